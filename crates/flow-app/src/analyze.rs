//! Project analysis report

use std::time::Duration;

use flow_core::prelude::*;
use flow_core::{ConfigIssue, FlutterProject};
use flow_tools::{Invocation, ToolPaths, ToolRunner};
use serde::Serialize;

use crate::artifacts::{self, Artifact};
use crate::flavors::{AssetStatus, FlavorRegistry};

const ANALYZE_TIMEOUT: Duration = Duration::from_secs(120);

/// Packages the report calls out when present
const NOTABLE_PACKAGES: &[(&str, &str)] = &[
    ("flutter_launcher_icons", "App icon generation"),
    ("flutter_native_splash", "Splash screen generation"),
    ("flutter_flavorizr", "Flavor configuration"),
    ("build_runner", "Code generation"),
    ("json_annotation", "JSON serialization"),
    ("provider", "State management"),
    ("flutter_bloc", "State management"),
    ("flutter_riverpod", "State management"),
    ("dio", "HTTP client"),
    ("shared_preferences", "Local storage"),
    ("sqflite", "SQLite database"),
];

/// Packages the generate commands rely on
const RECOMMENDED: &[&str] = &["flutter_launcher_icons", "flutter_native_splash"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeAnalysis {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    /// Issue lines as printed by `flutter analyze`
    pub issues: Vec<String>,
}

impl CodeAnalysis {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencySummary {
    pub dependencies: usize,
    pub dev_dependencies: usize,
    pub notable: Vec<(String, String)>,
    pub missing_recommended: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlavorSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    pub issues: Vec<ConfigIssue>,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub platforms: Vec<&'static str>,
    /// `None` when code analysis was skipped or could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_error: Option<String>,
    pub dependencies: DependencySummary,
    pub flavors: Vec<FlavorSummary>,
    /// Artifacts of the unflavored build and any IPAs
    pub artifacts: Vec<Artifact>,
}

/// Count `flutter analyze` issue lines (`  error • message • lib/x.dart:1:2 • code`)
pub fn parse_analyzer_output(output: &str) -> CodeAnalysis {
    let mut analysis = CodeAnalysis::default();
    for line in output.lines().map(str::trim) {
        let Some((severity, _)) = line.split_once('•') else {
            continue;
        };
        match severity.trim() {
            "error" => analysis.errors += 1,
            "warning" => analysis.warnings += 1,
            "info" => analysis.infos += 1,
            _ => continue,
        }
        analysis.issues.push(line.to_string());
    }
    analysis
}

/// Run `flutter analyze`; the analyzer exits non-zero whenever it finds issues
pub async fn analyze_code<R: ToolRunner>(
    runner: &R,
    tools: &ToolPaths,
    project: &FlutterProject,
) -> Result<CodeAnalysis> {
    let invocation = Invocation::new(&tools.flutter)
        .args(["analyze", "--no-congratulate"])
        .current_dir(&project.root)
        .timeout(ANALYZE_TIMEOUT);
    let output = runner.run(&invocation).await?;
    let analysis = parse_analyzer_output(&output.stdout);

    if !output.success() && analysis.total() == 0 {
        return Err(Error::process(format!(
            "flutter analyze failed: {}",
            output.combined().trim()
        )));
    }
    debug!("flutter analyze found {} issue(s)", analysis.total());
    Ok(analysis)
}

pub fn summarize_dependencies(project: &FlutterProject) -> DependencySummary {
    DependencySummary {
        dependencies: project.dependencies.len(),
        dev_dependencies: project.dev_dependencies.len(),
        notable: NOTABLE_PACKAGES
            .iter()
            .filter(|(package, _)| project.has_dependency(package))
            .map(|(package, purpose)| (package.to_string(), purpose.to_string()))
            .collect(),
        missing_recommended: RECOMMENDED
            .iter()
            .filter(|package| !project.has_dependency(package))
            .map(|package| package.to_string())
            .collect(),
    }
}

/// Per-flavor summary; `only` restricts it to one flavor
pub fn summarize_flavors(
    project: &FlutterProject,
    registry: &FlavorRegistry,
    only: Option<&str>,
) -> Vec<FlavorSummary> {
    registry
        .all_names()
        .into_iter()
        .filter(|name| only.map_or(true, |o| o == name))
        .map(|name| {
            let flavor = registry.get(&name).ok();
            FlavorSummary {
                assets: flavor.map(|f| f.assets.status()),
                package_id: flavor.map(|f| f.package_ids.android.clone()),
                issues: registry.issues_for(&name).to_vec(),
                artifacts: artifacts::android_artifacts(&project.root, Some(&name)),
                name,
            }
        })
        .collect()
}

/// Build the full report; code analysis runs unless `skip_code`
pub async fn analyze_project<R: ToolRunner>(
    runner: &R,
    tools: &ToolPaths,
    project: &FlutterProject,
    registry: &FlavorRegistry,
    flavor: Option<&str>,
    skip_code: bool,
) -> Result<AnalysisReport> {
    if let Some(name) = flavor {
        if !registry.all_names().iter().any(|n| n == name) {
            registry.get(name)?;
        }
    }

    let (code, code_error) = if skip_code {
        (None, None)
    } else {
        match analyze_code(runner, tools, project).await {
            Ok(analysis) => (Some(analysis), None),
            Err(e) => {
                warn!("Code analysis unavailable: {}", e);
                (None, Some(e.to_string()))
            }
        }
    };

    let mut artifacts = artifacts::android_artifacts(&project.root, None);
    artifacts.extend(artifacts::ios_artifacts(&project.root));

    Ok(AnalysisReport {
        project: project.name.clone(),
        version: project.version.clone(),
        platforms: project.platforms(),
        code,
        code_error,
        dependencies: summarize_dependencies(project),
        flavors: summarize_flavors(project, registry, flavor),
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavors::{configs_dir, MANIFEST_FILENAME};
    use flow_tools::test_utils::ScriptedRunner;
    use std::path::Path;
    use tempfile::tempdir;

    const ANALYZER_OUTPUT: &str = "\
Analyzing app...

   info • Prefer const with constant constructors • lib/main.dart:10:12 • prefer_const_constructors
warning • Unused import: 'dart:async' • lib/home.dart:1:8 • unused_import
  error • Undefined name 'foo' • lib/home.dart:20:3 • undefined_identifier
   info • Missing documentation • lib/api.dart:4:1 • public_member_api_docs

4 issues found. (ran in 3.2s)
";

    fn project(root: &Path) -> FlutterProject {
        std::fs::write(
            root.join("pubspec.yaml"),
            "name: demo\nversion: 1.2.0+3\ndependencies:\n  flutter:\n    sdk: flutter\n  dio: ^5.0.0\ndev_dependencies:\n  flutter_launcher_icons: ^0.13.1\nflutter:\n  uses-material-design: true\n",
        )
        .unwrap();
        FlutterProject::load(root).unwrap()
    }

    #[test]
    fn test_parse_analyzer_output() {
        let analysis = parse_analyzer_output(ANALYZER_OUTPUT);
        assert_eq!(analysis.errors, 1);
        assert_eq!(analysis.warnings, 1);
        assert_eq!(analysis.infos, 2);
        assert_eq!(analysis.issues.len(), 4);
    }

    #[test]
    fn test_summarize_dependencies() {
        let temp = tempdir().unwrap();
        let summary = summarize_dependencies(&project(temp.path()));
        assert_eq!(summary.dependencies, 2);
        assert_eq!(summary.dev_dependencies, 1);
        assert_eq!(
            summary.notable,
            vec![
                ("flutter_launcher_icons".to_string(), "App icon generation".to_string()),
                ("dio".to_string(), "HTTP client".to_string()),
            ]
        );
        assert_eq!(summary.missing_recommended, vec!["flutter_native_splash"]);
    }

    #[tokio::test]
    async fn test_analyzer_exit_with_issues_is_not_an_error() {
        let temp = tempdir().unwrap();
        let runner = ScriptedRunner::new().output("flutter analyze", 1, ANALYZER_OUTPUT, "");
        let analysis = analyze_code(&runner, &ToolPaths::default(), &project(temp.path()))
            .await
            .unwrap();
        assert_eq!(analysis.total(), 4);
    }

    #[tokio::test]
    async fn test_report_includes_flavors_and_records_analyzer_failure() {
        let temp = tempdir().unwrap();
        let project = project(temp.path());
        for (name, manifest) in [("dev", r#"{"packageName": "com.acme.dev"}"#), ("bad", "{")] {
            let dir = configs_dir(temp.path()).join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(MANIFEST_FILENAME), manifest).unwrap();
        }
        let registry = FlavorRegistry::load(temp.path()).unwrap();
        let runner = ScriptedRunner::new().missing("flutter analyze");

        let report = analyze_project(&runner, &ToolPaths::default(), &project, &registry, None, false)
            .await
            .unwrap();

        assert!(report.code.is_none());
        assert!(report.code_error.is_some());
        assert_eq!(report.version.as_deref(), Some("1.2.0+3"));
        let names: Vec<&str> = report.flavors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["bad", "dev"]);
        assert_eq!(report.flavors[0].issues.len(), 1);
        assert_eq!(report.flavors[1].package_id.as_deref(), Some("com.acme.dev"));
        assert_eq!(report.flavors[1].assets, Some(AssetStatus::Partial));
    }

    #[tokio::test]
    async fn test_unknown_flavor_filter() {
        let temp = tempdir().unwrap();
        let project = project(temp.path());
        let registry = FlavorRegistry::load(temp.path()).unwrap();
        let err = analyze_project(&ScriptedRunner::new(), &ToolPaths::default(), &project, &registry, Some("qa"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { .. }));
    }
}
