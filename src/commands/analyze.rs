//! `flow analyze`

use flow_app::analyze::{analyze_project, AnalysisReport};
use flow_app::artifacts::format_size;
use flow_app::FlavorRegistry;
use flow_core::prelude::*;

use super::Context;
use crate::cli::AnalyzeArgs;
use crate::output::columns;

/// Issue lines shown in text mode unless --verbose
const SHOWN_ISSUES: usize = 5;

pub async fn run(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let project = ctx.project()?;
    let registry = FlavorRegistry::load(&project.root)?;
    let report = analyze_project(
        &ctx.runner,
        &ctx.tools(),
        &project,
        &registry,
        args.flavor.as_deref(),
        args.skip_code,
    )
    .await?;

    if ctx.output.is_json() {
        return ctx.output.json(&report);
    }
    show(ctx, &report);
    Ok(())
}

fn show(ctx: &Context, report: &AnalysisReport) {
    let out = &ctx.output;
    out.heading(&format!(
        "{} {}",
        report.project,
        report.version.as_deref().unwrap_or("")
    ));
    out.line(&format!("  Platforms: {}", report.platforms.join(", ")));

    out.heading("Code");
    match (&report.code, &report.code_error) {
        (Some(code), _) if code.total() == 0 => out.success("No issues found"),
        (Some(code), _) => {
            out.line(&format!(
                "  {} error(s), {} warning(s), {} info",
                code.errors, code.warnings, code.infos
            ));
            let limit = if ctx.config.general.verbose_output { usize::MAX } else { SHOWN_ISSUES };
            for issue in code.issues.iter().take(limit) {
                out.hint(issue);
            }
        }
        (None, Some(error)) => out.warning(error),
        (None, None) => out.line("  skipped"),
    }

    out.heading("Dependencies");
    let deps = &report.dependencies;
    out.line(&format!(
        "  {} dependencies, {} dev dependencies",
        deps.dependencies, deps.dev_dependencies
    ));
    for (package, purpose) in &deps.notable {
        out.line(&format!("  {} - {}", package, purpose));
    }
    for package in &deps.missing_recommended {
        out.hint(&format!("{} is not installed; `flow generate` needs it", package));
    }

    out.heading("Flavors");
    if report.flavors.is_empty() {
        out.line("  none");
    }
    for flavor in &report.flavors {
        let status = match (&flavor.assets, flavor.issues.is_empty()) {
            (Some(assets), true) => assets.to_string(),
            _ => "invalid".to_string(),
        };
        out.line(&format!(
            "  {}  {}  {}",
            flavor.name,
            status,
            flavor.package_id.as_deref().unwrap_or("")
        ));
        for issue in &flavor.issues {
            out.hint(&issue.reason);
        }
        for artifact in &flavor.artifacts {
            out.hint(&format!("{} {}", artifact.path.display(), format_size(artifact.size_bytes)));
        }
    }

    if !report.artifacts.is_empty() {
        out.heading("Build artifacts");
        let rows: Vec<Vec<String>> = report
            .artifacts
            .iter()
            .map(|a| vec![a.kind.to_string(), format_size(a.size_bytes), a.path.display().to_string()])
            .collect();
        for line in columns(&rows) {
            out.line(&format!("  {}", line));
        }
    }
}
