//! Environment health checks
//!
//! Probes every external tool the CLI drives concurrently and validates the
//! SDK paths in the global config.

use std::path::Path;

use flow_core::prelude::*;
use flow_tools::{locate, probe, ToolProbe, ToolRunner};
use futures_util::future::join_all;
use serde::Serialize;

use crate::config::{load_config_strict, validate_sdk_paths, FlowConfig};

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Missing,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "ok"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Missing => write!(f, "missing"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether a missing tool makes the environment unusable
    pub required: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<Check>,
}

impl DoctorReport {
    /// No required tool is missing
    pub fn is_healthy(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|c| c.required && c.status == CheckStatus::Missing)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

struct Requirement {
    name: &'static str,
    program: String,
    /// Version arguments; `None` only checks that the program is on PATH
    version_args: Option<&'static [&'static str]>,
    required: bool,
    hint: &'static str,
}

fn requirements(config: &FlowConfig) -> Vec<Requirement> {
    let tools = config.tool_paths();
    let mut list = vec![
        Requirement {
            name: "Flutter",
            program: tools.flutter,
            version_args: Some(&["--version"]),
            required: true,
            hint: "Install the Flutter SDK from https://flutter.dev or set flutter.sdk_path",
        },
        Requirement {
            name: "Dart",
            program: tools.dart,
            version_args: Some(&["--version"]),
            required: true,
            hint: "Dart ships with the Flutter SDK; check flutter.sdk_path",
        },
        Requirement {
            name: "ADB",
            program: tools.adb,
            version_args: Some(&["version"]),
            required: false,
            hint: "Install Android platform-tools or set android.sdk_path",
        },
        Requirement {
            name: "Android Emulator",
            program: tools.emulator,
            version_args: Some(&["-version"]),
            required: false,
            hint: "Install the emulator package with the Android SDK manager",
        },
    ];

    if cfg!(target_os = "macos") {
        list.push(Requirement {
            name: "Xcode",
            program: tools.xcrun,
            version_args: Some(&["--version"]),
            required: false,
            hint: "Install Xcode from the Mac App Store and run xcode-select --install",
        });
    }

    list.extend([
        Requirement {
            name: "Git",
            program: "git".to_string(),
            version_args: Some(&["--version"]),
            required: false,
            hint: "Install Git from https://git-scm.com",
        },
        Requirement {
            name: "Java",
            program: "java".to_string(),
            version_args: Some(&["-version"]),
            required: false,
            hint: "Install a JDK (17 or newer) for Android builds",
        },
        Requirement {
            name: "keytool",
            program: tools.keytool,
            version_args: None,
            required: false,
            hint: "keytool ships with the JDK; needed for `flow deployment keystore`",
        },
        Requirement {
            name: "Bundler",
            program: tools.bundle,
            version_args: Some(&["--version"]),
            required: false,
            hint: "Install Ruby and run `gem install bundler` to use Fastlane",
        },
        Requirement {
            name: "Fastlane",
            program: "fastlane".to_string(),
            version_args: Some(&["--version"]),
            required: false,
            hint: "Install Fastlane with `gem install fastlane` for store releases",
        },
    ]);
    list
}

/// "Flutter 3.16.0" from "Flutter 3.16.0 • channel stable • https://..."
fn short_version(line: &str) -> String {
    line.split('•').next().unwrap_or(line).trim().to_string()
}

async fn run_requirement<R: ToolRunner>(runner: &R, requirement: &Requirement) -> Check {
    let result = match requirement.version_args {
        Some(args) => probe(runner, &requirement.program, args).await,
        None => {
            let location = locate(&requirement.program);
            ToolProbe {
                program: requirement.program.clone(),
                working: location.is_some(),
                location,
                version: None,
            }
        }
    };
    evaluate(requirement, &result)
}

fn evaluate(requirement: &Requirement, probe: &ToolProbe) -> Check {
    let (status, detail) = if probe.working {
        let detail = probe
            .version
            .as_deref()
            .map(short_version)
            .or_else(|| probe.location.as_ref().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "available".to_string());
        (CheckStatus::Ok, detail)
    } else if let Some(location) = &probe.location {
        (
            CheckStatus::Warning,
            format!("found at {} but failed to run", location.display()),
        )
    } else {
        (CheckStatus::Missing, "not found".to_string())
    };

    Check {
        name: requirement.name.to_string(),
        status,
        detail,
        hint: (status != CheckStatus::Ok).then(|| requirement.hint.to_string()),
        required: requirement.required,
    }
}

/// Run every check; tool probes run concurrently
pub async fn run_doctor<R: ToolRunner + Sync>(
    runner: &R,
    config: &FlowConfig,
    config_path: &Path,
) -> DoctorReport {
    let requirements = requirements(config);
    let mut checks = join_all(
        requirements
            .iter()
            .map(|requirement| run_requirement(runner, requirement)),
    )
    .await;

    checks.push(config_check(config_path));
    for issue in validate_sdk_paths(config, config_path) {
        checks.push(Check {
            name: issue.subject.clone(),
            status: CheckStatus::Warning,
            detail: issue.reason.clone(),
            hint: Some(format!("Fix it with `flow config set {}=<path>`", issue.subject)),
            required: false,
        });
    }

    let report = DoctorReport { checks };
    info!(
        "Doctor finished: {} ok, {} warning(s), {} missing",
        report.count(CheckStatus::Ok),
        report.count(CheckStatus::Warning),
        report.count(CheckStatus::Missing),
    );
    report
}

/// Whether the config file parses; a broken file means every setting is
/// running on defaults
fn config_check(path: &Path) -> Check {
    let (status, detail, hint) = match load_config_strict(path) {
        Ok(_) if path.exists() => (CheckStatus::Ok, path.display().to_string(), None),
        Ok(_) => (
            CheckStatus::Ok,
            "not created yet, using defaults".to_string(),
            None,
        ),
        Err(e) => (
            CheckStatus::Warning,
            e.to_string(),
            Some("Fix the file or run `flow config reset`; defaults are used until then".to_string()),
        ),
    };
    Check {
        name: "Config file".to_string(),
        status,
        detail,
        hint,
        required: false,
    }
}
