//! Application error types with rich context

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::Platform;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single problem found while validating a configuration entry.
///
/// Flavor loading collects these instead of stopping at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    /// What the issue is about (flavor name, config key, ...)
    pub subject: String,
    /// File the issue was found in
    pub path: PathBuf,
    /// Human-readable reason
    pub reason: String,
}

impl ConfigIssue {
    pub fn new(subject: impl Into<String>, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.subject, self.reason, self.path.display())
    }
}

/// What a selector was trying to pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Flavor,
    Device,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Flavor => write!(f, "flavor"),
            TargetKind::Device => write!(f, "device"),
        }
    }
}

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Project Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No Flutter project found in {path} or any parent directory")]
    NoProject { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // External Tool Errors
    // ─────────────────────────────────────────────────────────────
    #[error("'{program}' not found. Install it or configure its SDK path with `flow config set`.")]
    ToolNotFound { program: String },

    #[error("'{program}' did not finish within {}s", .after.as_secs())]
    ToolTimeout { program: String, after: Duration },

    #[error("Process error: {message}")]
    Process { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration:{}", format_issues(.issues))]
    ConfigurationInvalid { issues: Vec<ConfigIssue> },

    // ─────────────────────────────────────────────────────────────
    // Discovery Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{platform} device discovery unavailable: {reason}")]
    DiscoveryUnavailable { platform: Platform, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Target Resolution Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Several {kind}s match{}; choose one with --{kind}: {}", describe_selector(.selector), .choices.join(", "))]
    TargetAmbiguous {
        kind: TargetKind,
        selector: Option<String>,
        choices: Vec<String>,
    },

    #[error("{kind} '{selector}' {}{}", describe_status(.reason), describe_choices(.choices))]
    TargetNotFound {
        kind: TargetKind,
        selector: String,
        /// Why a matching target cannot be used; `None` when nothing matched
        reason: Option<String>,
        choices: Vec<String>,
    },

    #[error("No {platform} device is ready. Connect a device or start an emulator/simulator.")]
    NoDevices { platform: Platform },

    // ─────────────────────────────────────────────────────────────
    // Dispatch Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Step {} of {total} failed ({label}){}{}", .step + 1, describe_code(.code), describe_output(.output))]
    DispatchFailed {
        /// Zero-based index of the failing step
        step: usize,
        total: usize,
        label: String,
        code: Option<i32>,
        output: String,
    },
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues.iter().map(|i| format!("\n  - {}", i)).collect()
}

fn describe_selector(selector: &Option<String>) -> String {
    match selector {
        Some(s) => format!(" '{}'", s),
        None => String::new(),
    }
}

fn describe_status(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!("is not usable ({})", r),
        None => "not found".to_string(),
    }
}

fn describe_choices(choices: &[String]) -> String {
    if choices.is_empty() {
        " (none available)".to_string()
    } else {
        format!(". Available: {}", choices.join(", "))
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {}", c),
        None => String::new(),
    }
}

fn describe_output(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{}", trimmed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn discovery_unavailable(platform: Platform, reason: impl Into<String>) -> Self {
        Self::DiscoveryUnavailable {
            platform,
            reason: reason.into(),
        }
    }

    pub fn no_project(path: impl Into<PathBuf>) -> Self {
        Self::NoProject { path: path.into() }
    }

    /// Stable machine-readable name of the error kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::NoProject { .. } => "no_project",
            Error::ToolNotFound { .. } => "tool_not_found",
            Error::ToolTimeout { .. } => "tool_timeout",
            Error::Process { .. } => "process",
            Error::Config { .. } | Error::ConfigurationInvalid { .. } => "configuration_invalid",
            Error::DiscoveryUnavailable { .. } => "discovery_unavailable",
            Error::TargetAmbiguous { .. } => "target_ambiguous",
            Error::TargetNotFound { .. } | Error::NoDevices { .. } => "target_not_found",
            Error::DispatchFailed { .. } => "dispatch_failed",
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config { .. } | Error::ConfigurationInvalid { .. } | Error::Yaml(_) => 3,
            Error::DiscoveryUnavailable { .. } => 4,
            Error::TargetAmbiguous { .. } => 5,
            Error::TargetNotFound { .. } | Error::NoDevices { .. } => 6,
            Error::DispatchFailed { .. } => 7,
            Error::NoProject { .. } => 8,
            _ => 1,
        }
    }

    /// Choices the user can pick from, when the error carries them
    pub fn choices(&self) -> &[String] {
        match self {
            Error::TargetAmbiguous { choices, .. } | Error::TargetNotFound { choices, .. } => {
                choices
            }
            _ => &[],
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
