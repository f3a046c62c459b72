//! External tool execution
//!
//! Every subprocess the CLI starts goes through [`ToolRunner`]. Discovery and
//! dispatch are written against the trait so they can be driven by a scripted
//! runner in tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use flow_core::prelude::*;
use tokio::process::Command;
use tokio::time::timeout;

/// How a child's standard streams are wired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Capture stdout/stderr; stdin is closed
    #[default]
    Capture,
    /// Hand the terminal to the child (interactive `flutter run`, keytool prompts)
    Inherit,
    /// Like `Inherit`, but the child's stdout is written to our stderr
    InheritToStderr,
}

impl StdioMode {
    /// Whether the child owns the terminal and nothing is captured
    pub fn is_inherited(self) -> bool {
        matches!(self, StdioMode::Inherit | StdioMode::InheritToStderr)
    }
}

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub stdio: StdioMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout: None,
            stdio: StdioMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn inherit_stdio(mut self) -> Self {
        self.stdio = StdioMode::Inherit;
        self
    }

    /// Short program name ("flutter" for "/opt/flutter/bin/flutter")
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// "flutter build apk --release", using the short program name
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program_name().to_string()
        } else {
            format!("{} {}", self.program_name(), self.args.join(" "))
        }
    }
}

/// What a finished tool produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, as a user would have seen them
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end().is_empty(), self.stderr.trim_end().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Runs external tools
///
/// `Err` means the tool could not be run to completion (missing binary,
/// timeout, spawn failure). A tool that ran and exited non-zero is `Ok` with
/// a non-success [`ToolOutput`]; callers decide what that means.
#[trait_variant::make(ToolRunner: Send)]
pub trait LocalToolRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs tools as real child processes via `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        debug!("Running: {}", invocation.display());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).kill_on_drop(true);

        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        if invocation.stdio.is_inherited() {
            return run_attached(command, invocation).await;
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match invocation.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| timed_out(invocation, limit))?,
            None => command.output().await,
        }
        .map_err(|e| spawn_error(invocation, e))?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!("{} exited with {:?}", invocation.program_name(), result.code);
        if !result.stderr.is_empty() {
            trace!("{} stderr: {}", invocation.program_name(), result.stderr);
        }

        Ok(result)
    }
}

/// Spawn with the terminal attached and wait; nothing is captured
async fn run_attached(mut command: Command, invocation: &Invocation) -> Result<ToolOutput> {
    command.stdin(Stdio::inherit()).stderr(Stdio::inherit());
    match invocation.stdio {
        StdioMode::InheritToStderr => command.stdout(std::io::stderr()),
        _ => command.stdout(Stdio::inherit()),
    };

    let mut child = command.spawn().map_err(|e| spawn_error(invocation, e))?;
    let status = match invocation.timeout {
        Some(limit) => timeout(limit, child.wait())
            .await
            .map_err(|_| timed_out(invocation, limit))?,
        None => child.wait().await,
    }
    .map_err(|e| spawn_error(invocation, e))?;

    debug!("{} exited with {:?}", invocation.program_name(), status.code());
    Ok(ToolOutput {
        code: status.code(),
        ..ToolOutput::default()
    })
}

fn timed_out(invocation: &Invocation, limit: Duration) -> Error {
    warn!("{} timed out after {:?}", invocation.display(), limit);
    Error::ToolTimeout {
        program: invocation.program_name().to_string(),
        after: limit,
    }
}

fn spawn_error(invocation: &Invocation, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::ToolNotFound {
            program: invocation.program_name().to_string(),
        }
    } else {
        Error::process(format!("Failed to run {}: {}", invocation.display(), e))
    }
}
