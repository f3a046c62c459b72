//! Test utilities for tool invocation and discovery
//!
//! [`ScriptedRunner`] stands in for real processes: each rule maps a command
//! line prefix to a canned outcome. Helpers at the bottom build [`Device`]
//! records with sensible defaults.

use std::sync::Mutex;
use std::time::Duration;

use flow_core::{Device, DeviceKind, Error, Platform, Readiness, Result};

use crate::runner::{Invocation, ToolOutput, ToolRunner};

#[derive(Debug, Clone)]
enum Outcome {
    Output(ToolOutput),
    Missing,
    Hang,
}

/// A [`ToolRunner`] that answers from a script instead of spawning processes.
///
/// Rules are matched in insertion order against [`Invocation::display`]
/// with `starts_with`. Unmatched invocations succeed with empty output.
/// Every invocation is recorded and available through [`ScriptedRunner::calls`].
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Outcome)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit 0 with the given stdout
    pub fn ok(self, prefix: &str, stdout: &str) -> Self {
        self.output(prefix, 0, stdout, "")
    }

    /// Exit with `code` and the given stderr
    pub fn fail(self, prefix: &str, code: i32, stderr: &str) -> Self {
        self.output(prefix, code, "", stderr)
    }

    pub fn output(mut self, prefix: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push((
            prefix.to_string(),
            Outcome::Output(ToolOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
        ));
        self
    }

    /// The program cannot be found
    pub fn missing(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Outcome::Missing));
        self
    }

    /// The program never finishes within its timeout
    pub fn hang(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Outcome::Hang));
        self
    }

    /// Command lines seen so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let line = invocation.display();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }

        let outcome = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, outcome)| outcome.clone());

        match outcome {
            Some(Outcome::Output(output)) => Ok(output),
            Some(Outcome::Missing) => Err(Error::ToolNotFound {
                program: invocation.program_name().to_string(),
            }),
            Some(Outcome::Hang) => Err(Error::ToolTimeout {
                program: invocation.program_name().to_string(),
                after: invocation.timeout.unwrap_or(Duration::from_secs(10)),
            }),
            None => Ok(ToolOutput {
                code: Some(0),
                ..Default::default()
            }),
        }
    }
}

/// Creates an available Android phone.
pub fn test_device(id: &str, name: &str) -> Device {
    test_device_full(id, name, Platform::Android, DeviceKind::Physical, Readiness::Available)
}

/// Creates an iOS simulator in the given readiness state.
pub fn test_simulator(id: &str, name: &str, readiness: Readiness) -> Device {
    test_device_full(id, name, Platform::Ios, DeviceKind::Simulator, readiness)
}

/// Creates a test device with full control over classification.
pub fn test_device_full(
    id: &str,
    name: &str,
    platform: Platform,
    kind: DeviceKind,
    readiness: Readiness,
) -> Device {
    Device {
        id: id.to_string(),
        name: name.to_string(),
        platform,
        kind,
        readiness,
        os_version: None,
        state: None,
    }
}
