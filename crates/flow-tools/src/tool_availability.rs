//! Locating and probing external tools
//!
//! [`ToolPaths`] decides which executable is used for each wrapped tool:
//! the configured SDK location when one is set, otherwise the bare program
//! name resolved through `PATH`. [`probe`] runs a tool's version command for
//! `flow doctor`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use flow_core::prelude::*;

use crate::runner::{Invocation, ToolRunner};

/// Timeout for version probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Executables used for each wrapped tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub flutter: String,
    pub dart: String,
    pub adb: String,
    pub emulator: String,
    pub xcrun: String,
    pub keytool: String,
    pub bundle: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            flutter: "flutter".to_string(),
            dart: "dart".to_string(),
            adb: "adb".to_string(),
            emulator: "emulator".to_string(),
            xcrun: "xcrun".to_string(),
            keytool: "keytool".to_string(),
            bundle: "bundle".to_string(),
        }
    }
}

impl ToolPaths {
    /// Build tool paths from configured SDK roots.
    ///
    /// Empty or missing roots fall back to `ANDROID_HOME` / `ANDROID_SDK_ROOT`
    /// for the Android SDK and to `PATH` lookup for everything else.
    pub fn from_sdk_roots(flutter_sdk: Option<&Path>, android_sdk: Option<&Path>) -> Self {
        let mut paths = Self::default();

        if let Some(sdk) = flutter_sdk.filter(|p| !p.as_os_str().is_empty()) {
            paths.flutter = path_string(sdk.join("bin").join("flutter"));
            paths.dart = path_string(sdk.join("bin").join("dart"));
        }

        let android_sdk = android_sdk
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(android_sdk_from_env);

        if let Some(sdk) = android_sdk {
            let adb = sdk.join("platform-tools").join("adb");
            if adb.exists() {
                paths.adb = path_string(adb);
            }
            let emulator = sdk.join("emulator").join("emulator");
            if emulator.exists() {
                paths.emulator = path_string(emulator);
            }
        }

        paths
    }
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Android SDK root from `ANDROID_HOME`, then `ANDROID_SDK_ROOT`
pub fn android_sdk_from_env() -> Option<PathBuf> {
    ["ANDROID_HOME", "ANDROID_SDK_ROOT"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Resolve a program name to its full path through `PATH`.
///
/// Absolute or relative paths are returned as-is when the file exists.
pub fn locate(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.exists().then(|| candidate.to_path_buf());
    }
    which::which(program).ok()
}

/// Result of probing one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProbe {
    pub program: String,
    /// Full path of the executable, when it could be located
    pub location: Option<PathBuf>,
    /// First non-empty line of the version output
    pub version: Option<String>,
    /// Whether the version command ran and exited successfully
    pub working: bool,
}

/// Run `program args...` and capture the first line of its version output.
///
/// Never fails: a missing or broken tool is reported through the probe.
pub async fn probe<R: ToolRunner>(runner: &R, program: &str, args: &[&str]) -> ToolProbe {
    let invocation = Invocation::new(program)
        .args(args.iter().copied())
        .timeout(PROBE_TIMEOUT);

    let location = locate(program);

    match runner.run(&invocation).await {
        Ok(output) => {
            // Several tools (java -version) print their version on stderr
            let text = if output.stdout.trim().is_empty() {
                &output.stderr
            } else {
                &output.stdout
            };
            ToolProbe {
                program: invocation.program_name().to_string(),
                location,
                version: first_line(text),
                working: output.success(),
            }
        }
        Err(e) => {
            debug!("Probe of {} failed: {}", program, e);
            ToolProbe {
                program: invocation.program_name().to_string(),
                location,
                version: None,
                working: false,
            }
        }
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
