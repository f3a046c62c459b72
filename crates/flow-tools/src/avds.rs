//! Android AVD (Android Virtual Device) listing
//!
//! `flow android devices` shows configured AVDs next to running devices so
//! the user knows which emulators can be started. Uses `emulator -list-avds`
//! from the Android SDK.

use std::sync::LazyLock;
use std::time::Duration;

use flow_core::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::runner::{Invocation, ToolRunner};

/// Static regex pattern for extracting API level from AVD names
static API_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_API_(\d+)$").expect("Invalid API pattern regex"));

/// An Android Virtual Device (AVD)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidAvd {
    /// AVD name (used for `emulator -avd`)
    pub name: String,
    /// Friendly display name
    pub display_name: String,
    /// API level (e.g., 34 for Android 14)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
}

/// List all configured Android AVDs
pub async fn list_android_avds<R: ToolRunner>(
    runner: &R,
    emulator: &str,
    limit: Duration,
) -> Result<Vec<AndroidAvd>> {
    let invocation = Invocation::new(emulator).arg("-list-avds").timeout(limit);
    let output = runner.run(&invocation).await?;

    if !output.success() {
        return Err(Error::process(format!(
            "emulator -list-avds failed: {}",
            output.stderr.trim()
        )));
    }

    Ok(parse_avd_list(&output.stdout))
}

/// Parse the output of `emulator -list-avds`
///
/// Output format is one AVD name per line. Diagnostic lines from the
/// emulator binary (`INFO    | ...`) are skipped.
fn parse_avd_list(output: &str) -> Vec<AndroidAvd> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' '))
        .map(|name| {
            let (display_name, api_level) = parse_avd_name(name);
            AndroidAvd {
                name: name.to_string(),
                display_name,
                api_level,
            }
        })
        .collect()
}

/// Parse AVD name to extract display name and API level
///
/// - "Pixel_6_API_33" -> ("Pixel 6", Some(33))
/// - "My_Custom_AVD" -> ("My Custom AVD", None)
fn parse_avd_name(name: &str) -> (String, Option<u32>) {
    if let Some(caps) = API_PATTERN.captures(name) {
        let api_level = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let display = API_PATTERN.replace(name, "").replace('_', " ");
        return (display.trim().to_string(), api_level);
    }

    (name.replace('_', " "), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedRunner;

    #[test]
    fn test_parse_avd_list() {
        let output = "Pixel_6_API_33\nNexus_5X_API_29\nMy_Custom_AVD\n";
        let avds = parse_avd_list(output);

        assert_eq!(avds.len(), 3);
        assert_eq!(avds[0].name, "Pixel_6_API_33");
        assert_eq!(avds[0].display_name, "Pixel 6");
        assert_eq!(avds[0].api_level, Some(33));
        assert_eq!(avds[2].api_level, None);
    }

    #[test]
    fn test_parse_avd_list_skips_diagnostics() {
        let output = "INFO    | Storing crashdata in: /tmp/android/emu-crash.db\nPixel_7_API_34\n";
        let avds = parse_avd_list(output);
        assert_eq!(avds.len(), 1);
        assert_eq!(avds[0].display_name, "Pixel 7");
    }

    #[test]
    fn test_parse_avd_name_without_api() {
        let (display, api) = parse_avd_name("My_Custom_AVD");
        assert_eq!(display, "My Custom AVD");
        assert_eq!(api, None);
    }

    #[tokio::test]
    async fn test_list_android_avds() {
        let runner = ScriptedRunner::new().ok("emulator -list-avds", "Pixel_7_API_34\n");
        let avds = list_android_avds(&runner, "emulator", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(avds.len(), 1);
    }

    #[tokio::test]
    async fn test_list_android_avds_missing_emulator() {
        let runner = ScriptedRunner::new().missing("emulator");
        let result = list_android_avds(&runner, "emulator", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }
}
