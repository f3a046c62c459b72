//! Configuration types for `~/.flow-cli/config.yaml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flow_tools::ToolPaths;
use serde::{Deserialize, Serialize};

/// Global Flow CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub flutter: FlutterSettings,

    #[serde(default)]
    pub android: AndroidSettings,

    #[serde(default)]
    pub ios: IosSettings,

    #[serde(default)]
    pub general: GeneralSettings,

    /// Command shortcuts; stored and listed, not expanded
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    #[serde(default)]
    pub recent_projects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlutterSettings {
    /// Flutter SDK root; empty means `flutter` from PATH
    #[serde(default)]
    pub sdk_path: String,

    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for FlutterSettings {
    fn default() -> Self {
        Self {
            sdk_path: String::new(),
            channel: default_channel(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AndroidSettings {
    /// Android SDK root; empty falls back to ANDROID_HOME / ANDROID_SDK_ROOT
    #[serde(default)]
    pub sdk_path: String,

    #[serde(default)]
    pub build_tools_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IosSettings {
    #[serde(default)]
    pub xcode_path: String,

    #[serde(default)]
    pub team_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralSettings {
    /// Flavor used when `--flavor` is omitted
    #[serde(default)]
    pub default_flavor: String,

    /// Run `flutter pub get` before builds and runs
    #[serde(default = "default_true")]
    pub auto_pub_get: bool,

    #[serde(default)]
    pub verbose_output: bool,

    #[serde(default = "default_true")]
    pub color_output: bool,

    /// Upper bound for each discovery tool call
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            default_flavor: String::new(),
            auto_pub_get: true,
            verbose_output: false,
            color_output: true,
            discovery_timeout_secs: default_discovery_timeout(),
        }
    }
}

fn default_channel() -> String {
    "stable".to_string()
}

fn default_true() -> bool {
    true
}

fn default_discovery_timeout() -> u64 {
    10
}

fn non_empty(value: &str) -> Option<&Path> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| Path::new(trimmed))
}

impl FlowConfig {
    /// Executables to use, honoring configured SDK roots
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths::from_sdk_roots(
            non_empty(&self.flutter.sdk_path),
            non_empty(&self.android.sdk_path),
        )
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.general.discovery_timeout_secs.max(1))
    }

    pub fn default_flavor(&self) -> Option<&str> {
        let name = self.general.default_flavor.trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn flutter_sdk(&self) -> Option<PathBuf> {
        non_empty(&self.flutter.sdk_path).map(Path::to_path_buf)
    }

    pub fn android_sdk(&self) -> Option<PathBuf> {
        non_empty(&self.android.sdk_path).map(Path::to_path_buf)
    }

    pub fn xcode_path(&self) -> Option<PathBuf> {
        non_empty(&self.ios.xcode_path).map(Path::to_path_buf)
    }
}
