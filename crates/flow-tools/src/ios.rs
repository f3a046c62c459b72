//! iOS device discovery
//!
//! Simulators come from `xcrun simctl list devices available --json`;
//! physical devices come from `flutter devices --machine`, which is the only
//! source that knows about connected iPhones without extra tooling.

use std::collections::BTreeMap;

use flow_core::prelude::*;
use flow_core::{Device, DeviceKind, Platform, Readiness};
use serde::{Deserialize, Serialize};

const RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

/// JSON output from `xcrun simctl list devices --json`
#[derive(Debug, Deserialize)]
struct SimctlOutput {
    devices: BTreeMap<String, Vec<SimctlDevice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlDevice {
    udid: String,
    name: String,
    state: String,
    #[serde(default)]
    is_available: Option<bool>,
}

/// Parse the simctl device listing into iOS simulator records.
///
/// Only iOS runtimes are kept; watchOS/tvOS/visionOS simulators cannot run
/// a Flutter mobile build.
pub fn parse_simctl_devices(json: &str) -> Result<Vec<Device>> {
    let parsed: SimctlOutput = serde_json::from_str(json)?;

    let mut devices = Vec::new();
    for (runtime_key, entries) in parsed.devices {
        let runtime = parse_runtime_name(&runtime_key);
        if !runtime.starts_with("iOS") {
            continue;
        }

        for entry in entries {
            if entry.is_available == Some(false) {
                continue;
            }

            devices.push(Device {
                id: entry.udid,
                name: entry.name,
                platform: Platform::Ios,
                kind: DeviceKind::Simulator,
                readiness: simulator_readiness(&entry.state),
                os_version: Some(runtime.clone()),
                state: Some(entry.state),
            });
        }
    }

    Ok(devices)
}

fn simulator_readiness(state: &str) -> Readiness {
    match state.to_lowercase().as_str() {
        "booted" => Readiness::Available,
        "booting" => Readiness::Booting,
        _ => Readiness::Unavailable,
    }
}

/// Parse runtime identifier to friendly name
/// "com.apple.CoreSimulator.SimRuntime.iOS-17-2" -> "iOS 17.2"
fn parse_runtime_name(identifier: &str) -> String {
    match identifier.strip_prefix(RUNTIME_PREFIX) {
        Some(suffix) => match suffix.split_once('-') {
            Some((os_name, version)) => format!("{} {}", os_name, version.replace('-', ".")),
            None => suffix.to_string(),
        },
        None => identifier.to_string(),
    }
}

/// One entry of `flutter devices --machine`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlutterDevice {
    id: String,
    name: String,
    #[serde(alias = "platform")]
    target_platform: String,
    #[serde(default)]
    emulator: bool,
    #[serde(default)]
    sdk: Option<String>,
}

/// Extract physical iOS devices from `flutter devices --machine` output.
///
/// Flutter may print progress lines around the JSON array; only the
/// bracketed part is parsed. Output without an array yields no devices.
pub fn parse_flutter_devices(output: &str) -> Result<Vec<Device>> {
    let json_str = match (output.find('['), output.rfind(']')) {
        (Some(start), Some(end)) if end > start => &output[start..=end],
        _ => {
            warn!("No JSON array found in flutter devices output");
            return Ok(Vec::new());
        }
    };

    let entries: Vec<FlutterDevice> = serde_json::from_str(json_str)?;

    Ok(entries
        .into_iter()
        .filter(|d| d.target_platform.starts_with("ios") && !d.emulator)
        .map(|d| Device {
            id: d.id,
            name: d.name,
            platform: Platform::Ios,
            kind: DeviceKind::Physical,
            readiness: Readiness::Available,
            os_version: d.sdk,
            state: None,
        })
        .collect())
}

/// An installed simulator runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimRuntime {
    pub name: String,
    pub version: String,
    pub build: Option<String>,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
struct SimctlRuntimes {
    runtimes: Vec<SimctlRuntime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlRuntime {
    name: String,
    version: String,
    #[serde(default)]
    buildversion: Option<String>,
    #[serde(default)]
    is_available: bool,
}

/// Parse `xcrun simctl list runtimes --json`, keeping iOS runtimes newest
/// first
pub fn parse_simctl_runtimes(json: &str) -> Result<Vec<SimRuntime>> {
    let output: SimctlRuntimes = serde_json::from_str(json)?;
    let mut runtimes: Vec<SimRuntime> = output
        .runtimes
        .into_iter()
        .filter(|r| r.name.starts_with("iOS"))
        .map(|r| SimRuntime {
            name: r.name,
            version: r.version,
            build: r.buildversion,
            available: r.is_available,
        })
        .collect();
    runtimes.sort_by(|a, b| version_key(&b.version).cmp(&version_key(&a.version)));
    Ok(runtimes)
}

fn version_key(version: &str) -> Vec<u32> {
    version.split('.').map(|part| part.parse().unwrap_or(0)).collect()
}
