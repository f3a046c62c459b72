//! Android device discovery using `adb devices -l`

use std::sync::LazyLock;
use std::time::Duration;

use flow_core::prelude::*;
use flow_core::{Device, DeviceKind, Platform, Readiness};
use regex::Regex;

use crate::runner::{Invocation, ToolRunner};

/// `model:Pixel_7` in the long listing
static MODEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmodel:(\S+)").expect("Invalid model pattern regex"));

/// adb state meaning the device accepts commands
const READY_STATE: &str = "device";

/// Parse the output of `adb devices -l`
///
/// ```text
/// List of devices attached
/// emulator-5554          device product:sdk_gphone64_arm64 model:sdk_gphone64_arm64 device:emu64a transport_id:1
/// R58M123ABC             unauthorized usb:1-1 transport_id:2
/// 0123456789ABCDEF       no permissions (user in plugdev group); see [http://developer.android.com/tools/device.html] usb:1-2
/// ```
///
/// Header lines and daemon notices (`* daemon started successfully`) are skipped.
pub fn parse_adb_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*')
        })
        .filter_map(parse_adb_line)
        .collect()
}

fn parse_adb_line(line: &str) -> Option<Device> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?;
    let state = match tokens.next() {
        Some("no") => {
            // "no permissions" is the only two-word state
            tokens.next();
            "no permissions"
        }
        Some(state) => state,
        None => {
            debug!("Skipping adb line without state: {}", line);
            return None;
        }
    };

    let name = MODEL_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('_', " "))
        .unwrap_or_else(|| id.to_string());

    let kind = if id.starts_with("emulator-") {
        DeviceKind::Emulator
    } else {
        DeviceKind::Physical
    };

    let readiness = if state == READY_STATE {
        Readiness::Available
    } else {
        Readiness::Unavailable
    };

    Some(Device {
        id: id.to_string(),
        name,
        platform: Platform::Android,
        kind,
        readiness,
        os_version: None,
        state: Some(state.to_string()),
    })
}

/// Ask a connected device for its Android release (e.g. "14").
///
/// Returns `None` when the query fails; the version is informational only.
pub async fn query_os_version<R: ToolRunner>(
    runner: &R,
    adb: &str,
    id: &str,
    limit: Duration,
) -> Option<String> {
    let invocation = Invocation::new(adb)
        .args(["-s", id, "shell", "getprop", "ro.build.version.release"])
        .timeout(limit);

    match runner.run(&invocation).await {
        Ok(output) if output.success() => {
            let version = output.stdout.trim();
            (!version.is_empty()).then(|| format!("Android {}", version))
        }
        Ok(output) => {
            debug!("getprop on {} exited with {:?}", id, output.code);
            None
        }
        Err(e) => {
            debug!("getprop on {} failed: {}", id, e);
            None
        }
    }
}
