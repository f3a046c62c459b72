//! Device Directory
//!
//! Enumerates run targets for a platform by invoking the platform tools and
//! normalizing their output into [`Device`] records. Results are never
//! cached; every call re-runs the tools.
//!
//! A tool that is missing, exits non-zero, times out or prints something
//! unparseable makes discovery *unavailable*. That is reported as
//! [`Error::DiscoveryUnavailable`], which callers must keep distinct from an
//! empty device list.

use std::time::Duration;

use flow_core::prelude::*;
use flow_core::{Device, Platform};
use serde::Serialize;

use crate::android;
use crate::avds::{self, AndroidAvd};
use crate::ios::{self, SimRuntime};
use crate::runner::{Invocation, ToolOutput, ToolRunner};
use crate::tool_availability::ToolPaths;

/// Default bound for a single discovery tool call
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// `flutter devices` starts the Flutter tool and is noticeably slower
const FLUTTER_DEVICES_TIMEOUT: Duration = Duration::from_secs(30);

/// Devices found for one platform
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub platform: Platform,
    /// Sorted by readiness, then name, then id
    pub devices: Vec<Device>,
    /// Problems with secondary sources that did not stop discovery
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Discovery {
    pub fn available(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.is_available())
    }
}

/// Discovers devices through a [`ToolRunner`]
pub struct DeviceDirectory<'a, R> {
    runner: &'a R,
    tools: ToolPaths,
    timeout: Duration,
}

impl<'a, R: ToolRunner + Sync> DeviceDirectory<'a, R> {
    pub fn new(runner: &'a R, tools: ToolPaths) -> Self {
        Self {
            runner,
            tools,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enumerate devices for one platform
    pub async fn discover(&self, platform: Platform) -> Result<Discovery> {
        info!("Discovering {} devices...", platform);
        let mut discovery = match platform {
            Platform::Android => self.discover_android().await?,
            Platform::Ios => self.discover_ios().await?,
        };
        sort_devices(&mut discovery.devices);
        info!(
            "Discovered {} {} device(s), {} available",
            discovery.devices.len(),
            platform,
            discovery.available().count()
        );
        Ok(discovery)
    }

    /// Enumerate both platforms concurrently
    pub async fn discover_all(&self) -> (Result<Discovery>, Result<Discovery>) {
        tokio::join!(
            self.discover(Platform::Android),
            self.discover(Platform::Ios)
        )
    }

    /// Configured AVDs, for listing next to running Android devices
    pub async fn android_avds(&self) -> Result<Vec<AndroidAvd>> {
        avds::list_android_avds(self.runner, &self.tools.emulator, self.timeout).await
    }

    /// Installed iOS simulator runtimes, newest first
    pub async fn ios_runtimes(&self) -> Result<Vec<SimRuntime>> {
        let invocation = Invocation::new(&self.tools.xcrun)
            .args(["simctl", "list", "runtimes", "--json"])
            .timeout(self.timeout);
        let output = self.run_source(Platform::Ios, &invocation).await?;
        ios::parse_simctl_runtimes(&output.stdout).map_err(|e| {
            Error::discovery_unavailable(
                Platform::Ios,
                format!("unparseable `{}` output: {}", invocation.display(), e),
            )
        })
    }

    async fn discover_android(&self) -> Result<Discovery> {
        let invocation = Invocation::new(&self.tools.adb)
            .args(["devices", "-l"])
            .timeout(self.timeout);
        let output = self.run_source(Platform::Android, &invocation).await?;

        let mut devices = android::parse_adb_devices(&output.stdout);
        for device in devices.iter_mut().filter(|d| d.is_available()) {
            device.os_version =
                android::query_os_version(self.runner, &self.tools.adb, &device.id, self.timeout)
                    .await;
        }

        Ok(Discovery {
            platform: Platform::Android,
            devices,
            warnings: Vec::new(),
        })
    }

    async fn discover_ios(&self) -> Result<Discovery> {
        let simctl = Invocation::new(&self.tools.xcrun)
            .args(["simctl", "list", "devices", "available", "--json"])
            .timeout(self.timeout);
        let flutter = Invocation::new(&self.tools.flutter)
            .args(["devices", "--machine"])
            .timeout(self.timeout.max(FLUTTER_DEVICES_TIMEOUT));

        let (simctl_result, flutter_result) = tokio::join!(
            self.run_source(Platform::Ios, &simctl),
            self.runner.run(&flutter)
        );

        let output = simctl_result?;
        let mut devices = ios::parse_simctl_devices(&output.stdout).map_err(|e| {
            Error::discovery_unavailable(
                Platform::Ios,
                format!("unparseable `{}` output: {}", simctl.display(), e),
            )
        })?;

        let mut warnings = Vec::new();
        match flutter_result {
            Ok(output) if output.success() => match ios::parse_flutter_devices(&output.stdout) {
                Ok(physical) => {
                    for device in physical {
                        if !devices.iter().any(|d| d.id == device.id) {
                            devices.push(device);
                        }
                    }
                }
                Err(e) => warnings.push(format!("Could not parse physical iOS devices: {}", e)),
            },
            Ok(output) => warnings.push(format!(
                "Physical iOS devices not listed: `{}` exited with code {:?}",
                flutter.display(),
                output.code
            )),
            Err(e) => warnings.push(format!("Physical iOS devices not listed: {}", e)),
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(Discovery {
            platform: Platform::Ios,
            devices,
            warnings,
        })
    }

    /// Run a primary discovery source, mapping every failure to
    /// [`Error::DiscoveryUnavailable`]
    async fn run_source(&self, platform: Platform, invocation: &Invocation) -> Result<ToolOutput> {
        let output = self
            .runner
            .run(invocation)
            .await
            .map_err(|e| Error::discovery_unavailable(platform, e.to_string()))?;

        if !output.success() {
            let detail = output.combined();
            return Err(Error::discovery_unavailable(
                platform,
                if detail.is_empty() {
                    format!("`{}` exited with code {:?}", invocation.display(), output.code)
                } else {
                    format!(
                        "`{}` exited with code {:?}: {}",
                        invocation.display(),
                        output.code,
                        detail
                    )
                },
            ));
        }

        Ok(output)
    }
}

/// Deterministic device order: ready first, then by name, then by id
pub fn sort_devices(devices: &mut [Device]) {
    devices.sort_by(|a, b| {
        a.readiness
            .cmp(&b.readiness)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}
