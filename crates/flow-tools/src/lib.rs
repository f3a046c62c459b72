//! # flow-tools - External Tool Invocation and Device Discovery
//!
//! Wraps the Flutter, Android and iOS command line tools. Every subprocess
//! goes through the [`ToolRunner`] trait so discovery and dispatch can be
//! tested with a scripted runner.
//!
//! Depends on [`flow_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Execution
//! - [`ToolRunner`] - Run an [`Invocation`] and collect its [`ToolOutput`]
//! - [`SystemRunner`] - Real child processes via `tokio::process`
//!
//! ### Device Discovery
//! - [`DeviceDirectory`] - Enumerate Android and iOS devices
//! - [`Discovery`] - Devices for one platform plus non-fatal warnings
//! - [`parse_adb_devices()`], [`parse_simctl_devices()`], [`parse_flutter_devices()`] - Output parsers
//!
//! ### Platform Utilities
//! - [`AndroidAvd`] - Configured Android virtual devices
//! - [`ToolPaths`] - Which executable to use for each tool
//! - [`probe()`] - Version check used by `flow doctor`

pub mod android;
pub mod avds;
pub mod directory;
pub mod ios;
pub mod runner;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;

// Public API re-exports
pub use android::parse_adb_devices;
pub use avds::{list_android_avds, AndroidAvd};
pub use directory::{sort_devices, DeviceDirectory, Discovery, DEFAULT_DISCOVERY_TIMEOUT};
pub use ios::{parse_flutter_devices, parse_simctl_devices, parse_simctl_runtimes, SimRuntime};
pub use runner::{Invocation, StdioMode, SystemRunner, ToolOutput, ToolRunner};
pub use tool_availability::{android_sdk_from_env, locate, probe, ToolPaths, ToolProbe};
