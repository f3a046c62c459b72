//! # flow-app - Flavors, Target Resolution and Dispatch
//!
//! Application layer of Flow CLI. Everything here is driven by the binary's
//! command handlers and talks to external tools only through
//! [`flow_tools::ToolRunner`].
//!
//! ## Public API
//!
//! - [`FlavorRegistry`] - Per-flavor configuration from `assets/configs/<flavor>/config.json`
//! - [`TargetResolver`] / [`select_device`] - Pick the flavor and device an action applies to
//! - [`dispatch::plan`] / [`Plan::execute`] - Turn a [`ResolvedTarget`] into tool invocations and run them
//! - [`config`] - Global `~/.flow-cli/config.yaml`
//! - [`doctor`], [`analyze`], [`deployment`], [`fastlane`], [`generate`] - Supporting commands

pub mod analyze;
pub mod artifacts;
pub mod config;
pub mod deployment;
pub mod fastlane;
pub mod dispatch;
pub mod doctor;
pub mod flavors;
pub mod generate;
pub mod resolver;

pub use config::FlowConfig;
pub use dispatch::{Action, BuildFormat, DispatchContext, KeystoreOptions, Plan, Step, StepOutcome};
pub use flavors::{Flavor, FlavorRegistry};
pub use resolver::{select_device, ResolvedTarget, TargetRequest, TargetResolver};
