//! # flow-core - Core Domain Types
//!
//! Foundation crate for Flow CLI. Provides domain types, error handling,
//! logging setup and Flutter project detection.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Device`] - A normalized device/emulator/simulator record
//! - [`Platform`], [`DeviceKind`], [`Readiness`] - Device classification
//! - [`BuildMode`] - debug / profile / release
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum covering configuration, discovery, resolution and dispatch
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//! - [`ConfigIssue`] - One collected validation problem
//!
//! ### Projects (`project`)
//! - [`FlutterProject`] - Locate and describe the Flutter app a command applies to
//!
//! ## Prelude
//!
//! ```rust
//! use flow_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod project;
pub mod types;

/// Prelude for common imports used throughout all Flow CLI crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{ConfigIssue, Error, Result, ResultExt, TargetKind};
pub use project::FlutterProject;
pub use types::{BuildMode, Device, DeviceKind, Platform, Readiness};
