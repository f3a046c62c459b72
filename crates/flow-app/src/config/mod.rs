//! Global configuration for Flow CLI
//!
//! Supports:
//! - `~/.flow-cli/config.yaml` - SDK paths and default preferences
//! - `FLOW_CLI_CONFIG` - Alternate config file location

pub mod settings;
pub mod types;

pub use settings::{
    config_path, get_value, load_config, load_config_reporting,
    load_config_strict, load_document, parse_assignment,
    parse_scalar, reset_config, save_document, set_value, validate_sdk_paths, CONFIG_PATH_ENV,
};
pub use types::*;
