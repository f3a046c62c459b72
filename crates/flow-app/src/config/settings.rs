//! Loading, editing and saving `~/.flow-cli/config.yaml`
//!
//! Commands read the typed [`FlowConfig`]; `flow config get/set` work on the
//! raw YAML document so keys this version does not know about survive a
//! round trip.

use std::path::{Path, PathBuf};

use flow_core::prelude::*;
use flow_core::ConfigIssue;
use serde_yaml::{Mapping, Value};

use super::types::FlowConfig;

const CONFIG_DIR: &str = ".flow-cli";
const CONFIG_FILENAME: &str = "config.yaml";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "FLOW_CLI_CONFIG";

/// Location of the global config file
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILENAME)
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load the config file.
///
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> FlowConfig {
    load_config_reporting(path).0
}

/// Like [`load_config`], but also hands back the error that caused a
/// fallback to defaults so the caller can show it.
pub fn load_config_reporting(path: &Path) -> (FlowConfig, Option<Error>) {
    match load_config_strict(path) {
        Ok(config) => (config, None),
        Err(e) => {
            warn!("Failed to load {:?}: {}; using defaults", path, e);
            (FlowConfig::default(), Some(e))
        }
    }
}

/// Load the config file, reporting parse errors instead of falling back.
///
/// A missing file is not an error.
pub fn load_config_strict(path: &Path) -> Result<FlowConfig> {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Ok(FlowConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(FlowConfig::default());
    }

    let config = serde_yaml::from_str(&content).map_err(|e| Error::ConfigurationInvalid {
        issues: vec![ConfigIssue::new("config.yaml", path, e.to_string())],
    })?;
    debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Write the defaults to `path`, replacing any existing file
pub fn reset_config(path: &Path) -> Result<FlowConfig> {
    let config = FlowConfig::default();
    save_document(path, &serde_yaml::to_value(&config)?)?;
    info!("Reset config at {:?}", path);
    Ok(config)
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw Document Editing
// ─────────────────────────────────────────────────────────────────────────────

/// Load the config as a YAML document, merged over the defaults.
///
/// Unknown keys in the file are kept.
pub fn load_document(path: &Path) -> Result<Value> {
    let mut document = serde_yaml::to_value(FlowConfig::default())?;

    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        if !content.trim().is_empty() {
            let stored: Value =
                serde_yaml::from_str(&content).map_err(|e| Error::ConfigurationInvalid {
                    issues: vec![ConfigIssue::new("config.yaml", path, e.to_string())],
                })?;
            merge(&mut document, stored);
        }
    }

    Ok(document)
}

/// Recursively overlay `overlay` onto `base`; mappings merge, everything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Save a document atomically (temp file + rename), creating the directory
pub fn save_document(path: &Path, document: &Value) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("Failed to create {}: {}", dir.display(), e)))?;
    }

    let content = format!("{}{}", config_header(), serde_yaml::to_string(document)?);
    let temp_path = dir.join(".config.yaml.tmp");

    std::fs::write(&temp_path, content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved config to {:?}", path);
    Ok(())
}

fn config_header() -> &'static str {
    "# Flow CLI Configuration\n# Edit with `flow config set KEY=VALUE`\n\n"
}

/// Look up a dotted key (`general.default_flavor`)
pub fn get_value<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(document, |node, part| node.as_mapping()?.get(part))
}

/// Set a dotted key, creating intermediate mappings as needed.
///
/// The result must still deserialize into [`FlowConfig`]. A converted
/// scalar that does not fit a known key is retried as a plain string
/// (`ios.team_id=1234567890`); a value that fits neither is rejected and the
/// document is left as it was.
pub fn set_value(document: &mut Value, key: &str, raw: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').map(str::trim).collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(Error::config(format!("Invalid key '{}'", key)));
    }

    let parsed = parse_scalar(raw);
    let mut candidates = vec![parsed.clone()];
    if !parsed.is_string() {
        candidates.push(Value::String(raw.trim().to_string()));
    }

    let mut last_error = None;
    for value in candidates {
        let updated = with_value(document, &parts, value)?;
        match serde_yaml::from_value::<FlowConfig>(updated.clone()) {
            Ok(_) => {
                *document = updated;
                return Ok(());
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(Error::config(format!(
        "Invalid value for '{}': {}",
        key,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

fn with_value(document: &Value, parts: &[&str], value: Value) -> Result<Value> {
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| Error::config("Empty key"))?;

    let mut updated = document.clone();
    let mut node = &mut updated;
    for part in parents {
        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| Error::config(format!("'{}' is not a section", part)))?;
        node = map
            .entry(Value::String(part.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    let map = node
        .as_mapping_mut()
        .ok_or_else(|| Error::config(format!("'{}' is not a section", last)))?;
    map.insert(Value::String(last.to_string()), value);

    Ok(updated)
}

/// `true`/`false` become booleans, all-digit strings become integers
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = trimmed.parse::<u64>() {
            return Value::Number(n.into());
        }
    }

    Value::String(trimmed.to_string())
}

/// Split `KEY=VALUE` as given on the command line
pub fn parse_assignment(input: &str) -> Result<(&str, &str)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(Error::config(format!(
            "Expected KEY=VALUE, got '{}'",
            input
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Check that configured SDK paths exist and look like what they claim to be
pub fn validate_sdk_paths(config: &FlowConfig, path: &Path) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if let Some(sdk) = config.flutter_sdk() {
        if !sdk.join("bin").join("flutter").exists() {
            issues.push(ConfigIssue::new(
                "flutter.sdk_path",
                path,
                format!("{} does not contain bin/flutter", sdk.display()),
            ));
        }
    }

    if let Some(sdk) = config.android_sdk() {
        if !sdk.join("platform-tools").exists() {
            issues.push(ConfigIssue::new(
                "android.sdk_path",
                path,
                format!("{} does not contain platform-tools", sdk.display()),
            ));
        }
    }

    if let Some(xcode) = config.xcode_path() {
        if !xcode.exists() {
            issues.push(ConfigIssue::new(
                "ios.xcode_path",
                path,
                format!("{} does not exist", xcode.display()),
            ));
        }
    }

    issues
}
