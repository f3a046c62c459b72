//! Flavor Registry
//!
//! A flavor is a subdirectory of `assets/configs/` holding a `config.json`
//! manifest, optionally with `icon.png` and `splash.png` branding assets:
//!
//! ```text
//! assets/configs/
//! ├── dev/
//! │   ├── config.json   {"packageName": "com.acme.app.dev", "appName": "Acme Dev"}
//! │   ├── icon.png
//! │   └── splash.png
//! └── prod/
//!     └── config.json
//! ```
//!
//! Loading never stops at the first bad entry. Every malformed manifest is
//! kept with its list of [`ConfigIssue`]s so the user sees all problems at
//! once, and only looking up a broken flavor fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use flow_core::prelude::*;
use flow_core::{ConfigIssue, TargetKind};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Manifest file that marks a directory as a flavor
pub const MANIFEST_FILENAME: &str = "config.json";

const ICON_FILENAME: &str = "icon.png";
const SPLASH_FILENAME: &str = "splash.png";

const PACKAGE_NAME_KEY: &str = "packageName";
const ANDROID_ID_KEY: &str = "androidApplicationId";
const IOS_ID_KEY: &str = "iosBundleId";
const APP_NAME_KEY: &str = "appName";
const MAIN_COLOR_KEY: &str = "mainColor";

static FLAVOR_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("Invalid flavor name pattern regex")
});

/// Directory holding one subdirectory per flavor
pub fn configs_dir(project_root: &Path) -> PathBuf {
    project_root.join("assets").join("configs")
}

/// Whether `name` can be used as a flavor (and Gradle product flavor) name
pub fn is_valid_flavor_name(name: &str) -> bool {
    FLAVOR_NAME_PATTERN.is_match(name)
}

/// Application identifiers per platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIds {
    pub android: String,
    pub ios: String,
}

/// How much branding a flavor ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Complete,
    Partial,
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetStatus::Complete => write!(f, "complete"),
            AssetStatus::Partial => write!(f, "partial"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlavorAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splash: Option<PathBuf>,
}

impl FlavorAssets {
    fn scan(dir: &Path) -> Self {
        let existing = |name: &str| Some(dir.join(name)).filter(|p| p.is_file());
        Self {
            icon: existing(ICON_FILENAME),
            splash: existing(SPLASH_FILENAME),
        }
    }

    pub fn status(&self) -> AssetStatus {
        if self.icon.is_some() && self.splash.is_some() {
            AssetStatus::Complete
        } else {
            AssetStatus::Partial
        }
    }
}

/// A validated flavor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flavor {
    pub name: String,
    pub dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub package_ids: PackageIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_color: Option<String>,
    pub assets: FlavorAssets,
    /// Every other manifest key, in key order
    pub overrides: BTreeMap<String, Value>,
}

impl Flavor {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILENAME)
    }

    pub fn package_id(&self, platform: flow_core::Platform) -> &str {
        match platform {
            flow_core::Platform::Android => &self.package_ids.android,
            flow_core::Platform::Ios => &self.package_ids.ios,
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Valid(Flavor),
    Invalid(Vec<ConfigIssue>),
}

/// All flavors of one project, ordered by name
#[derive(Debug, Clone, Default)]
pub struct FlavorRegistry {
    entries: BTreeMap<String, Entry>,
}

impl FlavorRegistry {
    /// Scan `<project_root>/assets/configs`.
    ///
    /// A missing configs directory yields an empty registry. Only failing to
    /// list an existing directory is an error.
    pub fn load(project_root: &Path) -> Result<Self> {
        let dir = configs_dir(project_root);
        if !dir.is_dir() {
            debug!("No flavor configs at {:?}", dir);
            return Ok(Self::default());
        }

        let mut entries = BTreeMap::new();
        for item in std::fs::read_dir(&dir)? {
            let item = item?;
            let path = item.path();
            if !path.is_dir() || !path.join(MANIFEST_FILENAME).is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                warn!("Skipping flavor directory with non UTF-8 name: {:?}", path);
                continue;
            };

            let entry = match load_flavor(&name, &path) {
                Ok(flavor) => Entry::Valid(flavor),
                Err(issues) => {
                    for issue in &issues {
                        warn!("Invalid flavor {}", issue);
                    }
                    Entry::Invalid(issues)
                }
            };
            entries.insert(name, entry);
        }

        info!("Loaded {} flavor(s) from {:?}", entries.len(), dir);
        Ok(Self { entries })
    }

    /// Valid flavors in name order
    pub fn flavors(&self) -> impl Iterator<Item = &Flavor> {
        self.entries.values().filter_map(|entry| match entry {
            Entry::Valid(flavor) => Some(flavor),
            Entry::Invalid(_) => None,
        })
    }

    /// Names of valid flavors
    pub fn names(&self) -> Vec<String> {
        self.flavors().map(|f| f.name.clone()).collect()
    }

    /// Names of every entry, valid or not
    pub fn all_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Issues across all malformed entries, in name order
    pub fn issues(&self) -> Vec<ConfigIssue> {
        self.entries
            .values()
            .filter_map(|entry| match entry {
                Entry::Invalid(issues) => Some(issues.iter().cloned()),
                Entry::Valid(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Issues of one entry; empty for valid or unknown names
    pub fn issues_for(&self, name: &str) -> &[ConfigIssue] {
        match self.entries.get(name) {
            Some(Entry::Invalid(issues)) => issues,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up a flavor by exact name.
    ///
    /// Unknown names fail with [`Error::TargetNotFound`] listing valid
    /// flavors; malformed ones fail with [`Error::ConfigurationInvalid`].
    pub fn get(&self, name: &str) -> Result<&Flavor> {
        match self.entries.get(name) {
            Some(Entry::Valid(flavor)) => Ok(flavor),
            Some(Entry::Invalid(issues)) => Err(Error::ConfigurationInvalid {
                issues: issues.clone(),
            }),
            None => Err(Error::TargetNotFound {
                kind: TargetKind::Flavor,
                selector: name.to_string(),
                reason: None,
                choices: self.names(),
            }),
        }
    }

    /// Fail with every collected issue if any entry is malformed
    pub fn ensure_valid(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigurationInvalid { issues })
        }
    }
}

/// Parse and validate one flavor directory, collecting every problem
fn load_flavor(name: &str, dir: &Path) -> std::result::Result<Flavor, Vec<ConfigIssue>> {
    let manifest = dir.join(MANIFEST_FILENAME);
    let issue = |reason: String| ConfigIssue::new(name, &manifest, reason);

    let mut issues = Vec::new();
    if !is_valid_flavor_name(name) {
        issues.push(issue(format!(
            "invalid flavor name; must match {}",
            FLAVOR_NAME_PATTERN.as_str()
        )));
    }

    let content = match std::fs::read_to_string(&manifest) {
        Ok(content) => content,
        Err(e) => {
            issues.push(issue(format!("cannot read manifest: {}", e)));
            return Err(issues);
        }
    };

    let root: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            issues.push(issue(format!("invalid JSON: {}", e)));
            return Err(issues);
        }
    };

    let Value::Object(mut fields) = root else {
        issues.push(issue("manifest root must be a JSON object".to_string()));
        return Err(issues);
    };

    let package_name = match fields.remove(PACKAGE_NAME_KEY) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::String(_)) => {
            issues.push(issue(format!("'{}' must not be empty", PACKAGE_NAME_KEY)));
            None
        }
        Some(_) => {
            issues.push(issue(format!("'{}' must be a string", PACKAGE_NAME_KEY)));
            None
        }
        None => {
            issues.push(issue(format!("missing required field '{}'", PACKAGE_NAME_KEY)));
            None
        }
    };

    let mut optional = |key: &str| match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(_) => {
            issues.push(issue(format!("'{}' must be a string", key)));
            None
        }
    };

    let android_id = optional(ANDROID_ID_KEY);
    let ios_id = optional(IOS_ID_KEY);
    let app_name = optional(APP_NAME_KEY);
    let main_color = optional(MAIN_COLOR_KEY);

    match package_name {
        Some(package_name) if issues.is_empty() => Ok(Flavor {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            app_name,
            package_ids: PackageIds {
                android: android_id.unwrap_or_else(|| package_name.clone()),
                ios: ios_id.unwrap_or(package_name),
            },
            main_color,
            assets: FlavorAssets::scan(dir),
            overrides: into_sorted(fields),
        }),
        _ => Err(issues),
    }
}

fn into_sorted(fields: Map<String, Value>) -> BTreeMap<String, Value> {
    fields.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_flavor(root: &Path, name: &str, manifest: &str) -> PathBuf {
        let dir = configs_dir(root).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILENAME), manifest).unwrap();
        dir
    }

    #[test]
    fn test_missing_configs_dir_is_empty() {
        let temp = tempdir().unwrap();
        let registry = FlavorRegistry::load(temp.path()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.issues().is_empty());
    }

    #[test]
    fn test_loads_flavors_in_name_order() {
        let temp = tempdir().unwrap();
        write_flavor(temp.path(), "prod", r#"{"packageName": "com.acme.app"}"#);
        write_flavor(temp.path(), "dev", r#"{"packageName": "com.acme.app.dev"}"#);
        // No manifest: not a flavor
        std::fs::create_dir_all(configs_dir(temp.path()).join("shared")).unwrap();

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        assert_eq!(registry.names(), vec!["dev", "prod"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_manifest_fields() {
        let temp = tempdir().unwrap();
        let dir = write_flavor(
            temp.path(),
            "dev",
            r##"{
                "packageName": "com.acme.app.dev",
                "iosBundleId": "com.acme.ios.dev",
                "appName": "Acme Dev",
                "mainColor": "#FF5722",
                "apiUrl": "https://dev.acme.test",
                "featureFlags": {"beta": true}
            }"##,
        );
        std::fs::write(dir.join("icon.png"), b"png").unwrap();

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        let flavor = registry.get("dev").unwrap();
        assert_eq!(flavor.app_name.as_deref(), Some("Acme Dev"));
        assert_eq!(flavor.package_ids.android, "com.acme.app.dev");
        assert_eq!(flavor.package_ids.ios, "com.acme.ios.dev");
        assert_eq!(flavor.main_color.as_deref(), Some("#FF5722"));
        assert_eq!(
            flavor.overrides.keys().collect::<Vec<_>>(),
            vec!["apiUrl", "featureFlags"]
        );
        assert_eq!(flavor.assets.status(), AssetStatus::Partial);
    }

    #[test]
    fn test_complete_assets() {
        let temp = tempdir().unwrap();
        let dir = write_flavor(temp.path(), "prod", r#"{"packageName": "com.acme.app"}"#);
        std::fs::write(dir.join("icon.png"), b"png").unwrap();
        std::fs::write(dir.join("splash.png"), b"png").unwrap();

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        assert_eq!(registry.get("prod").unwrap().assets.status(), AssetStatus::Complete);
    }

    #[test]
    fn test_collects_all_issues() {
        let temp = tempdir().unwrap();
        write_flavor(temp.path(), "dev", r#"{"packageName": "com.acme.app.dev"}"#);
        write_flavor(temp.path(), "broken", "{ not json");
        write_flavor(temp.path(), "empty", r#"{"packageName": "  ", "appName": 7}"#);
        write_flavor(temp.path(), "list", "[1, 2]");
        write_flavor(temp.path(), "9lives", r#"{"packageName": "com.acme.nine"}"#);

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        assert_eq!(registry.names(), vec!["dev"]);
        assert_eq!(registry.all_names().len(), 5);

        // "empty" has two problems, the others one each
        let issues = registry.issues();
        assert_eq!(issues.len(), 5);
        assert_eq!(registry.issues_for("empty").len(), 2);
        assert!(registry.issues_for("9lives")[0].reason.contains("invalid flavor name"));
        assert!(registry.issues_for("list")[0].reason.contains("JSON object"));

        let err = registry.ensure_valid().unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_missing_package_name() {
        let temp = tempdir().unwrap();
        write_flavor(temp.path(), "qa", r#"{"appName": "QA"}"#);

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        let err = registry.get("qa").unwrap_err();
        match err {
            Error::ConfigurationInvalid { issues } => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].reason.contains("packageName"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_flavor_lists_valid_choices() {
        let temp = tempdir().unwrap();
        write_flavor(temp.path(), "dev", r#"{"packageName": "a.b"}"#);
        write_flavor(temp.path(), "prod", r#"{"packageName": "a.b"}"#);
        write_flavor(temp.path(), "bad", r#"{}"#);

        let registry = FlavorRegistry::load(temp.path()).unwrap();
        let err = registry.get("staging").unwrap_err();
        assert_eq!(err.choices(), ["dev".to_string(), "prod".to_string()]);
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_flavor_name_pattern() {
        assert!(is_valid_flavor_name("dev"));
        assert!(is_valid_flavor_name("Prod_EU2"));
        assert!(!is_valid_flavor_name("2fast"));
        assert!(!is_valid_flavor_name("my-flavor"));
        assert!(!is_valid_flavor_name(""));
    }
}
