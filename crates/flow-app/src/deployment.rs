//! Release readiness: signing material, Fastlane and CI configuration

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use flow_core::prelude::*;
use flow_core::Platform;
use regex::Regex;
use serde::Serialize;

use crate::dispatch::KeystoreOptions;
use crate::doctor::CheckStatus;

pub const DEFAULT_KEY_ALIAS: &str = "release";
pub const DEFAULT_VALIDITY_DAYS: u32 = 10_000;

/// Store tracks accepted by `deployment release --track`
pub const TRACKS: [&str; 4] = ["internal", "alpha", "beta", "production"];

/// `version: 1.2.3+45` in pubspec.yaml; the build number is optional
static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^version:[ \t]*(\d+\.\d+\.\d+)(?:\+(\d+))?[ \t]*$")
        .expect("Invalid pubspec version regex")
});

pub fn default_keystore_path(root: &Path) -> PathBuf {
    root.join("keys").join("release-key.jks")
}

pub fn fastfile_path(root: &Path) -> PathBuf {
    root.join("fastlane").join("Fastfile")
}

/// Keystore options with defaults filled in; relative outputs are taken
/// from the project root
pub fn keystore_options(
    root: &Path,
    alias: Option<String>,
    validity_days: Option<u32>,
    output: Option<PathBuf>,
    dname: Option<String>,
) -> KeystoreOptions {
    let output = match output {
        Some(path) if path.is_relative() => root.join(path),
        Some(path) => path,
        None => default_keystore_path(root),
    };
    KeystoreOptions {
        alias: alias.unwrap_or_else(|| DEFAULT_KEY_ALIAS.to_string()),
        validity_days: validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
        output,
        dname,
    }
}

/// Refuse to overwrite an existing keystore and create its directory
pub fn prepare_keystore_output(options: &KeystoreOptions) -> Result<()> {
    if options.output.exists() {
        return Err(Error::config(format!(
            "Keystore {} already exists; choose another --output or remove it",
            options.output.display()
        )));
    }
    if let Some(dir) = options.output.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

pub fn validate_track(track: &str) -> Result<()> {
    if TRACKS.contains(&track) {
        Ok(())
    } else {
        Err(Error::config(format!(
            "Unknown track '{}'. Expected one of: {}",
            track,
            TRACKS.join(", ")
        )))
    }
}

/// Check what a release needs before any step runs.
///
/// Missing Fastlane setup is an error; problems the release can survive
/// are returned as warnings for the caller to show.
pub fn check_release_ready(
    root: &Path,
    platform: Option<Platform>,
    build_only: bool,
) -> Result<Vec<String>> {
    if build_only {
        return Ok(Vec::new());
    }
    if !fastfile_path(root).is_file() {
        return Err(Error::config(
            "fastlane/Fastfile not found. Run `flow deployment setup` or pass --build-only",
        ));
    }

    let mut warnings = Vec::new();
    let android = platform.map_or(true, |p| p == Platform::Android);
    if android && !root.join("android").join("key.properties").is_file() {
        warnings.push(
            "android/key.properties is missing; the release bundle may be signed with debug keys"
                .to_string(),
        );
    }
    for warning in &warnings {
        warn!("{}", warning);
    }
    Ok(warnings)
}

/// Increment the build number in pubspec.yaml (`1.2.3+4` becomes
/// `1.2.3+5`, `1.2.3` becomes `1.2.3+1`) and return the new version.
/// `None` when the pubspec has no version line.
pub fn bump_build_number(root: &Path) -> Result<Option<String>> {
    let path = root.join("pubspec.yaml");
    let content = std::fs::read_to_string(&path)?;
    let Some(captures) = VERSION_LINE.captures(&content) else {
        return Ok(None);
    };

    let build = match captures.get(2) {
        Some(number) => number
            .as_str()
            .parse::<u64>()
            .map_err(|_| Error::config(format!("Build number {} is out of range", number.as_str())))?
            + 1,
        None => 1,
    };
    let version = format!("{}+{}", &captures[1], build);

    let line = captures.get(0).map_or(0..0, |m| m.range());
    let mut updated = String::with_capacity(content.len() + 4);
    updated.push_str(&content[..line.start]);
    updated.push_str("version: ");
    updated.push_str(&version);
    updated.push_str(&content[line.end..]);
    std::fs::write(&path, updated)?;

    info!("Bumped {} to {}", path.display(), version);
    Ok(Some(version))
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusItem {
    pub component: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl StatusItem {
    fn new(component: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

fn presence(component: &str, path: &Path, found: &str, missing: &str) -> StatusItem {
    if path.exists() {
        StatusItem::new(component, CheckStatus::Ok, found)
    } else {
        StatusItem::new(component, CheckStatus::Missing, missing)
    }
}

/// Deployment configuration of a project
pub fn deployment_status(root: &Path) -> Vec<StatusItem> {
    let mut items = vec![
        presence(
            "Fastlane",
            &fastfile_path(root),
            "Fastfile found",
            "fastlane/Fastfile not found",
        ),
        presence(
            "Gemfile",
            &root.join("Gemfile"),
            "Gemfile found",
            "add a Gemfile pinning fastlane",
        ),
        presence(
            "Android keystore",
            &default_keystore_path(root),
            "keys/release-key.jks",
            "run `flow deployment keystore`",
        ),
        presence(
            "Android key.properties",
            &root.join("android").join("key.properties"),
            "android/key.properties",
            "reference the keystore from android/key.properties",
        ),
        presence(
            "iOS certificates",
            &root.join("keys").join("ios"),
            "keys/ios",
            "export signing certificates to keys/ios",
        ),
    ];

    let github = root.join(".github").join("workflows").join("release.yml");
    let gitlab = root.join(".gitlab-ci.yml");
    items.push(if github.is_file() {
        StatusItem::new("CI/CD", CheckStatus::Ok, "GitHub Actions release.yml")
    } else if gitlab.is_file() {
        StatusItem::new("CI/CD", CheckStatus::Ok, "GitLab .gitlab-ci.yml")
    } else {
        StatusItem::new("CI/CD", CheckStatus::Warning, "no release pipeline configured")
    });

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_keystore_defaults() {
        let root = Path::new("/work/app");
        let options = keystore_options(root, None, None, None, None);
        assert_eq!(options.alias, "release");
        assert_eq!(options.validity_days, 10_000);
        assert_eq!(options.output, Path::new("/work/app/keys/release-key.jks"));

        let custom = keystore_options(root, None, Some(365), Some("upload.jks".into()), None);
        assert_eq!(custom.output, Path::new("/work/app/upload.jks"));
        assert_eq!(custom.validity_days, 365);
    }

    #[test]
    fn test_existing_keystore_is_not_overwritten() {
        let temp = tempdir().unwrap();
        let options = keystore_options(temp.path(), None, None, None, None);

        prepare_keystore_output(&options).unwrap();
        assert!(temp.path().join("keys").is_dir());

        std::fs::write(&options.output, b"jks").unwrap();
        assert!(prepare_keystore_output(&options).is_err());
    }

    #[test]
    fn test_validate_track() {
        assert!(validate_track("beta").is_ok());
        assert!(validate_track("nightly").is_err());
    }

    #[test]
    fn test_release_requires_fastfile_unless_build_only() {
        let temp = tempdir().unwrap();
        assert!(check_release_ready(temp.path(), None, false).is_err());
        assert!(check_release_ready(temp.path(), None, true).unwrap().is_empty());

        std::fs::create_dir_all(temp.path().join("fastlane")).unwrap();
        std::fs::write(fastfile_path(temp.path()), "default_platform(:android)\n").unwrap();
        assert!(check_release_ready(temp.path(), Some(Platform::Ios), false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_key_properties_is_returned_as_warning() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("fastlane")).unwrap();
        std::fs::write(fastfile_path(temp.path()), "default_platform(:android)\n").unwrap();

        let warnings = check_release_ready(temp.path(), None, false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("android/key.properties"));

        let warnings = check_release_ready(temp.path(), Some(Platform::Android), false).unwrap();
        assert_eq!(warnings.len(), 1);

        std::fs::create_dir_all(temp.path().join("android")).unwrap();
        std::fs::write(temp.path().join("android").join("key.properties"), "storeFile=x\n").unwrap();
        assert!(check_release_ready(temp.path(), None, false).unwrap().is_empty());
    }

    #[test]
    fn test_bump_build_number() {
        let temp = tempdir().unwrap();
        let pubspec = temp.path().join("pubspec.yaml");
        std::fs::write(
            &pubspec,
            "name: shop\ndescription: versions 1.0.0+1 in text stay\nversion: 2.3.4+41\n\nenvironment:\n  sdk: '>=3.0.0 <4.0.0'\n",
        )
        .unwrap();

        assert_eq!(bump_build_number(temp.path()).unwrap().as_deref(), Some("2.3.4+42"));
        let content = std::fs::read_to_string(&pubspec).unwrap();
        assert_eq!(
            content,
            "name: shop\ndescription: versions 1.0.0+1 in text stay\nversion: 2.3.4+42\n\nenvironment:\n  sdk: '>=3.0.0 <4.0.0'\n"
        );
    }

    #[test]
    fn test_bump_build_number_without_build_part() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("pubspec.yaml"), "name: shop\nversion: 1.0.0\n").unwrap();
        assert_eq!(bump_build_number(temp.path()).unwrap().as_deref(), Some("1.0.0+1"));

        std::fs::write(temp.path().join("pubspec.yaml"), "name: shop\n").unwrap();
        assert_eq!(bump_build_number(temp.path()).unwrap(), None);
    }

    #[test]
    fn test_deployment_status() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("keys").join("ios")).unwrap();
        std::fs::write(temp.path().join(".gitlab-ci.yml"), "stages: []\n").unwrap();

        let items = deployment_status(temp.path());
        let status_of = |name: &str| items.iter().find(|i| i.component == name).unwrap().status;

        assert_eq!(status_of("Fastlane"), CheckStatus::Missing);
        assert_eq!(status_of("iOS certificates"), CheckStatus::Ok);
        assert_eq!(status_of("CI/CD"), CheckStatus::Ok);
        assert_eq!(status_of("Android keystore"), CheckStatus::Missing);
    }
}
