//! Flutter project detection
//!
//! Locates the Flutter application a command applies to by walking up from
//! the working directory to the nearest `pubspec.yaml` that belongs to a
//! Flutter app, and reads the handful of pubspec fields the CLI reports on.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};

const PUBSPEC: &str = "pubspec.yaml";

/// Platform directories a runnable app carries
const PLATFORM_DIRECTORIES: &[&str] = &["android", "ios", "macos", "web", "linux", "windows"];

/// The subset of `pubspec.yaml` the CLI cares about
#[derive(Debug, Default, Deserialize)]
struct Pubspec {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    flutter: Option<serde_yaml::Value>,
}

/// A Flutter application on disk
#[derive(Debug, Clone)]
pub struct FlutterProject {
    /// Directory containing `pubspec.yaml`
    pub root: PathBuf,
    /// `name:` from pubspec, falling back to the directory name
    pub name: String,
    pub version: Option<String>,
    pub dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
}

impl FlutterProject {
    /// Load the project rooted at `root`.
    ///
    /// Fails with [`Error::NoProject`] when `root` has no pubspec or the
    /// pubspec does not describe a Flutter project.
    pub fn load(root: &Path) -> Result<Self> {
        let pubspec_path = root.join(PUBSPEC);
        let content = fs::read_to_string(&pubspec_path).map_err(|_| Error::no_project(root))?;
        let pubspec = parse_pubspec(&content)?;

        if !is_flutter_pubspec(&pubspec) {
            return Err(Error::no_project(root));
        }

        let name = pubspec.name.clone().unwrap_or_else(|| {
            root.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("app")
                .to_string()
        });

        Ok(Self {
            root: root.to_path_buf(),
            name,
            version: pubspec.version,
            dependencies: pubspec.dependencies.into_keys().collect(),
            dev_dependencies: pubspec.dev_dependencies.into_keys().collect(),
        })
    }

    /// Find the nearest Flutter project at or above `start`
    pub fn find(start: &Path) -> Result<Self> {
        let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

        for dir in start.ancestors() {
            if !dir.join(PUBSPEC).is_file() {
                continue;
            }
            match Self::load(dir) {
                Ok(project) => {
                    debug!("Found Flutter project '{}' at {:?}", project.name, dir);
                    return Ok(project);
                }
                Err(e) => trace!("Skipping {:?}: {}", dir, e),
            }
        }

        Err(Error::no_project(start))
    }

    /// Whether the app ships the given platform directory (android/, ios/)
    pub fn has_platform_dir(&self, platform: &str) -> bool {
        self.root.join(platform).is_dir()
    }

    /// Platform directories present in the project
    pub fn platforms(&self) -> Vec<&'static str> {
        PLATFORM_DIRECTORIES
            .iter()
            .copied()
            .filter(|dir| self.root.join(dir).is_dir())
            .collect()
    }

    pub fn has_dependency(&self, package: &str) -> bool {
        self.dependencies.iter().any(|d| d == package)
            || self.dev_dependencies.iter().any(|d| d == package)
    }
}

fn parse_pubspec(content: &str) -> Result<Pubspec> {
    if content.trim().is_empty() {
        return Ok(Pubspec::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// A Flutter pubspec has a root `flutter:` section or depends on the Flutter SDK
fn is_flutter_pubspec(pubspec: &Pubspec) -> bool {
    if pubspec.flutter.is_some() {
        return true;
    }
    pubspec
        .dependencies
        .get("flutter")
        .and_then(|dep| dep.get("sdk"))
        .and_then(|sdk| sdk.as_str())
        == Some("flutter")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const APP_PUBSPEC: &str = r#"name: my_app
version: 1.2.0+5

dependencies:
  flutter:
    sdk: flutter
  http: ^1.1.0

dev_dependencies:
  flutter_launcher_icons: ^0.13.1

flutter:
  uses-material-design: true
"#;

    #[test]
    fn test_load_reads_pubspec_fields() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(PUBSPEC), APP_PUBSPEC).unwrap();
        fs::create_dir_all(temp.path().join("android")).unwrap();

        let project = FlutterProject::load(temp.path()).unwrap();
        assert_eq!(project.name, "my_app");
        assert_eq!(project.version.as_deref(), Some("1.2.0+5"));
        assert!(project.has_dependency("http"));
        assert!(project.has_dependency("flutter_launcher_icons"));
        assert!(!project.has_dependency("flutter_native_splash"));
        assert_eq!(project.platforms(), vec!["android"]);
    }

    #[test]
    fn test_dart_package_is_not_a_project() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join(PUBSPEC),
            "name: pkg\ndependencies:\n  collection: ^1.17.0\n",
        )
        .unwrap();

        let err = FlutterProject::load(temp.path()).unwrap_err();
        assert!(matches!(err, Error::NoProject { .. }));
    }

    #[test]
    fn test_find_walks_up_from_subdirectory() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(PUBSPEC), APP_PUBSPEC).unwrap();
        let nested = temp.path().join("lib").join("src");
        fs::create_dir_all(&nested).unwrap();

        let project = FlutterProject::find(&nested).unwrap();
        assert_eq!(project.root, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_find_without_project_fails() {
        let temp = tempdir().unwrap();
        let err = FlutterProject::find(temp.path()).unwrap_err();
        assert_eq!(err.exit_code(), 8);
    }

    #[test]
    fn test_name_falls_back_to_directory() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("shop_app");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(PUBSPEC), "flutter:\n  uses-material-design: true\n").unwrap();

        let project = FlutterProject::load(&root).unwrap();
        assert_eq!(project.name, "shop_app");
    }
}
