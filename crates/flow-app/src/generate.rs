//! Icon and splash generator configs
//!
//! Writes `flutter_launcher_icons-<flavor>.yaml` and
//! `flutter_native_splash-<flavor>.yaml` at the project root from a flavor's
//! branding assets. The generators themselves run as dispatch steps.

use std::path::{Path, PathBuf};

use flow_core::prelude::*;
use flow_core::{FlutterProject, Platform};
use serde::Serialize;

use crate::dispatch::Action;
use crate::flavors::Flavor;

pub const ICONS_PACKAGE: &str = "flutter_launcher_icons";
pub const SPLASH_PACKAGE: &str = "flutter_native_splash";

const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// Which generator(s) to prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateKind {
    Icons,
    Splash,
    /// Icons followed by splash
    Branding,
}

impl GenerateKind {
    fn wants_icons(self) -> bool {
        matches!(self, GenerateKind::Icons | GenerateKind::Branding)
    }

    fn wants_splash(self) -> bool {
        matches!(self, GenerateKind::Splash | GenerateKind::Branding)
    }
}

#[derive(Debug, Serialize)]
struct IconsFile {
    flutter_launcher_icons: IconsConfig,
}

#[derive(Debug, Serialize)]
struct IconsConfig {
    image_path: String,
    remove_alpha_ios: bool,
    android: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    adaptive_icon_foreground: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adaptive_icon_background: Option<String>,
    ios: bool,
}

#[derive(Debug, Serialize)]
struct SplashFile {
    flutter_native_splash: SplashConfig,
}

#[derive(Debug, Serialize)]
struct SplashConfig {
    color: String,
    image: String,
    branding_mode: &'static str,
    color_dark: String,
    image_dark: String,
    android: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    android_12: Option<Android12Splash>,
    ios: bool,
    web: bool,
}

#[derive(Debug, Serialize)]
struct Android12Splash {
    image: String,
    icon_background_color: String,
    image_dark: String,
    icon_background_color_dark: String,
}

/// "#RRGGBB" from a manifest `mainColor` (`#1E88E5`, `1e88e5`, `0xFF1E88E5`)
pub fn normalize_color(main_color: Option<&str>) -> String {
    let Some(raw) = main_color.map(str::trim).filter(|c| !c.is_empty()) else {
        return DEFAULT_BACKGROUND.to_string();
    };

    let hex = raw.trim_start_matches('#');
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    // ARGB from Flutter's Color(0xAARRGGBB)
    let hex = if hex.len() == 8 && hex.is_ascii() { &hex[2..] } else { hex };

    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", hex.to_uppercase())
    } else {
        warn!("Ignoring unrecognized mainColor '{}'", raw);
        DEFAULT_BACKGROUND.to_string()
    }
}

/// `flutter_launcher_icons-dev.yaml`, or `flutter_launcher_icons.yaml` unflavored
pub fn config_filename(package: &str, flavor: Option<&str>) -> String {
    match flavor {
        Some(flavor) => format!("{}-{}.yaml", package, flavor),
        None => format!("{}.yaml", package),
    }
}

/// Path written into generator configs, relative to the project root
fn project_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn source_image(root: &Path, flavor: Option<&Flavor>, file: &str) -> Result<PathBuf> {
    let path = match flavor {
        Some(flavor) => flavor.dir.join(file),
        None => root.join("assets").join(file),
    };
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::config(format!(
            "{} not found: {}",
            file,
            project_relative(root, &path)
        )))
    }
}

fn targets(platform: Option<Platform>, wanted: Platform) -> bool {
    platform.map_or(true, |p| p == wanted)
}

fn write_yaml<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let content = serde_yaml::to_string(document)?;
    std::fs::write(path, content)
        .map_err(|e| Error::config(format!("Failed to write {}: {}", path.display(), e)))?;
    debug!("Wrote {:?}", path);
    Ok(())
}

/// Write the launcher icons config and return its path
pub fn write_icons_config(
    root: &Path,
    flavor: Option<&Flavor>,
    platform: Option<Platform>,
) -> Result<PathBuf> {
    let image = project_relative(root, &source_image(root, flavor, "icon.png")?);
    let android = targets(platform, Platform::Android);

    let document = IconsFile {
        flutter_launcher_icons: IconsConfig {
            adaptive_icon_foreground: android.then(|| image.clone()),
            adaptive_icon_background: android.then(|| DEFAULT_BACKGROUND.to_string()),
            image_path: image,
            remove_alpha_ios: true,
            android,
            ios: targets(platform, Platform::Ios),
        },
    };

    let path = root.join(config_filename(ICONS_PACKAGE, flavor.map(|f| f.name.as_str())));
    write_yaml(&path, &document)?;
    Ok(path)
}

/// Write the native splash config and return its path
pub fn write_splash_config(
    root: &Path,
    flavor: Option<&Flavor>,
    platform: Option<Platform>,
) -> Result<PathBuf> {
    let image = project_relative(root, &source_image(root, flavor, "splash.png")?);
    let color = normalize_color(flavor.and_then(|f| f.main_color.as_deref()));
    let android = targets(platform, Platform::Android);

    let document = SplashFile {
        flutter_native_splash: SplashConfig {
            android_12: android.then(|| Android12Splash {
                image: image.clone(),
                icon_background_color: color.clone(),
                image_dark: image.clone(),
                icon_background_color_dark: color.clone(),
            }),
            color: color.clone(),
            color_dark: color,
            image_dark: image.clone(),
            image,
            branding_mode: "bottom",
            android,
            ios: targets(platform, Platform::Ios),
            web: false,
        },
    };

    let path = root.join(config_filename(SPLASH_PACKAGE, flavor.map(|f| f.name.as_str())));
    write_yaml(&path, &document)?;
    Ok(path)
}

/// Check the generator packages, write their configs and return the action
/// that runs them
pub fn prepare(
    project: &FlutterProject,
    flavor: Option<&Flavor>,
    kind: GenerateKind,
    platform: Option<Platform>,
) -> Result<Action> {
    let required = [
        (kind.wants_icons(), ICONS_PACKAGE),
        (kind.wants_splash(), SPLASH_PACKAGE),
    ];
    for (wanted, package) in required {
        if wanted && !project.has_dependency(package) {
            return Err(Error::config(format!(
                "{} is not a dependency of {}. Add it to dev_dependencies in pubspec.yaml.",
                package, project.name
            )));
        }
    }

    let root = project.root.as_path();
    let action = match kind {
        GenerateKind::Icons => Action::GenerateIcons {
            config: write_icons_config(root, flavor, platform)?,
        },
        GenerateKind::Splash => Action::GenerateSplash {
            config: write_splash_config(root, flavor, platform)?,
        },
        GenerateKind::Branding => Action::GenerateBranding {
            icons_config: write_icons_config(root, flavor, platform)?,
            splash_config: write_splash_config(root, flavor, platform)?,
        },
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavors::{FlavorAssets, PackageIds};
    use serde_yaml::Value;
    use tempfile::tempdir;

    fn flavor_at(root: &Path, name: &str, main_color: Option<&str>) -> Flavor {
        let dir = root.join("assets").join("configs").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("icon.png"), b"png").unwrap();
        std::fs::write(dir.join("splash.png"), b"png").unwrap();
        Flavor {
            name: name.to_string(),
            dir: dir.clone(),
            app_name: None,
            package_ids: PackageIds {
                android: "com.acme".into(),
                ios: "com.acme".into(),
            },
            main_color: main_color.map(str::to_string),
            assets: FlavorAssets {
                icon: Some(dir.join("icon.png")),
                splash: Some(dir.join("splash.png")),
            },
            overrides: Default::default(),
        }
    }

    fn read(path: &Path) -> Value {
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color(Some("#1e88e5")), "#1E88E5");
        assert_eq!(normalize_color(Some("1E88E5")), "#1E88E5");
        assert_eq!(normalize_color(Some("0xFF1E88E5")), "#1E88E5");
        assert_eq!(normalize_color(Some("blue")), "#FFFFFF");
        assert_eq!(normalize_color(None), "#FFFFFF");
    }

    #[test]
    fn test_config_filename() {
        assert_eq!(
            config_filename(ICONS_PACKAGE, Some("dev")),
            "flutter_launcher_icons-dev.yaml"
        );
        assert_eq!(config_filename(SPLASH_PACKAGE, None), "flutter_native_splash.yaml");
    }

    #[test]
    fn test_icons_config_for_both_platforms() {
        let temp = tempdir().unwrap();
        let flavor = flavor_at(temp.path(), "dev", None);

        let path = write_icons_config(temp.path(), Some(&flavor), None).unwrap();
        assert_eq!(path, temp.path().join("flutter_launcher_icons-dev.yaml"));

        let doc = read(&path);
        let icons = &doc["flutter_launcher_icons"];
        assert_eq!(icons["image_path"], Value::from("assets/configs/dev/icon.png"));
        assert_eq!(icons["adaptive_icon_background"], Value::from("#FFFFFF"));
        assert_eq!(icons["android"], Value::from(true));
        assert_eq!(icons["ios"], Value::from(true));
    }

    #[test]
    fn test_ios_only_icons_skip_adaptive_icon() {
        let temp = tempdir().unwrap();
        let flavor = flavor_at(temp.path(), "dev", None);

        let path = write_icons_config(temp.path(), Some(&flavor), Some(Platform::Ios)).unwrap();
        let icons = read(&path)["flutter_launcher_icons"].clone();
        assert_eq!(icons["android"], Value::from(false));
        assert!(icons.get("adaptive_icon_foreground").is_none());
    }

    #[test]
    fn test_splash_config_uses_main_color() {
        let temp = tempdir().unwrap();
        let flavor = flavor_at(temp.path(), "prod", Some("#00aa77"));

        let path = write_splash_config(temp.path(), Some(&flavor), None).unwrap();
        let splash = read(&path)["flutter_native_splash"].clone();
        assert_eq!(splash["color"], Value::from("#00AA77"));
        assert_eq!(splash["image"], Value::from("assets/configs/prod/splash.png"));
        assert_eq!(splash["branding_mode"], Value::from("bottom"));
        assert_eq!(
            splash["android_12"]["icon_background_color"],
            Value::from("#00AA77")
        );
        assert_eq!(splash["web"], Value::from(false));
    }

    #[test]
    fn test_missing_image_is_reported() {
        let temp = tempdir().unwrap();
        let err = write_splash_config(temp.path(), None, None).unwrap_err();
        assert!(err.to_string().contains("assets/splash.png"));
    }

    #[test]
    fn test_prepare_requires_generator_package() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("pubspec.yaml"),
            "name: demo\nflutter:\n  uses-material-design: true\n",
        )
        .unwrap();
        let project = FlutterProject::load(temp.path()).unwrap();
        let flavor = flavor_at(temp.path(), "dev", None);

        let err = prepare(&project, Some(&flavor), GenerateKind::Icons, None).unwrap_err();
        assert!(err.to_string().contains(ICONS_PACKAGE));
    }

    #[test]
    fn test_prepare_branding_writes_both_configs() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("pubspec.yaml"),
            "name: demo\nflutter:\n  uses-material-design: true\ndev_dependencies:\n  flutter_launcher_icons: ^0.13.1\n  flutter_native_splash: ^2.4.0\n",
        )
        .unwrap();
        let project = FlutterProject::load(temp.path()).unwrap();
        let flavor = flavor_at(temp.path(), "dev", None);

        let action = prepare(&project, Some(&flavor), GenerateKind::Branding, None).unwrap();
        match action {
            Action::GenerateBranding {
                icons_config,
                splash_config,
            } => {
                assert!(icons_config.is_file());
                assert!(splash_config.is_file());
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
