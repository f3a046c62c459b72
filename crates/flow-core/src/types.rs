//! Domain types shared by discovery, resolution and dispatch

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mobile platform a device or build targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    /// Lowercase identifier used on the command line and in JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => write!(f, "Android"),
            Platform::Ios => write!(f, "iOS"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// Physical hardware or a virtual run target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Physical,
    Emulator,
    Simulator,
}

impl DeviceKind {
    pub fn is_virtual(&self) -> bool {
        !matches!(self, DeviceKind::Physical)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Physical => write!(f, "physical"),
            DeviceKind::Emulator => write!(f, "emulator"),
            DeviceKind::Simulator => write!(f, "simulator"),
        }
    }
}

/// Whether a device can take an install/run right now
///
/// Ordering puts ready devices first when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Available,
    Booting,
    Unavailable,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Available => write!(f, "available"),
            Readiness::Booting => write!(f, "booting"),
            Readiness::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A device or simulator found by discovery, normalized across tools.
///
/// Never cached: every command re-runs discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Identifier understood by `flutter run -d` and the platform tool
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub platform: Platform,

    pub kind: DeviceKind,

    pub readiness: Readiness,

    /// OS version or runtime (e.g. "iOS 17.2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,

    /// Raw state string reported by the tool ("device", "unauthorized", "Shutdown", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Device {
    pub fn is_available(&self) -> bool {
        self.readiness == Readiness::Available
    }

    /// A simulator that is not running yet but can be booted on demand
    pub fn needs_boot(&self) -> bool {
        self.kind == DeviceKind::Simulator && self.readiness != Readiness::Available
    }

    /// "Pixel 7 (emulator-5554)"
    pub fn label(&self) -> String {
        if self.name == self.id {
            self.id.clone()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}

/// Flutter build mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Debug,
    Profile,
    Release,
}

impl BuildMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            BuildMode::Debug => "--debug",
            BuildMode::Profile => "--profile",
            BuildMode::Release => "--release",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Profile => "profile",
            BuildMode::Release => "release",
        }
    }

    /// "Release" as used in Gradle output directories (`prodRelease`)
    pub fn capitalized(&self) -> &'static str {
        match self {
            BuildMode::Debug => "Debug",
            BuildMode::Profile => "Profile",
            BuildMode::Release => "Release",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(kind: DeviceKind, readiness: Readiness) -> Device {
        Device {
            id: "id-1".to_string(),
            name: "Test".to_string(),
            platform: Platform::Ios,
            kind,
            readiness,
            os_version: None,
            state: None,
        }
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("android".parse::<Platform>(), Ok(Platform::Android));
        assert_eq!("iOS".parse::<Platform>(), Ok(Platform::Ios));
        assert!("web".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::Ios.to_string(), "iOS");
        assert_eq!(Platform::Android.as_str(), "android");
    }

    #[test]
    fn test_readiness_orders_available_first() {
        let mut states = vec![Readiness::Unavailable, Readiness::Available, Readiness::Booting];
        states.sort();
        assert_eq!(
            states,
            vec![Readiness::Available, Readiness::Booting, Readiness::Unavailable]
        );
    }

    #[test]
    fn test_needs_boot_only_for_idle_simulators() {
        assert!(device(DeviceKind::Simulator, Readiness::Unavailable).needs_boot());
        assert!(device(DeviceKind::Simulator, Readiness::Booting).needs_boot());
        assert!(!device(DeviceKind::Simulator, Readiness::Available).needs_boot());
        assert!(!device(DeviceKind::Emulator, Readiness::Unavailable).needs_boot());
    }

    #[test]
    fn test_device_label() {
        let mut d = device(DeviceKind::Physical, Readiness::Available);
        assert_eq!(d.label(), "Test (id-1)");
        d.name = "id-1".to_string();
        assert_eq!(d.label(), "id-1");
    }

    #[test]
    fn test_build_mode_args() {
        assert_eq!(BuildMode::default(), BuildMode::Debug);
        assert_eq!(BuildMode::Release.as_arg(), "--release");
        assert_eq!(BuildMode::Profile.capitalized(), "Profile");
    }

    #[test]
    fn test_device_json_shape() {
        let d = device(DeviceKind::Simulator, Readiness::Booting);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["platform"], "ios");
        assert_eq!(json["kind"], "simulator");
        assert_eq!(json["readiness"], "booting");
        assert!(json.get("os_version").is_none());
    }
}
