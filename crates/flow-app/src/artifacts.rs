//! Build artifact locations
//!
//! Paths follow the Flutter Gradle plugin's output layout:
//! - `build/app/outputs/flutter-apk/app-<flavor>-<mode>.apk`
//! - `build/app/outputs/bundle/<flavor><Mode>/app-<flavor>-<mode>.aab`
//!
//! Unflavored builds drop the flavor segment (`app-release.apk`,
//! `bundle/release/app-release.aab`).

use std::path::{Path, PathBuf};

use flow_core::BuildMode;
use serde::Serialize;

const MODES: [BuildMode; 3] = [BuildMode::Debug, BuildMode::Profile, BuildMode::Release];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Apk,
    Aab,
    Ipa,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Apk => write!(f, "APK"),
            ArtifactKind::Aab => write!(f, "AAB"),
            ArtifactKind::Ipa => write!(f, "IPA"),
        }
    }
}

/// A build output found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<BuildMode>,
    pub path: PathBuf,
    pub size_bytes: u64,
}

fn outputs_dir(root: &Path) -> PathBuf {
    root.join("build").join("app").join("outputs")
}

pub fn apk_path(root: &Path, flavor: Option<&str>, mode: BuildMode) -> PathBuf {
    let file = match flavor {
        Some(flavor) => format!("app-{}-{}.apk", flavor, mode.as_str()),
        None => format!("app-{}.apk", mode.as_str()),
    };
    outputs_dir(root).join("flutter-apk").join(file)
}

pub fn aab_path(root: &Path, flavor: Option<&str>, mode: BuildMode) -> PathBuf {
    let (dir, file) = match flavor {
        Some(flavor) => (
            format!("{}{}", flavor, mode.capitalized()),
            format!("app-{}-{}.aab", flavor, mode.as_str()),
        ),
        None => (
            mode.as_str().to_string(),
            format!("app-{}.aab", mode.as_str()),
        ),
    };
    outputs_dir(root).join("bundle").join(dir).join(file)
}

/// Directory `flutter build ipa` writes to
pub fn ipa_dir(root: &Path) -> PathBuf {
    root.join("build").join("ios").join("ipa")
}

fn existing(kind: ArtifactKind, mode: Option<BuildMode>, path: PathBuf) -> Option<Artifact> {
    let metadata = std::fs::metadata(&path).ok()?;
    metadata.is_file().then(|| Artifact {
        kind,
        mode,
        path,
        size_bytes: metadata.len(),
    })
}

/// Android artifacts of one flavor (or the unflavored build) that exist
pub fn android_artifacts(root: &Path, flavor: Option<&str>) -> Vec<Artifact> {
    let apks = MODES
        .iter()
        .filter_map(|&mode| existing(ArtifactKind::Apk, Some(mode), apk_path(root, flavor, mode)));
    let aabs = MODES
        .iter()
        .filter_map(|&mode| existing(ArtifactKind::Aab, Some(mode), aab_path(root, flavor, mode)));
    apks.chain(aabs).collect()
}

/// IPA files under `build/ios/ipa`, in file name order
pub fn ios_artifacts(root: &Path) -> Vec<Artifact> {
    files_in(&ipa_dir(root), "ipa", ArtifactKind::Ipa)
}

/// Every APK in `build/app/outputs/flutter-apk`, whatever its flavor or
/// mode, in file name order
pub fn all_apks(root: &Path) -> Vec<Artifact> {
    files_in(&outputs_dir(root).join("flutter-apk"), "apk", ArtifactKind::Apk)
}

fn files_in(dir: &Path, extension: &str, kind: ArtifactKind) -> Vec<Artifact> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<Artifact> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .filter_map(|path| existing(kind, None, path))
        .collect();
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// "12.34 MB"
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{} B", bytes)
    }
}
