//! Fastlane scaffolding for `flow deployment setup`
//!
//! Writes a Gemfile, `fastlane/Fastfile` and `fastlane/Appfile` whose lanes
//! match what `flow deployment release` invokes: one Android lane per store
//! track, `beta` and `release` for iOS.

use std::path::{Path, PathBuf};

use flow_core::prelude::*;
use flow_core::{FlutterProject, Platform};

use crate::deployment::{fastfile_path, TRACKS};

/// Service account key the Android lanes upload with
pub const PLAY_STORE_KEY: &str = "fastlane/play-store-key.json";

/// What to scaffold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastlaneSetup {
    pub platforms: Vec<Platform>,
    pub app_id: String,
    pub apple_id: Option<String>,
    pub team_id: Option<String>,
    /// Overwrite existing files
    pub force: bool,
}

impl FastlaneSetup {
    pub fn new(project: &FlutterProject, platforms: Vec<Platform>) -> Self {
        Self {
            platforms,
            app_id: default_app_id(&project.name),
            apple_id: None,
            team_id: None,
            force: false,
        }
    }

    fn has(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

/// `com.example.<name>` with the project name reduced to identifier
/// characters
pub fn default_app_id(project_name: &str) -> String {
    let name: String = project_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("com.example.{}", if name.is_empty() { "app" } else { &name })
}

/// Write the Fastlane files and return the paths written.
///
/// An existing Fastfile is only replaced with `force`; an existing Gemfile
/// is kept unless `force` is set.
pub fn write_fastlane_files(root: &Path, setup: &FastlaneSetup) -> Result<Vec<PathBuf>> {
    if setup.platforms.is_empty() {
        return Err(Error::config("No platform selected for Fastlane setup"));
    }
    let fastfile = fastfile_path(root);
    if fastfile.exists() && !setup.force {
        return Err(Error::config(
            "Fastlane is already configured (fastlane/Fastfile exists); pass --force to overwrite",
        ));
    }

    let dir = root.join("fastlane");
    std::fs::create_dir_all(&dir)?;

    let mut written = Vec::new();
    let gemfile = root.join("Gemfile");
    if setup.force || !gemfile.exists() {
        std::fs::write(&gemfile, gemfile_contents(setup))?;
        written.push(gemfile);
    } else {
        debug!("Keeping existing {}", gemfile.display());
    }

    std::fs::write(&fastfile, fastfile_contents(setup))?;
    written.push(fastfile);

    let appfile = dir.join("Appfile");
    std::fs::write(&appfile, appfile_contents(setup))?;
    written.push(appfile);

    info!("Wrote {} Fastlane file(s) under {}", written.len(), root.display());
    Ok(written)
}

fn gemfile_contents(setup: &FastlaneSetup) -> String {
    let mut out = String::from("source \"https://rubygems.org\"\n\ngem \"fastlane\"\n");
    if setup.has(Platform::Ios) {
        out.push_str("gem \"cocoapods\"\n");
    }
    out
}

fn fastfile_contents(setup: &FastlaneSetup) -> String {
    let default = setup.platforms[0];
    let mut out = String::new();
    out.push_str("# Lanes invoked by `flow deployment release`\n");
    out.push_str(&format!("default_platform(:{})\n\n", default.as_str()));
    out.push_str("def newest(pattern)\n");
    out.push_str("  Dir[File.join(__dir__, \"..\", pattern)].max_by { |f| File.mtime(f) }\n");
    out.push_str("end\n");

    if setup.has(Platform::Android) {
        out.push_str("\nplatform :android do\n");
        for (index, track) in TRACKS.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&format!("  desc \"Upload the newest app bundle to the {} track\"\n", track));
            out.push_str(&format!("  lane :{} do\n", track));
            out.push_str(&format!(
                "    upload_to_play_store(track: \"{}\", aab: newest(\"build/app/outputs/bundle/**/*.aab\"))\n",
                track
            ));
            out.push_str("  end\n");
        }
        out.push_str("end\n");
    }

    if setup.has(Platform::Ios) {
        out.push_str("\nplatform :ios do\n");
        out.push_str("  desc \"Upload the newest IPA to TestFlight\"\n");
        out.push_str("  lane :beta do\n");
        out.push_str("    upload_to_testflight(ipa: newest(\"build/ios/ipa/*.ipa\"))\n");
        out.push_str("  end\n\n");
        out.push_str("  desc \"Upload the newest IPA to App Store Connect\"\n");
        out.push_str("  lane :release do\n");
        out.push_str(
            "    upload_to_app_store(ipa: newest(\"build/ios/ipa/*.ipa\"), submit_for_review: false, force: true)\n",
        );
        out.push_str("  end\n");
        out.push_str("end\n");
    }
    out
}

fn appfile_contents(setup: &FastlaneSetup) -> String {
    let mut out = String::new();
    if setup.has(Platform::Android) {
        out.push_str(&format!("json_key_file(\"{}\")\n", PLAY_STORE_KEY));
        out.push_str(&format!("package_name(\"{}\")\n", setup.app_id));
    }
    if setup.has(Platform::Ios) {
        out.push_str(&format!("app_identifier(\"{}\")\n", setup.app_id));
        if let Some(apple_id) = &setup.apple_id {
            out.push_str(&format!("apple_id(\"{}\")\n", apple_id));
        }
        if let Some(team_id) = &setup.team_id {
            out.push_str(&format!("team_id(\"{}\")\n", team_id));
        }
    }
    out
}
