//! Command Dispatcher
//!
//! Turns a [`ResolvedTarget`] into an ordered [`Plan`] of external tool
//! invocations and runs it. Execution is strictly sequential and stops at
//! the first step that fails; later steps are never started.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use flow_core::prelude::*;
use flow_core::{BuildMode, Device, DeviceKind, Platform, Readiness};
use flow_tools::{Invocation, StdioMode, ToolPaths, ToolRunner};
use serde::Serialize;

use crate::artifacts;
use crate::resolver::ResolvedTarget;

/// Bound for waiting on a simulator to finish booting
const BOOT_WAIT_TIMEOUT: Duration = Duration::from_secs(180);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Output format of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFormat {
    Apk,
    AppBundle,
    Ios,
    Ipa,
}

impl BuildFormat {
    /// Subcommand of `flutter build`
    pub fn as_arg(&self) -> &'static str {
        match self {
            BuildFormat::Apk => "apk",
            BuildFormat::AppBundle => "appbundle",
            BuildFormat::Ios => "ios",
            BuildFormat::Ipa => "ipa",
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            BuildFormat::Apk | BuildFormat::AppBundle => Platform::Android,
            BuildFormat::Ios | BuildFormat::Ipa => Platform::Ios,
        }
    }
}

/// Options for `keytool -genkeypair`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeystoreOptions {
    pub alias: String,
    pub validity_days: u32,
    pub output: PathBuf,
    /// Distinguished name; keytool prompts for it when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dname: Option<String>,
}

/// What the user asked to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Build {
        mode: BuildMode,
        format: BuildFormat,
        no_codesign: bool,
    },
    Run {
        mode: BuildMode,
    },
    Install {
        mode: BuildMode,
    },
    /// Install prebuilt APKs without building
    InstallApks {
        apks: Vec<PathBuf>,
    },
    StartSimulator,
    ShutdownSimulator,
    GenerateIcons {
        config: PathBuf,
    },
    GenerateSplash {
        config: PathBuf,
    },
    GenerateBranding {
        icons_config: PathBuf,
        splash_config: PathBuf,
    },
    Release {
        track: String,
        skip_tests: bool,
        build_only: bool,
    },
    Keystore(KeystoreOptions),
    /// `bundle install` for the Fastlane Gemfile
    InstallGems,
}

impl Action {
    /// Whether the action runs against a device
    pub fn needs_device(&self) -> bool {
        matches!(
            self,
            Action::Run { .. }
                | Action::Install { .. }
                | Action::InstallApks { .. }
                | Action::StartSimulator
                | Action::ShutdownSimulator
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Build { .. } => "build",
            Action::Run { .. } => "run",
            Action::Install { .. } | Action::InstallApks { .. } => "install",
            Action::StartSimulator => "start simulator",
            Action::ShutdownSimulator => "shutdown simulator",
            Action::GenerateIcons { .. } => "generate icons",
            Action::GenerateSplash { .. } => "generate splash",
            Action::GenerateBranding { .. } => "generate branding",
            Action::Release { .. } => "release",
            Action::Keystore(_) => "keystore",
            Action::InstallGems => "install gems",
        }
    }
}

/// One external invocation in a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: String,
    pub invocation: Invocation,
}

impl Step {
    fn new(invocation: Invocation) -> Self {
        Self {
            label: invocation.display(),
            invocation,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.invocation.stdio.is_inherited()
    }
}

/// Everything the dispatcher needs besides the target
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub project_root: PathBuf,
    pub tools: ToolPaths,
    /// Run `flutter pub get` before builds and runs
    pub auto_pub_get: bool,
}

/// Result of one executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub label: String,
    pub code: Option<i32>,
    pub started_at: DateTime<Local>,
    pub elapsed_ms: u64,
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.label.clone()).collect()
    }

    /// Append another plan's steps
    pub fn extend(&mut self, other: Plan) {
        self.steps.extend(other.steps);
    }

    /// Route interactive steps' stdout to stderr, leaving stdout free for
    /// a machine-readable document
    pub fn keep_stdout_clean(&mut self) {
        for step in self.steps.iter_mut().filter(|s| s.is_interactive()) {
            step.invocation.stdio = StdioMode::InheritToStderr;
        }
    }

    fn push(&mut self, invocation: Invocation) {
        self.steps.push(Step::new(invocation));
    }

    /// Run every step in order
    pub async fn execute<R: ToolRunner>(&self, runner: &R) -> Result<Vec<StepOutcome>> {
        self.execute_with(runner, |_, _, _| {}).await
    }

    /// Run every step in order, calling `on_step(index, total, step)` before each.
    ///
    /// The first failing step ends execution with [`Error::DispatchFailed`]
    /// carrying its zero-based index and captured output.
    pub async fn execute_with<R, F>(&self, runner: &R, mut on_step: F) -> Result<Vec<StepOutcome>>
    where
        R: ToolRunner,
        F: FnMut(usize, usize, &Step),
    {
        let total = self.steps.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, step) in self.steps.iter().enumerate() {
            on_step(index, total, step);
            info!("Step {}/{}: {}", index + 1, total, step.label);

            let started_at = Local::now();
            let started = Instant::now();
            let output = runner.run(&step.invocation).await.map_err(|e| {
                error!("Step {}/{} could not run: {}", index + 1, total, e);
                Error::DispatchFailed {
                    step: index,
                    total,
                    label: step.label.clone(),
                    code: None,
                    output: e.to_string(),
                }
            })?;

            if !output.success() {
                error!(
                    "Step {}/{} failed with {:?}: {}",
                    index + 1,
                    total,
                    output.code,
                    step.label
                );
                return Err(Error::DispatchFailed {
                    step: index,
                    total,
                    label: step.label.clone(),
                    code: output.code,
                    output: output.combined(),
                });
            }

            outcomes.push(StepOutcome {
                label: step.label.clone(),
                code: output.code,
                started_at,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        Ok(outcomes)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan Construction
// ─────────────────────────────────────────────────────────────────────────────

/// Build the plan for a resolved target
pub fn plan(target: &ResolvedTarget, ctx: &DispatchContext) -> Result<Plan> {
    let flavor = target.flavor.as_ref().map(|f| f.name.as_str());
    let mut plan = Plan::default();

    match &target.action {
        Action::Build {
            mode,
            format,
            no_codesign,
        } => {
            let platform = require_platform(target)?;
            if format.platform() != platform {
                return Err(Error::config(format!(
                    "'{}' is not a {} build format",
                    format.as_arg(),
                    platform
                )));
            }
            pub_get(&mut plan, ctx);
            let mut build = flutter_build(ctx, *format, *mode, flavor);
            if *no_codesign && platform == Platform::Ios {
                build = build.arg("--no-codesign");
            }
            plan.push(build);
        }

        Action::Run { mode } => {
            let device = require_device(target)?;
            if device.platform == Platform::Ios && device.needs_boot() {
                boot_simulator(&mut plan, ctx, device);
            }
            pub_get(&mut plan, ctx);
            plan.push(
                flutter(ctx)
                    .args(["run", "-d", device.id.as_str(), mode.as_arg()])
                    .args(flavor_args(flavor))
                    .inherit_stdio(),
            );
        }

        Action::Install { mode } => {
            let device = require_device(target)?;
            if device.platform != Platform::Android {
                return Err(Error::config("install is only supported for Android devices"));
            }
            plan.push(flutter_build(ctx, BuildFormat::Apk, *mode, flavor));
            let apk = artifacts::apk_path(&ctx.project_root, flavor, *mode);
            plan.push(
                Invocation::new(&ctx.tools.adb)
                    .args(["-s", device.id.as_str(), "install", "-r"])
                    .arg(path_arg(&apk))
                    .current_dir(&ctx.project_root),
            );
        }

        Action::InstallApks { apks } => {
            let device = require_device(target)?;
            if device.platform != Platform::Android {
                return Err(Error::config("install is only supported for Android devices"));
            }
            if apks.is_empty() {
                return Err(Error::config("No APKs to install"));
            }
            for apk in apks {
                plan.push(
                    Invocation::new(&ctx.tools.adb)
                        .args(["-s", device.id.as_str(), "install", "-r"])
                        .arg(path_arg(apk))
                        .current_dir(&ctx.project_root),
                );
            }
        }

        Action::StartSimulator => {
            let device = require_simulator(target)?;
            boot_simulator(&mut plan, ctx, device);
        }

        Action::ShutdownSimulator => {
            let device = require_simulator(target)?;
            plan.push(
                Invocation::new(&ctx.tools.xcrun)
                    .args(["simctl", "shutdown", device.id.as_str()])
                    .timeout(SHUTDOWN_TIMEOUT),
            );
        }

        Action::GenerateIcons { config } => plan.push(launcher_icons(ctx, config)),

        Action::GenerateSplash { config } => plan.push(native_splash(ctx, config)),

        Action::GenerateBranding {
            icons_config,
            splash_config,
        } => {
            plan.push(launcher_icons(ctx, icons_config));
            plan.push(native_splash(ctx, splash_config));
        }

        Action::Release {
            track,
            skip_tests,
            build_only,
        } => release(&mut plan, ctx, target.platform, flavor, track, *skip_tests, *build_only),

        Action::Keystore(options) => {
            let mut keytool = Invocation::new(&ctx.tools.keytool)
                .args(["-genkeypair", "-v", "-keystore"])
                .arg(path_arg(&options.output))
                .args(["-alias", options.alias.as_str()])
                .args(["-keyalg", "RSA", "-keysize", "2048", "-validity"])
                .arg(options.validity_days.to_string())
                .current_dir(&ctx.project_root)
                .inherit_stdio();
            if let Some(dname) = &options.dname {
                keytool = keytool.args(["-dname", dname.as_str()]);
            }
            plan.push(keytool);
        }

        Action::InstallGems => plan.push(
            Invocation::new(&ctx.tools.bundle)
                .arg("install")
                .current_dir(&ctx.project_root),
        ),
    }

    debug!("Planned {} step(s) for {}", plan.len(), target.action.name());
    Ok(plan)
}

fn require_platform(target: &ResolvedTarget) -> Result<Platform> {
    target.platform.ok_or_else(|| {
        Error::config(format!("{} requires a target platform", target.action.name()))
    })
}

fn require_device(target: &ResolvedTarget) -> Result<&Device> {
    target.device.as_ref().ok_or_else(|| {
        Error::config(format!("{} requires a target device", target.action.name()))
    })
}

fn require_simulator(target: &ResolvedTarget) -> Result<&Device> {
    let device = require_device(target)?;
    if device.platform != Platform::Ios || device.kind != DeviceKind::Simulator {
        return Err(Error::config(format!("{} is not an iOS simulator", device.label())));
    }
    Ok(device)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn flutter(ctx: &DispatchContext) -> Invocation {
    Invocation::new(&ctx.tools.flutter).current_dir(&ctx.project_root)
}

fn flavor_args(flavor: Option<&str>) -> Vec<String> {
    flavor
        .map(|f| vec!["--flavor".to_string(), f.to_string()])
        .unwrap_or_default()
}

fn pub_get(plan: &mut Plan, ctx: &DispatchContext) {
    if ctx.auto_pub_get {
        plan.push(flutter(ctx).args(["pub", "get"]));
    }
}

fn flutter_build(
    ctx: &DispatchContext,
    format: BuildFormat,
    mode: BuildMode,
    flavor: Option<&str>,
) -> Invocation {
    flutter(ctx)
        .args(["build", format.as_arg(), mode.as_arg()])
        .args(flavor_args(flavor))
}

fn boot_simulator(plan: &mut Plan, ctx: &DispatchContext, device: &Device) {
    if device.readiness == Readiness::Unavailable {
        plan.push(
            Invocation::new(&ctx.tools.xcrun).args(["simctl", "boot", device.id.as_str()]),
        );
    }
    plan.push(
        Invocation::new(&ctx.tools.xcrun)
            .args(["simctl", "bootstatus", device.id.as_str(), "-b"])
            .timeout(BOOT_WAIT_TIMEOUT),
    );
}

fn launcher_icons(ctx: &DispatchContext, config: &Path) -> Invocation {
    Invocation::new(&ctx.tools.dart)
        .args(["run", "flutter_launcher_icons", "-f"])
        .arg(path_arg(config))
        .current_dir(&ctx.project_root)
}

fn native_splash(ctx: &DispatchContext, config: &Path) -> Invocation {
    Invocation::new(&ctx.tools.dart)
        .args(["run", "flutter_native_splash:create"])
        .arg(format!("--path={}", path_arg(config)))
        .current_dir(&ctx.project_root)
}

/// Fastlane iOS lane for a store track
fn ios_lane(track: &str) -> &'static str {
    match track {
        "internal" | "alpha" | "beta" => "beta",
        _ => "release",
    }
}

/// Release steps; `platform == None` releases both platforms with the
/// shared preparation steps run once
fn release(
    plan: &mut Plan,
    ctx: &DispatchContext,
    platform: Option<Platform>,
    flavor: Option<&str>,
    track: &str,
    skip_tests: bool,
    build_only: bool,
) {
    let platforms: Vec<Platform> = match platform {
        Some(p) => vec![p],
        None => Platform::ALL.to_vec(),
    };

    if !skip_tests {
        plan.push(flutter(ctx).arg("test"));
    }
    plan.push(flutter(ctx).arg("clean"));
    plan.push(flutter(ctx).args(["pub", "get"]));

    for platform in &platforms {
        let format = match platform {
            Platform::Android => BuildFormat::AppBundle,
            Platform::Ios => BuildFormat::Ipa,
        };
        plan.push(flutter_build(ctx, format, BuildMode::Release, flavor));
    }

    if build_only {
        return;
    }

    for platform in &platforms {
        let lane = match platform {
            Platform::Android => track,
            Platform::Ios => ios_lane(track),
        };
        plan.push(
            Invocation::new(&ctx.tools.bundle)
                .args(["exec", "fastlane", platform.as_str(), lane])
                .current_dir(&ctx.project_root),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavors::{Flavor, FlavorAssets, PackageIds};
    use flow_tools::test_utils::{test_device, test_simulator, ScriptedRunner};

    fn ctx(auto_pub_get: bool) -> DispatchContext {
        DispatchContext {
            project_root: PathBuf::from("/work/app"),
            tools: ToolPaths::default(),
            auto_pub_get,
        }
    }

    fn flavor(name: &str) -> Flavor {
        Flavor {
            name: name.to_string(),
            dir: PathBuf::from(format!("/work/app/assets/configs/{}", name)),
            app_name: None,
            package_ids: PackageIds {
                android: "com.acme.app".into(),
                ios: "com.acme.app".into(),
            },
            main_color: None,
            assets: FlavorAssets::default(),
            overrides: Default::default(),
        }
    }

    fn target(
        platform: Option<Platform>,
        flavor_name: Option<&str>,
        device: Option<Device>,
        action: Action,
    ) -> ResolvedTarget {
        ResolvedTarget {
            flavor: flavor_name.map(flavor),
            device,
            platform,
            action,
        }
    }

    fn plan_err(t: &ResolvedTarget) -> Error {
        match plan(t, &ctx(false)) {
            Ok(p) => panic!("expected an error, got {:?}", p.labels()),
            Err(e) => e,
        }
    }

    #[test]
    fn test_android_build_plan() {
        let t = target(
            Some(Platform::Android),
            Some("dev"),
            None,
            Action::Build {
                mode: BuildMode::Release,
                format: BuildFormat::AppBundle,
                no_codesign: false,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec!["flutter pub get", "flutter build appbundle --release --flavor dev"]
        );
        assert_eq!(
            plan.steps[1].invocation.cwd.as_deref(),
            Some(Path::new("/work/app"))
        );
    }

    #[test]
    fn test_unflavored_build_without_pub_get() {
        let t = target(
            Some(Platform::Ios),
            None,
            None,
            Action::Build {
                mode: BuildMode::Debug,
                format: BuildFormat::Ios,
                no_codesign: true,
            },
        );
        let plan = plan(&t, &ctx(false)).unwrap();
        assert_eq!(plan.labels(), vec!["flutter build ios --debug --no-codesign"]);
    }

    #[test]
    fn test_build_format_must_match_platform() {
        let t = target(
            Some(Platform::Ios),
            None,
            None,
            Action::Build {
                mode: BuildMode::Debug,
                format: BuildFormat::Apk,
                no_codesign: false,
            },
        );
        assert!(plan(&t, &ctx(false)).is_err());
    }

    #[test]
    fn test_android_run_is_interactive() {
        let t = target(
            Some(Platform::Android),
            Some("dev"),
            Some(test_device("emulator-5554", "Pixel 7")),
            Action::Run {
                mode: BuildMode::Debug,
            },
        );
        let plan = plan(&t, &ctx(false)).unwrap();
        assert_eq!(
            plan.labels(),
            vec!["flutter run -d emulator-5554 --debug --flavor dev"]
        );
        assert!(plan.steps[0].is_interactive());
    }

    #[test]
    fn test_ios_run_boots_shutdown_simulator() {
        let t = target(
            Some(Platform::Ios),
            None,
            Some(test_simulator("SIM-1", "iPhone 15", Readiness::Unavailable)),
            Action::Run {
                mode: BuildMode::Debug,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec![
                "xcrun simctl boot SIM-1",
                "xcrun simctl bootstatus SIM-1 -b",
                "flutter pub get",
                "flutter run -d SIM-1 --debug",
            ]
        );
    }

    #[test]
    fn test_ios_run_waits_for_booting_simulator() {
        let t = target(
            Some(Platform::Ios),
            None,
            Some(test_simulator("SIM-1", "iPhone 15", Readiness::Booting)),
            Action::Run {
                mode: BuildMode::Debug,
            },
        );
        let labels = plan(&t, &ctx(false)).unwrap().labels();
        assert_eq!(labels[0], "xcrun simctl bootstatus SIM-1 -b");
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_install_plan() {
        let t = target(
            Some(Platform::Android),
            Some("prod"),
            Some(test_device("R58M", "Galaxy")),
            Action::Install {
                mode: BuildMode::Release,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec![
                "flutter build apk --release --flavor prod",
                "adb -s R58M install -r /work/app/build/app/outputs/flutter-apk/app-prod-release.apk",
            ]
        );
    }

    #[test]
    fn test_install_prebuilt_apks() {
        let t = target(
            Some(Platform::Android),
            None,
            Some(test_device("emulator-5554", "Pixel 7")),
            Action::InstallApks {
                apks: vec![PathBuf::from("/tmp/a.apk"), PathBuf::from("/tmp/b.apk")],
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec![
                "adb -s emulator-5554 install -r /tmp/a.apk",
                "adb -s emulator-5554 install -r /tmp/b.apk",
            ]
        );

        let empty = target(
            Some(Platform::Android),
            None,
            Some(test_device("emulator-5554", "Pixel 7")),
            Action::InstallApks { apks: Vec::new() },
        );
        assert!(plan_err(&empty).to_string().contains("No APKs"));
    }

    #[test]
    fn test_start_and_shutdown_simulator() {
        let shutdown = test_simulator("SIM-1", "iPhone 15", Readiness::Unavailable);
        let t = target(Some(Platform::Ios), None, Some(shutdown), Action::StartSimulator);
        assert_eq!(
            plan(&t, &ctx(true)).unwrap().labels(),
            vec!["xcrun simctl boot SIM-1", "xcrun simctl bootstatus SIM-1 -b"]
        );

        let booted = test_simulator("SIM-2", "iPad Air", Readiness::Available);
        let t = target(Some(Platform::Ios), None, Some(booted), Action::ShutdownSimulator);
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(plan.labels(), vec!["xcrun simctl shutdown SIM-2"]);
        assert_eq!(plan.steps[0].invocation.timeout, Some(SHUTDOWN_TIMEOUT));
    }

    #[test]
    fn test_simulator_actions_reject_physical_devices() {
        let t = target(
            Some(Platform::Android),
            None,
            Some(test_device("R58M", "Galaxy")),
            Action::StartSimulator,
        );
        assert!(plan_err(&t).to_string().contains("not an iOS simulator"));
    }

    #[test]
    fn test_install_gems_plan() {
        let t = target(None, None, None, Action::InstallGems);
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(plan.labels(), vec!["bundle install"]);
        assert_eq!(plan.steps[0].invocation.cwd.as_deref(), Some(Path::new("/work/app")));
    }

    #[test]
    fn test_run_without_device_is_rejected() {
        let t = target(
            Some(Platform::Android),
            None,
            None,
            Action::Run {
                mode: BuildMode::Debug,
            },
        );
        assert!(plan(&t, &ctx(false)).is_err());
    }

    #[test]
    fn test_release_both_platforms() {
        let t = target(
            None,
            Some("prod"),
            None,
            Action::Release {
                track: "beta".into(),
                skip_tests: false,
                build_only: false,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec![
                "flutter test",
                "flutter clean",
                "flutter pub get",
                "flutter build appbundle --release --flavor prod",
                "flutter build ipa --release --flavor prod",
                "bundle exec fastlane android beta",
                "bundle exec fastlane ios beta",
            ]
        );
    }

    #[test]
    fn test_release_build_only_skip_tests() {
        let t = target(
            Some(Platform::Ios),
            None,
            None,
            Action::Release {
                track: "production".into(),
                skip_tests: true,
                build_only: true,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec!["flutter clean", "flutter pub get", "flutter build ipa --release"]
        );
        assert_eq!(ios_lane("production"), "release");
    }

    #[test]
    fn test_generate_branding_plan() {
        let t = target(
            None,
            Some("dev"),
            None,
            Action::GenerateBranding {
                icons_config: PathBuf::from("flutter_launcher_icons-dev.yaml"),
                splash_config: PathBuf::from("flutter_native_splash-dev.yaml"),
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec![
                "dart run flutter_launcher_icons -f flutter_launcher_icons-dev.yaml",
                "dart run flutter_native_splash:create --path=flutter_native_splash-dev.yaml",
            ]
        );
    }

    #[test]
    fn test_keystore_plan() {
        let t = target(
            Some(Platform::Android),
            None,
            None,
            Action::Keystore(KeystoreOptions {
                alias: "release".into(),
                validity_days: 10000,
                output: PathBuf::from("keys/release-key.jks"),
                dname: Some("CN=Acme".into()),
            }),
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        assert_eq!(
            plan.labels(),
            vec!["keytool -genkeypair -v -keystore keys/release-key.jks -alias release -keyalg RSA -keysize 2048 -validity 10000 -dname CN=Acme"]
        );
        assert!(plan.steps[0].is_interactive());
    }

    #[test]
    fn test_keep_stdout_clean_only_touches_interactive_steps() {
        let t = target(
            Some(Platform::Android),
            Some("dev"),
            Some(test_device("emulator-5554", "Pixel 7")),
            Action::Run {
                mode: BuildMode::Debug,
            },
        );
        let mut plan = plan(&t, &ctx(true)).unwrap();
        plan.keep_stdout_clean();

        assert_eq!(plan.steps[0].invocation.stdio, StdioMode::Capture);
        assert_eq!(plan.steps[1].invocation.stdio, StdioMode::InheritToStderr);
        assert!(plan.steps[1].is_interactive());
    }

    #[tokio::test]
    async fn test_execute_stops_at_first_failure() {
        let runner = ScriptedRunner::new()
            .fail("flutter build", 1, "FAILURE: Build failed with an exception.");
        let t = target(
            None,
            Some("prod"),
            None,
            Action::Release {
                track: "internal".into(),
                skip_tests: true,
                build_only: false,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();

        let err = plan.execute(&runner).await.unwrap_err();
        match err {
            Error::DispatchFailed {
                step,
                total,
                code,
                ref output,
                ..
            } => {
                assert_eq!(step, 2);
                assert_eq!(total, 6);
                assert_eq!(code, Some(1));
                assert!(output.contains("Build failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Nothing after the failing build ran
        assert_eq!(
            runner.calls(),
            vec![
                "flutter clean",
                "flutter pub get",
                "flutter build appbundle --release --flavor prod",
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_missing_tool_as_dispatch_failure() {
        let runner = ScriptedRunner::new().missing("adb");
        let t = target(
            Some(Platform::Android),
            None,
            Some(test_device("R58M", "Galaxy")),
            Action::Install {
                mode: BuildMode::Debug,
            },
        );
        let err = plan(&t, &ctx(false))
            .unwrap()
            .execute(&runner)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DispatchFailed { step: 1, code: None, .. }));
    }

    #[tokio::test]
    async fn test_execute_all_steps() {
        let runner = ScriptedRunner::new();
        let t = target(
            Some(Platform::Android),
            None,
            None,
            Action::Build {
                mode: BuildMode::Debug,
                format: BuildFormat::Apk,
                no_codesign: false,
            },
        );
        let plan = plan(&t, &ctx(true)).unwrap();
        let mut seen = Vec::new();
        let outcomes = plan
            .execute_with(&runner, |index, total, step| {
                seen.push(format!("{}/{} {}", index + 1, total, step.label))
            })
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(seen, vec!["1/2 flutter pub get", "2/2 flutter build apk --debug"]);
    }
}
