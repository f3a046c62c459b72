//! Command line definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flow_app::BuildFormat;
use flow_core::{BuildMode, Platform};

/// Flavor-aware companion for Flutter Android and iOS projects
#[derive(Parser, Debug)]
#[command(name = "flow", version)]
#[command(about = "Build, run and release multi-flavor Flutter apps", long_about = None)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print a single JSON document instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Flutter project directory (defaults to the nearest one above the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the Flutter, Android and iOS toolchains
    Doctor,
    /// Analyze code, dependencies, flavors and build artifacts
    Analyze(AnalyzeArgs),
    /// List devices of both platforms
    Devices,
    /// Android devices, builds and installs
    #[command(subcommand)]
    Android(AndroidCommand),
    /// iOS simulators, devices and builds
    #[command(subcommand)]
    Ios(IosCommand),
    /// Generate launcher icons and splash screens
    #[command(subcommand)]
    Generate(GenerateCommand),
    /// Keystores, releases and deployment status
    #[command(subcommand)]
    Deployment(DeploymentCommand),
    /// Read and edit ~/.flow-cli/config.yaml
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Only report on this flavor
    #[arg(long)]
    pub flavor: Option<String>,

    /// Skip `flutter analyze`
    #[arg(long)]
    pub skip_code: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[default]
    Debug,
    Profile,
    Release,
}

impl From<ModeArg> for BuildMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Debug => BuildMode::Debug,
            ModeArg::Profile => BuildMode::Profile,
            ModeArg::Release => BuildMode::Release,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AndroidFormat {
    #[default]
    Apk,
    Appbundle,
}

impl From<AndroidFormat> for BuildFormat {
    fn from(format: AndroidFormat) -> Self {
        match format {
            AndroidFormat::Apk => BuildFormat::Apk,
            AndroidFormat::Appbundle => BuildFormat::AppBundle,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum IosFormat {
    #[default]
    Ios,
    Ipa,
}

impl From<IosFormat> for BuildFormat {
    fn from(format: IosFormat) -> Self {
        match format {
            IosFormat::Ios => BuildFormat::Ios,
            IosFormat::Ipa => BuildFormat::Ipa,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Android,
    Ios,
    #[default]
    Both,
}

impl PlatformArg {
    /// `None` means both platforms
    pub fn platform(self) -> Option<Platform> {
        match self {
            PlatformArg::Android => Some(Platform::Android),
            PlatformArg::Ios => Some(Platform::Ios),
            PlatformArg::Both => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct FlavorsArgs {
    /// Show details of one flavor
    #[arg(long)]
    pub flavor: Option<String>,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Flavor name (see `flavors`)
    #[arg(long)]
    pub flavor: Option<String>,

    /// Device id, name or part of a name
    #[arg(long, short)]
    pub device: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,
}

#[derive(Subcommand, Debug)]
pub enum AndroidCommand {
    /// Connected devices, running emulators and configured AVDs
    Devices,
    /// Flavors found under assets/configs
    Flavors(FlavorsArgs),
    /// Build an APK or app bundle
    Build(AndroidBuildArgs),
    /// Run on a device with hot reload
    Run(TargetArgs),
    /// Build an APK and install it with adb
    Install(InstallArgs),
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Install this APK instead of building one
    #[arg(long, value_name = "PATH", conflicts_with = "all")]
    pub apk: Option<PathBuf>,

    /// Install every APK under build/app/outputs/flutter-apk
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct AndroidBuildArgs {
    #[arg(long, conflicts_with = "all_flavors")]
    pub flavor: Option<String>,

    /// Build every valid flavor in name order
    #[arg(long)]
    pub all_flavors: bool,

    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,

    #[arg(long, value_enum, default_value_t)]
    pub format: AndroidFormat,
}

#[derive(Subcommand, Debug)]
pub enum IosCommand {
    /// Simulators and connected devices
    Devices(IosDevicesArgs),
    /// Flavors found under assets/configs
    Flavors(FlavorsArgs),
    /// Build the iOS app or an IPA
    Build(IosBuildArgs),
    /// Run on a simulator or device, booting the simulator if needed
    Run(TargetArgs),
}

#[derive(Args, Debug)]
pub struct IosDevicesArgs {
    /// Boot a simulator by id or name
    #[arg(long, value_name = "SIMULATOR", conflicts_with_all = ["shutdown", "list_runtimes"])]
    pub start: Option<String>,

    /// Shut down a running simulator
    #[arg(long, value_name = "SIMULATOR", conflicts_with = "list_runtimes")]
    pub shutdown: Option<String>,

    /// List installed iOS simulator runtimes
    #[arg(long)]
    pub list_runtimes: bool,
}

#[derive(Args, Debug)]
pub struct IosBuildArgs {
    #[arg(long)]
    pub flavor: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,

    #[arg(long, value_enum, default_value_t)]
    pub format: IosFormat,

    /// Skip code signing
    #[arg(long)]
    pub no_codesign: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, conflicts_with = "all_flavors")]
    pub flavor: Option<String>,

    /// Generate for every valid flavor
    #[arg(long)]
    pub all_flavors: bool,

    #[arg(long, value_enum, default_value_t)]
    pub platform: PlatformArg,
}

#[derive(Subcommand, Debug)]
pub enum GenerateCommand {
    /// Launcher icons with flutter_launcher_icons
    Icons(GenerateArgs),
    /// Splash screens with flutter_native_splash
    Splash(GenerateArgs),
    /// Icons followed by splash screens
    Branding(GenerateArgs),
}

#[derive(Subcommand, Debug)]
pub enum DeploymentCommand {
    /// Create an Android upload keystore with keytool
    Keystore(KeystoreArgs),
    /// Test, build and upload through Fastlane
    Release(ReleaseArgs),
    /// Write the Gemfile and Fastlane files, then install the gems
    Setup(SetupArgs),
    /// Show signing, Fastlane and CI configuration
    Status,
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Overwrite existing Fastlane files
    #[arg(long)]
    pub force: bool,

    #[arg(long, value_enum, default_value_t)]
    pub platform: PlatformArg,

    /// Bundle id / application id [default: com.example.<project>]
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Apple ID used for App Store Connect
    #[arg(long, value_name = "EMAIL")]
    pub apple_id: Option<String>,

    /// Apple developer team [default: ios.team_id from the config]
    #[arg(long, value_name = "TEAM")]
    pub team_id: Option<String>,

    /// Do not run `bundle install`
    #[arg(long)]
    pub skip_install: bool,
}

#[derive(Args, Debug)]
pub struct KeystoreArgs {
    /// Key alias [default: release]
    #[arg(long)]
    pub alias: Option<String>,

    /// Validity in days [default: 10000]
    #[arg(long, value_name = "DAYS")]
    pub validity: Option<u32>,

    /// Keystore file [default: keys/release-key.jks]
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Distinguished name, e.g. "CN=Acme, O=Acme Inc, C=US"
    #[arg(long)]
    pub dname: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    #[arg(long)]
    pub flavor: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub platform: PlatformArg,

    /// internal, alpha, beta or production
    #[arg(long, default_value = "internal")]
    pub track: String,

    #[arg(long)]
    pub skip_tests: bool,

    /// Stop after building; do not run Fastlane
    #[arg(long)]
    pub build_only: bool,

    /// Keep the build number in pubspec.yaml
    #[arg(long)]
    pub no_bump: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    List,
    /// Print the config file location
    Path,
    /// Print one value, e.g. `general.default_flavor`
    Get { key: String },
    /// Set one value: `flow config set general.auto_pub_get=false`
    Set {
        #[arg(value_name = "KEY=VALUE")]
        assignment: String,
    },
    /// Restore the defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_android_run() {
        let cli = Cli::try_parse_from([
            "flow", "--json", "android", "run", "--flavor", "dev", "-d", "Pixel", "--mode", "profile",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Android(AndroidCommand::Run(args)) => {
                assert_eq!(args.flavor.as_deref(), Some("dev"));
                assert_eq!(args.device.as_deref(), Some("Pixel"));
                assert_eq!(BuildMode::from(args.mode), BuildMode::Profile);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flavor_conflicts_with_all_flavors() {
        let result = Cli::try_parse_from([
            "flow", "android", "build", "--flavor", "dev", "--all-flavors",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_release_defaults() {
        let cli = Cli::try_parse_from(["flow", "deployment", "release"]).unwrap();
        match cli.command {
            Command::Deployment(DeploymentCommand::Release(args)) => {
                assert_eq!(args.track, "internal");
                assert_eq!(args.platform.platform(), None);
                assert!(!args.build_only);
                assert!(!args.no_bump);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_install_apk_conflicts_with_all() {
        let result = Cli::try_parse_from([
            "flow", "android", "install", "--apk", "app.apk", "--all",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["flow", "android", "install", "--apk", "app.apk", "-d", "emu"])
            .unwrap();
        match cli.command {
            Command::Android(AndroidCommand::Install(args)) => {
                assert_eq!(args.apk, Some(PathBuf::from("app.apk")));
                assert_eq!(args.target.device.as_deref(), Some("emu"));
                assert!(!args.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ios_devices_actions_are_exclusive() {
        assert!(Cli::try_parse_from([
            "flow", "ios", "devices", "--start", "iPhone 15", "--list-runtimes",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "flow", "ios", "devices", "--start", "a", "--shutdown", "b",
        ])
        .is_err());

        let cli = Cli::try_parse_from(["flow", "ios", "devices"]).unwrap();
        match cli.command {
            Command::Ios(IosCommand::Devices(args)) => {
                assert!(args.start.is_none() && args.shutdown.is_none() && !args.list_runtimes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_deployment_setup() {
        let cli = Cli::try_parse_from([
            "flow", "deployment", "setup", "--platform", "ios", "--team-id", "ABCDE12345",
            "--skip-install",
        ])
        .unwrap();
        match cli.command {
            Command::Deployment(DeploymentCommand::Setup(args)) => {
                assert_eq!(args.platform.platform(), Some(Platform::Ios));
                assert_eq!(args.team_id.as_deref(), Some("ABCDE12345"));
                assert!(args.skip_install);
                assert!(!args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
