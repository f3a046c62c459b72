//! End-to-end: discover devices, resolve a target, plan and execute it
//! against scripted tools

use std::fs;

use flow_app::dispatch::{plan, Action, DispatchContext};
use flow_app::flavors::configs_dir;
use flow_app::{select_device, FlavorRegistry, ResolvedTarget, TargetRequest, TargetResolver};
use flow_core::{BuildMode, Error, Platform};
use flow_tools::test_utils::ScriptedRunner;
use flow_tools::{DeviceDirectory, ToolPaths};
use tempfile::TempDir;

const ADB_ONE_READY: &str = "List of devices attached\n\
    emulator-5554 device product:sdk model:Pixel_7 device:emu transport_id:1\n\
    R58M123 unauthorized usb:1-1 transport_id:2\n";

fn project_with_flavor(name: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pubspec.yaml"),
        "name: acme\ndependencies:\n  flutter:\n    sdk: flutter\n",
    )
    .unwrap();
    let dir = configs_dir(temp.path()).join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.json"), r#"{"packageName": "com.acme.app"}"#).unwrap();
    temp
}

fn context(temp: &TempDir) -> DispatchContext {
    DispatchContext {
        project_root: temp.path().to_path_buf(),
        tools: ToolPaths::default(),
        auto_pub_get: true,
    }
}

fn run_request(device: Option<&str>) -> TargetRequest {
    TargetRequest {
        platform: Some(Platform::Android),
        flavor: None,
        device: device.map(str::to_string),
        action: Action::Run {
            mode: BuildMode::Debug,
        },
    }
}

#[tokio::test]
async fn test_run_on_the_only_ready_device() {
    let temp = project_with_flavor("dev");
    let runner = ScriptedRunner::new()
        .ok("adb -s emulator-5554 shell getprop", "14\n")
        .ok("adb devices -l", ADB_ONE_READY);

    let discovery = DeviceDirectory::new(&runner, ToolPaths::default())
        .discover(Platform::Android)
        .await
        .unwrap();
    let registry = FlavorRegistry::load(temp.path()).unwrap();
    let target = TargetResolver::new(&registry)
        .resolve(run_request(None), &discovery.devices)
        .unwrap();

    assert_eq!(target.flavor.as_ref().map(|f| f.name.as_str()), Some("dev"));
    assert_eq!(target.device.as_ref().map(|d| d.id.as_str()), Some("emulator-5554"));

    let plan = plan(&target, &context(&temp)).unwrap();
    let outcomes = plan.execute(&runner).await.unwrap();
    assert_eq!(outcomes.len(), 2);

    let calls = runner.calls();
    assert!(calls.contains(&"flutter pub get".to_string()));
    assert_eq!(
        calls.last().map(String::as_str),
        Some("flutter run -d emulator-5554 --debug --flavor dev")
    );
}

#[tokio::test]
async fn test_unauthorized_device_is_not_selectable() {
    let temp = project_with_flavor("dev");
    let runner = ScriptedRunner::new().ok("adb devices -l", ADB_ONE_READY);

    let discovery = DeviceDirectory::new(&runner, ToolPaths::default())
        .discover(Platform::Android)
        .await
        .unwrap();
    let registry = FlavorRegistry::load(temp.path()).unwrap();
    let err = TargetResolver::new(&registry)
        .resolve(run_request(Some("R58M123")), &discovery.devices)
        .unwrap_err();

    assert_eq!(err.exit_code(), 6);
    assert_eq!(err.choices(), ["Pixel 7 (emulator-5554)"]);
}

#[tokio::test]
async fn test_failed_discovery_differs_from_no_devices() {
    let temp = project_with_flavor("dev");
    let registry = FlavorRegistry::load(temp.path()).unwrap();

    let broken = ScriptedRunner::new().missing("adb");
    let err = DeviceDirectory::new(&broken, ToolPaths::default())
        .discover(Platform::Android)
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 4);

    let empty = ScriptedRunner::new().ok("adb devices -l", "List of devices attached\n\n");
    let discovery = DeviceDirectory::new(&empty, ToolPaths::default())
        .discover(Platform::Android)
        .await
        .unwrap();
    let err = TargetResolver::new(&registry)
        .resolve(run_request(None), &discovery.devices)
        .unwrap_err();
    assert!(matches!(err, Error::NoDevices { platform: Platform::Android }));
}

#[tokio::test]
async fn test_build_halts_at_first_failed_step() {
    let temp = project_with_flavor("prod");
    let registry = FlavorRegistry::load(temp.path()).unwrap();
    let runner = ScriptedRunner::new().fail("flutter pub get", 69, "Could not resolve dependencies");

    let target = TargetResolver::new(&registry)
        .resolve(
            TargetRequest {
                platform: Some(Platform::Android),
                flavor: Some("prod".to_string()),
                device: None,
                action: Action::Build {
                    mode: BuildMode::Release,
                    format: flow_app::BuildFormat::Apk,
                    no_codesign: false,
                },
            },
            &[],
        )
        .unwrap();
    let plan = plan(&target, &context(&temp)).unwrap();
    assert_eq!(plan.len(), 2);

    let err = plan.execute(&runner).await.unwrap_err();
    match &err {
        Error::DispatchFailed { step, total, code, output, .. } => {
            assert_eq!((*step, *total), (0, 2));
            assert_eq!(*code, Some(69));
            assert!(output.contains("Could not resolve dependencies"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 7);
    assert_eq!(runner.calls(), vec!["flutter pub get"]);
}

#[tokio::test]
async fn test_start_simulator_by_name() {
    let simctl = r#"{"devices": {"com.apple.CoreSimulator.SimRuntime.iOS-17-2": [
        {"udid": "SIM-OFF", "name": "iPhone 15", "state": "Shutdown", "isAvailable": true},
        {"udid": "SIM-ON", "name": "iPhone 15 Pro", "state": "Booted", "isAvailable": true}
    ]}}"#;
    let runner = ScriptedRunner::new().ok("xcrun simctl list devices", simctl);

    let discovery = DeviceDirectory::new(&runner, ToolPaths::default())
        .discover(Platform::Ios)
        .await
        .unwrap();
    let device = select_device(&discovery.devices, Platform::Ios, Some("iphone 15")).unwrap();
    assert_eq!(device.id, "SIM-OFF");

    let temp = TempDir::new().unwrap();
    let target = ResolvedTarget {
        flavor: None,
        device: Some(device),
        platform: Some(Platform::Ios),
        action: Action::StartSimulator,
    };
    plan(&target, &context(&temp)).unwrap().execute(&runner).await.unwrap();
    assert!(runner.calls().ends_with(&[
        "xcrun simctl boot SIM-OFF".to_string(),
        "xcrun simctl bootstatus SIM-OFF -b".to_string(),
    ]));
}
