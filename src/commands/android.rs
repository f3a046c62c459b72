//! `flow android ...`

use flow_app::artifacts;
use flow_app::{Action, BuildFormat, ResolvedTarget, TargetRequest};
use flow_core::prelude::*;
use flow_core::{BuildMode, FlutterProject, Platform};
use flow_tools::AndroidAvd;
use serde::Serialize;
use serde_json::json;

use super::{devices, dispatch_target, flavors, Context, DispatchReport};
use crate::cli::{AndroidBuildArgs, AndroidCommand, InstallArgs, TargetArgs};
use crate::output::columns;

pub async fn run(ctx: &Context, command: AndroidCommand) -> Result<()> {
    match command {
        AndroidCommand::Devices => list_devices(ctx).await,
        AndroidCommand::Flavors(args) => flavors::run(ctx, Platform::Android, args),
        AndroidCommand::Build(args) => build(ctx, args).await,
        AndroidCommand::Run(args) => {
            let mode = args.mode.into();
            run_on_device(ctx, args, Action::Run { mode }).await
        }
        AndroidCommand::Install(args) => install(ctx, args).await,
    }
}

async fn list_devices(ctx: &Context) -> Result<()> {
    let directory = ctx.directory();
    let discovery = directory.discover(Platform::Android).await?;
    let avds = match directory.android_avds().await {
        Ok(avds) => avds,
        Err(e) => {
            ctx.output.warning(&format!("Could not list emulators: {}", e));
            Vec::new()
        }
    };

    if ctx.output.is_json() {
        return ctx.output.json(&json!({
            "platform": discovery.platform,
            "devices": discovery.devices,
            "warnings": discovery.warnings,
            "emulators": avds,
        }));
    }

    devices::show_discovery(ctx, &discovery);
    show_avds(ctx, &avds);
    Ok(())
}

fn show_avds(ctx: &Context, avds: &[AndroidAvd]) {
    if avds.is_empty() {
        return;
    }
    ctx.output.heading("Emulators");
    let rows: Vec<Vec<String>> = avds
        .iter()
        .map(|avd| {
            vec![
                avd.display_name.clone(),
                avd.name.clone(),
                avd.api_level.map(|level| format!("API {}", level)).unwrap_or_default(),
            ]
        })
        .collect();
    for line in columns(&rows) {
        ctx.output.line(&format!("  {}", line));
    }
    ctx.output.hint("Start one with `emulator -avd <name>`");
}

#[derive(Debug, Serialize)]
struct BuildsDocument {
    builds: Vec<DispatchReport>,
}

async fn build(ctx: &Context, args: AndroidBuildArgs) -> Result<()> {
    let (project, registry) = ctx.project_with_flavors()?;
    let mode: BuildMode = args.mode.into();
    let format: BuildFormat = args.format.into();
    let action = Action::Build {
        mode,
        format,
        no_codesign: false,
    };

    let flavors = if args.all_flavors {
        let all: Vec<_> = registry.flavors().cloned().collect();
        if all.is_empty() {
            return Err(Error::config("No valid flavors to build"));
        }
        all.into_iter().map(Some).collect()
    } else {
        vec![ctx.resolver(&registry).resolve_flavor(args.flavor.as_deref())?]
    };

    let mut builds = Vec::with_capacity(flavors.len());
    for flavor in flavors {
        let target = ResolvedTarget {
            flavor,
            device: None,
            platform: Some(Platform::Android),
            action: action.clone(),
        };
        let report = dispatch_target(ctx, &project.root, target).await?;
        show_build_output(ctx, &project, &report, format, mode);
        builds.push(report);
    }

    if ctx.output.is_json() {
        ctx.output.json(&BuildsDocument { builds })?;
    }
    Ok(())
}

fn show_build_output(
    ctx: &Context,
    project: &FlutterProject,
    report: &DispatchReport,
    format: BuildFormat,
    mode: BuildMode,
) {
    let flavor = report.target.flavor.as_ref().map(|f| f.name.as_str());
    let path = match format {
        BuildFormat::AppBundle => artifacts::aab_path(&project.root, flavor, mode),
        _ => artifacts::apk_path(&project.root, flavor, mode),
    };
    match std::fs::metadata(&path) {
        Ok(metadata) => ctx.output.success(&format!(
            "Built {} ({})",
            path.display(),
            artifacts::format_size(metadata.len())
        )),
        Err(_) => ctx.output.success(&format!("Build finished for {}", flavor.unwrap_or("default flavor"))),
    }
}

/// Build-and-install by default; `--apk` and `--all` install what is
/// already on disk
async fn install(ctx: &Context, args: InstallArgs) -> Result<()> {
    let action = if let Some(apk) = args.apk {
        if !apk.is_file() {
            return Err(Error::config(format!("APK not found: {}", apk.display())));
        }
        // adb runs from the project root
        Action::InstallApks {
            apks: vec![std::path::absolute(&apk)?],
        }
    } else if args.all {
        let project = ctx.project()?;
        let apks: Vec<_> = artifacts::all_apks(&project.root)
            .into_iter()
            .map(|artifact| artifact.path)
            .collect();
        if apks.is_empty() {
            return Err(Error::config(
                "No APKs under build/app/outputs/flutter-apk. Run `flow android build` first",
            ));
        }
        Action::InstallApks { apks }
    } else {
        Action::Install {
            mode: args.target.mode.into(),
        }
    };
    run_on_device(ctx, args.target, action).await
}

async fn run_on_device(ctx: &Context, args: TargetArgs, action: Action) -> Result<()> {
    let (project, registry) = ctx.project_with_flavors()?;
    let resolver = ctx.resolver(&registry);
    // Fail on flavor problems before spending time on discovery
    resolver.resolve_flavor(args.flavor.as_deref())?;

    let discovery = ctx.directory().discover(Platform::Android).await?;
    ctx.show_discovery_warnings(&discovery);

    let target = resolver.resolve(
        TargetRequest {
            platform: Some(Platform::Android),
            flavor: args.flavor,
            device: args.device,
            action,
        },
        &discovery.devices,
    )?;

    let report = dispatch_target(ctx, &project.root, target).await?;
    if ctx.output.is_json() {
        ctx.output.json(&report)?;
    } else {
        ctx.output.success(&format!("{} finished", report.target.action.name()));
    }
    Ok(())
}
