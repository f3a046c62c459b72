//! `flow ios ...`

use flow_app::artifacts;
use flow_app::{select_device, Action, BuildFormat, ResolvedTarget, TargetRequest};
use flow_core::prelude::*;
use flow_core::{DeviceKind, Platform};
use flow_tools::SimRuntime;

use super::{devices, dispatch_target, flavors, Context};
use crate::cli::{IosBuildArgs, IosCommand, IosDevicesArgs, TargetArgs};
use crate::output::columns;

pub async fn run(ctx: &Context, command: IosCommand) -> Result<()> {
    match command {
        IosCommand::Devices(IosDevicesArgs {
            start: Some(selector),
            ..
        }) => simulator_power(ctx, &selector, true).await,
        IosCommand::Devices(IosDevicesArgs {
            shutdown: Some(selector),
            ..
        }) => simulator_power(ctx, &selector, false).await,
        IosCommand::Devices(IosDevicesArgs {
            list_runtimes: true,
            ..
        }) => list_runtimes(ctx).await,
        IosCommand::Devices(_) => list_devices(ctx).await,
        IosCommand::Flavors(args) => flavors::run(ctx, Platform::Ios, args),
        IosCommand::Build(args) => build(ctx, args).await,
        IosCommand::Run(args) => run_on_device(ctx, args).await,
    }
}

async fn list_devices(ctx: &Context) -> Result<()> {
    let discovery = ctx.directory().discover(Platform::Ios).await?;
    if ctx.output.is_json() {
        return ctx.output.json(&discovery);
    }
    devices::show_discovery(ctx, &discovery);
    if discovery.devices.iter().any(|d| d.needs_boot()) {
        ctx.output.hint("Shut down simulators are booted automatically by `flow ios run`");
    }
    Ok(())
}

/// Boot (`start`) or shut down a simulator picked by id or name
async fn simulator_power(ctx: &Context, selector: &str, start: bool) -> Result<()> {
    let discovery = ctx.directory().discover(Platform::Ios).await?;
    ctx.show_discovery_warnings(&discovery);

    let device = select_device(&discovery.devices, Platform::Ios, Some(selector))?;
    if device.kind != DeviceKind::Simulator {
        return Err(Error::config(format!("{} is not a simulator", device.label())));
    }

    let already = if start { device.is_available() } else { !device.is_available() };
    if already {
        let state = if start { "already running" } else { "not running" };
        ctx.output.warning(&format!("{} is {}", device.label(), state));
        if ctx.output.is_json() {
            return ctx.output.json(&serde_json::json!({ "device": device, "changed": false }));
        }
        return Ok(());
    }

    let action = if start { Action::StartSimulator } else { Action::ShutdownSimulator };
    let target = ResolvedTarget {
        flavor: None,
        device: Some(device),
        platform: Some(Platform::Ios),
        action,
    };
    // Works outside a Flutter project
    let report = dispatch_target(ctx, &std::env::current_dir()?, target).await?;

    if ctx.output.is_json() {
        return ctx.output.json(&report);
    }
    let verb = if start { "booted" } else { "shut down" };
    if let Some(device) = &report.target.device {
        ctx.output.success(&format!("{} {}", device.name, verb));
    }
    Ok(())
}

async fn list_runtimes(ctx: &Context) -> Result<()> {
    let runtimes = ctx.directory().ios_runtimes().await?;
    if ctx.output.is_json() {
        return ctx.output.json(&serde_json::json!({ "runtimes": runtimes }));
    }
    show_runtimes(ctx, &runtimes);
    Ok(())
}

fn show_runtimes(ctx: &Context, runtimes: &[SimRuntime]) {
    ctx.output.heading("iOS runtimes");
    if runtimes.is_empty() {
        ctx.output.line("  none installed");
        return;
    }
    let rows: Vec<Vec<String>> = runtimes
        .iter()
        .map(|runtime| {
            vec![
                runtime.name.clone(),
                runtime.build.clone().unwrap_or_default(),
                (if runtime.available { "available" } else { "unavailable" }).to_string(),
            ]
        })
        .collect();
    for line in columns(&rows) {
        ctx.output.line(&format!("  {}", line));
    }
}

async fn build(ctx: &Context, args: IosBuildArgs) -> Result<()> {
    let (project, registry) = ctx.project_with_flavors()?;
    let format: BuildFormat = args.format.into();
    let target = ResolvedTarget {
        flavor: ctx.resolver(&registry).resolve_flavor(args.flavor.as_deref())?,
        device: None,
        platform: Some(Platform::Ios),
        action: Action::Build {
            mode: args.mode.into(),
            format,
            no_codesign: args.no_codesign,
        },
    };

    let report = dispatch_target(ctx, &project.root, target).await?;
    if ctx.output.is_json() {
        return ctx.output.json(&report);
    }

    if format == BuildFormat::Ipa {
        for ipa in artifacts::ios_artifacts(&project.root) {
            ctx.output.success(&format!(
                "Built {} ({})",
                ipa.path.display(),
                artifacts::format_size(ipa.size_bytes)
            ));
        }
    } else {
        ctx.output.success("iOS build finished");
    }
    Ok(())
}

async fn run_on_device(ctx: &Context, args: TargetArgs) -> Result<()> {
    let (project, registry) = ctx.project_with_flavors()?;
    let resolver = ctx.resolver(&registry);
    resolver.resolve_flavor(args.flavor.as_deref())?;

    let discovery = ctx.directory().discover(Platform::Ios).await?;
    ctx.show_discovery_warnings(&discovery);

    let target = resolver.resolve(
        TargetRequest {
            platform: Some(Platform::Ios),
            flavor: args.flavor,
            device: args.device,
            action: Action::Run {
                mode: args.mode.into(),
            },
        },
        &discovery.devices,
    )?;

    let report = dispatch_target(ctx, &project.root, target).await?;
    if ctx.output.is_json() {
        ctx.output.json(&report)?;
    }
    Ok(())
}
