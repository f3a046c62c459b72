//! `flow deployment keystore|release|setup|status`

use flow_app::deployment::{
    bump_build_number, check_release_ready, deployment_status, keystore_options,
    prepare_keystore_output, validate_track,
};
use flow_app::fastlane::{write_fastlane_files, FastlaneSetup, PLAY_STORE_KEY};
use flow_app::{Action, ResolvedTarget};
use flow_core::prelude::*;
use flow_core::Platform;
use serde_json::json;

use super::{dispatch_target, Context};
use crate::cli::{DeploymentCommand, KeystoreArgs, ReleaseArgs, SetupArgs};
use crate::output::columns;

pub async fn run(ctx: &Context, command: DeploymentCommand) -> Result<()> {
    match command {
        DeploymentCommand::Keystore(args) => keystore(ctx, args).await,
        DeploymentCommand::Release(args) => release(ctx, args).await,
        DeploymentCommand::Setup(args) => setup(ctx, args).await,
        DeploymentCommand::Status => status(ctx),
    }
}

async fn keystore(ctx: &Context, args: KeystoreArgs) -> Result<()> {
    let project = ctx.project()?;
    let options = keystore_options(&project.root, args.alias, args.validity, args.output, args.dname);
    prepare_keystore_output(&options)?;

    let target = ResolvedTarget {
        flavor: None,
        device: None,
        platform: Some(Platform::Android),
        action: Action::Keystore(options.clone()),
    };
    let report = dispatch_target(ctx, &project.root, target).await?;

    if ctx.output.is_json() {
        return ctx.output.json(&report);
    }
    ctx.output.success(&format!("Keystore written to {}", options.output.display()));
    ctx.output.hint("Reference it from android/key.properties and keep it out of version control");
    Ok(())
}

async fn release(ctx: &Context, args: ReleaseArgs) -> Result<()> {
    validate_track(&args.track)?;
    let (project, registry) = ctx.project_with_flavors()?;
    let platform = args.platform.platform();
    for warning in check_release_ready(&project.root, platform, args.build_only)? {
        ctx.output.warning(&warning);
    }
    let flavor = ctx.resolver(&registry).resolve_flavor(args.flavor.as_deref())?;

    if !args.no_bump {
        match bump_build_number(&project.root)? {
            Some(version) => ctx.output.success(&format!("Version bumped to {}", version)),
            None => ctx.output.warning("pubspec.yaml has no version line; build number left as is"),
        }
    }

    let target = ResolvedTarget {
        flavor,
        device: None,
        platform,
        action: Action::Release {
            track: args.track,
            skip_tests: args.skip_tests,
            build_only: args.build_only,
        },
    };
    let report = dispatch_target(ctx, &project.root, target).await?;

    if ctx.output.is_json() {
        return ctx.output.json(&report);
    }
    if args.build_only {
        ctx.output.success("Release build finished");
    } else {
        ctx.output.success("Release uploaded");
    }
    Ok(())
}

async fn setup(ctx: &Context, args: SetupArgs) -> Result<()> {
    let project = ctx.project()?;
    let platforms = match args.platform.platform() {
        Some(platform) => vec![platform],
        None => Platform::ALL.to_vec(),
    };

    let mut setup = FastlaneSetup::new(&project, platforms);
    setup.force = args.force;
    setup.apple_id = args.apple_id;
    setup.team_id = args
        .team_id
        .or_else(|| Some(ctx.config.ios.team_id.clone()).filter(|id| !id.is_empty()));
    if let Some(app_id) = args.app_id {
        setup.app_id = app_id;
    }

    let written = write_fastlane_files(&project.root, &setup)?;
    for path in &written {
        let shown = path.strip_prefix(&project.root).unwrap_or(path);
        ctx.output.success(&format!("Wrote {}", shown.display()));
    }

    let report = if args.skip_install {
        None
    } else {
        let target = ResolvedTarget {
            flavor: None,
            device: None,
            platform: args.platform.platform(),
            action: Action::InstallGems,
        };
        Some(dispatch_target(ctx, &project.root, target).await?)
    };

    if ctx.output.is_json() {
        return ctx.output.json(&json!({
            "files": written,
            "app_id": setup.app_id,
            "install": report,
        }));
    }
    if setup.platforms.contains(&Platform::Android) {
        ctx.output.hint(&format!(
            "Put the Play Console service account key at {}",
            PLAY_STORE_KEY
        ));
    }
    if args.skip_install {
        ctx.output.hint("Run `bundle install` before the first release");
    }
    Ok(())
}

fn status(ctx: &Context) -> Result<()> {
    let project = ctx.project()?;
    let items = deployment_status(&project.root);

    if ctx.output.is_json() {
        return ctx.output.json(&json!({ "project": project.name, "status": items }));
    }

    ctx.output.heading(&format!("Deployment status for {}", project.name));
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            vec![
                item.component.clone(),
                ctx.output.status(item.status),
                item.detail.clone(),
            ]
        })
        .collect();
    for line in columns(&rows) {
        ctx.output.line(&format!("  {}", line));
    }
    Ok(())
}
