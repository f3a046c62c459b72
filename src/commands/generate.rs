//! `flow generate icons|splash|branding`

use flow_app::generate::{self, GenerateKind};
use flow_app::{Flavor, ResolvedTarget};
use flow_core::prelude::*;
use serde::Serialize;

use super::{dispatch_target, Context, DispatchReport};
use crate::cli::{GenerateArgs, GenerateCommand};

#[derive(Debug, Serialize)]
struct GenerateDocument {
    generated: Vec<DispatchReport>,
}

pub async fn run(ctx: &Context, command: GenerateCommand) -> Result<()> {
    let (kind, args) = match command {
        GenerateCommand::Icons(args) => (GenerateKind::Icons, args),
        GenerateCommand::Splash(args) => (GenerateKind::Splash, args),
        GenerateCommand::Branding(args) => (GenerateKind::Branding, args),
    };
    generate_assets(ctx, kind, args).await
}

async fn generate_assets(ctx: &Context, kind: GenerateKind, args: GenerateArgs) -> Result<()> {
    let (project, registry) = ctx.project_with_flavors()?;
    let platform = args.platform.platform();

    let flavors: Vec<Option<Flavor>> = if args.all_flavors {
        let all: Vec<Option<Flavor>> = registry.flavors().cloned().map(Some).collect();
        if all.is_empty() {
            return Err(Error::config("No valid flavors found under assets/configs"));
        }
        all
    } else {
        vec![ctx.resolver(&registry).resolve_flavor(args.flavor.as_deref())?]
    };

    let mut generated = Vec::with_capacity(flavors.len());
    for flavor in flavors {
        let action = generate::prepare(&project, flavor.as_ref(), kind, platform)?;
        let target = ResolvedTarget {
            flavor,
            device: None,
            platform,
            action,
        };
        let report = dispatch_target(ctx, &project.root, target).await?;
        ctx.output.success(&format!(
            "Generated {} for {}",
            report.target.action.name().trim_start_matches("generate "),
            report
                .target
                .flavor
                .as_ref()
                .map(|f| f.name.as_str())
                .unwrap_or("the app")
        ));
        generated.push(report);
    }

    if ctx.output.is_json() {
        ctx.output.json(&GenerateDocument { generated })?;
    }
    Ok(())
}
