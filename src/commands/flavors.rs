//! `android flavors` / `ios flavors`

use flow_app::artifacts::{self, Artifact};
use flow_app::flavors::AssetStatus;
use flow_app::{Flavor, FlavorRegistry};
use flow_core::prelude::*;
use flow_core::{ConfigIssue, Platform};
use serde::Serialize;

use super::Context;
use crate::cli::FlavorsArgs;
use crate::output::columns;

#[derive(Debug, Serialize)]
struct FlavorView<'a> {
    #[serde(flatten)]
    flavor: &'a Flavor,
    package_id: &'a str,
    status: AssetStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Serialize)]
struct FlavorsDocument<'a> {
    platform: Platform,
    flavors: Vec<FlavorView<'a>>,
    issues: Vec<ConfigIssue>,
}

fn view<'a>(flavor: &'a Flavor, platform: Platform, root: &std::path::Path) -> FlavorView<'a> {
    let artifacts = match platform {
        Platform::Android => artifacts::android_artifacts(root, Some(&flavor.name)),
        Platform::Ios => Vec::new(),
    };
    FlavorView {
        flavor,
        package_id: flavor.package_id(platform),
        status: flavor.assets.status(),
        artifacts,
    }
}

pub fn run(ctx: &Context, platform: Platform, args: FlavorsArgs) -> Result<()> {
    let project = ctx.project()?;
    let registry = FlavorRegistry::load(&project.root)?;

    let views: Vec<FlavorView<'_>> = match &args.flavor {
        Some(name) => vec![view(registry.get(name)?, platform, &project.root)],
        None => registry
            .flavors()
            .map(|flavor| view(flavor, platform, &project.root))
            .collect(),
    };
    let issues = match &args.flavor {
        Some(_) => Vec::new(),
        None => registry.issues(),
    };

    if ctx.output.is_json() {
        return ctx.output.json(&FlavorsDocument {
            platform,
            flavors: views,
            issues,
        });
    }

    if views.is_empty() && issues.is_empty() {
        ctx.output.line("No flavors found under assets/configs");
        return Ok(());
    }

    if args.flavor.is_some() {
        for view in &views {
            show_detail(ctx, view);
        }
        return Ok(());
    }

    ctx.output.heading(&format!("{} flavors", platform));
    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            vec![
                v.flavor.name.clone(),
                v.flavor.app_name.clone().unwrap_or_else(|| "-".to_string()),
                v.package_id.to_string(),
                v.status.to_string(),
            ]
        })
        .collect();
    for line in columns(&rows) {
        ctx.output.line(&format!("  {}", line));
    }
    for issue in &issues {
        ctx.output.warning(&format!("Invalid flavor {}", issue));
    }
    Ok(())
}

fn show_detail(ctx: &Context, view: &FlavorView<'_>) {
    let flavor = view.flavor;
    ctx.output.heading(&flavor.name);
    ctx.output.line(&format!(
        "  App name:    {}",
        flavor.app_name.as_deref().unwrap_or("-")
    ));
    ctx.output.line(&format!("  Package id:  {}", view.package_id));
    if let Some(color) = &flavor.main_color {
        ctx.output.line(&format!("  Main color:  {}", color));
    }
    ctx.output.line(&format!("  Assets:      {}", view.status));
    if view.status == AssetStatus::Partial {
        let missing: Vec<&str> = [
            ("icon.png", flavor.assets.icon.is_none()),
            ("splash.png", flavor.assets.splash.is_none()),
        ]
        .into_iter()
        .filter_map(|(file, missing)| missing.then_some(file))
        .collect();
        ctx.output.hint(&format!("missing {}", missing.join(", ")));
    }
    for (key, value) in &flavor.overrides {
        ctx.output.line(&format!("  {}: {}", key, value));
    }
    for artifact in &view.artifacts {
        ctx.output.line(&format!(
            "  {} {}  {}",
            artifact.kind,
            artifacts::format_size(artifact.size_bytes),
            artifact.path.display()
        ));
    }
}
