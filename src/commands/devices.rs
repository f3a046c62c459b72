//! Device listings

use flow_core::prelude::*;
use flow_core::{Device, Platform};
use flow_tools::Discovery;
use serde_json::{json, Value};

use super::Context;
use crate::output::columns;

fn device_rows(devices: &[Device]) -> Vec<Vec<String>> {
    devices
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.id.clone(),
                d.kind.to_string(),
                d.readiness.to_string(),
                d.os_version.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

/// Print one platform's devices in text mode
pub fn show_discovery(ctx: &Context, discovery: &Discovery) {
    ctx.show_discovery_warnings(discovery);
    if discovery.devices.is_empty() {
        ctx.output.line(&format!("No {} devices found", discovery.platform));
        return;
    }

    ctx.output.heading(&format!(
        "{} devices ({} available)",
        discovery.platform,
        discovery.available().count()
    ));
    for line in columns(&device_rows(&discovery.devices)) {
        ctx.output.line(&format!("  {}", line));
    }
}

fn as_document(result: &Result<Discovery>) -> Value {
    match result {
        Ok(discovery) => json!(discovery),
        Err(e) => json!({ "error": { "kind": e.kind(), "message": e.to_string() } }),
    }
}

/// `flow devices`: both platforms, discovered concurrently
pub async fn run(ctx: &Context) -> Result<()> {
    let (android, ios) = match ctx.directory().discover_all().await {
        (Err(e), Err(ios_error)) => {
            warn!("iOS discovery failed too: {}", ios_error);
            return Err(e);
        }
        results => results,
    };

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "android": as_document(&android),
            "ios": as_document(&ios),
        }))?;
    } else {
        for (platform, result) in [(Platform::Android, &android), (Platform::Ios, &ios)] {
            match result {
                Ok(discovery) => show_discovery(ctx, discovery),
                Err(e) => ctx.output.warning(&format!("{}: {}", platform, e)),
            }
        }
    }
    Ok(())
}
