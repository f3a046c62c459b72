//! `flow doctor`

use flow_app::doctor::{run_doctor, CheckStatus};
use flow_core::prelude::*;
use serde_json::json;

use super::Context;
use crate::output::columns;

pub async fn run(ctx: &Context) -> Result<()> {
    let report = run_doctor(&ctx.runner, &ctx.config, &ctx.config_path).await;

    if ctx.output.is_json() {
        return ctx.output.json(&json!({
            "healthy": report.is_healthy(),
            "config_path": ctx.config_path,
            "checks": report.checks,
        }));
    }

    ctx.output.heading("Flow doctor");
    let rows: Vec<Vec<String>> = report
        .checks
        .iter()
        .map(|check| vec![check.name.clone(), ctx.output.status(check.status), check.detail.clone()])
        .collect();
    for (line, check) in columns(&rows).iter().zip(&report.checks) {
        ctx.output.line(&format!("  {}", line));
        if let Some(hint) = &check.hint {
            ctx.output.hint(&format!("  {}", hint));
        }
    }

    ctx.output.line("");
    let problems = report.count(CheckStatus::Warning) + report.count(CheckStatus::Missing);
    if problems == 0 {
        ctx.output.success("Everything looks good");
    } else if report.is_healthy() {
        ctx.output.line(&format!("{} optional item(s) need attention", problems));
    } else {
        ctx.output.warning("Required tools are missing; builds will fail until they are installed");
    }
    Ok(())
}
