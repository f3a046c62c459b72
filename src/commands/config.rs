//! `flow config list|path|get|set|reset`

use flow_app::config::{
    get_value, load_config_strict, load_document, parse_assignment, reset_config, save_document,
    set_value,
};
use flow_core::prelude::*;
use serde_json::json;
use serde_yaml::Value;

use super::Context;
use crate::cli::ConfigCommand;

pub fn run(ctx: &Context, command: ConfigCommand) -> Result<()> {
    let path = &ctx.config_path;
    match command {
        ConfigCommand::List => {
            let config = load_config_strict(path)?;
            if ctx.output.is_json() {
                return ctx.output.json(&config);
            }
            ctx.output.line(serde_yaml::to_string(&config)?.trim_end());
            Ok(())
        }

        ConfigCommand::Path => {
            if ctx.output.is_json() {
                return ctx.output.json(&json!({ "path": path, "exists": path.exists() }));
            }
            ctx.output.line(&path.display().to_string());
            Ok(())
        }

        ConfigCommand::Get { key } => {
            let document = load_document(path)?;
            let value = get_value(&document, &key)
                .ok_or_else(|| Error::config(format!("Unknown key '{}'", key)))?;
            if ctx.output.is_json() {
                return ctx.output.json(&json!({ "key": key, "value": value }));
            }
            ctx.output.line(&render_value(value)?);
            Ok(())
        }

        ConfigCommand::Set { assignment } => {
            let (key, raw) = parse_assignment(&assignment)?;
            let mut document = load_document(path)?;
            set_value(&mut document, key, raw)?;
            save_document(path, &document)?;

            let value = get_value(&document, key).cloned().unwrap_or(Value::Null);
            if ctx.output.is_json() {
                return ctx.output.json(&json!({ "key": key, "value": value }));
            }
            ctx.output.success(&format!("{} = {}", key, render_value(&value)?));
            Ok(())
        }

        ConfigCommand::Reset => {
            let config = reset_config(path)?;
            if ctx.output.is_json() {
                return ctx.output.json(&config);
            }
            ctx.output.success(&format!("Restored defaults in {}", path.display()));
            Ok(())
        }
    }
}

/// Scalars print bare; sections print as YAML
fn render_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)?.trim_end().to_string(),
    })
}
