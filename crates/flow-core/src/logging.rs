//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/flow-cli/logs/` so that command
/// output on stdout stays clean (and parseable with `--json`).
/// Log level is controlled by the `FLOW_LOG` environment variable;
/// `verbose` raises the default from info to debug.
///
/// # Examples
/// ```bash
/// FLOW_LOG=debug flow android devices
/// FLOW_LOG=flow_tools=trace flow ios run
/// ```
pub fn init(verbose: bool) -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "flow.log");

    let default_filter = if verbose {
        "flow_cli=debug,flow_core=debug,flow_tools=debug,flow_app=debug,warn"
    } else {
        "flow_cli=info,flow_core=info,flow_tools=info,flow_app=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_env("FLOW_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("───────────────────────────────────────────────");
    tracing::info!("Flow CLI {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log directory: {}", log_dir.display());

    Ok(())
}

/// Get the log directory path
pub fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("flow-cli").join("logs")
}
