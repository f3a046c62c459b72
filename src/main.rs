//! Flow - flavor-aware companion for Flutter Android and iOS projects
//!
//! This is the binary entry point. All logic lives in the library.

use std::process::ExitCode;

use clap::Parser;
use flow_app::config::{config_path, load_config_reporting};
use flow_cli::cli::{Cli, Command};
use flow_cli::commands::{self, Context};
use flow_cli::output::{color_enabled, Output};
use flow_core::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error reporter: {}", e);
    }

    let path = config_path();
    let (config, config_error) = load_config_reporting(&path);

    if let Err(e) = logging::init(cli.verbose || config.general.verbose_output) {
        eprintln!("warning: logging disabled: {}", e);
    }
    info!("flow {} starting", env!("CARGO_PKG_VERSION"));

    let output = Output::new(cli.json, color_enabled(config.general.color_output));
    // `flow config` reports the parse error itself
    if let Some(e) = &config_error {
        if !matches!(cli.command, Command::Config(_)) {
            output.warning(&format!("{}\nUsing default settings; run `flow doctor` for details", e));
        }
    }
    let ctx = Context::new(output, config, path);

    match commands::run(cli, ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            output.error(&e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
