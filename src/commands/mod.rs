//! Command handlers
//!
//! Each handler loads what it needs fresh (project, flavors, devices),
//! resolves a target and hands a plan to the dispatcher. Nothing is cached
//! between invocations.

pub mod analyze;
pub mod android;
pub mod config;
pub mod deployment;
pub mod devices;
pub mod doctor;
pub mod flavors;
pub mod generate;
pub mod ios;

use std::path::{Path, PathBuf};

use flow_app::{
    dispatch, DispatchContext, FlavorRegistry, FlowConfig, ResolvedTarget, StepOutcome,
    TargetResolver,
};
use flow_core::prelude::*;
use flow_core::FlutterProject;
use flow_tools::{DeviceDirectory, Discovery, SystemRunner, ToolPaths};
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::output::Output;

/// Everything a handler needs for one invocation
pub struct Context {
    pub output: Output,
    pub config: FlowConfig,
    pub config_path: PathBuf,
    pub project_dir: Option<PathBuf>,
    pub runner: SystemRunner,
}

impl Context {
    pub fn new(output: Output, config: FlowConfig, config_path: PathBuf) -> Self {
        Self {
            output,
            config,
            config_path,
            project_dir: None,
            runner: SystemRunner,
        }
    }

    /// The Flutter project from `--project`, or the nearest one above the
    /// working directory
    pub fn project(&self) -> Result<FlutterProject> {
        let start = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let project = FlutterProject::find(&start)?;
        info!("Project: {} ({})", project.name, project.root.display());
        Ok(project)
    }

    /// Project plus its flavor registry; malformed flavors become warnings
    pub fn project_with_flavors(&self) -> Result<(FlutterProject, FlavorRegistry)> {
        let project = self.project()?;
        let registry = FlavorRegistry::load(&project.root)?;
        for issue in registry.issues() {
            self.output.warning(&format!("Invalid flavor {}", issue));
        }
        Ok((project, registry))
    }

    pub fn tools(&self) -> ToolPaths {
        self.config.tool_paths()
    }

    pub fn directory(&self) -> DeviceDirectory<'_, SystemRunner> {
        DeviceDirectory::new(&self.runner, self.tools()).with_timeout(self.config.discovery_timeout())
    }

    pub fn resolver<'a>(&self, registry: &'a FlavorRegistry) -> TargetResolver<'a> {
        TargetResolver::new(registry).with_default_flavor(self.config.default_flavor())
    }

    pub fn dispatch_context(&self, project_root: &Path) -> DispatchContext {
        DispatchContext {
            project_root: project_root.to_path_buf(),
            tools: self.tools(),
            auto_pub_get: self.config.general.auto_pub_get,
        }
    }

    pub fn show_discovery_warnings(&self, discovery: &Discovery) {
        for warning in &discovery.warnings {
            self.output.warning(warning);
        }
    }
}

/// Result document of a dispatched action
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub target: ResolvedTarget,
    pub steps: Vec<StepOutcome>,
}

/// Plan and run one resolved target, printing progress in text mode
pub async fn dispatch_target(
    ctx: &Context,
    project_root: &Path,
    target: ResolvedTarget,
) -> Result<DispatchReport> {
    let mut plan = dispatch::plan(&target, &ctx.dispatch_context(project_root))?;
    if ctx.output.is_json() {
        plan.keep_stdout_clean();
    }

    if let Some(flavor) = &target.flavor {
        ctx.output.line(&format!("Flavor: {}", flavor.name));
    }
    if let Some(device) = &target.device {
        ctx.output.line(&format!("Device: {}", device.label()));
    }

    let output = ctx.output;
    let steps = plan
        .execute_with(&ctx.runner, |index, total, step| {
            output.step(index, total, &step.label)
        })
        .await?;

    Ok(DispatchReport { target, steps })
}

/// Run the parsed command line
pub async fn run(cli: Cli, mut ctx: Context) -> Result<()> {
    ctx.project_dir = cli.project;

    match cli.command {
        Command::Doctor => doctor::run(&ctx).await,
        Command::Analyze(args) => analyze::run(&ctx, args).await,
        Command::Devices => devices::run(&ctx).await,
        Command::Android(command) => android::run(&ctx, command).await,
        Command::Ios(command) => ios::run(&ctx, command).await,
        Command::Generate(command) => generate::run(&ctx, command).await,
        Command::Deployment(command) => deployment::run(&ctx, command).await,
        Command::Config(command) => config::run(&ctx, command),
    }
}
