use serde::Serialize;
use std::path::PathBuf;

use kickoff::context::ProjectContext;
use kickoff::pipeline::PipelineReport;

pub type CmdResult<T> = kickoff::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit config file (`--config`).
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn context(&self) -> kickoff::Result<ProjectContext> {
        ProjectContext::detect(self.config.as_deref())
    }
}

/// Result of a workflow that ran a single pipeline.
#[derive(Debug, Serialize)]
pub struct WorkflowOutput {
    pub command: &'static str,
    #[serde(flatten)]
    pub report: PipelineReport,
}

impl WorkflowOutput {
    pub fn ok(command: &'static str, report: PipelineReport) -> CmdResult<Self> {
        Ok((Self { command, report }, 0))
    }
}

pub mod context;
pub mod golive;
pub mod init_dev;
pub mod init_git;
pub mod install;
pub mod pull;
pub mod push;
pub mod update;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (kickoff::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::InitDev(args) => dispatch!(args, global, init_dev),
        crate::Commands::Install(args) => dispatch!(args, global, install),
        crate::Commands::InitGit(args) => dispatch!(args, global, init_git),
        crate::Commands::Push(args) => dispatch!(args, global, push),
        crate::Commands::Pull(args) => dispatch!(args, global, pull),
        crate::Commands::GoLive(args) => dispatch!(args, global, golive),
        crate::Commands::Update(args) => dispatch!(args, global, update),
        crate::Commands::Context(args) => dispatch!(args, global, context),
    }
}
