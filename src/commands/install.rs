use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::workflows::install;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct InstallArgs {}

pub fn run(_args: InstallArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    WorkflowOutput::ok("install", install::run(&ctx, &SystemRunner)?)
}
