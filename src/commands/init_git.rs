use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::workflows::init_git;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct InitGitArgs {}

pub fn run(_args: InitGitArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    WorkflowOutput::ok("init-git", init_git::run(&ctx, &SystemRunner)?)
}
