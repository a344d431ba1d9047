use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::prompt::TerminalPrompter;
use kickoff::workflows::pull;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct PullArgs {}

pub fn run(_args: PullArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    let report = pull::run(&ctx, &SystemRunner, &TerminalPrompter::new())?;
    WorkflowOutput::ok("pull", report)
}
