use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::prompt::TerminalPrompter;
use kickoff::workflows::push;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct PushArgs {
    /// Commit message (defaults to "Sync from <ENV> on <timestamp>")
    pub message: Option<String>,
}

pub fn run(args: PushArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    let report = push::run(
        &ctx,
        &SystemRunner,
        &TerminalPrompter::new(),
        args.message.as_deref(),
    )?;
    WorkflowOutput::ok("push", report)
}
