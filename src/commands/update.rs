use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::workflows::update;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct UpdateArgs {}

pub fn run(_args: UpdateArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    WorkflowOutput::ok("update", update::run(&ctx, &SystemRunner)?)
}
