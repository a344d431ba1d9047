use clap::Args;

use kickoff::executor::SystemRunner;
use kickoff::workflows::init_dev;

use super::{CmdResult, GlobalArgs, WorkflowOutput};

#[derive(Args)]
pub struct InitDevArgs {}

pub fn run(_args: InitDevArgs, global: &GlobalArgs) -> CmdResult<WorkflowOutput> {
    let ctx = global.context()?;
    WorkflowOutput::ok("init-dev", init_dev::run(&ctx, &SystemRunner)?)
}
