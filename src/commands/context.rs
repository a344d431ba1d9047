use clap::Args;
use serde::Serialize;

use kickoff::context::ContextSummary;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ContextArgs {}

#[derive(Debug, Serialize)]
pub struct ContextOutput {
    pub command: &'static str,
    #[serde(flatten)]
    pub context: ContextSummary,
}

pub fn run(_args: ContextArgs, global: &GlobalArgs) -> CmdResult<ContextOutput> {
    let ctx = global.context()?;
    Ok((
        ContextOutput {
            command: "context",
            context: ctx.summary(),
        },
        0,
    ))
}
