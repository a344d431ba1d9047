use clap::Args;

use kickoff::error::Error;
use kickoff::executor::SystemRunner;
use kickoff::prompt::TerminalPrompter;
use kickoff::workflows::golive::{self, GoLiveReport};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct GoLiveArgs {}

pub fn run(_args: GoLiveArgs, global: &GlobalArgs) -> CmdResult<GoLiveReport> {
    let prompter = TerminalPrompter::new();
    if !prompter.is_interactive() {
        return Err(Error::validation_invalid_argument(
            "tty",
            "go-live asks for production credentials and needs an interactive terminal",
            None,
        ));
    }

    let ctx = global.context()?;
    let report = golive::run(&ctx, &SystemRunner, &prompter)?;
    Ok((report, 0))
}
