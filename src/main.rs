use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{context, golive, init_dev, init_git, install, pull, push, update};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "kickoff")]
#[command(version = VERSION)]
#[command(about = "Lifecycle workflows for hosted website projects (dev setup, sync, go-live)")]
struct Cli {
    /// Config file (defaults to $KICKOFF_CONFIG, then ./kickoff.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the minimal settings for a fresh dev checkout
    InitDev(init_dev::InitDevArgs),
    /// Install the site from the exported configuration
    Install(install::InstallArgs),
    /// Create the git repository and push the initial commit
    InitGit(init_git::InitGitArgs),
    /// Export configuration, commit and push
    Push(push::PushArgs),
    /// Pull, rebuild dependencies and deploy configuration
    Pull(pull::PullArgs),
    /// Promote the dev project to a new production host
    GoLive(golive::GoLiveArgs),
    /// Merge upstream dependencies and update the site
    #[command(visible_alias = "sync")]
    Update(update::UpdateArgs),
    /// Show the detected environment for the current directory
    Context(context::ContextArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
