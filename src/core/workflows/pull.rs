//! `pull`: bring code and configuration from the repository into this site.

use crate::context::ProjectContext;
use crate::drift;
use crate::error::{Error, Result};
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};
use crate::prompt::Prompter;

use super::{composer, drush, git};

pub fn steps(ctx: &ProjectContext) -> Vec<Step<'static>> {
    let git_config = &ctx.config().git;
    vec![
        Step::command(
            "maintenance-on",
            drush(ctx, ["state:set", "system.maintenance_mode", "1"]),
        ),
        Step::command(
            "git-pull",
            git(ctx, ["pull", git_config.remote.as_str(), git_config.branch.as_str()]),
        ),
        Step::command(
            "git-clean",
            git(ctx, ["clean", "-fd", git_config.sync_dir.as_str()]),
        ),
        Step::command(
            "composer-install",
            composer(ctx, ["install", "--no-dev", "--prefer-dist"]),
        ),
        Step::command("deploy", drush(ctx, ["deploy"])),
        Step::command(
            "maintenance-off",
            drush(ctx, ["state:set", "system.maintenance_mode", "0"]),
        ),
    ]
}

pub fn run(
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
) -> Result<PipelineReport> {
    guard::check_all(ctx, &[Gate::any_project_dir()])?;

    let repo = drift::check_repo_drift(runner, ctx)?;
    drift::ensure_pullable(&repo)?;

    let mut run = PipelineRun::new("pull").steps(steps(ctx));

    let config = drift::check_config_drift(runner, ctx)?;
    if !config.is_clean() {
        if let Some(detail) = &config.detail {
            prompter.show(detail);
        }
        let proceed = prompter.confirm(
            "There are config changes between DB and sync directory. If you continue you'll lose changes in active config. Continue?",
            false,
        )?;
        if !proceed {
            return Err(Error::drift_conflict(
                "Aborted due to changes in active config.",
                config.status.as_str(),
                config.detail.clone(),
            ));
        }
        run.say("Operator accepted discarding active config changes.");
    }

    run.run(runner)
        .map(|report| report.conclude("Pulled everything from origin repository."))
}
