//! `init-git`: connect an installed dev site to its repository.

use crate::context::ProjectContext;
use crate::error::Result;
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};
use crate::utils::template::{self, TemplateVars};

use super::{drush, git, sites_path};

pub fn gates(ctx: &ProjectContext) -> Vec<Gate> {
    vec![
        Gate::dev(),
        Gate::dir_exists(
            sites_path(ctx, "files"),
            "The \"files\" storage directory was not found. Run install first.",
        ),
        Gate::dir_absent(".git", "A git repository already exists in this project."),
    ]
}

/// Repository URL with the project name filled in.
pub fn repository_url(ctx: &ProjectContext) -> Result<String> {
    Ok(template::render(
        &ctx.config().git.repository,
        &[(TemplateVars::PROJECT, ctx.project_name()?)],
    ))
}

pub fn run(ctx: &ProjectContext, runner: &dyn CommandRunner) -> Result<PipelineReport> {
    guard::check_all(ctx, &gates(ctx))?;

    let git_config = &ctx.config().git;
    let url = repository_url(ctx)?;

    PipelineRun::new("init-git")
        .step(Step::command("git-init", git(ctx, ["init"])))
        .step(Step::command(
            "add-remote",
            git(ctx, ["remote", "add", git_config.remote.as_str(), url.as_str()]),
        ))
        .step(Step::command(
            "initial-commit",
            drush(
                ctx,
                ["config:export", "-y", "--commit", "--message=Initial commit"],
            ),
        ))
        .step(Step::command(
            "git-push",
            git(ctx, ["push", git_config.remote.as_str(), git_config.branch.as_str()]),
        ))
        .run(runner)
        .map(|report| report.conclude(format!("Initial commit pushed to {}.", url)))
}
