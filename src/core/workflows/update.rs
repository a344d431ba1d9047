//! `update` (alias `sync`): pull upstream package changes into a dev site.

use crate::context::ProjectContext;
use crate::drift;
use crate::error::Result;
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};

use super::{composer, drush, manifest, sites_path};

pub fn gates(ctx: &ProjectContext) -> Vec<Gate> {
    let update = &ctx.config().update;
    vec![
        Gate::dev(),
        Gate::dir_exists(
            sites_path(ctx, "files"),
            "The \"files\" storage directory was not found. Run install first.",
        ),
        Gate::file_exists(&update.manifest, "The package manifest is missing."),
        Gate::file_exists(
            &update.upstream_manifest,
            "The upstream package manifest is missing.",
        ),
    ]
}

pub fn run(ctx: &ProjectContext, runner: &dyn CommandRunner) -> Result<PipelineReport> {
    guard::check_all(ctx, &gates(ctx))?;

    let repo = drift::check_repo_drift(runner, ctx)?;
    drift::ensure_pushable(&repo)?;

    let update = &ctx.config().update;
    let project_manifest = ctx.path(&update.manifest);
    let upstream_manifest = ctx.path(&update.upstream_manifest);

    PipelineRun::new("update")
        .step(Step::action("merge-manifest", || {
            manifest::merge_files(&project_manifest, &upstream_manifest, &update.merge_sections)
                .map(|_| ())
        }))
        .step(Step::command(
            "composer-update",
            composer(ctx, ["update", "--no-interaction"]),
        ))
        .step(Step::command("update-database", drush(ctx, ["updatedb", "-y"])))
        .step(Step::command("config-export", drush(ctx, ["config:export", "-y"])))
        .step(Step::command("cache-rebuild", drush(ctx, ["cache:rebuild"])))
        .run(runner)
        .map(|report| report.conclude("Updated from upstream. Review the changes, then push."))
}
