//! `init-dev`: create the minimal settings for a fresh dev checkout.

use crate::context::ProjectContext;
use crate::error::{Error, Result};
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};
use crate::utils::io;

use super::sites_path;

pub fn gates(ctx: &ProjectContext) -> Vec<Gate> {
    let config = ctx.config();
    vec![
        Gate::dev(),
        Gate::file_exists(
            &config.install.scaffold_file,
            "This command can only be used by starterkit projects (scaffold file missing).",
        ),
        Gate::file_exists(
            &config.settings.shared_file,
            "This command can only be used by starterkit projects (shared settings file missing).",
        ),
        Gate::file_absent(
            &config.settings.project_file,
            "A project settings file already exists. Aborting.",
        ),
        Gate::settings_unset(
            &["PROJECT_NAME", "DB_NAME"],
            "Project specific settings detected. Aborting.",
        ),
        Gate::file_absent(
            sites_path(ctx, "settings.php"),
            "A \"settings.php\" file was found. Aborting.",
        ),
        Gate::file_exists(
            sites_path(ctx, "default.settings.php"),
            "\"default.settings.php\" is missing; run composer install first.",
        ),
    ]
}

pub fn run(ctx: &ProjectContext, runner: &dyn CommandRunner) -> Result<PipelineReport> {
    guard::check_all(ctx, &gates(ctx))?;

    let project = ctx.project_name()?.to_string();
    let family = ctx.family().ok_or_else(|| {
        Error::precondition_violation(
            "family",
            "Could not detect the dev family from the directory.",
        )
    })?;
    let db_name = format!("{}_{}", family, project);

    let template = ctx.path(&sites_path(ctx, "default.settings.php"));
    let settings_php = ctx.path(&sites_path(ctx, "settings.php"));

    PipelineRun::new("init-dev")
        .step(Step::action("write-settings", || {
            ctx.settings_file()
                .upsert_many(&[("PROJECT_NAME", project.as_str()), ("DB_NAME", db_name.as_str())])
                .map(|_| ())
        }))
        .step(Step::action("copy-settings-php", || {
            io::copy_file(&template, &settings_php, "copy default.settings.php")
        }))
        .run(runner)
        .map(|report| report.conclude("Created minimal env and settings file for dev system."))
}
