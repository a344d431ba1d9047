//! `install`: install the site from the exported configuration.

use crate::context::ProjectContext;
use crate::error::Result;
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};

use super::{chmod, drush, sites_path};

pub fn gates(ctx: &ProjectContext) -> Vec<Gate> {
    let config = ctx.config();
    let missing = "\"settings.php\" or the project settings file is missing. Run init-dev first.";
    vec![
        Gate::dev(),
        Gate::file_exists(&config.settings.project_file, missing),
        Gate::file_exists(sites_path(ctx, "settings.php"), missing),
        Gate::dir_absent(
            sites_path(ctx, "files"),
            "The \"files\" storage directory already exists. This project seems to be installed.",
        ),
    ]
}

pub fn steps(ctx: &ProjectContext) -> Result<Vec<Step<'static>>> {
    let project = ctx.project_name()?;
    let install = &ctx.config().install;
    let sites_dir = install.sites_dir.clone();

    let mut steps = vec![
        Step::command("make-writable", chmod(ctx, ["-R", "u+w", sites_dir.as_str()])),
        Step::command(
            "site-install",
            drush(
                ctx,
                [
                    "site:install".to_string(),
                    "--existing-config".to_string(),
                    format!("--site-name={}", project),
                    format!("--account-name={}", install.account_name),
                    format!("--account-mail={}", install.account_mail),
                    "--no-interaction".to_string(),
                ],
            ),
        ),
        Step::command(
            "make-writable-again",
            chmod(ctx, ["-R", "u+w", sites_dir.as_str()]),
        ),
        Step::command("cache-rebuild", drush(ctx, ["cache:rebuild"])),
        Step::command(
            "create-default-content",
            drush(ctx, ["maintenance:create-default-content", "-y"]),
        ),
    ];

    steps.extend(install.translations.iter().map(|t| {
        Step::command(
            format!("locale-import:{}", t.file),
            drush(ctx, ["locale:import", t.langcode.as_str(), t.file.as_str()]),
        )
    }));

    Ok(steps)
}

pub fn run(ctx: &ProjectContext, runner: &dyn CommandRunner) -> Result<PipelineReport> {
    guard::check_all(ctx, &gates(ctx))?;
    let project = ctx.project_name()?.to_string();

    PipelineRun::new("install")
        .steps(steps(ctx)?)
        .run(runner)
        .map(|report| report.conclude(format!("Site {} was created.", project)))
}
