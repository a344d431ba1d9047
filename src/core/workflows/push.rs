//! `push`: export configuration, commit and push.

use chrono::{DateTime, Local};

use crate::context::ProjectContext;
use crate::drift;
use crate::error::Result;
use crate::executor::CommandRunner;
use crate::guard::{self, Gate};
use crate::pipeline::{PipelineReport, PipelineRun, Step};
use crate::prompt::Prompter;
use crate::utils::validation;

use super::{drush, git};

/// Message used when none is given: `Sync from <ENV> on <timestamp>`.
pub fn default_message(env: Option<&str>, now: DateTime<Local>) -> Option<String> {
    env.filter(|e| !e.trim().is_empty()).map(|env| {
        format!(
            "Sync from {} on {}",
            env,
            now.format("%Y-%m-%d %H:%M:%S")
        )
    })
}

pub fn steps(ctx: &ProjectContext, message: &str) -> Vec<Step<'static>> {
    let git_config = &ctx.config().git;
    vec![
        Step::command(
            "config-export",
            drush(
                ctx,
                [
                    "config:export".to_string(),
                    "-y".to_string(),
                    "--commit".to_string(),
                    format!("--message={}", message),
                ],
            ),
        ),
        Step::command(
            "git-push",
            git(ctx, ["push", git_config.remote.as_str(), git_config.branch.as_str()]),
        ),
    ]
}

/// Drift check plus the push pipeline, with a message already decided.
pub fn push_with_message(
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    message: &str,
) -> Result<PipelineReport> {
    let report = drift::check_repo_drift(runner, ctx)?;
    drift::ensure_pushable(&report)?;
    execute(ctx, runner, message)
}

fn execute(
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    message: &str,
) -> Result<PipelineReport> {
    PipelineRun::new("push")
        .steps(steps(ctx, message))
        .run(runner)
        .map(|report| report.conclude("Pushed to origin repository."))
}

pub fn run(
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    prompter: &dyn Prompter,
    message: Option<&str>,
) -> Result<PipelineReport> {
    guard::check_all(ctx, &[Gate::any_project_dir()])?;

    let report = drift::check_repo_drift(runner, ctx)?;
    drift::ensure_pushable(&report)?;

    let message = match message.filter(|m| !m.trim().is_empty()) {
        Some(message) => message.to_string(),
        None => match default_message(ctx.setting("ENV"), Local::now()) {
            Some(message) => message,
            None => {
                let answer = prompter.ask("Commit message", None)?;
                validation::require_non_empty(&answer, "message", "Commit message is required")?
                    .to_string()
            }
        },
    };

    execute(ctx, runner, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_message_uses_env_and_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            default_message(Some("dev1"), now).as_deref(),
            Some("Sync from dev1 on 2024-03-05 14:07:09")
        );
        assert_eq!(default_message(Some(" "), now), None);
        assert_eq!(default_message(None, now), None);
    }
}
