//! Repository and configuration drift detection.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::context::ProjectContext;
use crate::error::{Error, Result, StepFailedDetails};
use crate::executor::{CommandOutput, CommandRunner, CommandSpec};

// Tracking sentence of `git status`, English and German
static TRACKING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(your|ihr) branch\b").unwrap());
static QUOTED_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*'").unwrap());
static AHEAD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(ahead|vor)\b").unwrap());
static BEHIND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(behind|hinter)\b").unwrap());
static DIVERGED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(diverged|divergiert)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    Clean,
    Ahead,
    Behind,
    Diverged,
    ConfigDirty,
}

impl DriftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::Clean => "clean",
            DriftStatus::Ahead => "ahead",
            DriftStatus::Behind => "behind",
            DriftStatus::Diverged => "diverged",
            DriftStatus::ConfigDirty => "config_dirty",
        }
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub status: DriftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.status == DriftStatus::Clean
    }
}

/// Classify `git status` output.
///
/// Only the branch-tracking lines are read. File lists and quoted ref names
/// never count as drift.
pub fn parse_repo_status(output: &str) -> DriftStatus {
    let tracking = tracking_sentence(output);
    let ahead = AHEAD_PATTERN.is_match(&tracking);
    let behind = BEHIND_PATTERN.is_match(&tracking);

    if DIVERGED_PATTERN.is_match(&tracking) || (ahead && behind) {
        DriftStatus::Diverged
    } else if behind {
        DriftStatus::Behind
    } else if ahead {
        DriftStatus::Ahead
    } else {
        DriftStatus::Clean
    }
}

fn tracking_sentence(output: &str) -> String {
    output
        .lines()
        .filter(|line| TRACKING_LINE.is_match(line))
        .map(|line| QUOTED_REF.replace_all(line, "''").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean iff the config-status output contains one of `clean_markers`.
pub fn parse_config_status(output: &str, clean_markers: &[String]) -> DriftReport {
    if clean_markers
        .iter()
        .any(|marker| !marker.is_empty() && output.contains(marker.as_str()))
    {
        DriftReport {
            status: DriftStatus::Clean,
            detail: None,
        }
    } else {
        DriftReport {
            status: DriftStatus::ConfigDirty,
            detail: Some(output.trim().to_string()),
        }
    }
}

/// Fetch from the remote and compare the local branch with it.
pub fn check_repo_drift(runner: &dyn CommandRunner, ctx: &ProjectContext) -> Result<DriftReport> {
    let git = &ctx.config().tools.git;

    let fetch = CommandSpec::new(git).arg("fetch").current_dir(ctx.root());
    let output = runner.run(&fetch);
    if !output.success {
        return Err(probe_failed("git-fetch", &fetch, &output));
    }

    let status = CommandSpec::new(git).arg("status").current_dir(ctx.root());
    let output = runner.capture(&status);
    if !output.success {
        return Err(probe_failed("git-status", &status, &output));
    }

    let report = DriftReport {
        status: parse_repo_status(&output.stdout),
        detail: Some(output.stdout.trim().to_string()).filter(|s| !s.is_empty()),
    };
    log_status!("drift", "Repository is {}", report.status);
    Ok(report)
}

/// Compare the active configuration with the exported sync directory.
pub fn check_config_drift(
    runner: &dyn CommandRunner,
    ctx: &ProjectContext,
) -> Result<DriftReport> {
    let spec = CommandSpec::new(&ctx.config().tools.drush)
        .arg("config:status")
        .current_dir(ctx.root());
    let output = runner.capture(&spec);
    if !output.success {
        return Err(probe_failed("config-status", &spec, &output));
    }

    let report = parse_config_status(&output.combined(), &ctx.config().drift.clean_markers);
    log_status!("drift", "Configuration is {}", report.status);
    Ok(report)
}

/// Pushing requires that nothing on the remote is missing locally.
pub fn ensure_pushable(report: &DriftReport) -> Result<()> {
    match report.status {
        DriftStatus::Behind | DriftStatus::Diverged => Err(Error::drift_conflict(
            format!(
                "Local branch is {} the remote. Pull before pushing.",
                describe(report.status)
            ),
            report.status.as_str(),
            report.detail.clone(),
        )),
        _ => Ok(()),
    }
}

/// Pulling requires that nothing local is missing on the remote.
pub fn ensure_pullable(report: &DriftReport) -> Result<()> {
    match report.status {
        DriftStatus::Ahead | DriftStatus::Diverged => Err(Error::drift_conflict(
            format!(
                "Local branch is {} the remote. Push before pulling.",
                describe(report.status)
            ),
            report.status.as_str(),
            report.detail.clone(),
        )),
        _ => Ok(()),
    }
}

fn describe(status: DriftStatus) -> &'static str {
    match status {
        DriftStatus::Ahead => "ahead of",
        DriftStatus::Behind => "behind",
        DriftStatus::Diverged => "diverged from",
        DriftStatus::Clean | DriftStatus::ConfigDirty => "in sync with",
    }
}

fn probe_failed(step: &str, spec: &CommandSpec, output: &CommandOutput) -> Error {
    Error::step_failed(StepFailedDetails {
        workflow: "drift".to_string(),
        step: step.to_string(),
        step_index: 0,
        completed_steps: Vec::new(),
        command: Some(spec.display()),
        exit_code: Some(output.exit_code),
        host: None,
        error: Some(output.error_text()).filter(|s| !s.is_empty()),
    })
}
