//! Precondition gates evaluated before a workflow's first step.

use crate::context::ProjectContext;
use crate::environment::EnvironmentTier;
use crate::error::{Error, Result};

/// One predicate over the project context and the filesystem.
///
/// Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Tier(Vec<EnvironmentTier>),
    FileExists { path: String, reason: String },
    FileAbsent { path: String, reason: String },
    DirExists { path: String, reason: String },
    DirAbsent { path: String, reason: String },
    SettingsUnset { keys: Vec<String>, reason: String },
}

impl Gate {
    pub fn dev() -> Self {
        Gate::Tier(vec![EnvironmentTier::Dev])
    }

    pub fn any_project_dir() -> Self {
        Gate::Tier(vec![EnvironmentTier::Dev, EnvironmentTier::Prod])
    }

    pub fn file_exists(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Gate::FileExists {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn file_absent(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Gate::FileAbsent {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn dir_exists(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Gate::DirExists {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn dir_absent(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Gate::DirAbsent {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn settings_unset(keys: &[&str], reason: impl Into<String>) -> Self {
        Gate::SettingsUnset {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            reason: reason.into(),
        }
    }

    /// Short identifier used in error details.
    pub fn name(&self) -> String {
        match self {
            Gate::Tier(_) => "tier".to_string(),
            Gate::FileExists { path, .. } => format!("file_exists:{}", path),
            Gate::FileAbsent { path, .. } => format!("file_absent:{}", path),
            Gate::DirExists { path, .. } => format!("dir_exists:{}", path),
            Gate::DirAbsent { path, .. } => format!("dir_absent:{}", path),
            Gate::SettingsUnset { keys, .. } => format!("settings_unset:{}", keys.join(",")),
        }
    }

    pub fn check(&self, ctx: &ProjectContext) -> Result<()> {
        let (passed, reason) = match self {
            Gate::Tier(allowed) => return ctx.classification().ensure(allowed),
            Gate::FileExists { path, reason } => (ctx.path(path).is_file(), reason),
            Gate::FileAbsent { path, reason } => (!ctx.path(path).exists(), reason),
            Gate::DirExists { path, reason } => (ctx.path(path).is_dir(), reason),
            Gate::DirAbsent { path, reason } => (!ctx.path(path).exists(), reason),
            Gate::SettingsUnset { keys, reason } => {
                (keys.iter().all(|k| ctx.setting(k).is_none()), reason)
            }
        };

        if passed {
            return Ok(());
        }

        let name = self.name();
        log_status!("guard", "Gate {} failed", name);
        Err(Error::precondition_violation(name, reason.clone()))
    }
}

/// Check every gate in order; the first failure is returned.
pub fn check_all(ctx: &ProjectContext, gates: &[Gate]) -> Result<()> {
    for gate in gates {
        gate.check(ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KickoffConfig;
    use std::fs;
    use tempfile::TempDir;

    const DEV_PATH: &str = "/var/www/vhosts/dev1.webtourismus.at/demo.dev1.webtourismus.at";

    fn ctx(dir: &TempDir, logical: &str) -> ProjectContext {
        ProjectContext::for_root(dir.path(), logical, "dev1", KickoffConfig::default()).unwrap()
    }

    #[test]
    fn file_gates_probe_relative_to_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "A=1\n").unwrap();
        let ctx = ctx(&dir, DEV_PATH);

        assert!(Gate::file_exists(".env", "needs .env").check(&ctx).is_ok());
        let err = Gate::file_absent(".env", "already initialized")
            .check(&ctx)
            .unwrap_err();
        assert_eq!(err.code.as_str(), "precondition.violation");
        assert_eq!(err.message, "already initialized");
        assert_eq!(err.details["gate"], "file_absent:.env");
    }

    #[test]
    fn dir_gates_distinguish_files_from_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("files"), "").unwrap();
        let ctx = ctx(&dir, DEV_PATH);

        assert!(Gate::dir_exists("files", "r").check(&ctx).is_err());
        assert!(Gate::dir_absent("files", "r").check(&ctx).is_err());
        assert!(Gate::dir_absent("other", "r").check(&ctx).is_ok());
    }

    #[test]
    fn settings_unset_checks_every_key() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "DB_NAME=\"dev1_demo\"\n").unwrap();
        let ctx = ctx(&dir, DEV_PATH);

        assert!(Gate::settings_unset(&["PROJECT_NAME"], "r").check(&ctx).is_ok());
        assert!(Gate::settings_unset(&["PROJECT_NAME", "DB_NAME"], "r")
            .check(&ctx)
            .is_err());
    }

    #[test]
    fn check_all_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir, "/home/someone/src");

        let err = check_all(
            &ctx,
            &[
                Gate::dev(),
                Gate::file_exists(".env", "missing settings"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.details["gate"], "tier");
    }

    #[test]
    fn check_all_passes_when_every_gate_passes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        let ctx = ctx(&dir, DEV_PATH);

        assert!(check_all(
            &ctx,
            &[
                Gate::any_project_dir(),
                Gate::dir_exists("web", "r"),
                Gate::file_absent(".git", "r"),
            ],
        )
        .is_ok());
    }
}
