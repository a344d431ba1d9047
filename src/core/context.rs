//! Per-run project context.
//!
//! [`ProjectContext::detect`] is the only place that reads the process
//! environment (working directory, `PWD`, hostname, config env var). Every
//! other component receives the resulting value.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, KickoffConfig};
use crate::environment::{Classification, Classifier, EnvironmentTier};
use crate::error::{Error, Result};
use crate::settings::{Settings, SettingsFile};

#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    logical_root: PathBuf,
    hostname: String,
    classification: Classification,
    settings_file: SettingsFile,
    settings: Settings,
    shared_settings: Settings,
    config: KickoffConfig,
}

/// Serializable view for the `context` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub root: String,
    pub logical_root: String,
    pub hostname: String,
    pub tier: EnvironmentTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub settings_file: String,
    pub settings_present: bool,
    pub settings_keys: Vec<String>,
    pub shared_keys: Vec<String>,
}

impl ProjectContext {
    /// Build the context for the current process.
    pub fn detect(config_path: Option<&Path>) -> Result<Self> {
        let root = std::env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("read current directory".to_string()))
        })?;

        let logical_root = std::env::var("PWD")
            .ok()
            .map(PathBuf::from)
            .filter(|pwd| pwd.is_absolute() && same_directory(pwd, &root))
            .unwrap_or_else(|| root.clone());

        let env_config = std::env::var(config::CONFIG_ENV_VAR).ok();
        let config = match config::resolve_path(config_path, env_config.as_deref(), &root) {
            Some(path) => {
                log_status!("config", "Using {}", path.display());
                KickoffConfig::load(Some(&path))?
            }
            None => KickoffConfig::default(),
        };

        Self::for_root(root, logical_root, local_hostname(), config)
    }

    /// Build a context from explicit inputs.
    pub fn for_root(
        root: impl Into<PathBuf>,
        logical_root: impl Into<PathBuf>,
        hostname: impl Into<String>,
        config: KickoffConfig,
    ) -> Result<Self> {
        let root = root.into();
        let logical_root = logical_root.into();
        let hostname = hostname.into();

        let mut candidates = vec![logical_root.clone()];
        if root != logical_root {
            candidates.push(root.clone());
        }

        let classification = Classifier::new(&config.tiers)?.detect(&candidates, &hostname)?;
        log_status!(
            "context",
            "{} on {} classified as {}",
            logical_root.display(),
            hostname,
            classification.tier
        );

        let settings_file = SettingsFile::new(root.join(&config.settings.project_file));
        let settings = settings_file.read_all()?;
        let shared_settings =
            SettingsFile::new(root.join(&config.settings.shared_file)).read_all()?;

        Ok(Self {
            root,
            logical_root,
            hostname,
            classification,
            settings_file,
            settings,
            shared_settings,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn tier(&self) -> EnvironmentTier {
        self.classification.tier
    }

    pub fn config(&self) -> &KickoffConfig {
        &self.config
    }

    pub fn settings_file(&self) -> &SettingsFile {
        &self.settings_file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn shared_settings(&self) -> &Settings {
        &self.shared_settings
    }

    /// Project settings first, then the shared host settings. Blank values count as unset.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .non_empty(key)
            .or_else(|| self.shared_settings.non_empty(key))
    }

    /// Project name from the directory shape, falling back to `PROJECT_NAME`.
    pub fn project_name(&self) -> Result<&str> {
        self.classification
            .project
            .as_deref()
            .or_else(|| self.settings.non_empty("PROJECT_NAME"))
            .ok_or_else(|| {
                Error::precondition_violation(
                    "project_name",
                    "Could not determine the project name from the directory or PROJECT_NAME.",
                )
            })
    }

    pub fn family(&self) -> Option<&str> {
        self.classification.family.as_deref()
    }

    /// Resolve a path relative to the project root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// A new context carrying `settings` as its project snapshot.
    pub fn with_settings(&self, settings: Settings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            root: self.root.display().to_string(),
            logical_root: self.logical_root.display().to_string(),
            hostname: self.hostname.clone(),
            tier: self.classification.tier,
            project: self.classification.project.clone(),
            family: self.classification.family.clone(),
            settings_file: self.settings_file.path().display().to_string(),
            settings_present: self.settings_file.exists(),
            settings_keys: self.settings.keys().map(str::to_string).collect(),
            shared_keys: self.shared_settings.keys().map(str::to_string).collect(),
        }
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes for the duration of the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return String::new();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir, logical: &str) -> ProjectContext {
        ProjectContext::for_root(dir.path(), logical, "dev1", KickoffConfig::default()).unwrap()
    }

    #[test]
    fn classifies_through_logical_path() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(
            &dir,
            "/var/www/vhosts/dev1.webtourismus.at/demo.dev1.webtourismus.at",
        );
        assert_eq!(ctx.tier(), EnvironmentTier::Dev);
        assert_eq!(ctx.project_name().unwrap(), "demo");
        assert_eq!(ctx.family(), Some("dev1"));
    }

    #[test]
    fn project_settings_shadow_shared_settings() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("site");
        fs::create_dir(&project).unwrap();
        fs::write(dir.path().join(".env"), "ENV=\"dev1\"\nDB_HOST=\"db\"\n").unwrap();
        fs::write(project.join(".env"), "DB_HOST=\"localhost\"\nEMPTY=\"\"\n").unwrap();

        let ctx = ProjectContext::for_root(&project, &project, "h", KickoffConfig::default())
            .unwrap();
        assert_eq!(ctx.setting("DB_HOST"), Some("localhost"));
        assert_eq!(ctx.setting("ENV"), Some("dev1"));
        assert_eq!(ctx.setting("EMPTY"), None);
    }

    #[test]
    fn unknown_directory_has_no_project_name() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(&dir, "/home/someone/src");
        assert_eq!(ctx.tier(), EnvironmentTier::Unknown);
        assert!(ctx.project_name().is_err());
    }

    #[test]
    fn with_settings_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let ctx = context_in(&dir, "/home/someone/src");
        let next = ctx.with_settings(ctx.settings().with("PROJECT_NAME", "demo"));
        assert!(ctx.settings().is_empty());
        assert_eq!(next.setting("PROJECT_NAME"), Some("demo"));
        assert_eq!(next.project_name().unwrap(), "demo");
    }

    #[test]
    fn summary_lists_settings_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "PROJECT_NAME=\"demo\"\n").unwrap();
        let ctx = context_in(&dir, "/home/someone/src");
        let summary = ctx.summary();
        assert!(summary.settings_present);
        assert_eq!(summary.settings_keys, vec!["PROJECT_NAME".to_string()]);
    }
}
