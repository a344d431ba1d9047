use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

/// File name looked up in the project root when no config path is given.
pub const CONFIG_FILE_NAME: &str = "kickoff.json";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "KICKOFF_CONFIG";

/// Root configuration structure for kickoff.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KickoffConfig {
    #[serde(default)]
    pub tiers: TiersConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub golive: GoLiveConfig,

    #[serde(default)]
    pub update: UpdateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default = "default_dev_tier")]
    pub dev: TierRule,

    #[serde(default = "default_prod_tier")]
    pub prod: TierRule,
}

/// Directory shapes (and optionally hosts) that identify one environment tier.
///
/// Patterns may define the named groups `project` and `family`. Each pair in
/// `matching_groups` must capture identical text for the pattern to match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierRule {
    pub path_patterns: Vec<String>,

    /// Glob patterns; empty means the tier is not restricted by hostname.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matching_groups: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_drush")]
    pub drush: String,
    #[serde(default = "default_composer")]
    pub composer: String,
    #[serde(default = "default_ssh")]
    pub ssh: String,
    #[serde(default = "default_rsync")]
    pub rsync: String,
    #[serde(default = "default_ssh_keyscan")]
    pub ssh_keyscan: String,
    #[serde(default = "default_chmod")]
    pub chmod: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Per-project settings file, relative to the project root.
    #[serde(default = "default_project_settings")]
    pub project_file: String,

    /// Settings shared by every project on the host, relative to the project root.
    #[serde(default = "default_shared_settings")]
    pub shared_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Repository URL; `{{project}}` is replaced with the project name.
    #[serde(default = "default_repository")]
    pub repository: String,
    /// Host whose key is registered on a fresh prod server before cloning.
    #[serde(default = "default_git_host")]
    pub host: String,
    #[serde(default = "default_sync_dir")]
    pub sync_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_account_name")]
    pub account_name: String,
    #[serde(default = "default_account_mail")]
    pub account_mail: String,
    #[serde(default = "default_sites_dir")]
    pub sites_dir: String,
    #[serde(default = "default_scaffold_file")]
    pub scaffold_file: String,
    #[serde(default = "default_translations")]
    pub translations: Vec<TranslationImport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationImport {
    pub langcode: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Any of these in the config-status output means active config is clean.
    #[serde(default = "default_clean_markers")]
    pub clean_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoLiveConfig {
    /// Project directory on the prod host, relative to the remote user's home.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
    #[serde(default = "default_staging_file")]
    pub staging_file: String,
    #[serde(default = "default_env_tag")]
    pub env_tag: String,
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    /// Hosting placeholders removed from `remote_dir` before cloning.
    #[serde(default = "default_placeholder_files")]
    pub placeholder_files: Vec<String>,
    #[serde(default = "default_path_additions")]
    pub path_additions: Vec<String>,
    #[serde(default = "default_rsync_excludes")]
    pub rsync_excludes: Vec<String>,
    /// Drush invocations that switch debug and cache-bypass settings back off.
    #[serde(default = "default_production_commands")]
    pub production_commands: Vec<Vec<String>>,
    #[serde(default = "default_dump_file")]
    pub dump_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Upstream package manifest, relative to the project root.
    #[serde(default = "default_upstream_manifest")]
    pub upstream_manifest: String,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Dotted paths of JSON objects merged from upstream.
    #[serde(default = "default_merge_sections")]
    pub merge_sections: Vec<String>,
}

// =============================================================================
// Default value functions (match the hosting layout)
// =============================================================================

fn default_dev_tier() -> TierRule {
    TierRule {
        path_patterns: vec![
            r"^/var/www/vhosts/(?P<family_host>(?P<family>[a-z0-9_-]+)\.webtourismus\.at)/(?P<project>[a-z0-9_-]+)\.(?P<family_host_ref>[a-z0-9_.-]+)/?$".to_string(),
        ],
        hostnames: Vec::new(),
        matching_groups: vec![["family_host".to_string(), "family_host_ref".to_string()]],
    }
}

fn default_prod_tier() -> TierRule {
    TierRule {
        path_patterns: vec![r"^/user/home/(?P<project>[a-z0-9_-]+)/public_html/?$".to_string()],
        hostnames: Vec::new(),
        matching_groups: Vec::new(),
    }
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            dev: default_dev_tier(),
            prod: default_prod_tier(),
        }
    }
}

fn default_git() -> String {
    "git".to_string()
}

fn default_drush() -> String {
    "./vendor/bin/drush".to_string()
}

fn default_composer() -> String {
    "./composer.phar".to_string()
}

fn default_ssh() -> String {
    "ssh".to_string()
}

fn default_rsync() -> String {
    "rsync".to_string()
}

fn default_ssh_keyscan() -> String {
    "ssh-keyscan".to_string()
}

fn default_chmod() -> String {
    "chmod".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            drush: default_drush(),
            composer: default_composer(),
            ssh: default_ssh(),
            rsync: default_rsync(),
            ssh_keyscan: default_ssh_keyscan(),
            chmod: default_chmod(),
        }
    }
}

fn default_project_settings() -> String {
    ".env".to_string()
}

fn default_shared_settings() -> String {
    "../.env".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            project_file: default_project_settings(),
            shared_file: default_shared_settings(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_repository() -> String {
    "git@bitbucket.org:webtourismus/{{project}}.git".to_string()
}

fn default_git_host() -> String {
    "bitbucket.org".to_string()
}

fn default_sync_dir() -> String {
    "config/sync".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            branch: default_branch(),
            repository: default_repository(),
            host: default_git_host(),
            sync_dir: default_sync_dir(),
        }
    }
}

fn default_account_name() -> String {
    "entwicklung".to_string()
}

fn default_account_mail() -> String {
    "entwicklung@webtourismus.at".to_string()
}

fn default_sites_dir() -> String {
    "web/sites/default".to_string()
}

fn default_scaffold_file() -> String {
    "private/scaffold/default.settings.php.append".to_string()
}

fn default_translations() -> Vec<TranslationImport> {
    [
        "modules/contrib/ebr/translations/ebr.de.po",
        "modules/contrib/gin_custom/translations/gin_custom.de.po",
        "modules/contrib/seasonal_paragraphs/translations/seasonal_paragraphs.de.po",
        "modules/custom/backend/translations/backend.de.po",
    ]
    .iter()
    .map(|file| TranslationImport {
        langcode: "de".to_string(),
        file: file.to_string(),
    })
    .collect()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            account_name: default_account_name(),
            account_mail: default_account_mail(),
            sites_dir: default_sites_dir(),
            scaffold_file: default_scaffold_file(),
            translations: default_translations(),
        }
    }
}

fn default_clean_markers() -> Vec<String> {
    vec!["No differences between DB and sync directory.".to_string()]
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            clean_markers: default_clean_markers(),
        }
    }
}

fn default_remote_dir() -> String {
    "public_html".to_string()
}

fn default_staging_file() -> String {
    ".env.prod".to_string()
}

fn default_env_tag() -> String {
    "prod".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_placeholder_files() -> Vec<String> {
    vec![
        "index.html".to_string(),
        "index.php".to_string(),
        "cgi-bin".to_string(),
    ]
}

fn default_path_additions() -> Vec<String> {
    vec!["$HOME/public_html/vendor/bin".to_string()]
}

fn default_rsync_excludes() -> Vec<String> {
    [
        ".git",
        ".env",
        ".env.prod",
        "vendor",
        "web/core",
        "web/modules/contrib",
        "web/themes/contrib",
        "web/profiles/contrib",
        "web/libraries",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_production_commands() -> Vec<Vec<String>> {
    [
        vec!["config:set", "-y", "system.performance", "css.preprocess", "1"],
        vec!["config:set", "-y", "system.performance", "js.preprocess", "1"],
        vec!["state:set", "twig_debug", "0"],
        vec!["state:set", "twig_cache_disable", "0"],
        vec!["state:set", "disable_rendered_output_cache_bins", "0"],
    ]
    .iter()
    .map(|cmd| cmd.iter().map(|s| s.to_string()).collect())
    .collect()
}

fn default_dump_file() -> String {
    "kickoff-golive.sql".to_string()
}

impl Default for GoLiveConfig {
    fn default() -> Self {
        Self {
            remote_dir: default_remote_dir(),
            staging_file: default_staging_file(),
            env_tag: default_env_tag(),
            ssh_port: default_ssh_port(),
            identity_file: None,
            placeholder_files: default_placeholder_files(),
            path_additions: default_path_additions(),
            rsync_excludes: default_rsync_excludes(),
            production_commands: default_production_commands(),
            dump_file: default_dump_file(),
        }
    }
}

fn default_upstream_manifest() -> String {
    "../starterkit/composer.json".to_string()
}

fn default_manifest() -> String {
    "composer.json".to_string()
}

fn default_merge_sections() -> Vec<String> {
    vec![
        "require".to_string(),
        "require-dev".to_string(),
        "extra.patches".to_string(),
    ]
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            upstream_manifest: default_upstream_manifest(),
            manifest: default_manifest(),
            merge_sections: default_merge_sections(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl KickoffConfig {
    pub fn from_json(content: &str, source: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))
    }

    /// Load from `path`, or fall back to built-in defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = io::read_file(path, "read kickoff config")?;
                Self::from_json(&content, &path.display().to_string())
            }
            None => Ok(Self::default()),
        }
    }
}

/// Pick the config file: explicit flag, then the env var, then `kickoff.json`
/// in the project root if it exists.
pub fn resolve_path(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    root: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand(path.to_string_lossy().as_ref()));
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Some(expand(value));
    }
    let local = root.join(CONFIG_FILE_NAME);
    local.is_file().then_some(local)
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_object_yields_defaults() {
        let config = KickoffConfig::from_json("{}", "inline").unwrap();
        assert_eq!(config.git.branch, "master");
        assert_eq!(config.tools.drush, "./vendor/bin/drush");
        assert_eq!(config.install.translations.len(), 4);
        assert_eq!(config.tiers.dev.matching_groups.len(), 1);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = KickoffConfig::from_json(
            r#"{"git": {"branch": "main"}, "golive": {"ssh_port": 2222}}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.git.branch, "main");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.golive.ssh_port, 2222);
        assert_eq!(config.golive.remote_dir, "public_html");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = KickoffConfig::from_json("{", "kickoff.json").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }

    #[test]
    fn resolve_path_prefers_explicit_then_env() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("a.json");
        assert_eq!(
            resolve_path(Some(&explicit), Some("/b.json"), dir.path()),
            Some(explicit)
        );
        assert_eq!(
            resolve_path(None, Some("/b.json"), dir.path()),
            Some(PathBuf::from("/b.json"))
        );
    }

    #[test]
    fn resolve_path_finds_project_file_only_if_present() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_path(None, None, dir.path()), None);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        assert_eq!(
            resolve_path(None, Some("  "), dir.path()),
            Some(dir.path().join(CONFIG_FILE_NAME))
        );
    }
}
