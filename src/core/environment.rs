//! Environment tier detection from the working directory and hostname.

use glob_match::glob_match;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{TierRule, TiersConfig};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentTier {
    Dev,
    Prod,
    Unknown,
}

impl EnvironmentTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentTier::Dev => "dev",
            EnvironmentTier::Prod => "prod",
            EnvironmentTier::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EnvironmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one (path, hostname) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub tier: EnvironmentTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_path: Option<String>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            tier: EnvironmentTier::Unknown,
            project: None,
            family: None,
            matched_path: None,
        }
    }

    pub fn ensure_dev(&self) -> Result<()> {
        self.ensure(&[EnvironmentTier::Dev])
    }

    pub fn ensure_prod(&self) -> Result<()> {
        self.ensure(&[EnvironmentTier::Prod])
    }

    pub fn ensure_any_project_dir(&self) -> Result<()> {
        self.ensure(&[EnvironmentTier::Dev, EnvironmentTier::Prod])
    }

    /// Fail closed unless the detected tier is one of `allowed`.
    pub fn ensure(&self, allowed: &[EnvironmentTier]) -> Result<()> {
        if self.tier != EnvironmentTier::Unknown && allowed.contains(&self.tier) {
            return Ok(());
        }

        let wanted = allowed
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        log_status!(
            "guard",
            "Tier check failed: need {}, detected {}",
            wanted,
            self.tier
        );
        Err(Error::precondition_violation(
            "tier",
            format!(
                "This command must be executed in the root directory of a project on the {} server (detected: {}).",
                wanted, self.tier
            ),
        ))
    }
}

struct CompiledRule {
    tier: EnvironmentTier,
    patterns: Vec<Regex>,
    hostnames: Vec<String>,
    matching_groups: Vec<[String; 2]>,
}

impl CompiledRule {
    fn compile(tier: EnvironmentTier, rule: &TierRule) -> Result<Self> {
        if rule.path_patterns.is_empty() {
            return Err(Error::config_invalid_value(
                format!("tiers.{}.path_patterns", tier),
                None,
                "at least one path pattern is required",
            ));
        }

        let patterns = rule
            .path_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::config_invalid_value(
                        format!("tiers.{}.path_patterns", tier),
                        Some(pattern.clone()),
                        e.to_string(),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tier,
            patterns,
            hostnames: rule.hostnames.iter().map(|h| h.to_lowercase()).collect(),
            matching_groups: rule.matching_groups.clone(),
        })
    }

    fn host_allowed(&self, hostname: &str) -> bool {
        if self.hostnames.is_empty() {
            return true;
        }
        let hostname = hostname.to_lowercase();
        self.hostnames
            .iter()
            .any(|pattern| glob_match(pattern, &hostname))
    }

    fn match_path(&self, path: &str) -> Option<Classification> {
        self.patterns.iter().find_map(|re| {
            let caps = re.captures(path)?;
            let groups_agree = self.matching_groups.iter().all(|[a, b]| {
                match (caps.name(a), caps.name(b)) {
                    (Some(x), Some(y)) => x.as_str() == y.as_str(),
                    _ => false,
                }
            });
            if !groups_agree {
                return None;
            }
            Some(Classification {
                tier: self.tier,
                project: caps.name("project").map(|m| m.as_str().to_string()),
                family: caps.name("family").map(|m| m.as_str().to_string()),
                matched_path: Some(path.to_string()),
            })
        })
    }

    /// A tier matches only if a path pattern matches AND the host is allowed.
    fn matches(&self, candidates: &[PathBuf], hostname: &str) -> Option<Classification> {
        if !self.host_allowed(hostname) {
            return None;
        }
        candidates
            .iter()
            .find_map(|path| self.match_path(&path.to_string_lossy()))
    }
}

pub struct Classifier {
    dev: CompiledRule,
    prod: CompiledRule,
}

impl Classifier {
    pub fn new(tiers: &TiersConfig) -> Result<Self> {
        Ok(Self {
            dev: CompiledRule::compile(EnvironmentTier::Dev, &tiers.dev)?,
            prod: CompiledRule::compile(EnvironmentTier::Prod, &tiers.prod)?,
        })
    }

    pub fn classify(&self, path: &Path, hostname: &str) -> Result<EnvironmentTier> {
        Ok(self.detect(&[path.to_path_buf()], hostname)?.tier)
    }

    /// Classify a directory given every form it is known by (logical path as
    /// seen through symlinks, canonical path).
    pub fn detect(&self, candidates: &[PathBuf], hostname: &str) -> Result<Classification> {
        let dev = self.dev.matches(candidates, hostname);
        let prod = self.prod.matches(candidates, hostname);

        match (dev, prod) {
            (Some(dev), Some(prod)) => Err(Error::config_conflict(
                "Directory matches both the dev and the prod tier",
                serde_json::json!({
                    "hostname": hostname,
                    "devPath": dev.matched_path,
                    "prodPath": prod.matched_path,
                }),
            )),
            (Some(found), None) | (None, Some(found)) => Ok(found),
            (None, None) => Ok(Classification::unknown()),
        }
    }
}
