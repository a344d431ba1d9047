//! Input validation primitives.
//!
//! Operator-supplied values end up in settings files and remote command lines,
//! so each kind of value is checked against a strict shape before use.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None))
    } else {
        Ok(trimmed)
    }
}

/// The kind of an operator-supplied value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Hostname or IP address.
    Host,
    /// POSIX account name.
    User,
    /// Public domain name (at least one dot).
    Domain,
    /// Database, user or similar SQL identifier.
    Identifier,
    /// Free text without line breaks (passwords).
    Secret,
}

static HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9.-]{0,251}[A-Za-z0-9])?$").unwrap()
});

static USER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").unwrap());

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$").unwrap()
});

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").unwrap());

/// Validate a value and return it trimmed (secrets are returned untouched).
pub fn validate_input(kind: InputKind, field: &str, value: &str) -> Result<String> {
    let problem = match kind {
        InputKind::Secret => {
            if value.is_empty() {
                Some("must not be empty")
            } else if value.contains(['\n', '\r', '\0']) {
                Some("must not contain line breaks")
            } else {
                None
            }
        }
        _ => {
            let trimmed = value.trim();
            let (re, problem) = match kind {
                InputKind::Host => (&*HOST_PATTERN, "must be a hostname or IP address"),
                InputKind::User => (&*USER_PATTERN, "must be a lowercase account name"),
                InputKind::Domain => (&*DOMAIN_PATTERN, "must be a domain name like example.at"),
                _ => (
                    &*IDENTIFIER_PATTERN,
                    "may only contain letters, digits and underscores",
                ),
            };
            if re.is_match(trimmed) {
                None
            } else {
                Some(problem)
            }
        }
    };

    match problem {
        Some(problem) => Err(Error::validation_invalid_argument(
            field,
            problem,
            (kind != InputKind::Secret).then(|| value.to_string()),
        )),
        None if kind == InputKind::Secret => Ok(value.to_string()),
        None => Ok(value.trim().to_string()),
    }
}
