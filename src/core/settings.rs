//! Flat `KEY="value"` settings files (`.env`).
//!
//! A settings file holds one assignment per line. Keys are unique; writing an
//! existing key replaces its line in place, writing a new key appends a line.
//! Blank lines and `#` comments survive rewrites but are not modeled.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::utils::io;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Ordered key/value snapshot of a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        for (key, value) in content.lines().filter_map(parse_line) {
            // first assignment wins, matching which line an upsert rewrites
            if !settings.contains(&key) {
                settings.entries.push((key, value));
            }
        }
        settings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key` unless it is missing or blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new snapshot with `key` set; the receiver is left untouched.
    pub fn with(&self, key: &str, value: &str) -> Settings {
        let mut next = self.clone();
        match next.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => next.entries.push((key.to_string(), value.to_string())),
        }
        next
    }
}

/// Parse one `KEY=value` line. Comments, blanks and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (key, raw) = trimmed.split_once('=')?;
    let key = key.trim();
    if !KEY_PATTERN.is_match(key) {
        return None;
    }

    Some((key.to_string(), parse_value(raw.trim())))
}

fn parse_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(next @ ('"' | '\\')) => out.push(next),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        return out;
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].to_string();
    }

    raw.to_string()
}

/// Render `KEY="value"` with `\` and `"` escaped.
pub fn format_line(key: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}=\"{}\"", key, escaped)
}

/// Replace the first line assigning `key`, or append one. Other lines keep
/// their text and order.
pub fn upsert_content(content: &str, key: &str, value: &str) -> String {
    let replacement = format_line(key, value);
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let existing = lines
        .iter()
        .position(|line| parse_line(line).is_some_and(|(k, _)| k == key));

    match existing {
        Some(index) => lines[index] = replacement,
        None => lines.push(replacement),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn validate_key(key: &str) -> Result<()> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(Error::validation_invalid_argument(
            "settings_key",
            "must start with a letter or underscore and contain only letters, digits and underscores",
            Some(key.to_string()),
        ))
    }
}

/// A settings file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Raw file text; an absent file reads as empty.
    pub fn read_raw(&self) -> Result<String> {
        Ok(io::read_optional(&self.path, &self.operation("read"))?.unwrap_or_default())
    }

    /// Parse the file; an absent file is an empty mapping.
    pub fn read_all(&self) -> Result<Settings> {
        Ok(Settings::parse(&self.read_raw()?))
    }

    pub fn upsert(&self, key: &str, value: &str) -> Result<Settings> {
        self.upsert_many(&[(key, value)])
    }

    /// Apply several upserts in one atomic write and return the new snapshot.
    pub fn upsert_many(&self, pairs: &[(&str, &str)]) -> Result<Settings> {
        for (key, _) in pairs {
            validate_key(key)?;
        }

        let mut content = self.read_raw()?;
        for (key, value) in pairs {
            content = upsert_content(&content, key, value);
        }

        io::write_file_atomic(&self.path, &content, &self.operation("write"))?;
        log_status!(
            "settings",
            "Wrote {} key(s) to {}",
            pairs.len(),
            self.path.display()
        );
        Ok(Settings::parse(&content))
    }

    /// Copy this file verbatim to `dest` and return a handle to the copy.
    pub fn copy_to(&self, dest: impl Into<PathBuf>) -> Result<SettingsFile> {
        let dest = SettingsFile::new(dest);
        let content = self.read_raw()?;
        io::write_file_atomic(&dest.path, &content, &dest.operation("write"))?;
        Ok(dest)
    }

    pub fn remove(&self) -> Result<()> {
        io::remove_file_if_exists(&self.path, &self.operation("remove"))
    }

    fn operation(&self, verb: &str) -> String {
        format!("{} settings file {}", verb, self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_accepts_quoted_and_bare_values() {
        let settings = Settings::parse(
            "# family settings\nENV=\"dev1\"\nDB_HOST=localhost\nGREETING='hi there'\n\n",
        );
        assert_eq!(settings.get("ENV"), Some("dev1"));
        assert_eq!(settings.get("DB_HOST"), Some("localhost"));
        assert_eq!(settings.get("GREETING"), Some("hi there"));
        assert_eq!(settings.len(), 3);
    }

    #[test]
    fn parse_unescapes_double_quoted_values() {
        let settings = Settings::parse(r#"DB_PASSWORD="a\"b\\c""#);
        assert_eq!(settings.get("DB_PASSWORD"), Some(r#"a"b\c"#));
    }

    #[test]
    fn parse_keeps_first_duplicate() {
        let settings = Settings::parse("A=\"1\"\nA=\"2\"\n");
        assert_eq!(settings.get("A"), Some("1"));
        assert_eq!(settings.len(), 1);
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let settings = Settings::parse("not a line\n1BAD=x\nGOOD=y\n");
        assert_eq!(settings.keys().collect::<Vec<_>>(), vec!["GOOD"]);
    }

    #[test]
    fn format_line_round_trips_through_parse() {
        let line = format_line("DB_PASSWORD", r#"p"a\ss$"#);
        let (key, value) = parse_line(&line).unwrap();
        assert_eq!(key, "DB_PASSWORD");
        assert_eq!(value, r#"p"a\ss$"#);
    }

    #[test]
    fn upsert_content_replaces_in_place() {
        let content = "# header\nPROJECT_NAME=\"demo\"\nDB_NAME=\"dev1_demo\"\n";
        let out = upsert_content(content, "PROJECT_NAME", "alpha");
        assert_eq!(
            out,
            "# header\nPROJECT_NAME=\"alpha\"\nDB_NAME=\"dev1_demo\"\n"
        );
    }

    #[test]
    fn upsert_content_appends_missing_keys() {
        let out = upsert_content("A=\"1\"", "B", "2");
        assert_eq!(out, "A=\"1\"\nB=\"2\"\n");
    }

    #[test]
    fn upsert_content_only_touches_first_match() {
        let out = upsert_content("A=1\nA=2\n", "A", "3");
        assert_eq!(out, "A=\"3\"\nA=2\n");
    }

    #[test]
    fn upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join(".env"));
        fs::write(file.path(), "ENV=\"dev1\"\n").unwrap();

        file.upsert("PROD_HOST", "web01.example.at").unwrap();
        let once = fs::read_to_string(file.path()).unwrap();
        file.upsert("PROD_HOST", "web01.example.at").unwrap();
        let twice = fs::read_to_string(file.path()).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.matches("PROD_HOST=").count(), 1);
    }

    #[test]
    fn upsert_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join(".env"));
        assert!(!file.exists());

        let settings = file
            .upsert_many(&[("PROJECT_NAME", "demo"), ("DB_NAME", "dev1_demo")])
            .unwrap();

        assert!(file.exists());
        assert_eq!(settings.get("DB_NAME"), Some("dev1_demo"));
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "PROJECT_NAME=\"demo\"\nDB_NAME=\"dev1_demo\"\n"
        );
    }

    #[test]
    fn upsert_rejects_invalid_keys() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join(".env"));
        assert!(file.upsert("BAD KEY", "x").is_err());
        assert!(!file.exists());
    }

    #[test]
    fn read_all_of_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join(".env"));
        assert!(file.read_all().unwrap().is_empty());
    }

    #[test]
    fn copy_to_produces_identical_file() {
        let dir = TempDir::new().unwrap();
        let file = SettingsFile::new(dir.path().join(".env"));
        file.upsert("PROJECT_NAME", "demo").unwrap();

        let copy = file.copy_to(dir.path().join(".env.prod")).unwrap();
        assert_eq!(copy.read_raw().unwrap(), file.read_raw().unwrap());

        copy.upsert("ENV", "prod").unwrap();
        assert!(!file.read_all().unwrap().contains("ENV"));
    }

    #[test]
    fn with_returns_new_snapshot() {
        let base = Settings::parse("A=\"1\"\n");
        let next = base.with("A", "2").with("B", "3");
        assert_eq!(base.get("A"), Some("1"));
        assert_eq!(next.get("A"), Some("2"));
        assert_eq!(next.get("B"), Some("3"));
    }
}
