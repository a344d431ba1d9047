//! Upstream package manifest merge for `update`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMerge {
    pub added: Vec<String>,
    pub updated: Vec<String>,
}

impl ManifestMerge {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Copy every entry of each dotted `sections` object from `upstream` into
/// `project`. Existing keys keep their position; new keys are appended.
/// Sections absent upstream are skipped.
pub fn merge_sections(
    project: &mut Value,
    upstream: &Value,
    sections: &[String],
) -> Result<ManifestMerge> {
    let mut merge = ManifestMerge::default();

    for section in sections {
        let parts: Vec<&str> = section.split('.').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            continue;
        }

        let Some(source) = lookup(upstream, &parts) else {
            continue;
        };
        let source = source.as_object().ok_or_else(|| {
            Error::validation_invalid_argument(
                "merge_sections",
                format!("Upstream section '{}' is not an object", section),
                Some(section.clone()),
            )
        })?;

        let target = object_at(project, &parts, section)?;
        for (key, value) in source {
            match target.get(key) {
                Some(existing) if existing == value => {}
                Some(_) => {
                    target.insert(key.clone(), value.clone());
                    merge.updated.push(format!("{}.{}", section, key));
                }
                None => {
                    target.insert(key.clone(), value.clone());
                    merge.added.push(format!("{}.{}", section, key));
                }
            }
        }
    }

    Ok(merge)
}

fn lookup<'v>(value: &'v Value, parts: &[&str]) -> Option<&'v Value> {
    parts.iter().try_fold(value, |current, part| current.get(part))
}

/// Walk to the object at `parts`, creating missing intermediate objects.
fn object_at<'v>(
    value: &'v mut Value,
    parts: &[&str],
    section: &str,
) -> Result<&'v mut Map<String, Value>> {
    let mut current = value;
    for part in parts {
        let obj = current.as_object_mut().ok_or_else(|| not_an_object(section))?;
        current = obj
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    current.as_object_mut().ok_or_else(|| not_an_object(section))
}

fn not_an_object(section: &str) -> Error {
    Error::validation_invalid_argument(
        "merge_sections",
        format!("Project section '{}' is not an object", section),
        Some(section.to_string()),
    )
}

/// Merge the upstream manifest file into the project manifest file in place.
pub fn merge_files(
    project_path: &Path,
    upstream_path: &Path,
    sections: &[String],
) -> Result<ManifestMerge> {
    let mut project = read_json(project_path)?;
    let upstream = read_json(upstream_path)?;

    let merge = merge_sections(&mut project, &upstream, sections)?;
    if merge.is_empty() {
        log_status!("update", "{} already matches upstream", project_path.display());
        return Ok(merge);
    }

    io::write_file_atomic(
        project_path,
        &to_manifest_json(&project)?,
        "write package manifest",
    )?;
    log_status!(
        "update",
        "Merged {} new and {} changed entries into {}",
        merge.added.len(),
        merge.updated.len(),
        project_path.display()
    );
    Ok(merge)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = io::read_file(path, "read package manifest")?;
    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}

/// Four-space indented JSON with a trailing newline, the manifest tool's own layout.
fn to_manifest_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(|e| {
        Error::internal_json(e.to_string(), Some("serialize package manifest".to_string()))
    })?;

    let mut out = String::from_utf8(buf)
        .map_err(|e| Error::internal_unexpected(format!("Manifest is not UTF-8: {}", e)))?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sections() -> Vec<String> {
        vec![
            "require".to_string(),
            "require-dev".to_string(),
            "extra.patches".to_string(),
        ]
    }

    #[test]
    fn upstream_entries_are_added_and_overwritten() {
        let mut project = json!({
            "name": "webtourismus/demo",
            "require": {"drupal/core": "^10.1", "drupal/admin_toolbar": "^3.4"},
        });
        let upstream = json!({
            "require": {"drupal/core": "^10.2", "drupal/gin": "^3.0"},
            "extra": {"patches": {"drupal/core": {"fix": "patches/core.patch"}}},
        });

        let merge = merge_sections(&mut project, &upstream, &sections()).unwrap();

        assert_eq!(merge.updated, vec!["require.drupal/core".to_string()]);
        assert_eq!(
            merge.added,
            vec![
                "require.drupal/gin".to_string(),
                "extra.patches.drupal/core".to_string()
            ]
        );
        assert_eq!(project["require"]["drupal/core"], "^10.2");
        assert_eq!(project["require"]["drupal/admin_toolbar"], "^3.4");
        assert_eq!(
            project["extra"]["patches"]["drupal/core"]["fix"],
            "patches/core.patch"
        );
    }

    #[test]
    fn key_order_is_preserved() {
        let mut project = json!({"require": {"b": "1", "a": "1"}});
        let upstream = json!({"require": {"a": "2", "c": "1"}});
        merge_sections(&mut project, &upstream, &sections()).unwrap();

        let keys: Vec<&String> = project["require"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn non_object_sections_are_rejected() {
        let mut project = json!({"require": []});
        let upstream = json!({"require": {"a": "1"}});
        assert!(merge_sections(&mut project, &upstream, &sections()).is_err());
    }

    #[test]
    fn merge_files_writes_only_on_change() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("composer.json");
        let upstream = dir.path().join("upstream.json");
        std::fs::write(&project, "{\"require\": {\"a\": \"1\"}}").unwrap();
        std::fs::write(&upstream, "{\"require\": {\"a\": \"1\"}}").unwrap();

        assert!(merge_files(&project, &upstream, &sections()).unwrap().is_empty());
        assert_eq!(
            std::fs::read_to_string(&project).unwrap(),
            "{\"require\": {\"a\": \"1\"}}"
        );

        std::fs::write(&upstream, "{\"require\": {\"a\": \"2\"}}").unwrap();
        merge_files(&project, &upstream, &sections()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&project).unwrap(),
            "{\n    \"require\": {\n        \"a\": \"2\"\n    }\n}\n"
        );
    }
}
