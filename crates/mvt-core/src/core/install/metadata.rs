//! Readers for the files pip leaves in a `*.dist-info` directory.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static NAMESPACE_INIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__path__\s*=.*?extend_path\(__path__, __name__\)").expect("namespace pattern")
});

/// Core-metadata fields the vendoring workflow needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreMetadata {
    pub name: String,
    pub version: String,
    pub provides_extra: Vec<String>,
    pub requires_dist: Vec<String>,
}

/// Parses the RFC 822 style header block of a `METADATA` file.
pub fn parse_metadata(text: &str) -> CoreMetadata {
    let mut metadata = CoreMetadata::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Name" => metadata.name = value,
            "Version" => metadata.version = value,
            "Provides-Extra" => metadata.provides_extra.push(value),
            "Requires-Dist" => metadata.requires_dist.push(value),
            _ => {}
        }
    }
    metadata
}

/// The parts of PEP 610 `direct_url.json` used to describe git origins.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DirectUrl {
    pub url: String,
    #[serde(default)]
    pub vcs_info: Option<VcsInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct VcsInfo {
    #[serde(default)]
    pub vcs: String,
    pub commit_id: String,
    #[serde(default)]
    pub requested_revision: Option<String>,
}

/// # Errors
/// Returns an error when the JSON does not match PEP 610.
pub fn parse_direct_url(text: &str) -> serde_json::Result<DirectUrl> {
    serde_json::from_str(text)
}

/// Top-level modules from a `RECORD` file, main module first.
///
/// `install_dir` is consulted to tell files from directories and to spot
/// `pkgutil` namespace packages, whose sub-packages are listed instead.
pub fn top_level_modules(record: &str, install_dir: &Path, project_name: &str) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::new();
    let mut found: Vec<String> = Vec::new();

    for row in record.lines() {
        let Some(file) = record_path(row) else {
            continue;
        };
        let parts: Vec<&str> = file.split('/').collect();
        let top = parts[0];
        if top.ends_with(".dist-info") || top.ends_with(".egg-info") || top == ".." || top == "tests" {
            continue;
        }
        let parent = parts[..parts.len() - 1].join("/");
        let parent_prefix = format!("{parent}/");

        let inside_namespace = namespaces
            .iter()
            .any(|ns| *ns != parent_prefix && parent_prefix.starts_with(ns.as_str()));
        if inside_namespace {
            found.push(parent);
        } else if parts.last() == Some(&"__init__.py") && is_namespace_init(&install_dir.join(file)) {
            namespaces.push(parent_prefix);
        } else {
            found.push(top.to_string());
        }
    }

    order_modules(found, install_dir, project_name)
}

fn record_path(row: &str) -> Option<&str> {
    let row = row.trim();
    if row.is_empty() {
        return None;
    }
    // Paths may contain commas; hash and size never do.
    let mut fields = row.rsplitn(3, ',');
    let _size = fields.next()?;
    let _hash = fields.next()?;
    let path = fields.next()?.trim_matches('"');
    (!path.is_empty()).then_some(path)
}

fn is_namespace_init(path: &Path) -> bool {
    std::fs::read_to_string(path).is_ok_and(|text| NAMESPACE_INIT.is_match(&text))
}

/// Deduplicates and moves modules matching the project name to the front.
fn order_modules(found: Vec<String>, install_dir: &Path, project_name: &str) -> Vec<String> {
    let lower = project_name.to_lowercase();
    let stripped = lower.replace('.', "");
    let mut ordered: Vec<String> = Vec::new();
    for name in found {
        if ordered.contains(&name) {
            continue;
        }
        let is_file = install_dir.join(&name).is_file();
        let stem = name.strip_suffix(".py").unwrap_or(&name);
        let matches = name == project_name
            || name == lower
            || (is_file && (stem == project_name || stem == lower))
            || name.to_lowercase() == stripped;
        if matches {
            ordered.insert(0, name);
        } else {
            ordered.push(name);
        }
    }
    ordered
}
