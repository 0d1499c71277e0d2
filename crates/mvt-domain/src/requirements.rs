//! `requirements.txt` / `requirements.json` generation from a manifest.

use tracing::warn;

use crate::library::{VendoredLibrary, VendoredList, HOST_PROJECT};

/// Libraries worth pinning: used by the host project or taken from git,
/// or everything with `all_packages`. Sorted by lower-cased name.
pub fn select_requirements(list: &VendoredList, all_packages: bool) -> Vec<&VendoredLibrary> {
    list.iter()
        .filter(|lib| all_packages || lib.used_by(HOST_PROJECT) || lib.git)
        .collect()
}

/// One pinned requirement per line.
pub fn render_requirements_txt(libraries: &[&VendoredLibrary]) -> String {
    let mut out = String::new();
    for lib in libraries {
        match lib.as_requirement() {
            Some(requirement) => {
                out.push_str(&requirement);
                out.push('\n');
            }
            None => warn!(library = %lib, "no reproducible requirement, skipping"),
        }
    }
    out
}

/// JSON array with one compact record per line.
///
/// # Errors
/// Fails when a record cannot be serialized.
pub fn render_requirements_json(libraries: &[&VendoredLibrary]) -> serde_json::Result<String> {
    if libraries.is_empty() {
        return Ok("[]\n".to_string());
    }
    let records = libraries
        .iter()
        .map(|lib| serde_json::to_string(lib))
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(format!("[\n  {}\n]\n", records.join(",\n  ")))
}
