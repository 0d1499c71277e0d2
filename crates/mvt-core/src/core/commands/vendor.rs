use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use mvt_domain::{
    folders_for_targets, merge_major_dependencies, reconcile, DeclaredDependency, ManifestError,
    VendoredLibrary,
};
use pep508_rs::Requirement;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::core::config::context::CommandContext;
use crate::core::install::{InstallRequest, InstalledDistribution};
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

use super::{manifest_error_outcome, path_list, removal_paths, remove_paths, ListLayout};

static EGG_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#egg=([^&]+)(?:&|$)").expect("egg fragment pattern"));

static LEADING_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)").expect("name pattern")
});

#[derive(Clone, Debug)]
pub struct VendorRequest {
    pub package: String,
    pub py2: bool,
    pub py3: bool,
    pub dependents: Vec<String>,
    pub listfile: PathBuf,
}

/// A package argument as typed by the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageSpec {
    /// Name with its original spelling.
    pub name: String,
    pub extras: Vec<String>,
    /// Requirement handed to the installer, markers stripped.
    pub requirement: String,
}

impl PackageSpec {
    /// Parses a PEP 508 requirement, or a bare URL carrying `#egg=<name>`.
    ///
    /// # Errors
    /// Returns the parser's message when neither form applies.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        match Requirement::from_str(input) {
            Ok(requirement) => Ok(Self::from_requirement(input, &requirement)),
            Err(first) => {
                let Some(caps) = EGG_FRAGMENT.captures(input) else {
                    return Err(first.to_string());
                };
                let with_name = format!("{} @ {input}", &caps[1]);
                Requirement::from_str(&with_name)
                    .map(|requirement| Self::from_requirement(&with_name, &requirement))
                    .map_err(|err| err.to_string())
            }
        }
    }

    fn from_requirement(input: &str, requirement: &Requirement) -> Self {
        let name = LEADING_NAME
            .captures(input)
            .and_then(|caps| caps.name("name"))
            .map_or_else(|| requirement.name.to_string(), |m| m.as_str().to_string());
        let without_marker = if requirement.marker.is_some() {
            input.rsplit_once(';').map_or(input, |(head, _)| head).trim()
        } else {
            input
        };
        Self {
            name,
            extras: requirement.extras.iter().map(ToString::to_string).collect(),
            requirement: without_marker.to_string(),
        }
    }
}

/// Installs (or reinstalls) a library into its vendor folders and records it.
///
/// # Errors
/// Returns an error when the list file or vendor folders cannot be written.
pub fn vendor_package(ctx: &CommandContext, request: &VendorRequest) -> Result<ExecutionOutcome> {
    let spec = match PackageSpec::parse(&request.package) {
        Ok(spec) => spec,
        Err(reason) => {
            return Ok(user_error_with_hint(
                format!("unable to parse `{}`", request.package),
                "use a requirement like `six==1.15.0`, `name @ <url>`, or a URL ending in `#egg=<name>`",
                json!({ "package": request.package, "reason": reason }),
            ))
        }
    };
    let layout = ListLayout::new(ctx, &request.listfile);
    let document = layout.load(ctx)?.unwrap_or_default();
    let mut requirements = match document.to_list() {
        Ok(list) => list,
        Err(ManifestError::Rows(errors)) => {
            return Ok(manifest_error_outcome(&layout.listpath, &errors))
        }
        Err(ManifestError::List(err)) => return Err(err.into()),
    };

    let mut lines = vec![format!("Starting vendor for: {}", spec.requirement)];
    let existing = requirements.get(&spec.name).cloned();
    let explicit_targets = request.py2 || request.py3;
    let folders = match &existing {
        Some(old) => {
            let paths = removal_paths(ctx, old, &layout.root)?;
            lines.push(format!("Removing: {}", path_list(&paths)));
            remove_paths(ctx, &paths)?;
            if explicit_targets {
                lines.push(format!(
                    "Installing {} to targets according to CLI switches",
                    spec.name
                ));
                folders_for_targets(&layout.target, request.py2, request.py3)
            } else {
                lines.push(format!("Package {} found in list, using that", spec.name));
                old.folder.clone()
            }
        }
        None => {
            lines.push(format!(
                "Package {} not found in list, assuming new package",
                spec.name
            ));
            folders_for_targets(&layout.target, request.py2, request.py3)
        }
    };

    let install = ctx.config().install();
    let temp_dir = layout.root.join(&install.temp_dir);
    let mut installed: Option<InstalledDistribution> = None;
    let mut dependency_sets: Vec<(bool, Vec<DeclaredDependency>)> = Vec::new();
    for folder in &folders {
        let install_request = InstallRequest {
            requirement: spec.requirement.clone(),
            name: spec.name.clone(),
            extras: spec.extras.clone(),
            python: ctx.config().python().interpreter_for(folder).to_string(),
            python2: folder.ends_with('2'),
            vendor_dir: layout.root.join(folder),
            temp_dir: temp_dir.clone(),
            keep_temp: install.keep_temp,
        };
        let dist = match ctx.installer().install(&install_request) {
            Ok(dist) => dist,
            Err(err) => {
                lines.push(format!("Error: {err}"));
                return Ok(user_error_with_hint(
                    format!("failed to install {} into {folder}", spec.name),
                    "check the requirement, and the interpreters set through MVT_PYTHON / MVT_PYTHON2",
                    json!({
                        "package": spec.name,
                        "folder": folder,
                        "reason": err.to_string(),
                        "lines": lines,
                    }),
                ));
            }
        };
        lines.push(format!(
            "Installed: {}=={} to {folder}",
            dist.package_name, dist.version
        ));
        let declared = ctx.discovery().dependencies(&dist)?;
        dependency_sets.push((folder.ends_with('2'), parse_dependencies(&declared)));
        installed = Some(dist);
    }
    let dist = installed.ok_or_else(|| anyhow!("no install folder for {}", spec.name))?;
    let dependencies = combine_dependencies(dependency_sets)?;

    let mut library = record_from_install(&dist, &spec, folders.clone());
    if let Some(old) = &existing {
        library.usage = old.usage.clone();
        library.notes.extend(old.notes.iter().cloned());
    }

    let envs = ctx.marker_environments(&folders)?;
    let report = reconcile(
        &mut library,
        &dependencies,
        &request.dependents,
        &mut requirements,
        &envs,
    );
    lines.extend(report.lines());

    let name = library.name.clone();
    let version = library.version.clone();
    let modules = library.modules.clone();
    if let Some(old) = &existing {
        if old.key() != library.key() {
            requirements.remove_ignore_missing(&old.name);
        }
    }
    requirements.replace(library);

    lines.push(format!("Updating {}", layout.display_name()));
    layout.write(ctx, &document, &requirements)?;
    layout.regenerate_requirements(ctx, &requirements, &mut lines)?;
    info!(package = %name, "vendored");

    Ok(ExecutionOutcome::success(
        format!("vendored {name}"),
        json!({
            "package": name,
            "version": version,
            "folders": folders,
            "modules": modules,
            "changes": report.changes.len(),
            "advisories": report.advisories.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "lines": lines,
        }),
    ))
}

fn parse_dependencies(declared: &[String]) -> Vec<DeclaredDependency> {
    declared
        .iter()
        .filter_map(|spec| match DeclaredDependency::parse(spec) {
            Ok(dep) => Some(dep),
            Err(err) => {
                warn!(%err, "ignoring unparseable dependency");
                None
            }
        })
        .collect()
}

/// One Python-2 and one Python-3 install are merged with version markers;
/// anything else is a plain de-duplicated union.
fn combine_dependencies(
    sets: Vec<(bool, Vec<DeclaredDependency>)>,
) -> Result<Vec<DeclaredDependency>> {
    if let [(true, py2), (false, py3)] = sets.as_slice() {
        return merge_major_dependencies(py2, py3).map_err(Into::into);
    }
    let mut merged: Vec<DeclaredDependency> = Vec::new();
    for dep in sets.into_iter().flat_map(|(_, deps)| deps) {
        if !merged.contains(&dep) {
            merged.push(dep);
        }
    }
    Ok(merged)
}

fn record_from_install(
    dist: &InstalledDistribution,
    spec: &PackageSpec,
    folders: Vec<String>,
) -> VendoredLibrary {
    let name = if dist.package_name.is_empty() {
        spec.name.clone()
    } else {
        dist.package_name.clone()
    };
    let mut library = VendoredLibrary::new(name, folders);
    library.extras = dist.extras.clone();
    library.version = Some(dist.version.clone());
    if !dist.modules.is_empty() {
        library.modules = dist.modules.clone();
    }
    library.git = dist.git;
    library.branch = dist.branch.clone();
    library.url = Some(dist.url.clone());
    library
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_keeps_original_spelling() {
        let spec = PackageSpec::parse("CacheControl[filecache]==0.12.6").unwrap();
        assert_eq!(spec.name, "CacheControl");
        assert_eq!(spec.extras, vec!["filecache"]);
        assert_eq!(spec.requirement, "CacheControl[filecache]==0.12.6");
    }

    #[test]
    fn markers_are_stripped_from_the_install_requirement() {
        let spec = PackageSpec::parse("futures==3.3.0 ; python_version == '2.7'").unwrap();
        assert_eq!(spec.name, "futures");
        assert_eq!(spec.requirement, "futures==3.3.0");
    }

    #[test]
    fn egg_fragment_names_bare_urls() {
        let spec =
            PackageSpec::parse("https://github.com/pymedusa/adba/archive/HEAD.tar.gz#egg=adba")
                .unwrap();
        assert_eq!(spec.name, "adba");
        assert_eq!(
            spec.requirement,
            "adba @ https://github.com/pymedusa/adba/archive/HEAD.tar.gz#egg=adba"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(PackageSpec::parse("not a requirement!!").is_err());
    }

    #[test]
    fn python_major_sets_are_merged_with_markers() {
        let py2 = parse_dependencies(&["six".into(), "futures".into()]);
        let py3 = parse_dependencies(&["six".into()]);
        let merged = combine_dependencies(vec![(true, py2), (false, py3)]).unwrap();
        assert_eq!(merged.len(), 2);
        let futures = merged.iter().find(|d| d.name == "futures").unwrap();
        assert!(futures
            .marker
            .as_deref()
            .is_some_and(|m| m.contains("python_version")));
    }

    #[test]
    fn single_folder_deps_pass_through() {
        let deps = parse_dependencies(&["six".into(), "six".into(), "(bad".into()]);
        let merged = combine_dependencies(vec![(false, deps)]).unwrap();
        assert_eq!(merged.len(), 1);
    }
}
