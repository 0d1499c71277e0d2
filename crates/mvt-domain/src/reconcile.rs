//! Keeps the "used by" edges between vendored libraries consistent after a
//! library is (re)installed.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{
    ExtraName, MarkerEnvironment, Requirement as PepRequirement, StringVersion, VersionOrUrl,
};
use tracing::{debug, info, warn};

use crate::library::{VendoredLibrary, VendoredList, HOST_PROJECT};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("invalid dependency `{spec}`: {reason}")]
pub struct DependencyError {
    pub spec: String,
    pub reason: String,
}

/// A `Requires-Dist` style dependency declared by an installed library.
#[derive(Debug, Clone)]
pub struct DeclaredDependency {
    pub name: String,
    pub extras: Vec<String>,
    pub specifier: String,
    pub marker: Option<String>,
    requirement: PepRequirement,
}

impl DeclaredDependency {
    /// # Errors
    /// Returns [`DependencyError`] when `spec` is not a PEP 508 requirement.
    pub fn parse(spec: &str) -> Result<Self, DependencyError> {
        let requirement =
            PepRequirement::from_str(spec.trim()).map_err(|err| DependencyError {
                spec: spec.trim().to_string(),
                reason: err.to_string(),
            })?;
        let specifier = match &requirement.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => specifiers.to_string(),
            Some(VersionOrUrl::Url(url)) => format!(" @ {url}"),
            None => String::new(),
        };
        Ok(Self {
            name: requirement.name.to_string(),
            extras: requirement.extras.iter().map(ToString::to_string).collect(),
            specifier,
            marker: requirement.marker.as_ref().map(ToString::to_string),
            requirement,
        })
    }

    /// Normalized name, comparable with [`canonical_name`] of a record.
    pub fn key(&self) -> String {
        canonical_name(&self.name)
    }

    /// Rebuilds the dependency with a different marker expression.
    ///
    /// # Errors
    /// Returns [`DependencyError`] when the marker is not valid PEP 508.
    pub fn with_marker(&self, marker: &str) -> Result<Self, DependencyError> {
        let mut head = self.name.clone();
        if !self.extras.is_empty() {
            head = format!("{head}[{}]", self.extras.join(","));
        }
        Self::parse(&format!("{head}{} ; {marker}", self.specifier))
    }

    /// Whether the marker holds in any of `envs` for any extras selection,
    /// including the one with no extra at all.
    pub fn applies(&self, envs: &[MarkerEnvironment], extras: &[String]) -> bool {
        if self.requirement.marker.is_none() {
            return true;
        }
        let mut selections: Vec<Vec<ExtraName>> = vec![Vec::new()];
        selections.extend(
            extras
                .iter()
                .filter_map(|extra| ExtraName::from_str(extra).ok())
                .map(|extra| vec![extra]),
        );
        envs.iter().any(|env| {
            selections
                .iter()
                .any(|selection| self.requirement.evaluate_markers(env, selection))
        })
    }

    /// Containment check of `version` against the declared specifier.
    /// Versions that are not PEP 440 (commit ids) never satisfy a non-empty
    /// specifier.
    pub fn is_satisfied_by(&self, version: Option<&str>) -> bool {
        let specifier = self.specifier.trim();
        if specifier.is_empty() {
            return true;
        }
        let Ok(specifiers) = VersionSpecifiers::from_str(specifier) else {
            return true;
        };
        version
            .and_then(|v| Version::from_str(v).ok())
            .is_some_and(|v| specifiers.contains(&v))
    }

    fn specifier_or_any(&self) -> &str {
        let specifier = self.specifier.trim();
        if specifier.is_empty() {
            "any version"
        } else {
            specifier
        }
    }
}

impl PartialEq for DeclaredDependency {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for DeclaredDependency {}

impl fmt::Display for DeclaredDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        f.write_str(&self.specifier)?;
        if let Some(marker) = &self.marker {
            write!(f, " ; {marker}")?;
        }
        Ok(())
    }
}

/// PEP 503 style name: lower-cased with runs of `-`, `_` and `.` folded to `-`.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            separator = true;
            continue;
        }
        if separator && !out.is_empty() {
            out.push('-');
        }
        separator = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// An edge added to or removed from a usage graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageChange {
    Added { library: String, user: String },
    Removed { library: String, user: String },
}

impl fmt::Display for UsageChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { library, user } => {
                write!(f, "Adding `{user}` to the \"usage\" column of `{library}`")
            }
            Self::Removed { library, user } => {
                write!(f, "Removed `{user}` usage from dependency `{library}`")
            }
        }
    }
}

/// Something a human should look at; never acted upon automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    MissingDependency {
        name: String,
        specifier: String,
        marker: Option<String>,
    },
    UpdateGitDependency {
        name: String,
        specifier: String,
    },
    UpdateDependency {
        name: String,
        version: Option<String>,
        specifier: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency {
                name,
                specifier,
                marker,
            } => {
                write!(f, "May need to install new dependency `{name}` @ {specifier}")?;
                if let Some(marker) = marker {
                    write!(f, ", but only for {marker}")?;
                }
                Ok(())
            }
            Self::UpdateGitDependency { name, specifier } => write!(
                f,
                "May need to update `{name}` (git dependency) to match specifier: {specifier}"
            ),
            Self::UpdateDependency {
                name,
                version,
                specifier,
            } => write!(
                f,
                "Need to update `{name}` from {} to match specifier: {specifier}",
                version.as_deref().unwrap_or("-")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub changes: Vec<UsageChange>,
    pub advisories: Vec<Advisory>,
}

impl ReconcileReport {
    pub fn lines(&self) -> Vec<String> {
        self.changes
            .iter()
            .map(ToString::to_string)
            .chain(self.advisories.iter().map(ToString::to_string))
            .collect()
    }
}

/// Updates usage edges around `installed` after it was (re)installed.
///
/// `dependencies` are the library's declared dependencies, `dependents` the
/// operator-supplied users, and `envs` the marker environments of the install
/// targets. Records in `requirements` other than `installed` only ever get
/// usage edges added or removed.
pub fn reconcile(
    installed: &mut VendoredLibrary,
    dependencies: &[DeclaredDependency],
    dependents: &[String],
    requirements: &mut VendoredList,
    envs: &[MarkerEnvironment],
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let installed_key = installed.key();
    let installed_canonical = canonical_name(&installed.name);

    let filtered: Vec<&DeclaredDependency> = dependencies
        .iter()
        .filter(|dep| {
            let keep = dep.applies(envs, &installed.extras);
            if !keep {
                debug!(dependency = %dep, "skipping dependency of an unselected extra");
            }
            keep
        })
        .collect();
    let dep_names: Vec<String> = filtered.iter().map(|dep| dep.key()).collect();

    let mut pending: Vec<String> = dependents.to_vec();

    for key in requirements.names() {
        if key == installed_key {
            continue;
        }
        let Some(record) = requirements.get_mut(&key) else {
            continue;
        };
        if let Some(pos) = pending.iter().position(|d| d.to_lowercase() == key) {
            pending.remove(pos);
            if !installed.used_by(&key) && installed.usage.add(record.name.clone(), "").is_ok() {
                report.changes.push(UsageChange::Added {
                    library: installed.name.clone(),
                    user: record.name.clone(),
                });
            }
        }
        if record.used_by(&installed_key)
            && !dep_names.contains(&canonical_name(&key))
            && record.usage.remove_ignore_missing(&installed_key).is_some()
        {
            report.changes.push(UsageChange::Removed {
                library: record.name.clone(),
                user: installed.name.clone(),
            });
        }
    }

    for dep in filtered {
        if dep.key() == installed_canonical {
            continue;
        }
        let record_key = requirements
            .names()
            .into_iter()
            .find(|key| canonical_name(key) == dep.key());
        let Some(record) = record_key.and_then(|key| requirements.get_mut(&key)) else {
            report.advisories.push(Advisory::MissingDependency {
                name: dep.name.clone(),
                specifier: dep.specifier_or_any().to_string(),
                marker: dep.marker.clone(),
            });
            continue;
        };
        if !dep.is_satisfied_by(record.version.as_deref()) {
            let specifier = dep.specifier_or_any().to_string();
            report.advisories.push(if record.git {
                Advisory::UpdateGitDependency {
                    name: record.name.clone(),
                    specifier,
                }
            } else {
                Advisory::UpdateDependency {
                    name: record.name.clone(),
                    version: record.version.clone(),
                    specifier,
                }
            });
        }
        if !record.used_by(&installed_key) && record.usage.add(installed.name.clone(), "").is_ok() {
            record.usage.clear_placeholder();
            report.changes.push(UsageChange::Added {
                library: record.name.clone(),
                user: installed.name.clone(),
            });
        }
    }

    for dependent in pending {
        let user = if dependent.eq_ignore_ascii_case(HOST_PROJECT) {
            HOST_PROJECT.to_string()
        } else {
            dependent
        };
        if !installed.used_by(&user) && installed.usage.add(user.clone(), "").is_ok() {
            report.changes.push(UsageChange::Added {
                library: installed.name.clone(),
                user,
            });
        }
    }

    let has_real_users = installed
        .usage
        .ordered()
        .iter()
        .any(|entry| !entry.is_placeholder());
    if has_real_users {
        installed.usage.clear_placeholder();
    } else if installed.usage.is_empty() {
        installed.usage.mark_needs_review();
    }

    for change in &report.changes {
        info!("{change}");
    }
    for advisory in &report.advisories {
        warn!("{advisory}");
    }
    report
}

/// Union of the dependencies declared under Python 2 and Python 3. Entries
/// found on one side only are restricted to that major version.
///
/// # Errors
/// Returns [`DependencyError`] when a restricted marker cannot be rebuilt.
pub fn merge_major_dependencies(
    py2: &[DeclaredDependency],
    py3: &[DeclaredDependency],
) -> Result<Vec<DeclaredDependency>, DependencyError> {
    let mut merged: Vec<DeclaredDependency> = Vec::new();
    for (major, own, other) in [(2, py2, py3), (3, py3, py2)] {
        for dep in own {
            if merged.contains(dep) {
                continue;
            }
            let unique = !other.contains(dep);
            let mentions_python = dep
                .marker
                .as_deref()
                .is_some_and(|marker| marker.contains("python_version"));
            if unique && !mentions_python {
                let marker = match dep.marker.as_deref() {
                    Some(existing) => {
                        format!("({existing}) and python_version == '{major}.*'")
                    }
                    None => format!("python_version == '{major}.*'"),
                };
                merged.push(dep.with_marker(&marker)?);
            } else {
                merged.push(dep.clone());
            }
        }
    }
    Ok(merged)
}

/// Install folders for `target` given the requested Python majors.
pub fn folders_for_targets(target: &str, py2: bool, py3: bool) -> Vec<String> {
    if !py2 && !py3 {
        return vec![target.to_string()];
    }
    let mut folders = Vec::new();
    if py2 {
        folders.push(format!("{target}2"));
    }
    if py3 {
        folders.push(format!("{target}3"));
    }
    folders
}

/// Marker environment for a CPython `python_version` on the current OS.
///
/// # Errors
/// Returns an error when `python_version` is not a PEP 440 version.
pub fn marker_environment(python_version: &str) -> Result<MarkerEnvironment> {
    let full_version = if python_version.matches('.').count() >= 2 {
        python_version.to_string()
    } else {
        format!("{python_version}.0")
    };
    let (os_name, platform_system, sys_platform) = match std::env::consts::OS {
        "windows" => ("nt", "Windows", "win32"),
        "macos" => ("posix", "Darwin", "darwin"),
        other => ("posix", "Linux", other),
    };
    Ok(MarkerEnvironment {
        implementation_name: "cpython".into(),
        implementation_version: string_version(&full_version)?,
        os_name: os_name.into(),
        platform_machine: std::env::consts::ARCH.into(),
        platform_python_implementation: "CPython".into(),
        platform_release: String::new(),
        platform_system: platform_system.into(),
        platform_version: String::new(),
        python_full_version: string_version(&full_version)?,
        python_version: string_version(python_version)?,
        sys_platform: sys_platform.into(),
    })
}

fn string_version(value: &str) -> Result<StringVersion> {
    StringVersion::from_str(value)
        .map_err(|err| anyhow!("`{value}` is not a valid PEP 440 version: {err}"))
}
