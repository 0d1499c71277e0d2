mod metadata;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use mvt_domain::canonical_name;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::runtime::effects::Installer;
use crate::core::runtime::process::run_command;

pub use metadata::{
    parse_direct_url, parse_metadata, top_level_modules, CoreMetadata, DirectUrl, VcsInfo,
};

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"github\.com/(?P<slug>[^/]+?/[^/]+?)/[^/]+?/(?P<commit_ish>.+?)(?:\.tar\.gz|\.zip)?(?:#|$)",
    )
    .expect("github url pattern")
});

static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:](?P<slug>[^/]+/[^/]+?)(?:\.git)?/?$").expect("github repo pattern")
});

const INSTALL_SUBDIR: &str = "__install__";
const SCRATCH_PREFIX: &str = "mvt-install-";

/// Everything the installer needs to put one distribution into one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// PEP 508 requirement without markers, e.g. `six==1.15.0` or `adba @ <url>`.
    pub requirement: String,
    pub name: String,
    pub extras: Vec<String>,
    pub python: String,
    pub python2: bool,
    pub vendor_dir: PathBuf,
    /// Parent of the per-install scratch directory.
    pub temp_dir: PathBuf,
    pub keep_temp: bool,
}

/// What an install produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledDistribution {
    pub package_name: String,
    pub version: String,
    pub url: String,
    pub git: bool,
    pub branch: Option<String>,
    pub modules: Vec<String>,
    /// Requested extras the distribution actually provides.
    pub extras: Vec<String>,
    pub provides_extras: Vec<String>,
    pub requires_dist: Vec<String>,
}

#[derive(Debug, Error)]
pub enum InstallFailed {
    #[error("pip exited with status {code}: {stderr}")]
    Pip { code: i32, stderr: String },
    #[error("no installed metadata found for `{0}`")]
    MissingMetadata(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub(crate) fn requires_dist(installed: &InstalledDistribution) -> Vec<String> {
    installed.requires_dist.clone()
}

/// Rewrites GitHub archive links into a `git+` URL so pip records the
/// resolved commit in `direct_url.json`.
pub fn pip_requirement(requirement: &str) -> String {
    let Some((package, url)) = requirement.split_once(" @ ") else {
        return requirement.to_string();
    };
    let url = url.trim();
    if url.starts_with("git+") {
        return requirement.to_string();
    }
    let Some(caps) = GITHUB_URL.captures(url) else {
        return requirement.to_string();
    };
    let slug = &caps["slug"];
    let commit_ish = &caps["commit_ish"];
    if commit_ish.contains('/') {
        return requirement.to_string();
    }
    if commit_ish == "HEAD" {
        format!("{package} @ git+https://github.com/{slug}.git")
    } else {
        format!("{package} @ git+https://github.com/{slug}.git@{commit_ish}")
    }
}

/// Installs with `<python> -m pip install --target` and moves the result into place.
pub struct PipInstaller;

impl Installer for PipInstaller {
    fn install(&self, request: &InstallRequest) -> Result<InstalledDistribution, InstallFailed> {
        // `temp_dir` only hosts the scratch directory; it is never removed itself.
        fs::create_dir_all(&request.temp_dir)
            .with_context(|| format!("creating {}", request.temp_dir.display()))?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .keep(request.keep_temp)
            .tempdir_in(&request.temp_dir)
            .with_context(|| {
                format!("creating scratch directory in {}", request.temp_dir.display())
            })?;
        let install_dir = scratch.path().join(INSTALL_SUBDIR);
        fs::create_dir_all(&install_dir)
            .with_context(|| format!("creating {}", install_dir.display()))?;

        let result = self.install_into(request, scratch.path(), &install_dir);
        if request.keep_temp {
            debug!(path = %scratch.path().display(), "keeping install scratch directory");
        } else {
            let path = scratch.path().to_path_buf();
            if let Err(err) = scratch.close() {
                warn!(path = %path.display(), %err, "failed to remove scratch directory");
            }
        }
        result
    }
}

impl PipInstaller {
    fn install_into(
        &self,
        request: &InstallRequest,
        scratch: &Path,
        install_dir: &Path,
    ) -> Result<InstalledDistribution, InstallFailed> {
        let spec = pip_requirement(&request.requirement);
        let mut args: Vec<String> = [
            "-m",
            "pip",
            "install",
            "--no-deps",
            "--no-compile",
            "--disable-pip-version-check",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        if request.python2 {
            args.extend(["--progress-bar".to_string(), "off".to_string()]);
        }
        args.extend([
            "--target".to_string(),
            install_dir.display().to_string(),
            spec.clone(),
        ]);
        info!(requirement = %spec, python = %request.python, "installing");
        let output = run_command(&request.python, &args, &[], scratch)?;
        if !output.success() {
            return Err(InstallFailed::Pip {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let dist_info = find_dist_info(install_dir, &request.name)?
            .ok_or_else(|| InstallFailed::MissingMetadata(request.name.clone()))?;
        let metadata_text = fs::read_to_string(dist_info.join("METADATA"))
            .map_err(|_| InstallFailed::MissingMetadata(request.name.clone()))?;
        let metadata = parse_metadata(&metadata_text);
        let record = fs::read_to_string(dist_info.join("RECORD"))
            .with_context(|| format!("reading RECORD of {}", metadata.name))?;
        let modules = top_level_modules(&record, install_dir, &metadata.name);
        let direct_url = match fs::read_to_string(dist_info.join("direct_url.json")) {
            Ok(text) => Some(parse_direct_url(&text).context("parsing direct_url.json")?),
            Err(_) => None,
        };

        let mut installed = describe(metadata, direct_url.as_ref(), &request.extras);
        installed.modules = modules;

        prune_install_tree(install_dir, &dist_info)?;
        merge_move(install_dir, &request.vendor_dir)?;
        info!(
            package = %installed.package_name,
            version = %installed.version,
            target = %request.vendor_dir.display(),
            "installed"
        );
        Ok(installed)
    }
}

/// Version, origin URL and extras from the installed metadata.
fn describe(
    metadata: CoreMetadata,
    direct_url: Option<&DirectUrl>,
    requested_extras: &[String],
) -> InstalledDistribution {
    let extras = select_extras(requested_extras, &metadata.provides_extra, &metadata.name);
    let vcs = direct_url.and_then(|direct| direct.vcs_info.as_ref().map(|vcs| (direct, vcs)));
    let (version, url, git, branch) = match vcs {
        Some((direct, vcs)) => {
            let url = GITHUB_REPO.captures(direct.url.trim()).map_or_else(
                || direct.url.clone(),
                |caps| format!("https://github.com/{}/tree/{}", &caps["slug"], vcs.commit_id),
            );
            let branch = vcs
                .requested_revision
                .clone()
                .filter(|rev| *rev != vcs.commit_id && rev != "HEAD");
            (vcs.commit_id.clone(), url, true, branch)
        }
        None => {
            let url = format!(
                "https://pypi.org/project/{}/{}/",
                metadata.name, metadata.version
            );
            (metadata.version.clone(), url, false, None)
        }
    };
    InstalledDistribution {
        package_name: metadata.name,
        version,
        url,
        git,
        branch,
        modules: Vec::new(),
        extras,
        provides_extras: metadata.provides_extra,
        requires_dist: metadata.requires_dist,
    }
}

fn select_extras(requested: &[String], provided: &[String], name: &str) -> Vec<String> {
    let provided: Vec<String> = provided.iter().map(|e| canonical_name(e)).collect();
    let (known, unknown): (Vec<&String>, Vec<&String>) = requested
        .iter()
        .partition(|extra| provided.contains(&canonical_name(extra)));
    if !unknown.is_empty() {
        warn!(
            package = name,
            extras = ?unknown,
            "requested extras are not provided by the distribution"
        );
    }
    known.into_iter().cloned().collect()
}

fn find_dist_info(install_dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(install_dir)
        .with_context(|| format!("reading {}", install_dir.display()))?
    {
        let path = entry?.path();
        let is_dist_info = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".dist-info"));
        if is_dist_info && path.is_dir() {
            candidates.push(path);
        }
    }
    if candidates.len() <= 1 {
        return Ok(candidates.pop());
    }
    let wanted = canonical_name(name);
    Ok(candidates.into_iter().find(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".dist-info"))
            .and_then(|n| n.split('-').next())
            .is_some_and(|project| canonical_name(project) == wanted)
    }))
}

/// Drops the entry points, test suites, compiled extensions and metadata
/// that never get vendored.
fn prune_install_tree(install_dir: &Path, dist_info: &Path) -> Result<()> {
    fs::remove_dir_all(dist_info)
        .with_context(|| format!("removing {}", dist_info.display()))?;
    for name in ["bin", "tests"] {
        let path = install_dir.join(name);
        if path.is_dir() {
            debug!(path = %path.display(), "dropping");
            fs::remove_dir_all(&path).with_context(|| format!("removing {}", path.display()))?;
        }
    }
    let compiled: Vec<PathBuf> = WalkDir::new(install_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "pyd"))
        .collect();
    for path in compiled {
        debug!(path = %path.display(), "dropping compiled extension");
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}

/// Moves every entry of `src` into `dst`, merging directories that already exist.
fn merge_move(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("creating {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let from = entry?.path();
        let Some(name) = from.file_name() else {
            continue;
        };
        let to = dst.join(name);
        if from.is_dir() && to.is_dir() {
            merge_move(&from, &to)?;
            continue;
        }
        if to.is_dir() {
            fs::remove_dir_all(&to).with_context(|| format!("replacing {}", to.display()))?;
        } else if to.exists() {
            fs::remove_file(&to).with_context(|| format!("replacing {}", to.display()))?;
        }
        fs::rename(&from, &to)
            .with_context(|| format!("moving {} to {}", from.display(), to.display()))?;
    }
    Ok(())
}
