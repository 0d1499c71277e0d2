//! One request/outcome function per `mvt` command.

mod inspect;
mod make;
mod remove;
mod requirements;
mod update;
mod vendor;

use std::path::{Path, PathBuf};

use anyhow::Result;
use mvt_domain::{
    lexical_normalize, package_module_paths, render_requirements_txt, select_requirements,
    LineParseError, ManifestDocument, VendoredLibrary, VendoredList, DEFAULT_TARGET,
};
use serde_json::json;
use tracing::debug;

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

pub use inspect::{check_manifest, parse_manifest, CheckRequest, ParseRequest};
pub use make::{make_manifest, sort_manifests, MakeRequest, SortRequest};
pub use remove::{remove_package, RemoveRequest};
pub use requirements::{generate_requirements, GenRequest};
pub use update::{update_package, UpdateRequest};
pub use vendor::{vendor_package, PackageSpec, VendorRequest};

pub const DEFAULT_EXT_README: &str = "ext/readme.md";
pub const DEFAULT_LIB_README: &str = "lib/readme.md";
pub const DEFAULT_REQUIREMENTS_TXT: &str = "requirements.txt";
pub const DEFAULT_REQUIREMENTS_JSON: &str = "requirements.json";

/// Where a list file sits: `<root>/<target>/readme.md`.
#[derive(Debug, Clone)]
pub(crate) struct ListLayout {
    pub(crate) listpath: PathBuf,
    pub(crate) root: PathBuf,
    pub(crate) target: String,
}

impl ListLayout {
    pub(crate) fn new(ctx: &CommandContext, listfile: &Path) -> Self {
        let listpath = lexical_normalize(&ctx.resolve(listfile));
        let parent = listpath.parent().unwrap_or(ctx.cwd());
        let target = parent
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_TARGET)
            .to_string();
        let root = parent.parent().unwrap_or(parent).to_path_buf();
        Self {
            listpath,
            root,
            target,
        }
    }

    /// `ext/readme.md` style name for messages.
    pub(crate) fn display_name(&self) -> String {
        let parts: Vec<String> = self
            .listpath
            .components()
            .rev()
            .take(2)
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        parts.into_iter().rev().collect::<Vec<_>>().join("/")
    }

    pub(crate) fn load(&self, ctx: &CommandContext) -> Result<Option<ManifestDocument>> {
        read_document(ctx, &self.listpath)
    }

    /// Renders `list` through `document` and writes the list file.
    pub(crate) fn write(
        &self,
        ctx: &CommandContext,
        document: &ManifestDocument,
        list: &VendoredList,
    ) -> Result<()> {
        let folder = list.folder().unwrap_or_else(|| self.target.clone());
        if let Some(parent) = self.listpath.parent() {
            ctx.fs().create_dir_all(parent)?;
        }
        ctx.fs()
            .write(&self.listpath, document.render(list, &folder).as_bytes())
    }

    /// Rewrites `<root>/requirements.txt` for lists targeting `ext`.
    pub(crate) fn regenerate_requirements(
        &self,
        ctx: &CommandContext,
        list: &VendoredList,
        lines: &mut Vec<String>,
    ) -> Result<()> {
        let target = list.folder().unwrap_or_else(|| self.target.clone());
        if target != DEFAULT_TARGET {
            return Ok(());
        }
        lines.push(format!("Updating {DEFAULT_REQUIREMENTS_TXT}"));
        let path = self.root.join(DEFAULT_REQUIREMENTS_TXT);
        let data = render_requirements_txt(&select_requirements(list, false));
        ctx.fs().write(&path, data.as_bytes())
    }
}

pub(crate) fn read_document(ctx: &CommandContext, path: &Path) -> Result<Option<ManifestDocument>> {
    if !ctx.fs().exists(path) {
        return Ok(None);
    }
    let text = ctx.fs().read_to_string(path)?;
    Ok(Some(ManifestDocument::parse(&text)))
}

pub(crate) fn missing_file_outcome(path: &Path, hint: &str) -> ExecutionOutcome {
    user_error_with_hint(
        format!("`{}` does not exist", path.display()),
        hint,
        json!({ "path": path.display().to_string() }),
    )
}

/// Rows that failed to parse, rendered with their diagnostic blocks.
pub(crate) fn manifest_error_outcome(path: &Path, errors: &[LineParseError]) -> ExecutionOutcome {
    let lines: Vec<String> = errors
        .iter()
        .flat_map(|err| {
            err.to_string()
                .lines()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    let rows: Vec<usize> = errors.iter().filter_map(|err| err.line_no).collect();
    user_error_with_hint(
        format!(
            "{} has {} unparseable row(s)",
            path.display(),
            errors.len()
        ),
        "fix the rows shown above, then re-run the command",
        json!({
            "path": path.display().to_string(),
            "rows": rows,
            "lines": lines,
        }),
    )
}

/// Module paths to delete for `lib`; a namespace directory left holding
/// only its `__init__.py` is removed whole.
pub(crate) fn removal_paths(
    ctx: &CommandContext,
    lib: &VendoredLibrary,
    root: &Path,
) -> Result<Vec<PathBuf>> {
    let mut paths = package_module_paths(lib, root);
    for folder in &lib.folder {
        let target = lexical_normalize(&root.join(folder));
        for module in lib.modules.iter().filter(|m| m.contains('/')) {
            let Some((namespace, _)) = module.split_once('/') else {
                continue;
            };
            let ns_path = target.join(namespace);
            if !ctx.fs().is_dir(&ns_path) {
                continue;
            }
            let init = ns_path.join("__init__.py");
            let leftovers = ctx
                .fs()
                .list_dir(&ns_path)?
                .into_iter()
                .any(|entry| entry != init && !paths.contains(&entry));
            if leftovers {
                continue;
            }
            debug!(namespace = %ns_path.display(), "namespace left empty, removing it whole");
            paths.retain(|path| !path.starts_with(&ns_path));
            paths.push(ns_path);
        }
    }
    Ok(paths)
}

/// Deletes every path that exists, returning the ones removed.
pub(crate) fn remove_paths(ctx: &CommandContext, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in paths {
        if ctx.fs().is_dir(path) {
            ctx.fs().remove_dir_all(path)?;
        } else if ctx.fs().exists(path) {
            ctx.fs().remove_file(path)?;
        } else {
            debug!(path = %path.display(), "already gone");
            continue;
        }
        removed.push(path.clone());
    }
    Ok(removed)
}

pub(crate) fn path_list(paths: &[PathBuf]) -> String {
    let joined = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

/// Quotes a command-line argument containing spaces.
pub(crate) fn quote_arg(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_only_wraps_spaced_args() {
        assert_eq!(quote_arg("six"), "six");
        assert_eq!(
            quote_arg("adba @ https://x/y.tar.gz"),
            "\"adba @ https://x/y.tar.gz\""
        );
    }

    #[test]
    fn path_lists_are_bracketed() {
        let paths = vec![PathBuf::from("/r/ext/a"), PathBuf::from("/r/ext/b.py")];
        assert_eq!(path_list(&paths), "[/r/ext/a, /r/ext/b.py]");
        assert_eq!(path_list(&[]), "[]");
    }
}
