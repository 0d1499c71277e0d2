//! Read-only commands: `parse` and `check`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use mvt_domain::module_check_paths;
use serde_json::json;

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

use super::{missing_file_outcome, ListLayout};

#[derive(Clone, Debug)]
pub struct ParseRequest {
    pub file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CheckRequest {
    pub file: PathBuf,
}

/// Reports every package that parsed and every row that did not.
///
/// # Errors
/// Returns an error when the file cannot be read.
pub fn parse_manifest(ctx: &CommandContext, request: &ParseRequest) -> Result<ExecutionOutcome> {
    let layout = ListLayout::new(ctx, &request.file);
    let Some(document) = layout.load(ctx)? else {
        return Ok(missing_file_outcome(&request.file, "pass an existing list file"));
    };
    let mut lines = Vec::new();
    let mut packages = Vec::new();
    for row in document.rows() {
        match row {
            Ok(lib) => {
                lines.push(format!("Parsed package: {}", lib.name));
                packages.push(lib.name.clone());
            }
            Err(err) => lines.extend(err.to_string().lines().map(ToString::to_string)),
        }
    }
    let failed = document.errors().count();
    if failed > 0 {
        return Ok(user_error_with_hint(
            format!("{failed} row(s) of {} failed to parse", request.file.display()),
            "fix the rows shown above",
            json!({ "packages": packages, "failed": failed, "lines": lines }),
        ));
    }
    Ok(ExecutionOutcome::success(
        format!("parsed {} package(s)", packages.len()),
        json!({ "packages": packages, "failed": 0, "lines": lines }),
    ))
}

/// Verifies that every module of every record exists in each of its folders.
///
/// # Errors
/// Returns an error when the file cannot be read.
pub fn check_manifest(ctx: &CommandContext, request: &CheckRequest) -> Result<ExecutionOutcome> {
    let layout = ListLayout::new(ctx, &request.file);
    let Some(document) = layout.load(ctx)? else {
        return Ok(missing_file_outcome(&request.file, "pass an existing list file"));
    };
    let mut lines = Vec::new();
    for err in document.errors() {
        lines.extend(err.to_string().lines().map(ToString::to_string));
    }
    let mut missing = Vec::new();
    for lib in document.libraries() {
        for check in module_check_paths(lib, &layout.root) {
            if check.paths.iter().all(|path| ctx.fs().exists(path)) {
                continue;
            }
            let relative: Vec<String> = check
                .paths
                .iter()
                .map(|path| relative_display(path, &layout.root))
                .collect();
            lines.push(format!(
                "XX {} !!  NOT FOUND IN: [{}]",
                check.module,
                relative.join(", ")
            ));
            missing.push(json!({ "package": lib.name, "module": check.module, "paths": relative }));
        }
    }
    if !missing.is_empty() {
        return Ok(user_error_with_hint(
            format!("{} module(s) not found", missing.len()),
            "re-vendor the affected packages with `mvt vendor`, or fix their module lists",
            json!({ "missing": missing, "lines": lines }),
        ));
    }
    lines.push("Done.".to_string());
    Ok(ExecutionOutcome::success(
        "all modules found",
        json!({ "missing": missing, "lines": lines }),
    ))
}

fn relative_display(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_display(&root.join("ext").join("six.py"), root),
            "ext/six.py"
        );
        assert_eq!(relative_display(Path::new("other/x"), root), "other/x");
    }
}
