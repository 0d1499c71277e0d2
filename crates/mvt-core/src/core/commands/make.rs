//! Manifest rewriting commands: `sort` and `make`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use mvt_domain::{load_requirements, make_md, sort_lines, VendoredList};
use serde_json::json;
use tracing::{debug, warn};

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

use super::{missing_file_outcome, DEFAULT_EXT_README, DEFAULT_LIB_README};

#[derive(Clone, Debug)]
pub struct SortRequest {
    pub files: Vec<PathBuf>,
}

impl Default for SortRequest {
    fn default() -> Self {
        Self {
            files: vec![
                PathBuf::from(DEFAULT_EXT_README),
                PathBuf::from(DEFAULT_LIB_README),
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct MakeRequest {
    pub infile: PathBuf,
    pub outfile: PathBuf,
}

/// Sorts the table rows of each list file by package name.
///
/// # Errors
/// Returns an error when a file cannot be read or written.
pub fn sort_manifests(ctx: &CommandContext, request: &SortRequest) -> Result<ExecutionOutcome> {
    let mut lines = Vec::new();
    let mut sorted = Vec::new();
    for file in &request.files {
        let path = ctx.resolve(file);
        if !ctx.fs().exists(&path) {
            debug!(path = %path.display(), "no list file, skipping");
            lines.push(format!("Skipped {} (not found)", file.display()));
            continue;
        }
        let text = ctx.fs().read_to_string(&path)?;
        let output = match sort_lines(&text) {
            Ok(output) => output,
            Err(err) => {
                let mut lines = lines;
                lines.extend(err.to_string().lines().map(ToString::to_string));
                return Ok(user_error_with_hint(
                    format!("unable to sort {}", file.display()),
                    "fix the row shown above, then re-run `mvt sort`",
                    json!({ "path": file.display().to_string(), "lines": lines }),
                ));
            }
        };
        if output != text {
            ctx.fs().write(&path, output.as_bytes())?;
        }
        lines.push(format!("Sorted {}", file.display()));
        sorted.push(file.display().to_string());
    }
    Ok(ExecutionOutcome::success(
        format!("sorted {} list file(s)", sorted.len()),
        json!({ "files": sorted, "lines": lines }),
    ))
}

/// Renders a canonical manifest from `requirements.json`, or normalizes an
/// existing markdown manifest.
///
/// # Errors
/// Returns an error when files cannot be read or written.
pub fn make_manifest(ctx: &CommandContext, request: &MakeRequest) -> Result<ExecutionOutcome> {
    let inpath = ctx.resolve(&request.infile);
    if !ctx.fs().exists(&inpath) {
        return Ok(missing_file_outcome(
            &request.infile,
            "pass the input with `-i <infile>`",
        ));
    }
    let is_markdown = inpath.extension().is_some_and(|ext| ext == "md");
    let (list, outpath) = if is_markdown {
        let (list, errors) = load_requirements(&inpath)?;
        for err in &errors {
            warn!(line = ?err.line_no, section = %err.section, "dropping unparseable row");
        }
        // A markdown input with the default output is rewritten in place.
        let outpath = if request.outfile == Path::new(DEFAULT_EXT_README) {
            inpath.clone()
        } else {
            ctx.resolve(&request.outfile)
        };
        (list, outpath)
    } else {
        let text = ctx.fs().read_to_string(&inpath)?;
        let list = match serde_json::from_str(&text)
            .map_err(anyhow::Error::from)
            .and_then(VendoredList::from_json)
        {
            Ok(list) => list,
            Err(err) => {
                return Ok(user_error_with_hint(
                    format!("invalid requirements JSON in {}", request.infile.display()),
                    "regenerate it with `mvt gen --json`",
                    json!({ "reason": format!("{err:#}") }),
                ))
            }
        };
        (list, ctx.resolve(&request.outfile))
    };

    if let Some(parent) = outpath.parent() {
        ctx.fs().create_dir_all(parent)?;
    }
    ctx.fs().write(&outpath, make_md(&list).as_bytes())?;
    Ok(ExecutionOutcome::success(
        format!("wrote {}", outpath.display()),
        json!({
            "outfile": outpath.display().to_string(),
            "count": list.len(),
            "lines": [format!("Wrote {} package(s) to {}", list.len(), outpath.display())],
        }),
    ))
}
