use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mvt_domain::{render_requirements_json, render_requirements_txt, select_requirements};
use serde_json::json;
use tracing::warn;

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::ExecutionOutcome;

use super::{missing_file_outcome, read_document, DEFAULT_REQUIREMENTS_JSON, DEFAULT_REQUIREMENTS_TXT};

#[derive(Clone, Debug)]
pub struct GenRequest {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub all_packages: bool,
    pub json: bool,
}

impl GenRequest {
    /// `--json` with the default output name writes `requirements.json`.
    pub fn effective_outfile(&self) -> PathBuf {
        if self.json && self.outfile == Path::new(DEFAULT_REQUIREMENTS_TXT) {
            PathBuf::from(DEFAULT_REQUIREMENTS_JSON)
        } else {
            self.outfile.clone()
        }
    }
}

/// Writes the pinned requirements of a manifest as text or JSON.
///
/// # Errors
/// Returns an error when the output cannot be written.
pub fn generate_requirements(ctx: &CommandContext, request: &GenRequest) -> Result<ExecutionOutcome> {
    let inpath = ctx.resolve(&request.infile);
    let Some(document) = read_document(ctx, &inpath)? else {
        return Ok(missing_file_outcome(
            &request.infile,
            "pass the manifest to read with `-i <infile>`",
        ));
    };
    let mut lines = Vec::new();
    for err in document.errors() {
        warn!(line = ?err.line_no, section = %err.section, "skipping unparseable row");
        lines.extend(err.to_string().lines().map(ToString::to_string));
    }
    let list = document
        .to_list_lossy()
        .with_context(|| format!("invalid manifest {}", inpath.display()))?;
    let selected = select_requirements(&list, request.all_packages);
    let data = if request.json {
        render_requirements_json(&selected)?
    } else {
        render_requirements_txt(&selected)
    };

    let outfile = request.effective_outfile();
    let outpath = ctx.resolve(&outfile);
    if let Some(parent) = outpath.parent() {
        ctx.fs().create_dir_all(parent)?;
    }
    ctx.fs().write(&outpath, data.as_bytes())?;
    lines.push(format!(
        "Wrote {} requirement(s) to {}",
        selected.len(),
        outfile.display()
    ));
    Ok(ExecutionOutcome::success(
        format!("generated {}", outfile.display()),
        json!({
            "outfile": outpath.display().to_string(),
            "count": selected.len(),
            "skipped_rows": document.errors().count(),
            "lines": lines,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_switches_default_outfile_only() {
        let mut request = GenRequest {
            infile: PathBuf::from("ext/readme.md"),
            outfile: PathBuf::from(DEFAULT_REQUIREMENTS_TXT),
            all_packages: false,
            json: true,
        };
        assert_eq!(request.effective_outfile(), PathBuf::from("requirements.json"));
        request.outfile = PathBuf::from("out/reqs.txt");
        assert_eq!(request.effective_outfile(), PathBuf::from("out/reqs.txt"));
        request.json = false;
        request.outfile = PathBuf::from(DEFAULT_REQUIREMENTS_TXT);
        assert_eq!(request.effective_outfile(), PathBuf::from("requirements.txt"));
    }
}
