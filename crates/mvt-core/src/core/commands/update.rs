use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Value};
use tracing::warn;

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

use super::vendor::{vendor_package, VendorRequest};
use super::{missing_file_outcome, quote_arg, ListLayout, DEFAULT_EXT_README};

#[derive(Clone, Debug)]
pub struct UpdateRequest {
    pub package: String,
    pub listfile: PathBuf,
    /// Only print the vendor command instead of running it.
    pub cmd: bool,
}

/// Re-vendors a listed library from its update requirement.
///
/// # Errors
/// Propagates failures of the underlying vendor run.
pub fn update_package(ctx: &CommandContext, request: &UpdateRequest) -> Result<ExecutionOutcome> {
    let layout = ListLayout::new(ctx, &request.listfile);
    let Some(document) = layout.load(ctx)? else {
        return Ok(missing_file_outcome(
            &request.listfile,
            "pass the manifest to read with `-f <listfile>`",
        ));
    };
    for err in document.errors() {
        warn!(line = ?err.line_no, section = %err.section, "skipping unparseable row");
    }
    let wanted = request.package.to_lowercase();
    let Some(library) = document.libraries().find(|lib| lib.key() == wanted) else {
        return Ok(user_error_with_hint(
            format!("Package `{}` not found.", request.package),
            "run `mvt parse <listfile>` to list the recorded packages",
            json!({ "package": request.package }),
        ));
    };
    let Some(requirement) = library.as_update_requirement() else {
        return Ok(user_error_with_hint(
            format!("Package `{}` found, but can not be updated.", request.package),
            "records without an origin URL, or pinned to a single file, must be re-vendored by hand",
            json!({ "package": library.name }),
        ));
    };
    let quoted = quote_arg(&requirement);

    if request.cmd {
        let command = if is_default_listfile(ctx, &layout.listpath) {
            format!("mvt vendor {quoted}")
        } else {
            let listfile = quote_arg(&request.listfile.display().to_string());
            format!("mvt vendor -f {listfile} {quoted}")
        };
        return Ok(ExecutionOutcome::success(
            format!("vendor command for `{}`", library.package()),
            json!({
                "package": library.name,
                "command": command,
                "lines": [format!("> {command}")],
            }),
        ));
    }

    let package = library.package();
    let mut outcome = vendor_package(
        ctx,
        &VendorRequest {
            package: requirement,
            py2: false,
            py3: false,
            dependents: Vec::new(),
            listfile: request.listfile.clone(),
        },
    )?;
    prepend_line(
        &mut outcome.details,
        format!("Running vendor command for `{package}`: mvt vendor {quoted}"),
    );
    Ok(outcome)
}

fn is_default_listfile(ctx: &CommandContext, listpath: &Path) -> bool {
    let default = mvt_domain::lexical_normalize(&ctx.resolve(Path::new(DEFAULT_EXT_README)));
    default == listpath
}

fn prepend_line(details: &mut Value, line: String) {
    let Some(map) = details.as_object_mut() else {
        return;
    };
    let lines = map
        .entry("lines")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(array) = lines.as_array_mut() {
        array.insert(0, Value::String(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_creates_or_extends_lines() {
        let mut details = json!({ "lines": ["b"] });
        prepend_line(&mut details, "a".into());
        assert_eq!(details["lines"], json!(["a", "b"]));

        let mut empty = json!({});
        prepend_line(&mut empty, "only".into());
        assert_eq!(empty["lines"], json!(["only"]));
    }
}
