use std::path::PathBuf;

use anyhow::Result;
use mvt_domain::{ManifestError, UsageChange};
use serde_json::json;
use tracing::warn;

use crate::core::config::context::CommandContext;
use crate::core::tooling::outcome::{user_error_with_hint, ExecutionOutcome};

use super::{
    manifest_error_outcome, missing_file_outcome, path_list, removal_paths, remove_paths,
    ListLayout,
};

#[derive(Clone, Debug)]
pub struct RemoveRequest {
    pub package: String,
    pub listfile: PathBuf,
}

/// Drops a vendored library: its usage edges, its files and its row.
///
/// # Errors
/// Returns an error when files cannot be removed or the list cannot be written.
pub fn remove_package(ctx: &CommandContext, request: &RemoveRequest) -> Result<ExecutionOutcome> {
    let layout = ListLayout::new(ctx, &request.listfile);
    let Some(document) = layout.load(ctx)? else {
        return Ok(missing_file_outcome(
            &request.listfile,
            "pass the manifest to edit with `-f <listfile>`",
        ));
    };
    let mut requirements = match document.to_list() {
        Ok(list) => list,
        Err(ManifestError::Rows(errors)) => {
            return Ok(manifest_error_outcome(&layout.listpath, &errors))
        }
        Err(ManifestError::List(err)) => return Err(err.into()),
    };
    let Some(removed) = requirements.get(&request.package).cloned() else {
        return Ok(user_error_with_hint(
            format!("Package `{}` not found", request.package),
            "run `mvt parse <listfile>` to list the recorded packages",
            json!({ "package": request.package }),
        ));
    };
    let removed_key = removed.key();

    let mut lines = vec![format!("Starting removal of `{}`", removed.name)];
    let mut still_used = Vec::new();
    let mut unused = Vec::new();
    for key in requirements.names() {
        if key == removed_key {
            continue;
        }
        let Some(dep) = requirements.get_mut(&key) else {
            continue;
        };
        if removed.used_by(&key) {
            still_used.push(dep.name.clone());
        }
        if dep.usage.remove_ignore_missing(&removed_key).is_none() {
            continue;
        }
        lines.push(
            UsageChange::Removed {
                library: dep.name.clone(),
                user: removed.name.clone(),
            }
            .to_string(),
        );
        if dep.usage.is_empty() {
            unused.push(dep.name.clone());
        }
    }
    for name in &still_used {
        warn!(package = %removed.name, user = %name, "possibly still in use");
        lines.push(format!(
            "Warning: `{}` possibly still being used by `{name}`",
            removed.name
        ));
    }
    for name in &unused {
        warn!(package = %name, "possibly unused");
        lines.push(format!("Possibly unused: `{name}`, consider removing"));
    }

    let paths = removal_paths(ctx, &removed, &layout.root)?;
    lines.push(format!("Removing: {}", path_list(&paths)));
    let deleted = remove_paths(ctx, &paths)?;
    requirements.remove(&removed.name)?;

    lines.push(format!("Updating {}", layout.display_name()));
    layout.write(ctx, &document, &requirements)?;
    layout.regenerate_requirements(ctx, &requirements, &mut lines)?;

    Ok(ExecutionOutcome::success(
        format!("removed {}", removed.name),
        json!({
            "package": removed.name,
            "removed": deleted.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "still_used_by": still_used,
            "possibly_unused": unused,
            "lines": lines,
        }),
    ))
}
