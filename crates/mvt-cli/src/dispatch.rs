use color_eyre::Result;
use mvt_core::{
    CheckRequest, CommandContext, CommandGroup, CommandInfo, ExecutionOutcome, GenRequest,
    MakeRequest, ParseRequest, RemoveRequest, SortRequest, UpdateRequest, VendorRequest,
};
use tracing::debug;

use crate::cli::CommandGroupCli;

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Vendor(args) => {
            let info = CommandInfo::new(CommandGroup::Vendor, "vendor");
            let request = VendorRequest {
                package: args.package.clone(),
                py2: args.py2,
                py3: args.py3,
                dependents: args.dependents.clone(),
                listfile: args.list.listfile.clone(),
            };
            core_call(info, || mvt_core::vendor_package(ctx, &request))
        }
        CommandGroupCli::Remove(args) => {
            let info = CommandInfo::new(CommandGroup::Remove, "remove");
            let request = RemoveRequest {
                package: args.package.clone(),
                listfile: args.list.listfile.clone(),
            };
            core_call(info, || mvt_core::remove_package(ctx, &request))
        }
        CommandGroupCli::Update(args) => {
            let info = CommandInfo::new(CommandGroup::Update, "update");
            let request = UpdateRequest {
                package: args.package.clone(),
                listfile: args.list.listfile.clone(),
                cmd: args.cmd,
            };
            core_call(info, || mvt_core::update_package(ctx, &request))
        }
        CommandGroupCli::Gen(args) => {
            let info = CommandInfo::new(CommandGroup::Gen, "gen");
            let request = GenRequest {
                infile: args.infile.clone(),
                outfile: args.outfile.clone(),
                all_packages: args.all_packages,
                json: args.json_output,
            };
            core_call(info, || mvt_core::generate_requirements(ctx, &request))
        }
        CommandGroupCli::Parse(args) => {
            let info = CommandInfo::new(CommandGroup::Parse, "parse");
            let request = ParseRequest {
                file: args.file.clone(),
            };
            core_call(info, || mvt_core::parse_manifest(ctx, &request))
        }
        CommandGroupCli::Check(args) => {
            let info = CommandInfo::new(CommandGroup::Check, "check");
            let request = CheckRequest {
                file: args.file.clone(),
            };
            core_call(info, || mvt_core::check_manifest(ctx, &request))
        }
        CommandGroupCli::Sort => {
            let info = CommandInfo::new(CommandGroup::Sort, "sort");
            let request = SortRequest::default();
            core_call(info, || mvt_core::sort_manifests(ctx, &request))
        }
        CommandGroupCli::Make(args) => {
            let info = CommandInfo::new(CommandGroup::Make, "make");
            let request = MakeRequest {
                infile: args.infile.clone(),
                outfile: args.outfile.clone(),
            };
            core_call(info, || mvt_core::make_manifest(ctx, &request))
        }
    }
}

/// Runs a core command, turning unexpected errors into a `Failure` outcome.
fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    debug!(command = %info.group, "running");
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
            Ok((
                info,
                ExecutionOutcome::failure(
                    err.to_string(),
                    serde_json::json!({
                        "reason": "internal_error",
                        "error": err.to_string(),
                        "issues": issues,
                    }),
                ),
            ))
        }
    }
}
