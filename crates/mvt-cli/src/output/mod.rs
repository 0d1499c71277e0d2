mod details;

use atty::Stream;
use color_eyre::Result;
use mvt_core::{CommandInfo, CommandStatus, ExecutionOutcome};

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub const fn exit_code(status: &CommandStatus) -> i32 {
    match status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    }
}

/// Prints an outcome and returns the process exit code.
///
/// Successful runs go to stdout and are silenced by `--quiet`; user errors and
/// failures always go to stderr.
pub fn emit_output(
    opts: &OutputOptions,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = exit_code(&outcome.status);

    if opts.json {
        let payload = mvt_core::to_json_response(info, outcome, code);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let message = mvt_core::format_status_message(info, &outcome.message);
    let lines = details::lines_from_details(&outcome.details);
    let hint = details::hint_from_details(&outcome.details);
    match outcome.status {
        CommandStatus::Ok => {
            if opts.quiet {
                return Ok(code);
            }
            let style = Style::new(opts.no_color, atty::is(Stream::Stdout));
            println!("{}", style.status(&outcome.status, &message));
            for line in lines {
                println!("{}", style.body(line));
            }
            if let Some(hint) = hint {
                println!("{}", style.info(&format!("Hint: {hint}")));
            }
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            let style = Style::new(opts.no_color, atty::is(Stream::Stderr));
            eprintln!("{}", style.status(&outcome.status, &message));
            for line in lines {
                eprintln!("{}", style.body(line));
            }
            for issue in details::issues_from_details(&outcome.details) {
                eprintln!("  caused by: {issue}");
            }
            if let Some(hint) = hint {
                eprintln!("{}", style.info(&format!("Hint: {hint}")));
            }
        }
    }
    Ok(code)
}
