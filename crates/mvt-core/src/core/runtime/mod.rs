pub mod effects;
pub mod process;

use std::fmt;

use serde_json::{json, Value};

use crate::core::config::context::CommandInfo;
use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};

pub const MVT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Vendor,
    Remove,
    Update,
    Gen,
    Parse,
    Check,
    Sort,
    Make,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Vendor => "vendor",
            CommandGroup::Remove => "remove",
            CommandGroup::Update => "update",
            CommandGroup::Gen => "gen",
            CommandGroup::Parse => "parse",
            CommandGroup::Check => "check",
            CommandGroup::Sort => "sort",
            CommandGroup::Make => "make",
        };
        f.write_str(name)
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome, _code: i32) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("mvt {}", info.name)
    } else {
        format!("mvt {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_is_prefixed_once() {
        let info = CommandInfo::new(CommandGroup::Gen, "gen");
        assert_eq!(format_status_message(info, ""), "mvt gen");
        assert_eq!(format_status_message(info, "wrote 3"), "mvt gen: wrote 3");
        assert_eq!(format_status_message(info, "mvt gen: done"), "mvt gen: done");
    }

    #[test]
    fn json_response_wraps_non_object_details() {
        let info = CommandInfo::new(CommandGroup::Parse, "parse");
        let outcome = ExecutionOutcome::user_error("bad rows", json!(["a"]));
        let payload = to_json_response(info, &outcome, 1);
        assert_eq!(payload["status"], "user-error");
        assert_eq!(payload["message"], "mvt parse: bad rows");
        assert_eq!(payload["details"]["value"][0], "a");
    }
}
