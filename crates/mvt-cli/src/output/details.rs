use serde_json::Value;

pub(super) fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

pub(super) fn lines_from_details(details: &Value) -> Vec<&str> {
    details
        .as_object()
        .and_then(|map| map.get("lines"))
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Cause chain of an internal error, outermost first.
pub(super) fn issues_from_details(details: &Value) -> Vec<&str> {
    details
        .as_object()
        .and_then(|map| map.get("issues"))
        .and_then(Value::as_array)
        .map(|issues| issues.iter().skip(1).filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
