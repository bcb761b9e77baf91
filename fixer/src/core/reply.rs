//! Parsing of structured model replies.
//!
//! Replies are JSON objects, optionally wrapped in a markdown fence. Each shape
//! is checked against its JSON schema before deserialization so that error
//! messages name the offending field.

use serde_json::{Map, Value};

use crate::core::diff::strip_code_fences;
use crate::core::types::{Plan, PlannerReply, SelectedFileSet, ToolRequest};
use crate::error::AgentError;

const TOOL_REQUEST_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/planner_tool_request.schema.json"
));
const PLAN_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/plan.schema.json"
));
const FILE_SELECTION_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/file_selection.schema.json"
));

/// Classify a planner reply as a tool request or a finalized plan.
///
/// `action` is the discriminant: its presence makes the reply a tool request.
/// Without it the reply must be a plan. Replies mixing both shapes, or matching
/// neither, are rejected.
pub fn parse_planner_reply(text: &str) -> Result<PlannerReply, AgentError> {
    let object = parse_object(text).map_err(AgentError::MalformedReply)?;
    let has_action = object.contains_key("action");
    let has_plan_fields = object.contains_key("summary") || object.contains_key("steps");
    let value = Value::Object(object);

    match (has_action, has_plan_fields) {
        (true, true) => Err(AgentError::MalformedReply(
            "reply mixes a tool request with plan fields".to_string(),
        )),
        (true, false) => {
            check_schema(TOOL_REQUEST_SCHEMA, &value, "tool request")
                .map_err(AgentError::MalformedReply)?;
            let request: ToolRequest = serde_json::from_value(value)
                .map_err(|err| AgentError::MalformedReply(format!("tool request: {err}")))?;
            Ok(PlannerReply::Tool(request))
        }
        (false, true) => {
            check_schema(PLAN_SCHEMA, &value, "plan").map_err(AgentError::MalformedReply)?;
            let plan: Plan = serde_json::from_value(value)
                .map_err(|err| AgentError::MalformedReply(format!("plan: {err}")))?;
            plan.validate()
                .map_err(|err| AgentError::MalformedReply(err.to_string()))?;
            Ok(PlannerReply::Plan(plan))
        }
        (false, false) => Err(AgentError::MalformedReply(
            "reply carries neither action/path nor summary/steps".to_string(),
        )),
    }
}

/// Parse a file-selection reply. Paths are returned exactly as the model wrote them.
pub fn parse_selection_reply(text: &str) -> Result<SelectedFileSet, AgentError> {
    let object = parse_object(text).map_err(AgentError::SelectionFailed)?;
    let value = Value::Object(object);
    check_schema(FILE_SELECTION_SCHEMA, &value, "file selection")
        .map_err(AgentError::SelectionFailed)?;
    serde_json::from_value(value)
        .map_err(|err| AgentError::SelectionFailed(format!("file selection: {err}")))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    let stripped = strip_code_fences(text);
    let value: Value = serde_json::from_str(stripped.trim())
        .map_err(|err| format!("reply is not valid JSON: {err}"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a JSON object, got {}", kind_of(&other))),
    }
}

fn check_schema(schema_raw: &str, instance: &Value, label: &str) -> Result<(), String> {
    let schema: Value =
        serde_json::from_str(schema_raw).map_err(|err| format!("parse {label} schema: {err}"))?;
    let compiled = jsonschema::validator_for(&schema)
        .map_err(|err| format!("invalid {label} schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(format!("{label} does not match schema: {}", messages.join("; ")));
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
