//! Built-in `core` Integration
//!
//! Provides a handful of data-shaping actions so workflows can be run
//! from the command line without any external integration:
//!
//! - `core.echo`: returns its input unchanged
//! - `core.merge`: flattens object-valued inputs into one output object
//! - `core.log`: logs its input and reports what was logged

use std::sync::Arc;

use log::info;
use serde_json::Value;

use super::{ActionField, FnAction, Integration, Payload};

/// Integration id of the built-in actions.
pub const CORE_INTEGRATION: &str = "core";

/// Builds the `core` integration.
pub fn core_integration() -> Integration {
    let echo = FnAction::new("core.echo", |input: Payload| async move { Ok(input) })
        .with_name("Echo")
        .with_field(ActionField::text("*", "Any field").with_description("Returned as-is"));

    let merge = FnAction::new("core.merge", |input: Payload| async move { Ok(merge(input)) })
        .with_name("Merge objects");

    let log = FnAction::new("core.log", |input: Payload| async move {
        let message = Value::Object(input).to_string();
        info!("[core.log] {}", message);

        let mut output = Payload::new();
        output.insert("message".to_string(), Value::String(message));
        Ok(output)
    })
    .with_name("Log")
    .with_returns(vec!["message".to_string()]);

    Integration::new(CORE_INTEGRATION)
        .with_name("Core")
        .with_action("echo", Arc::new(echo))
        .with_action("merge", Arc::new(merge))
        .with_action("log", Arc::new(log))
}

/// Object values contribute their keys; other values keep their own key.
/// Later keys win.
fn merge(input: Payload) -> Payload {
    let mut output = Payload::new();
    for (key, value) in input {
        match value {
            Value::Object(fields) => output.extend(fields),
            other => {
                output.insert(key, other);
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_core_integration_actions() {
        let core = core_integration();
        assert_eq!(core.id, CORE_INTEGRATION);
        assert!(core.action_by_id("core.echo").is_some());
        assert!(core.action_by_id("core.merge").is_some());
        assert!(core.action_by_id("core.log").is_some());
    }

    #[tokio::test]
    async fn test_echo_returns_input() {
        let core = core_integration();
        let echo = core.action_by_id("core.echo").unwrap();
        let output = echo.run(payload(json!({ "a": 1 }))).await.unwrap();
        assert_eq!(Value::Object(output), json!({ "a": 1 }));
    }

    #[test]
    fn test_merge_flattens_objects() {
        let merged = merge(payload(json!({
            "user": { "name": "alice", "id": 7 },
            "note": "hi"
        })));
        assert_eq!(
            Value::Object(merged),
            json!({ "name": "alice", "id": 7, "note": "hi" })
        );
    }

    #[tokio::test]
    async fn test_log_reports_message() {
        let core = core_integration();
        let log = core.action_by_id("core.log").unwrap();
        let output = log.run(payload(json!({ "x": true }))).await.unwrap();
        assert_eq!(output["message"], json!("{\"x\":true}"));
        assert_eq!(log.returns(), vec!["message"]);
    }
}
