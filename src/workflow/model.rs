//! Workflow Data Model
//!
//! Serializable shapes of workflows, their steps and run results.
//!
//! # Example YAML Format
//!
//! ```yaml
//! id: ticket-reminder
//! name: Ticket reminder
//! trigger: ticket.created
//! steps:
//!   - id: assign
//!     action: tickets.assign
//!     data:
//!       ticket: "<<ticket.created.id>>"
//!
//!   - id: notify
//!     action: chat.send
//!     data:
//!       text: "Hi <<assign.assignedTo>>! This is a friendly topic reminder."
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::integration::Payload;

/// A single action invocation inside a workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// Identifier, unique within the workflow
    pub id: String,

    /// Id of the action to invoke
    pub action: String,

    /// Input template; strings may contain `<<step.field>>` markers
    #[serde(default)]
    pub data: Payload,
}

impl Step {
    /// Creates a step with an empty data template.
    ///
    /// # Example
    ///
    /// ```
    /// use eventflow::workflow::Step;
    /// use serde_json::json;
    ///
    /// let step = Step::new("notify", "chat.send")
    ///     .with_input("text", json!("Hi <<assign.assignedTo>>!"));
    /// assert_eq!(step.action, "chat.send");
    /// ```
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            action: action.into().trim().to_string(),
            data: Payload::new(),
        }
    }

    /// Replaces the data template.
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    /// Sets one field of the data template.
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Serializable form of a workflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawWorkflow {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,

    /// Id of the event that starts the workflow
    pub trigger: String,
}

/// Output recorded for one step of a run.
///
/// The first result of every run is the trigger payload, recorded under
/// the trigger event id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub step: String,
    pub output: Payload,
}

impl WorkflowResult {
    pub fn new(step: impl Into<String>, output: Payload) -> Self {
        Self {
            step: step.into(),
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_creation_trims() {
        let step = Step::new(" a ", " core.echo ");
        assert_eq!(step.id, "a");
        assert_eq!(step.action, "core.echo");
        assert!(step.data.is_empty());
    }

    #[test]
    fn test_step_data_defaults_to_empty_object() {
        let step: Step = serde_json::from_value(json!({ "id": "a", "action": "x" })).unwrap();
        assert!(step.data.is_empty());
    }

    #[test]
    fn test_step_with_input() {
        let step = Step::new("a", "x")
            .with_input("text", json!("hi"))
            .with_input("count", json!(2));
        assert_eq!(Value::Object(step.data), json!({ "text": "hi", "count": 2 }));
    }

    #[test]
    fn test_raw_workflow_without_name() {
        let raw = RawWorkflow {
            id: "wf".to_string(),
            name: None,
            steps: vec![Step::new("a", "core.echo")],
            trigger: "evt".to_string(),
        };
        let value = serde_json::to_value(&raw).unwrap();

        assert!(value.get("name").is_none());
        assert_eq!(value["trigger"], json!("evt"));
        assert_eq!(value["steps"][0]["action"], json!("core.echo"));
    }

    #[test]
    fn test_raw_workflow_from_yaml() {
        let yaml = r#"
id: reminder
name: Reminder
trigger: ticket.created
steps:
  - id: notify
    action: chat.send
    data:
      text: "Hi <<assign.assignedTo>>!"
      tags: [a, b]
"#;
        let raw: RawWorkflow = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(raw.name.as_deref(), Some("Reminder"));
        assert_eq!(raw.steps.len(), 1);
        assert_eq!(raw.steps[0].data["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_workflow_result_shape() {
        let mut output = Payload::new();
        output.insert("assignedTo".to_string(), json!("alice"));
        let result = WorkflowResult::new("assign", output);

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "step": "assign", "output": { "assignedTo": "alice" } })
        );
    }
}
