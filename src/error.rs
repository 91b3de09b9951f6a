//! Engine Errors
//!
//! A single error type shared by the event bus, the manager and the
//! workflow runner.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything that can go wrong while wiring or running workflows.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A workflow names a trigger event the manager does not know.
    #[error("There are no registered events that can run workflow '{workflow}' (trigger '{event}')")]
    UnknownTrigger { workflow: String, event: String },

    #[error("There is no event with ID: {0}")]
    EventNotFound(String),

    #[error("Step '{step}' wasn't found in workflow '{workflow}'")]
    StepNotFound { workflow: String, step: String },

    #[error("Duplicate step ID '{step}' in workflow '{workflow}'")]
    DuplicateStep { workflow: String, step: String },

    #[error("Workflow '{workflow}' has a step with an empty ID")]
    EmptyStepId { workflow: String },

    #[error("Step '{step}': action '{action}' wasn't found in the registered integrations")]
    ActionNotFound { step: String, action: String },

    #[error("Action '{0}' is not available to run")]
    ActionDisabled(String),

    /// Raised by an action implementation.
    #[error("Step '{step}' failed: {message}")]
    ActionFailed { step: String, message: String },

    #[error("{failed} handler(s) failed while dispatching event '{event}': {first}")]
    HandlerFailed {
        event: String,
        failed: usize,
        first: Box<EngineError>,
    },

    #[error("Manager for workflow '{0}' no longer exists")]
    ManagerDropped(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Convenience constructor for action implementations.
    pub fn action_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_trigger_message() {
        let err = EngineError::UnknownTrigger {
            workflow: "wf".to_string(),
            event: "missing".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wf"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_handler_failed_wraps_first_error() {
        let err = EngineError::HandlerFailed {
            event: "ticket.created".to_string(),
            failed: 2,
            first: Box::new(EngineError::ActionDisabled("notify".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 handler(s)"));
        assert!(msg.contains("notify"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
