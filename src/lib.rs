//! EventFlow - Embeddable Event-Driven Automation Engine
//!
//! External events trigger ordered chains of actions supplied by
//! pluggable integrations. Each step's input may reference earlier
//! outputs of the same run through `<<stepId.field>>` placeholders.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`events`]: Event slots with ordered, sequential subscriber dispatch
//! - [`integration`]: The `Action` contract and integration bundles
//! - [`manager`]: Registry binding workflows to their trigger events
//! - [`workflow`]: Workflow definitions, templating and execution
//! - [`config`]: YAML definition files
//!
//! # Example
//!
//! ```rust,no_run
//! use eventflow::integration::builtin::core_integration;
//! use eventflow::EngineConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load events and workflows from YAML
//!     let config = EngineConfig::load("definitions.yaml")?;
//!
//!     // Wire them into a manager with the built-in actions
//!     let manager = config.build([core_integration()])?;
//!
//!     // Fire an event; every subscribed workflow runs in turn
//!     manager.trigger_event("ticket.created", None).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod integration;
pub mod manager;
pub mod workflow;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use events::{EventBus, EventCatalog};
pub use integration::{Action, Integration, Payload};
pub use manager::Manager;
pub use workflow::{RawWorkflow, Step, Workflow, WorkflowResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "EventFlow";

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_builds_runnable_manager() {
        let yaml = r#"
events:
  tickets:
    created: ticket.created
workflows:
  - id: copy
    trigger: ticket.created
    steps:
      - id: echo
        action: core.echo
        data:
          owner: "<<ticket.created.owner>>"
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        let manager = config.build([integration::builtin::core_integration()]).unwrap();

        let mut data = Payload::new();
        data.insert("owner".to_string(), serde_json::json!("alice"));
        let results: Vec<WorkflowResult> = manager
            .trigger_workflow("copy", Some(data))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(results[1].output["owner"], serde_json::json!("alice"));
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::new("notify", "chat.send");
        assert_eq!(step.id, "notify");
        assert_eq!(step.action, "chat.send");
    }

    #[test]
    fn test_module_exports_manager() {
        let manager = Manager::new(&EventCatalog::new());
        assert!(manager.event_ids().is_empty());
        assert!(manager.workflow_ids().is_empty());
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
