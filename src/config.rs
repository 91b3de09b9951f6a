//! Definition Files
//!
//! Loads an event catalog and a list of workflows from YAML and wires
//! them into a [`Manager`].
//!
//! # Example YAML Format
//!
//! ```yaml
//! events:
//!   tickets:
//!     created: ticket.created
//!
//! workflows:
//!   - id: greet
//!     name: Greeting
//!     trigger: ticket.created
//!     steps:
//!       - id: hello
//!         action: core.echo
//!         data:
//!           text: "Hello <<ticket.created.owner>>"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::events::EventCatalog;
use crate::integration::Integration;
use crate::manager::Manager;
use crate::workflow::{RawWorkflow, Workflow};

/// Contents of a definition file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Group name -> event name -> event id
    #[serde(default)]
    pub events: EventCatalog,

    #[serde(default)]
    pub workflows: Vec<RawWorkflow>,
}

impl EngineConfig {
    /// Reads and parses a YAML definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading definitions from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read definition file '{}': {}",
                path.display(),
                e
            ))
        })?;
        debug!("YAML content loaded ({} bytes)", content.len());

        Self::from_yaml(&content)
    }

    /// Parses YAML text and checks workflow ids are unique.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;

        let mut seen = HashSet::new();
        for workflow in &config.workflows {
            if !seen.insert(workflow.id.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate workflow ID: '{}'",
                    workflow.id
                )));
            }
        }

        info!(
            "Parsed {} event(s), {} workflow(s)",
            config.event_count(),
            config.workflows.len()
        );
        Ok(config)
    }

    pub fn event_count(&self) -> usize {
        self.events.values().map(|group| group.len()).sum()
    }

    /// Creates a manager from the catalog, registers `integrations` and
    /// rebuilds every workflow.
    ///
    /// Workflows with an unknown trigger are skipped with a warning; a step
    /// naming an unknown action is an error.
    pub fn build(&self, integrations: impl IntoIterator<Item = Integration>) -> Result<Arc<Manager>> {
        let manager = Arc::new(Manager::new(&self.events));
        manager.add_integration(integrations);

        for raw in &self.workflows {
            match Workflow::from_raw(&manager, raw.clone()) {
                Ok(_) => {}
                Err(e @ EngineError::UnknownTrigger { .. }) => warn!("Skipping workflow: {}", e),
                Err(e) => return Err(e),
            }
        }

        info!(
            "{} of {} workflow(s) registered",
            manager.workflow_ids().len(),
            self.workflows.len()
        );
        Ok(manager)
    }
}
