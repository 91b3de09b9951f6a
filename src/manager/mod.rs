//! Integration and Workflow Manager
//!
//! The registry tying everything together:
//! - Integrations, and through them every available action
//! - Event slots, fixed once from the catalog given at construction
//! - Workflows, each subscribed to its trigger event through a dedicated
//!   dispatcher handler
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eventflow::events::EventCatalog;
//! use eventflow::integration::builtin::core_integration;
//! use eventflow::workflow::{Step, Workflow};
//! use eventflow::Manager;
//!
//! # async fn demo() -> eventflow::Result<()> {
//! let mut catalog = EventCatalog::new();
//! catalog.entry("tickets".into()).or_default()
//!     .insert("created".into(), "ticket.created".into());
//!
//! let manager = Arc::new(Manager::new(&catalog));
//! manager.add_integration([core_integration()]);
//!
//! let workflow = Workflow::new(&manager, "ticket.created");
//! workflow.set_steps(vec![Step::new("echo", "core.echo")])?;
//!
//! manager.trigger_event("ticket.created", None).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::events::{catalog_ids, handler, EventBus, EventCatalog, Handler};
use crate::integration::{Action, Integration, Payload};
use crate::workflow::{Workflow, WorkflowResult};

/// Registry of integrations, event slots and workflows.
pub struct Manager {
    integrations: RwLock<Vec<Arc<Integration>>>,
    workflows: RwLock<HashMap<String, Arc<Workflow>>>,
    events: BTreeMap<String, EventBus<Payload>>,
    dispatchers: Mutex<HashMap<String, Handler<Payload>>>,
}

// Locks are never held across an await or a user callback, so a poisoned
// lock still guards consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}

impl Manager {
    /// Creates a manager with one event slot per catalog entry.
    pub fn new(catalog: &EventCatalog) -> Self {
        let events: BTreeMap<String, EventBus<Payload>> = catalog_ids(catalog)
            .map(|id| (id.to_string(), EventBus::new(id)))
            .collect();

        info!("Manager created with {} event(s)", events.len());

        Self {
            integrations: RwLock::new(Vec::new()),
            workflows: RwLock::new(HashMap::new()),
            events,
            dispatchers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers integrations; ids already present are left untouched.
    ///
    /// Returns how many were added.
    pub fn add_integration(&self, integrations: impl IntoIterator<Item = Integration>) -> usize {
        let mut registry = write(&self.integrations);
        let mut added = 0;

        for integration in integrations {
            if registry.iter().any(|i| i.id == integration.id) {
                debug!("Integration '{}' already registered", integration.id);
                continue;
            }
            info!(
                "Registered integration '{}' ({} actions)",
                integration.id,
                integration.actions.len()
            );
            registry.push(Arc::new(integration));
            added += 1;
        }

        added
    }

    pub fn remove_integration(&self, id: &str) -> Option<Arc<Integration>> {
        let mut registry = write(&self.integrations);
        let index = registry.iter().position(|i| i.id == id)?;
        info!("Removed integration '{}'", id);
        Some(registry.remove(index))
    }

    pub fn integration(&self, id: &str) -> Option<Arc<Integration>> {
        read(&self.integrations).iter().find(|i| i.id == id).cloned()
    }

    /// Finds an action across all integrations, in registration order.
    pub fn get_action(&self, id: &str) -> Option<Arc<dyn Action>> {
        read(&self.integrations)
            .iter()
            .find_map(|integration| integration.action_by_id(id))
    }

    /// Registers workflows and subscribes each to its trigger event.
    ///
    /// A workflow whose trigger event is unknown is skipped and reported
    /// in the returned list; the others are still registered. Workflows
    /// whose id is already registered are left as they are.
    pub fn add_workflow(&self, workflows: impl IntoIterator<Item = Arc<Workflow>>) -> Vec<EngineError> {
        let mut skipped = Vec::new();

        for workflow in workflows {
            let Some(event) = self.events.get(workflow.trigger_event()) else {
                let err = EngineError::UnknownTrigger {
                    workflow: workflow.display_name().to_string(),
                    event: workflow.trigger_event().to_string(),
                };
                warn!("Manager: {}", err);
                skipped.push(err);
                continue;
            };

            let mut registry = write(&self.workflows);
            if registry.contains_key(workflow.id()) {
                debug!("Workflow '{}' already registered", workflow.id());
                continue;
            }

            let dispatcher = {
                let workflow = Arc::clone(&workflow);
                handler(move |data: Payload| {
                    let workflow = Arc::clone(&workflow);
                    async move { workflow.run(Some(data)).await.map(|_| ()) }
                })
            };

            registry.insert(workflow.id().to_string(), Arc::clone(&workflow));
            guard(&self.dispatchers).insert(workflow.id().to_string(), Arc::clone(&dispatcher));
            event.add(dispatcher);

            info!(
                "Registered workflow '{}' on event '{}'",
                workflow.display_name(),
                workflow.trigger_event()
            );
        }

        skipped
    }

    /// Unsubscribes and removes a workflow.
    pub fn remove_workflow(&self, id: &str) -> Option<Arc<Workflow>> {
        let workflow = self.workflow(id)?;

        // Unsubscribe before dropping the registry entry so no dispatch
        // can reach a workflow that is no longer registered.
        let dispatcher = guard(&self.dispatchers).remove(id);
        if let Some(dispatcher) = dispatcher {
            if let Some(event) = self.events.get(workflow.trigger_event()) {
                event.remove(&dispatcher);
            }
        }

        info!("Removed workflow '{}'", workflow.display_name());
        write(&self.workflows).remove(id)
    }

    pub fn workflow(&self, id: &str) -> Option<Arc<Workflow>> {
        read(&self.workflows).get(id).cloned()
    }

    /// Registered workflow ids, sorted.
    pub fn workflow_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = read(&self.workflows).keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn has_event(&self, id: &str) -> bool {
        self.events.contains_key(id)
    }

    /// Known event ids, sorted.
    pub fn event_ids(&self) -> Vec<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Runs a workflow directly, bypassing its trigger event.
    ///
    /// Returns `Ok(None)` when no workflow has this id.
    pub async fn trigger_workflow(&self, id: &str, data: Option<Payload>) -> Result<Option<Vec<WorkflowResult>>> {
        let Some(workflow) = self.workflow(id) else {
            debug!("No workflow with ID '{}' to trigger", id);
            return Ok(None);
        };
        workflow.run(data).await.map(Some)
    }

    /// Fires an event, running every workflow subscribed to it in turn.
    pub async fn trigger_event(&self, id: &str, data: Option<Payload>) -> Result<()> {
        let event = self
            .events
            .get(id)
            .ok_or_else(|| EngineError::EventNotFound(id.to_string()))?;
        event.trigger(data.unwrap_or_default()).await
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("workflows", &self.workflow_ids())
            .finish()
    }
}
