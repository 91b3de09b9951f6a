//! Workflow Runtime
//!
//! A [`Workflow`] is an ordered chain of steps bound to one trigger
//! event. Running it executes the steps strictly one after another; each
//! step's data template is resolved against the outputs recorded earlier
//! in the same run before its action is invoked.

use std::sync::{Arc, RwLock, Weak};

use chrono::Utc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::context::{RunContext, RunReport};
use super::model::{RawWorkflow, Step, WorkflowResult};
use super::template::resolve_payload;
use super::validator::{bind_steps, BoundStep};
use crate::error::{EngineError, Result};
use crate::events::EventBus;
use crate::integration::Payload;
use crate::manager::Manager;

/// An ordered chain of steps started by one event.
pub struct Workflow {
    id: String,
    name: Option<String>,
    trigger_event: String,
    manager: Weak<Manager>,
    steps: RwLock<Vec<BoundStep>>,
    on_workflow_run: EventBus<Vec<WorkflowResult>>,
}

impl Workflow {
    /// Creates a workflow with a random id and registers it with `manager`.
    ///
    /// Registration is skipped (with a warning) when the trigger event is
    /// unknown to the manager.
    pub fn new(manager: &Arc<Manager>, trigger_event: impl Into<String>) -> Arc<Self> {
        Self::with_id(manager, Uuid::new_v4().to_string(), None, trigger_event)
    }

    /// Creates a workflow with an explicit id and name and registers it.
    pub fn with_id(
        manager: &Arc<Manager>,
        id: impl Into<String>,
        name: Option<String>,
        trigger_event: impl Into<String>,
    ) -> Arc<Self> {
        let workflow = Self::detached(manager, id, name, trigger_event);
        manager.add_workflow([Arc::clone(&workflow)]);
        workflow
    }

    /// Creates a workflow without registering it, for batch registration
    /// through [`Manager::add_workflow`].
    pub fn detached(
        manager: &Arc<Manager>,
        id: impl Into<String>,
        name: Option<String>,
        trigger_event: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            name,
            trigger_event: trigger_event.into(),
            manager: Arc::downgrade(manager),
            steps: RwLock::new(Vec::new()),
            on_workflow_run: EventBus::new("workflow.run"),
        })
    }

    /// Rebuilds a workflow from its serializable form and registers it.
    ///
    /// The trigger is checked first and an unknown one fails with
    /// [`EngineError::UnknownTrigger`]. Steps are bound before
    /// registration, so a workflow with unknown actions is never
    /// subscribed.
    pub fn from_raw(manager: &Arc<Manager>, raw: RawWorkflow) -> Result<Arc<Self>> {
        if !manager.has_event(&raw.trigger) {
            return Err(EngineError::UnknownTrigger {
                workflow: raw.name.unwrap_or(raw.id),
                event: raw.trigger,
            });
        }

        let workflow = Self::detached(manager, raw.id, raw.name, raw.trigger);
        workflow.set_steps(raw.steps)?;
        manager.add_workflow([Arc::clone(&workflow)]);
        Ok(workflow)
    }

    /// Serializable form: `{id, name?, steps, trigger}`.
    pub fn raw(&self) -> RawWorkflow {
        RawWorkflow {
            id: self.id.clone(),
            name: self.name.clone(),
            steps: self.steps(),
            trigger: self.trigger_event.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn trigger_event(&self) -> &str {
        &self.trigger_event
    }

    /// Fired with the full result list after every successful run.
    pub fn on_workflow_run(&self) -> &EventBus<Vec<WorkflowResult>> {
        &self.on_workflow_run
    }

    fn bound_steps(&self) -> Vec<BoundStep> {
        self.steps.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current steps in execution order.
    pub fn steps(&self) -> Vec<Step> {
        self.bound_steps().into_iter().map(|b| b.step).collect()
    }

    pub fn step(&self, id: &str) -> Option<Step> {
        self.steps().into_iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces all steps, binding each to its action.
    ///
    /// On error the previous steps are kept.
    pub fn set_steps(&self, steps: Vec<Step>) -> Result<()> {
        let bound = self.bind(steps)?;
        *self.steps.write().unwrap_or_else(|e| e.into_inner()) = bound;
        Ok(())
    }

    /// Appends a step.
    ///
    /// The current steps stay write-locked until the new set is bound, so
    /// concurrent edits never overwrite each other.
    pub fn add_step(&self, step: Step) -> Result<()> {
        let mut current = self.steps.write().unwrap_or_else(|e| e.into_inner());
        let mut steps: Vec<Step> = current.iter().map(|b| b.step.clone()).collect();
        steps.push(step);
        *current = self.bind(steps)?;
        Ok(())
    }

    fn bind(&self, steps: Vec<Step>) -> Result<Vec<BoundStep>> {
        let manager = self
            .manager
            .upgrade()
            .ok_or_else(|| EngineError::ManagerDropped(self.id.clone()))?;

        let bound = bind_steps(&self.id, &self.trigger_event, steps, |action| {
            manager.get_action(action)
        })?;

        debug!("Workflow '{}': {} step(s) assigned", self.display_name(), bound.len());
        Ok(bound)
    }

    /// Removes a step by id.
    pub fn remove_step(&self, id: &str) -> Result<()> {
        let mut steps = self.steps.write().unwrap_or_else(|e| e.into_inner());
        let index = steps
            .iter()
            .position(|b| b.step.id == id)
            .ok_or_else(|| EngineError::StepNotFound {
                workflow: self.id.clone(),
                step: id.to_string(),
            })?;
        steps.remove(index);
        Ok(())
    }

    /// Runs every step in order and returns the ordered results, trigger
    /// payload first.
    pub async fn run(&self, data: Option<Payload>) -> Result<Vec<WorkflowResult>> {
        self.run_report(data).await.map(|report| report.results)
    }

    /// Like [`Workflow::run`], also returning run id and timings.
    ///
    /// The steps are snapshotted when the run starts; editing the workflow
    /// while it runs affects only later runs. A failing step aborts the run
    /// and nothing of it is kept.
    pub async fn run_report(&self, data: Option<Payload>) -> Result<RunReport> {
        let steps = self.bound_steps();
        let mut ctx = RunContext::new(&self.trigger_event, data.unwrap_or_default());

        info!(
            "Running workflow '{}' ({} steps, run {})",
            self.display_name(),
            steps.len(),
            ctx.run_id()
        );

        while let Some(bound) = steps.get(ctx.cursor()) {
            let step = &bound.step;
            let action = &bound.action;

            if !action.enabled() {
                error!(
                    "Workflow '{}' aborted at step '{}': action '{}' is disabled",
                    self.display_name(),
                    step.id,
                    action.name()
                );
                return Err(EngineError::ActionDisabled(action.name().to_string()));
            }

            let input = resolve_payload(&step.data, ctx.results());
            debug!("Step '{}' -> {} with {} input field(s)", step.id, action.id(), input.len());

            let started_at = Utc::now();
            let output = action.run(input).await.map_err(|e| {
                error!(
                    "Workflow '{}' aborted at step '{}': {}",
                    self.display_name(),
                    step.id,
                    e
                );
                e
            })?;

            ctx.record(&step.id, output, started_at);
        }

        let report = ctx.finish();
        info!(
            "Workflow '{}' completed in {} ms",
            self.display_name(),
            report.duration_ms()
        );

        if let Err(e) = self.on_workflow_run.trigger(report.results.clone()).await {
            warn!("Workflow '{}': completion listener failed: {}", self.display_name(), e);
        }

        Ok(report)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger_event", &self.trigger_event)
            .field("steps", &self.len())
            .finish()
    }
}
