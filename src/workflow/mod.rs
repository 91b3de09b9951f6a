//! Workflow Module
//!
//! Provides workflow definitions, step binding, template resolution and
//! the sequential execution loop.
//!
//! # Structure
//!
//! - [`model`]: Serializable shapes (Step, RawWorkflow, WorkflowResult)
//! - [`template`]: `<<step.field>>` placeholder resolution
//! - [`validator`]: Step validation and eager action binding
//! - [`context`]: Per-run execution state and run report
//! - [`flow`]: The Workflow runtime

pub mod context;
pub mod flow;
pub mod model;
pub mod template;
pub mod validator;

pub use context::{RunContext, RunReport, StepTiming};
pub use flow::Workflow;
pub use model::{RawWorkflow, Step, WorkflowResult};
pub use validator::BoundStep;
