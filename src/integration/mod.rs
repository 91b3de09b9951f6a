//! Integrations and Actions
//!
//! An [`Action`] is a unit of work: it receives a JSON object and
//! produces another. An [`Integration`] bundles related actions under a
//! common id. The engine only relies on `id`, `enabled` and `run`; the
//! remaining metadata exists for builder and presentation layers.
//!
//! - [`builtin`]: A small `core` integration used by the CLI

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod builtin;

/// Data flowing into and out of actions and events.
pub type Payload = Map<String, Value>;

/// Kind of input widget a field is edited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Select,
    Text,
    Checkbox,
}

/// Describes one input an action expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionField {
    /// Creates an optional text field.
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Text,
            required: false,
            options: Vec::new(),
            description: None,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Turns the field into a select with the given options.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.kind = FieldKind::Select;
        self.options = options;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A unit of work a workflow step can invoke.
#[async_trait]
pub trait Action: Send + Sync {
    /// Globally unique action id.
    fn id(&self) -> &str;

    /// Display name; defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    /// Whether the action may run inside a workflow.
    fn enabled(&self) -> bool {
        true
    }

    /// Output field names this action produces.
    fn returns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Input fields the action expects.
    fn fields(&self) -> Vec<ActionField> {
        Vec::new()
    }

    /// Executes the action.
    async fn run(&self, input: Payload) -> Result<Payload>;
}

type ActionFuture = Pin<Box<dyn Future<Output = Result<Payload>> + Send>>;

/// An [`Action`] backed by an async closure.
///
/// # Example
///
/// ```
/// use eventflow::integration::{Action, FnAction};
///
/// let action = FnAction::new("core.noop", |input| async move { Ok(input) });
/// assert_eq!(action.id(), "core.noop");
/// assert!(action.enabled());
/// ```
pub struct FnAction {
    id: String,
    name: Option<String>,
    enabled: bool,
    returns: Vec<String>,
    fields: Vec<ActionField>,
    func: Box<dyn Fn(Payload) -> ActionFuture + Send + Sync>,
}

impl FnAction {
    pub fn new<F, Fut>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        Self {
            id: id.into(),
            name: None,
            enabled: true,
            returns: Vec::new(),
            fields: Vec::new(),
            func: Box::new(move |input: Payload| Box::pin(func(input)) as ActionFuture),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_returns(mut self, returns: Vec<String>) -> Self {
        self.returns = returns;
        self
    }

    pub fn with_field(mut self, field: ActionField) -> Self {
        self.fields.push(field);
        self
    }
}

#[async_trait]
impl Action for FnAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn returns(&self) -> Vec<String> {
        self.returns.clone()
    }

    fn fields(&self) -> Vec<ActionField> {
        self.fields.clone()
    }

    async fn run(&self, input: Payload) -> Result<Payload> {
        (self.func)(input).await
    }
}

/// A named bundle of actions.
pub struct Integration {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub config: Option<Value>,
    /// Action name -> action.
    pub actions: BTreeMap<String, Arc<dyn Action>>,
}

impl Integration {
    /// Creates an enabled integration with no actions.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            config: None,
            actions: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers an action under `name`, replacing any previous one.
    pub fn with_action(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    /// Stores integration-specific configuration.
    pub fn setup(&mut self, config: Value) {
        self.config = Some(config);
    }

    /// Finds an action by its id (not its name in the map).
    pub fn action_by_id(&self, id: &str) -> Option<Arc<dyn Action>> {
        self.actions.values().find(|a| a.id() == id).cloned()
    }
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
