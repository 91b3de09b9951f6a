//! Step Validation and Binding
//!
//! Checks a step list before it replaces a workflow's steps and binds
//! every step to its action:
//! - Step ids are non-empty and unique
//! - Every step's action is registered
//! - Template markers pointing at later or unknown steps are reported
//!   (they resolve to empty values at run time, so this is a warning)

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use super::model::Step;
use super::template::template_references;
use crate::error::{EngineError, Result};
use crate::integration::Action;

/// A step together with the action it invokes.
#[derive(Clone)]
pub struct BoundStep {
    pub step: Step,
    pub action: Arc<dyn Action>,
}

impl std::fmt::Debug for BoundStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStep")
            .field("step", &self.step)
            .field("action", &self.action.id())
            .finish()
    }
}

/// Checks ids and reports questionable template references.
pub fn validate_steps(workflow_id: &str, trigger: &str, steps: &[Step]) -> Result<()> {
    let all_ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for step in steps {
        if step.id.trim().is_empty() {
            return Err(EngineError::EmptyStepId {
                workflow: workflow_id.to_string(),
            });
        }

        let refs = step.data.values().flat_map(template_references);
        for (referenced, field) in refs {
            if referenced == trigger || seen.contains(referenced.as_str()) {
                continue;
            }
            if all_ids.contains(referenced.as_str()) {
                warn!(
                    "Workflow '{}': step '{}' uses <<{}.{}>> but '{}' runs later; it will resolve empty",
                    workflow_id, step.id, referenced, field, referenced
                );
            } else {
                warn!(
                    "Workflow '{}': step '{}' uses <<{}.{}>> but no such step exists",
                    workflow_id, step.id, referenced, field
                );
            }
        }

        if !seen.insert(step.id.as_str()) {
            return Err(EngineError::DuplicateStep {
                workflow: workflow_id.to_string(),
                step: step.id.clone(),
            });
        }
    }

    Ok(())
}

/// Validates `steps` and resolves each step's action with `lookup`.
pub fn bind_steps<F>(workflow_id: &str, trigger: &str, steps: Vec<Step>, lookup: F) -> Result<Vec<BoundStep>>
where
    F: Fn(&str) -> Option<Arc<dyn Action>>,
{
    validate_steps(workflow_id, trigger, &steps)?;

    steps
        .into_iter()
        .map(|step| {
            let action = lookup(&step.action).ok_or_else(|| EngineError::ActionNotFound {
                step: step.id.clone(),
                action: step.action.clone(),
            })?;
            debug!(
                "Workflow '{}': step '{}' bound to action '{}'",
                workflow_id,
                step.id,
                action.id()
            );
            Ok(BoundStep { step, action })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::FnAction;
    use serde_json::json;

    fn lookup(id: &str) -> Option<Arc<dyn Action>> {
        match id {
            "core.echo" => Some(Arc::new(FnAction::new("core.echo", |i| async move { Ok(i) }))),
            _ => None,
        }
    }

    #[test]
    fn test_bind_valid_steps() {
        let steps = vec![
            Step::new("a", "core.echo"),
            Step::new("b", "core.echo").with_input("x", json!("<<a.y>>")),
        ];

        let bound = bind_steps("wf", "evt", steps, lookup).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[1].step.id, "b");
        assert_eq!(bound[1].action.id(), "core.echo");
    }

    #[test]
    fn test_duplicate_step_id() {
        let steps = vec![Step::new("a", "core.echo"), Step::new("a", "core.echo")];
        let err = bind_steps("wf", "evt", steps, lookup).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateStep { ref step, .. } if step == "a"));
    }

    #[test]
    fn test_empty_step_id() {
        let steps = vec![Step::new("  ", "core.echo")];
        let err = bind_steps("wf", "evt", steps, lookup).unwrap_err();
        assert!(matches!(err, EngineError::EmptyStepId { .. }));
    }

    #[test]
    fn test_unknown_action() {
        let steps = vec![Step::new("a", "core.echo"), Step::new("b", "mail.send")];
        let err = bind_steps("wf", "evt", steps, lookup).unwrap_err();
        match err {
            EngineError::ActionNotFound { step, action } => {
                assert_eq!(step, "b");
                assert_eq!(action, "mail.send");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_forward_reference_is_not_an_error() {
        let steps = vec![
            Step::new("a", "core.echo")
                .with_input("x", json!("<<b.y>>"))
                .with_input("t", json!("<<evt.id>>")),
            Step::new("b", "core.echo"),
        ];
        assert!(validate_steps("wf", "evt", &steps).is_ok());
    }

    #[test]
    fn test_empty_step_list() {
        let bound = bind_steps("wf", "evt", Vec::new(), lookup).unwrap();
        assert!(bound.is_empty());
    }
}
