//! Template Resolution
//!
//! Step data templates are arbitrary JSON. Strings inside them may
//! reference earlier outputs of the same run with `<<stepId.field>>`
//! markers:
//!
//! - A string made of exactly one marker becomes the referenced value,
//!   keeping its JSON type (`null` when the reference is missing).
//! - Markers embedded in text are replaced by strings verbatim, by the
//!   empty string for missing or `null` values, and by compact JSON for
//!   anything else.
//!
//! The reference is split at its last dot, so event ids such as
//! `ticket.created` work as step ids. Field paths are one level deep.
//! Resolution never fails.

use serde_json::Value;

use super::model::WorkflowResult;
use crate::integration::Payload;

const OPEN: &str = "<<";
const CLOSE: &str = ">>";

/// A piece of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Marker(&'a str),
}

/// Splits a string into literal text and marker references.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        if start > 0 {
            out.push(Segment::Text(&rest[..start]));
        }
        out.push(Segment::Marker(&after_open[..end]));
        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

/// Splits a marker body into `(step id, field)`.
fn parse_reference(reference: &str) -> Option<(&str, &str)> {
    let (step, field) = reference.trim().rsplit_once('.')?;
    if step.is_empty() || field.is_empty() {
        return None;
    }
    Some((step, field))
}

/// Returns the `(step id, field)` pairs referenced by a string.
///
/// # Example
///
/// ```
/// use eventflow::workflow::template::references;
///
/// let refs = references("Hi <<assign.assignedTo>>, see <<ticket.created.url>>");
/// assert_eq!(refs, vec![
///     ("assign".to_string(), "assignedTo".to_string()),
///     ("ticket.created".to_string(), "url".to_string()),
/// ]);
/// ```
pub fn references(text: &str) -> Vec<(String, String)> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Marker(reference) => parse_reference(reference),
            Segment::Text(_) => None,
        })
        .map(|(step, field)| (step.to_string(), field.to_string()))
        .collect()
}

/// Collects the references found in every string of a template.
pub fn template_references(template: &Value) -> Vec<(String, String)> {
    match template {
        Value::String(s) => references(s),
        Value::Array(items) => items.iter().flat_map(template_references).collect(),
        Value::Object(map) => map.values().flat_map(template_references).collect(),
        _ => Vec::new(),
    }
}

/// Looks up a field in the first recorded output of `step`.
fn lookup<'a>(results: &'a [WorkflowResult], reference: &str) -> Option<&'a Value> {
    let (step, field) = parse_reference(reference)?;
    results
        .iter()
        .find(|r| r.step == step)
        .and_then(|r| r.output.get(field))
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Substitutes the markers of a single string.
pub fn resolve_str(text: &str, results: &[WorkflowResult]) -> Value {
    let parts = segments(text);

    if let [Segment::Marker(reference)] = parts.as_slice() {
        return lookup(results, reference).cloned().unwrap_or(Value::Null);
    }

    if !parts.iter().any(|p| matches!(p, Segment::Marker(_))) {
        return Value::String(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    for part in parts {
        match part {
            Segment::Text(t) => out.push_str(t),
            Segment::Marker(reference) => out.push_str(&stringify(lookup(results, reference))),
        }
    }
    Value::String(out)
}

/// Walks a template, resolving every string against `results`.
///
/// Objects are resolved key by key, arrays element by element in order,
/// and non-string scalars are copied unchanged.
pub fn resolve(template: &Value, results: &[WorkflowResult]) -> Value {
    match template {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), resolve(value, results)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| resolve(item, results)).collect())
        }
        Value::String(text) => resolve_str(text, results),
        other => other.clone(),
    }
}

/// Resolves a step's data template into the action input.
pub fn resolve_payload(template: &Payload, results: &[WorkflowResult]) -> Payload {
    template
        .iter()
        .map(|(key, value)| (key.clone(), resolve(value, results)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(step: &str, output: Value) -> WorkflowResult {
        let output: Payload = serde_json::from_value(output).unwrap();
        WorkflowResult::new(step, output)
    }

    fn results() -> Vec<WorkflowResult> {
        vec![
            result("ticket.created", json!({ "id": 42, "title": "Broken build" })),
            result("A", json!({ "assignedTo": "alice", "meta": { "team": "core" }, "none": null })),
        ]
    }

    #[test]
    fn test_embedded_marker() {
        let value = resolve_str("Hi <<A.assignedTo>>!", &results());
        assert_eq!(value, json!("Hi alice!"));
    }

    #[test]
    fn test_multiple_markers() {
        let value = resolve_str("#<<ticket.created.id>> <<ticket.created.title>> -> <<A.assignedTo>>", &results());
        assert_eq!(value, json!("#42 Broken build -> alice"));
    }

    #[test]
    fn test_whole_marker_keeps_type() {
        assert_eq!(resolve_str("<<ticket.created.id>>", &results()), json!(42));
        assert_eq!(resolve_str("<<A.meta>>", &results()), json!({ "team": "core" }));
    }

    #[test]
    fn test_embedded_object_is_compact_json() {
        let value = resolve_str("meta=<<A.meta>>", &results());
        assert_eq!(value, json!("meta={\"team\":\"core\"}"));
    }

    #[test]
    fn test_unexecuted_step_resolves_empty() {
        assert_eq!(resolve_str("Hi <<B.name>>!", &results()), json!("Hi !"));
        assert_eq!(resolve_str("<<B.name>>", &results()), Value::Null);
    }

    #[test]
    fn test_missing_field_and_null_resolve_empty() {
        assert_eq!(resolve_str("[<<A.missing>>]", &results()), json!("[]"));
        assert_eq!(resolve_str("[<<A.none>>]", &results()), json!("[]"));
    }

    #[test]
    fn test_malformed_markers() {
        assert_eq!(resolve_str("<<A>>", &results()), Value::Null);
        assert_eq!(resolve_str("x <<.assignedTo>> y", &results()), json!("x  y"));
        assert_eq!(resolve_str("open <<A.assignedTo", &results()), json!("open <<A.assignedTo"));
    }

    #[test]
    fn test_plain_string_unchanged() {
        assert_eq!(resolve_str("no markers", &results()), json!("no markers"));
        assert_eq!(resolve_str("", &results()), json!(""));
    }

    #[test]
    fn test_resolve_nested_structure() {
        let template = json!({
            "greeting": "Hi <<A.assignedTo>>",
            "list": ["<<ticket.created.id>>", "static", 3, true, null],
            "nested": { "deep": ["<<A.meta>>"] },
            "count": 7
        });

        let value = resolve(&template, &results());

        assert_eq!(
            value,
            json!({
                "greeting": "Hi alice",
                "list": [42, "static", 3, true, null],
                "nested": { "deep": [{ "team": "core" }] },
                "count": 7
            })
        );
    }

    #[test]
    fn test_resolve_payload() {
        let template: Payload = serde_json::from_value(json!({
            "to": "<<A.assignedTo>>",
            "subject": "Ticket <<ticket.created.id>>"
        }))
        .unwrap();

        let input = resolve_payload(&template, &results());
        assert_eq!(input["to"], json!("alice"));
        assert_eq!(input["subject"], json!("Ticket 42"));
    }

    #[test]
    fn test_first_result_wins() {
        let mut rs = results();
        rs.push(result("A", json!({ "assignedTo": "bob" })));
        assert_eq!(resolve_str("<<A.assignedTo>>", &rs), json!("alice"));
    }

    #[test]
    fn test_template_references() {
        let template = json!({ "a": "<<x.y>>", "b": ["<<z.w>> and <<x.v>>"], "c": 1 });
        let mut refs = template_references(&template);
        refs.sort();
        assert_eq!(
            refs,
            vec![
                ("x".to_string(), "v".to_string()),
                ("x".to_string(), "y".to_string()),
                ("z".to_string(), "w".to_string()),
            ]
        );
    }
}
