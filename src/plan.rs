//! Schema-driven planning.
//!
//! The resource has no plan-time logic of its own: what changes, what must
//! be replaced and which computed values survive are all decided from the
//! schema.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Compute the plan for moving from `prior` to `proposed`.
///
/// - `proposed == null` plans a destroy: every prior attribute is removed.
/// - Configurable attributes take the proposed value, or their default.
/// - Computed-only attributes are carried from `prior` on in-place updates
///   and left unknown (absent) on create or replace.
/// - A changed `force_new` attribute on an existing resource requires
///   replacement.
pub fn diff(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.and_then(Value::as_object);

    if proposed.is_null() {
        let changes = prior
            .into_iter()
            .flatten()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| AttributeChange::removed(name.as_str(), value.clone()))
            .collect();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let proposed = proposed.as_object();
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.block.attributes {
        if attr.flags.is_computed_only() {
            continue;
        }

        let after = proposed
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
            .or(attr.default.as_ref());
        let before = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null());

        if let Some(value) = after {
            planned.insert(name.clone(), value.clone());
        }

        if let Some(change) = AttributeChange::between(name, before, after) {
            if prior.is_some() && attr.force_new {
                requires_replace = true;
            }
            changes.push(change);
        }
    }

    if let Some(prior) = prior.filter(|_| !requires_replace) {
        for (name, attr) in &schema.block.attributes {
            if !attr.flags.is_computed_only() {
                continue;
            }
            if let Some(value) = prior.get(name) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("parent_id", Attribute::required_string().with_force_new())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("size", Attribute::required_int64().with_force_new())
            .with_attribute(
                "is_larger_allowed",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("cidr", Attribute::computed_string())
    }

    fn prior() -> Value {
        json!({
            "id": "1001",
            "parent_id": "100",
            "name": "office",
            "size": 256,
            "is_larger_allowed": false,
            "cidr": "10.0.0.0/24"
        })
    }

    #[test]
    fn test_create_applies_defaults() {
        let plan = diff(
            &schema(),
            None,
            &json!({"parent_id": "100", "name": "office", "size": 256}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["is_larger_allowed"], false);
        assert!(plan.planned_state.get("id").is_none());
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["is_larger_allowed", "name", "parent_id", "size"]);
    }

    #[test]
    fn test_no_change_keeps_computed() {
        let plan = diff(&schema(), Some(&prior()), &prior());

        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state, prior());
    }

    #[test]
    fn test_rename_updates_in_place() {
        let mut proposed = prior();
        proposed["name"] = json!("lab");

        let plan = diff(&schema(), Some(&prior()), &proposed);

        assert!(!plan.requires_replace);
        assert_eq!(
            plan.changes,
            vec![AttributeChange::modified("name", json!("office"), json!("lab"))]
        );
        assert_eq!(plan.planned_state["id"], "1001");
        assert_eq!(plan.planned_state["cidr"], "10.0.0.0/24");
    }

    #[test]
    fn test_force_new_requires_replace() {
        let mut proposed = prior();
        proposed["size"] = json!(512);

        let plan = diff(&schema(), Some(&prior()), &proposed);

        assert!(plan.requires_replace);
        assert!(plan.planned_state.get("id").is_none());
        assert!(plan.planned_state.get("cidr").is_none());
    }

    #[test]
    fn test_proposed_computed_values_ignored() {
        let mut proposed = prior();
        proposed["cidr"] = json!("192.168.0.0/16");

        let plan = diff(&schema(), Some(&prior()), &proposed);

        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state["cidr"], "10.0.0.0/24");
    }

    #[test]
    fn test_destroy_removes_everything() {
        let plan = diff(&schema(), Some(&prior()), &Value::Null);

        assert!(plan.planned_state.is_null());
        assert!(!plan.requires_replace);
        assert_eq!(plan.changes.len(), 6);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }
}
