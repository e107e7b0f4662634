//! Plan, import and metadata types exchanged with the host.
//!
//! These are the Rust-side shapes of the protocol messages; conversion to
//! the protobuf types happens at the gRPC boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generated;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute name.
    pub path: String,
    /// The value before the change (None if the attribute is being set).
    pub before: Option<Value>,
    /// The value after the change (None if the attribute is being cleared).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// An attribute gaining a value.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute losing its value.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute changing from one value to another.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }

    /// Classify the transition between two optional values, or `None` if
    /// they are equal.
    pub fn between(path: &str, before: Option<&Value>, after: Option<&Value>) -> Option<Self> {
        match (before, after) {
            (None, None) => None,
            (None, Some(after)) => Some(Self::added(path, after.clone())),
            (Some(before), None) => Some(Self::removed(path, before.clone())),
            (Some(before), Some(after)) if before == after => None,
            (Some(before), Some(after)) => {
                Some(Self::modified(path, before.clone(), after.clone()))
            }
        }
    }
}

impl From<AttributeChange> for generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        // Absent sides travel as empty byte strings.
        let encode = |v: Option<Value>| {
            v.and_then(|v| serde_json::to_vec(&v).ok())
                .unwrap_or_default()
        };
        Self {
            path: change.path,
            before: encode(change.before),
            after: encode(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation (`null` when destroying).
    pub planned_state: Value,
    /// The attribute changes, ordered by attribute name.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource has to be destroyed and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// A resource brought under management by ImportResourceState.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The state read from BAM.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

impl From<ImportedResource> for generated::ImportedResource {
    fn from(resource: ImportedResource) -> Self {
        Self {
            resource_type: resource.resource_type,
            state: serde_json::to_vec(&resource.state).unwrap_or_default(),
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether Plan is called for destroy operations.
    pub plan_destroy: bool,
}

impl From<ServerCapabilities> for generated::ServerCapabilities {
    fn from(capabilities: ServerCapabilities) -> Self {
        Self {
            plan_destroy: capabilities.plan_destroy,
        }
    }
}

/// The protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_between() {
        let name = json!("office");
        let renamed = json!("lab");

        assert_eq!(AttributeChange::between("name", None, None), None);
        assert_eq!(
            AttributeChange::between("name", Some(&name), Some(&name)),
            None
        );
        assert_eq!(
            AttributeChange::between("name", None, Some(&name)),
            Some(AttributeChange::added("name", json!("office")))
        );
        assert_eq!(
            AttributeChange::between("name", Some(&name), None),
            Some(AttributeChange::removed("name", json!("office")))
        );
        assert_eq!(
            AttributeChange::between("name", Some(&name), Some(&renamed)),
            Some(AttributeChange::modified("name", json!("office"), json!("lab")))
        );
    }

    #[test]
    fn test_change_to_proto() {
        let proto: generated::AttributeChange =
            AttributeChange::added("size", json!(256)).into();

        assert_eq!(proto.path, "size");
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, b"256");
    }

    #[test]
    fn test_imported_resource_to_proto() {
        let imported = ImportedResource::new("bluecat_ip4_network", json!({"id": "1001"}));
        let proto: generated::ImportedResource = imported.into();

        assert_eq!(proto.resource_type, "bluecat_ip4_network");
        let state: Value = serde_json::from_slice(&proto.state).unwrap();
        assert_eq!(state["id"], "1001");
    }

    #[test]
    fn test_plan_result_with_changes() {
        let plan = PlanResult::with_changes(
            json!({"size": 512}),
            vec![AttributeChange::modified("size", json!(256), json!(512))],
            true,
        );
        assert_eq!(plan.changes.len(), 1);
        assert!(plan.requires_replace);
    }

    #[test]
    fn test_handshake_constants() {
        assert_eq!(
            format!("{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION),
            "HEMMER_PROVIDER|1"
        );
    }
}
