//! Plain Rust types exchanged with the host, converted to and from the
//! protocol messages at the gRPC boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

fn decode_optional(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

fn encode_optional(value: Option<&Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(v).ok())
        .unwrap_or_default()
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            before: decode_optional(&proto.before),
            after: decode_optional(&proto.after),
            path: proto.path,
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            before: encode_optional(change.before.as_ref()),
            after: encode_optional(change.after.as_ref()),
            path: change.path,
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation (`null` when destroying).
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
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

    /// Create a plan that destroys the resource.
    pub fn destroy(changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state: Value::Null,
            changes,
            requires_replace: false,
        }
    }

    /// Paths of every attribute this plan touches.
    pub fn changed_paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
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

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix output by providers.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("label", json!("vr"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("vr")));

        let removed = AttributeChange::removed("label", json!("vr"));
        assert_eq!(removed.before, Some(json!("vr")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("priority", json!(25), json!(10));
        assert_eq!(modified.before, Some(json!(25)));
        assert_eq!(modified.after, Some(json!(10)));
    }

    #[test]
    fn test_attribute_change_proto_conversion() {
        let change = AttributeChange::modified("tags", json!([1]), json!([1, 2]));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "tags");
        assert_eq!(proto.before, b"[1]".to_vec());

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);
    }

    #[test]
    fn test_added_change_encodes_empty_before() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::added("id", json!(3)).into();
        assert!(proto.before.is_empty());

        let back: AttributeChange = proto.into();
        assert!(back.before.is_none());
    }

    #[test]
    fn test_plan_result_destroy() {
        let plan = PlanResult::destroy(vec![AttributeChange::removed("label", json!("hd"))]);
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changed_paths(), vec!["label"]);
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("whisparr_tag", json!({"id": 4, "label": "hd"}));
        assert_eq!(imported.resource_type, "whisparr_tag");
        assert_eq!(imported.state["label"], "hd");
    }
}
