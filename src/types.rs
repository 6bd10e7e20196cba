//! Plan results, imported resources, and protocol constants.
//!
//! These wrap the raw protobuf messages in types that carry
//! [`serde_json::Value`]s instead of encoded bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proto;

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

    /// A change for a newly set attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// A change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// A change for a modified attribute.
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

impl From<proto::AttributeChange> for AttributeChange {
    fn from(change: proto::AttributeChange) -> Self {
        Self {
            path: change.path,
            before: decode_optional(&change.before),
            after: decode_optional(&change.after),
        }
    }
}

impl From<AttributeChange> for proto::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            before: encode_optional(change.before.as_ref()),
            after: encode_optional(change.after.as_ref()),
            path: change.path,
        }
    }
}

/// The result of planning a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after apply; may contain unknown markers.
    pub planned_state: Value,
    /// Attribute-level changes against the prior state.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

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

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// A resource produced by an import.
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
    /// Whether the provider plans destroy operations.
    pub plan_destroy: bool,
}

/// go-plugin core protocol version printed first in the handshake.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the JSON-state provider protocol spoken over gRPC.
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable the host sets when launching a plugin.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Expected value of [`MAGIC_COOKIE_KEY`].
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Format the handshake line for a listening address.
pub fn handshake_line(addr: std::net::SocketAddr) -> String {
    format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, addr
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_proto_conversion() {
        let change = AttributeChange::added("name", json!("accounts"));
        let encoded: proto::AttributeChange = change.clone().into();
        assert!(encoded.before.is_empty());
        assert_eq!(encoded.after, b"\"accounts\"".to_vec());

        let decoded: AttributeChange = encoded.into();
        assert_eq!(decoded, change);
    }

    #[test]
    fn test_removed_change_encodes_empty_after() {
        let encoded: proto::AttributeChange =
            AttributeChange::removed("name", json!("old")).into();
        assert!(encoded.after.is_empty());
        assert_eq!(encoded.before, b"\"old\"".to_vec());
    }

    #[test]
    fn test_plan_result_has_changes() {
        assert!(!PlanResult::no_change(json!({"id": "1"})).has_changes());
        let plan = PlanResult::with_changes(
            json!({"id": "1", "name": "b"}),
            vec![AttributeChange::modified("name", json!("a"), json!("b"))],
            false,
        );
        assert!(plan.has_changes());
    }

    #[test]
    fn test_handshake_line() {
        let addr: std::net::SocketAddr = "127.0.0.1:50051".parse().unwrap();
        assert_eq!(handshake_line(addr), "1|1|tcp|127.0.0.1:50051|grpc");
    }
}
