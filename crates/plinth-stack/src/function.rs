//! Function declaration and the event trigger binding.

use serde::{Deserialize, Serialize};

/// Event kind the binding subscribes to: a completed object write.
pub const OBJECT_FINALIZE: &str = "object-finalize";

/// The deployed handler function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub entry_point: String,
    pub runtime: String,
    pub region: String,
    /// Container + object key of the uploaded code artifact.
    pub source_container: String,
    pub source_object: String,
}

/// Binds the handler to object-finalize events on the source container.
///
/// Creation preconditions (service APIs enabled, identity created, code
/// artifact uploaded) are declared as graph edges; the binding fails fast
/// if any is missing instead of racing the platform's own propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBinding {
    pub function: FunctionSpec,
    /// Name of the event-source container.
    pub source_container: String,
    pub event_kind: String,
}

impl TriggerBinding {
    pub fn new(function: FunctionSpec, source_container: &str) -> Self {
        Self {
            function,
            source_container: source_container.to_string(),
            event_kind: OBJECT_FINALIZE.to_string(),
        }
    }

    /// The resolved event resource passed to the handler.
    pub fn event_resource(&self, container_id: &str) -> String {
        format!("projects/_/buckets/{container_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_resource_format() {
        let binding = TriggerBinding::new(
            FunctionSpec {
                name: "upload-fn".to_string(),
                entry_point: "process_upload".to_string(),
                runtime: "rust".to_string(),
                region: "us-central1".to_string(),
                source_container: "code-bucket".to_string(),
                source_object: "handler-abc123.zip".to_string(),
            },
            "uploads-bucket",
        );
        assert_eq!(binding.event_kind, OBJECT_FINALIZE);
        assert_eq!(
            binding.event_resource("uploads-bucket"),
            "projects/_/buckets/uploads-bucket"
        );
    }
}
