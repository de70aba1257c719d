//! The object-finalize event as delivered by the channel.

use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

/// Storage notification payload. Only `name` is required by the handler;
/// everything else is carried for logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default, rename = "eventType")]
    pub event_type: Option<String>,
}

impl StorageEvent {
    /// Event for a finalized object, as used in tests and the dev runner.
    pub fn finalize(name: &str, bucket: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            bucket: Some(bucket.to_string()),
            event_type: Some("finalize".to_string()),
        }
    }

    /// The object key, validated non-empty.
    ///
    /// Checked before anything else so a malformed event never costs a
    /// database connection.
    pub fn object_name(&self) -> Result<&str, HandlerError> {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(HandlerError::Validation(
                "no file name in the event data".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delivery_payload() {
        let event: StorageEvent = serde_json::from_str(
            r#"{"name": "report.csv", "bucket": "uploads", "eventType": "finalize", "size": "123"}"#,
        )
        .unwrap();
        assert_eq!(event.object_name().unwrap(), "report.csv");
        assert_eq!(event.bucket.as_deref(), Some("uploads"));
    }

    #[test]
    fn missing_name_is_a_validation_error() {
        let event: StorageEvent = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            event.object_name(),
            Err(HandlerError::Validation(_))
        ));
    }

    #[test]
    fn empty_name_is_a_validation_error() {
        let event: StorageEvent = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(matches!(
            event.object_name(),
            Err(HandlerError::Validation(_))
        ));
    }
}
