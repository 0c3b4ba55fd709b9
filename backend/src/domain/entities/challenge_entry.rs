use serde_json::Value;
use crate::domain::value_objects::{ChallengeKind, UserId};

/// Latest response received for one pending (user, kind) exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeEntry {
    pub user_id: UserId,
    pub kind: ChallengeKind,
    pub payload: String,
}

impl ChallengeEntry {
    /// The payload is opaque: strings are kept verbatim, anything else is
    /// stored as compact JSON text.
    pub fn new(user_id: UserId, kind: ChallengeKind, data: Value) -> Self {
        let payload = match data {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Self {
            user_id,
            kind,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserId {
        UserId::new("u1".to_string()).unwrap()
    }

    #[test]
    fn test_string_payload_is_verbatim() {
        let entry = ChallengeEntry::new(user(), ChallengeKind::App, json!("{\"ok\":1}"));
        assert_eq!(entry.payload, "{\"ok\":1}");
    }

    #[test]
    fn test_structured_payload_is_serialized() {
        let entry = ChallengeEntry::new(user(), ChallengeKind::App, json!({"approved": true}));
        assert_eq!(entry.payload, r#"{"approved":true}"#);
    }
}
