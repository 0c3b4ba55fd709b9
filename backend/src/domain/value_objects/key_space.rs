use super::{ChallengeKind, ConnectionId, UserId};

/// Key layout inside the shared store.
///
/// Presence entries and the connection index share the presence prefix;
/// challenge entries live under their own. The challenge prefix may be empty
/// for bare legacy keys, in which case a user id can spell out a presence
/// key, so writers check `is_presence_key` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    presence_prefix: String,
    challenge_prefix: String,
}

impl KeySpace {
    pub fn new(presence_prefix: impl Into<String>, challenge_prefix: impl Into<String>) -> Self {
        Self {
            presence_prefix: presence_prefix.into(),
            challenge_prefix: challenge_prefix.into(),
        }
    }

    /// `user id -> connection id`
    pub fn presence_key(&self, user_id: &UserId) -> String {
        format!("{}user:{}", self.presence_prefix, user_id)
    }

    /// `connection id -> user id`
    pub fn connection_key(&self, connection_id: &ConnectionId) -> String {
        format!("{}conn:{}", self.presence_prefix, connection_id)
    }

    pub fn presence_pattern(&self) -> String {
        format!("{}user:*", self.presence_prefix)
    }

    pub fn challenge_key(&self, user_id: &UserId, kind: ChallengeKind) -> String {
        format!("{}{}_{}", self.challenge_prefix, user_id, kind)
    }

    pub fn is_presence_key(&self, key: &str) -> bool {
        key.starts_with(&self.presence_prefix)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("presence:", "challenge:")
    }
}
