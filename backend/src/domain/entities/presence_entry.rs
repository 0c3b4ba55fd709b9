use crate::domain::value_objects::{ConnectionId, UserId};

/// The connection currently representing a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

impl PresenceEntry {
    pub fn new(user_id: UserId, connection_id: ConnectionId) -> Self {
        Self {
            user_id,
            connection_id,
        }
    }
}
