use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::locks::KeyedLocks;
use crate::application::ports::{ConnectionNotifier, KeyValueStore, StoreError, StoreOp};
use crate::domain::{ConnectionId, KeySpace, PresenceEntry, UserId};
use shared::events;

/// What happens when a connection registers a user it already represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Rewrite the entry and report success
    #[default]
    Refresh,
    /// Leave the entry alone and report `AlreadyRegistered`
    Reject,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("user {user_id} is already registered with connection {connection_id}")]
    AlreadyRegistered {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub connection_id: ConnectionId,
    /// Connection that represented the user before this call, if it differs
    pub replaced: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The connection never registered anyone
    NotRegistered,
    /// The user's presence entry was removed
    Removed { user_id: UserId },
    /// The user had already moved to another connection; only the index was cleared
    Superseded { user_id: UserId },
}

/// Presence directory: which live connection represents which user.
///
/// Every user id has at most one presence entry, mirrored by a
/// `connection -> user` index entry so that disconnect cleanup never needs
/// to scan the keyspace. Both are always written in one atomic batch, and
/// operations on the same user are serialized.
pub struct ConnectionRegistry {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn ConnectionNotifier>,
    keys: KeySpace,
    policy: DuplicatePolicy,
    locks: KeyedLocks,
}

impl ConnectionRegistry {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn ConnectionNotifier>,
        keys: KeySpace,
        policy: DuplicatePolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            keys,
            policy,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn register(
        &self,
        user_id: &UserId,
        connection_id: &ConnectionId,
    ) -> Result<RegisterOutcome, RegistryError> {
        let presence_key = self.keys.presence_key(user_id);
        let connection_key = self.keys.connection_key(connection_id);

        // A connection represents one user at a time, so a connection that used
        // to stand for someone else touches that user's entry too. Both users are
        // locked, and the index must still name the same owner once they are.
        let mut owner = self.store.get(&connection_key).await?;
        loop {
            let previous_user = owner
                .as_deref()
                .filter(|previous| *previous != user_id.as_str())
                .and_then(|previous| UserId::new(previous.to_string()).ok());
            let mut lock_keys = vec![presence_key.clone()];
            if let Some(previous_user) = &previous_user {
                lock_keys.push(self.keys.presence_key(previous_user));
            }
            let _guards = self.locks.lock_all(&lock_keys).await;

            let current = self.store.get(&connection_key).await?;
            if current == owner {
                return self.register_locked(user_id, connection_id, previous_user).await;
            }
            debug!(connection_id = %connection_id, "Connection index moved while locking, retrying");
            owner = current;
        }
    }

    /// Caller holds the locks of `user_id` and `previous_user`.
    async fn register_locked(
        &self,
        user_id: &UserId,
        connection_id: &ConnectionId,
        previous_user: Option<UserId>,
    ) -> Result<RegisterOutcome, RegistryError> {
        let presence_key = self.keys.presence_key(user_id);
        let connection_key = self.keys.connection_key(connection_id);

        let mut ops = Vec::new();
        let mut replaced = None;

        match self.store.get(&presence_key).await?.map(ConnectionId::from) {
            Some(existing) if existing == *connection_id => {
                if self.policy == DuplicatePolicy::Reject {
                    debug!(user_id = %user_id, connection_id = %connection_id, "Duplicate registration rejected");
                    return Err(RegistryError::AlreadyRegistered {
                        user_id: user_id.clone(),
                        connection_id: existing,
                    });
                }
            }
            Some(existing) => {
                // The old connection may have moved on to another user already
                let existing_key = self.keys.connection_key(&existing);
                if self.store.get(&existing_key).await?.as_deref() == Some(user_id.as_str()) {
                    ops.push(StoreOp::delete(existing_key));
                }
                replaced = Some(existing);
            }
            None => {}
        }

        if let Some(previous_user) = previous_user {
            let previous_key = self.keys.presence_key(&previous_user);
            if self.store.get(&previous_key).await?.as_deref() == Some(connection_id.as_str()) {
                debug!(previous_user = %previous_user, connection_id = %connection_id, "Dropping previous user on re-registration");
                ops.push(StoreOp::delete(previous_key));
            }
        }

        ops.push(StoreOp::set(presence_key, connection_id.as_str()));
        ops.push(StoreOp::set(connection_key, user_id.as_str()));
        self.store.apply(ops).await?;

        match &replaced {
            Some(old) => info!(user_id = %user_id, connection_id = %connection_id, replaced = %old, "User reconnected"),
            None => info!(user_id = %user_id, connection_id = %connection_id, "User registered"),
        }

        Ok(RegisterOutcome {
            connection_id: connection_id.clone(),
            replaced,
        })
    }

    /// Push an already-addressed `register_user` payload to `target`.
    /// A target that is gone, or the sender itself, is silently skipped.
    pub async fn forward(&self, sender: &ConnectionId, target: &ConnectionId, payload: Value) -> bool {
        if sender == target {
            debug!(connection_id = %sender, "Not forwarding to the sending connection");
            return false;
        }
        let delivered = self
            .notifier
            .send_to_connection(target, events::REGISTER_USER, payload)
            .await;
        debug!(from = %sender, to = %target, delivered, "Forwarded register_user payload");
        delivered
    }

    pub async fn handle_disconnect(&self, connection_id: &ConnectionId) -> Result<DisconnectOutcome, RegistryError> {
        let connection_key = self.keys.connection_key(connection_id);

        let mut owner = self.store.get(&connection_key).await?;
        loop {
            let Some(current_owner) = owner else {
                return Ok(DisconnectOutcome::NotRegistered);
            };
            let user_id = match UserId::new(current_owner.clone()) {
                Ok(user_id) => user_id,
                Err(_) => {
                    warn!(connection_id = %connection_id, "Connection index held a blank user id");
                    self.store.delete(&connection_key).await?;
                    return Ok(DisconnectOutcome::NotRegistered);
                }
            };

            let presence_key = self.keys.presence_key(&user_id);
            let _guard = self.locks.lock(&presence_key).await;

            // A concurrent register may have moved the connection to another user
            let current = self.store.get(&connection_key).await?;
            if current.as_deref() != Some(current_owner.as_str()) {
                owner = current;
                continue;
            }

            if self.store.get(&presence_key).await?.as_deref() == Some(connection_id.as_str()) {
                self.store
                    .apply(vec![StoreOp::delete(presence_key), StoreOp::delete(connection_key)])
                    .await?;
                info!(user_id = %user_id, connection_id = %connection_id, "User unregistered on disconnect");
                return Ok(DisconnectOutcome::Removed { user_id });
            }
            self.store.delete(&connection_key).await?;
            debug!(user_id = %user_id, connection_id = %connection_id, "Stale connection index removed");
            return Ok(DisconnectOutcome::Superseded { user_id });
        }
    }

    pub async fn resolve(&self, user_id: &UserId) -> Result<Option<PresenceEntry>, RegistryError> {
        let current = self.store.get(&self.keys.presence_key(user_id)).await?;
        Ok(current.map(|id| PresenceEntry::new(user_id.clone(), ConnectionId::from(id))))
    }

    /// Resolve a user and push an event to their connection.
    pub async fn push_to_user(&self, user_id: &UserId, event: &str, payload: Value) -> Result<bool, RegistryError> {
        match self.resolve(user_id).await? {
            Some(entry) => Ok(self
                .notifier
                .send_to_connection(&entry.connection_id, event, payload)
                .await),
            None => Ok(false),
        }
    }

    pub async fn online_count(&self) -> Result<usize, RegistryError> {
        Ok(self.store.list_keys(&self.keys.presence_pattern()).await?.len())
    }
}
