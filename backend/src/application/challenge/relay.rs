use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::locks::KeyedLocks;
use crate::application::ports::{KeyValueStore, StoreError};
use crate::domain::{ChallengeEntry, ChallengeKind, KeySpace, UserId};
use shared::ChallengeEnvelope;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed challenge envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("challenge envelope has an empty userId")]
    EmptyUserId,
    #[error("challenge userId {0:?} would overwrite a presence key")]
    ReservedUserId(String),
}

#[derive(Debug, Error)]
pub enum DropReason {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of relaying one response. Never echoed to the submitting socket.
#[derive(Debug)]
pub enum RelayOutcome {
    Applied {
        key: String,
        /// A pending response for the same user and kind was overwritten
        replaced: bool,
    },
    Dropped(DropReason),
}

/// Keeps the latest 2FA response per (user, challenge kind).
pub struct ChallengeRelay {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    ttl_secs: Option<u64>,
    locks: KeyedLocks,
}

impl ChallengeRelay {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace, ttl_secs: Option<u64>) -> Self {
        Self {
            store,
            keys,
            ttl_secs,
            locks: KeyedLocks::new(),
        }
    }

    /// Table-driven entry point for the `response_2fa_*` events.
    /// `None` when the event name is not a challenge response.
    pub async fn submit_event(&self, event: &str, raw: &str) -> Option<RelayOutcome> {
        let kind = ChallengeKind::from_event_name(event)?;
        Some(self.submit_response(kind, raw).await)
    }

    pub async fn submit_response(&self, kind: ChallengeKind, raw: &str) -> RelayOutcome {
        let entry = match decode(kind, raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Dropping undecodable 2FA response");
                return RelayOutcome::Dropped(e.into());
            }
        };

        let key = self.keys.challenge_key(&entry.user_id, entry.kind);
        if self.keys.is_presence_key(&key) {
            warn!(user_id = %entry.user_id, kind = %kind, "Dropping 2FA response addressed into the presence keyspace");
            return RelayOutcome::Dropped(DecodeError::ReservedUserId(entry.user_id.to_string()).into());
        }
        let _guard = self.locks.lock(&key).await;

        match self.write(&key, &entry.payload).await {
            Ok(replaced) => {
                info!(user_id = %entry.user_id, kind = %kind, replaced, "2FA response stored");
                RelayOutcome::Applied { key, replaced }
            }
            Err(e) => {
                error!(user_id = %entry.user_id, kind = %kind, error = %e, "Failed to store 2FA response");
                RelayOutcome::Dropped(e.into())
            }
        }
    }

    /// Overwrites the entry, reporting whether one was pending.
    async fn write(&self, key: &str, payload: &str) -> Result<bool, StoreError> {
        let replaced = self.store.get(key).await?.is_some();
        if replaced {
            debug!(key, "Overwriting pending 2FA response");
        }
        match self.ttl_secs {
            Some(ttl) => self.store.set_with_ttl(key, payload, ttl).await?,
            None => self.store.set(key, payload).await?,
        }
        Ok(replaced)
    }
}

fn decode(kind: ChallengeKind, raw: &str) -> Result<ChallengeEntry, DecodeError> {
    let envelope: ChallengeEnvelope = serde_json::from_str(raw)?;
    let user_id = UserId::new(envelope.user_id).map_err(|_| DecodeError::EmptyUserId)?;
    Ok(ChallengeEntry::new(user_id, kind, envelope.data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::key_value_store::MockKeyValueStore;
    use crate::infrastructure::driven::persistence::InMemoryKeyValueStore;

    fn applied(outcome: &RelayOutcome) -> bool {
        matches!(outcome, RelayOutcome::Applied { .. })
    }

    fn relay_with(store: Arc<InMemoryKeyValueStore>) -> ChallengeRelay {
        ChallengeRelay::new(store, KeySpace::default(), None)
    }

    #[tokio::test]
    async fn test_second_response_overwrites_first() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let relay = relay_with(store.clone());

        let first = relay
            .submit_response(ChallengeKind::App, r#"{"userId":"u1","data":"p1"}"#)
            .await;
        let second = relay
            .submit_response(ChallengeKind::App, r#"{"userId":"u1","data":"p2"}"#)
            .await;

        assert!(matches!(first, RelayOutcome::Applied { replaced: false, .. }));
        assert!(matches!(second, RelayOutcome::Applied { replaced: true, .. }));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("challenge:u1_2fa_app").map(String::as_str), Some("p2"));
    }

    #[tokio::test]
    async fn test_kinds_are_isolated() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let relay = relay_with(store.clone());

        for kind in ChallengeKind::ALL {
            let raw = format!(r#"{{"userId":"u1","data":"{}"}}"#, kind.as_str());
            assert!(applied(&relay.submit_response(kind, &raw).await));
        }
        relay
            .submit_response(ChallengeKind::OtpPhone, r#"{"userId":"u1","data":"again"}"#)
            .await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["challenge:u1_2fa_app"], "2fa_app");
        assert_eq!(snapshot["challenge:u1_2fa_otp_phone"], "again");
        assert_eq!(snapshot["challenge:u1_2fa_otp_whatsapp"], "2fa_otp_whatsapp");
    }

    #[tokio::test]
    async fn test_malformed_envelope_makes_no_store_calls() {
        // No expectations: any store call fails the test
        let store = MockKeyValueStore::new();
        let relay = ChallengeRelay::new(Arc::new(store), KeySpace::default(), None);

        for raw in ["not json", r#"{"data":"x"}"#, r#"{"userId":"","data":"x"}"#, r#"{"userId":"u1"}"#] {
            let outcome = relay.submit_response(ChallengeKind::App, raw).await;
            assert!(
                matches!(outcome, RelayOutcome::Dropped(DropReason::Decode(_))),
                "{raw} should be dropped"
            );
        }
    }

    #[tokio::test]
    async fn test_unprefixed_challenge_cannot_touch_presence_keys() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let relay = ChallengeRelay::new(store.clone(), KeySpace::new("presence:", ""), None);

        let outcome = relay
            .submit_response(ChallengeKind::App, r#"{"userId":"presence:user:x","data":"p"}"#)
            .await;
        assert!(matches!(
            outcome,
            RelayOutcome::Dropped(DropReason::Decode(DecodeError::ReservedUserId(_)))
        ));
        assert!(store.snapshot().is_empty());

        let outcome = relay
            .submit_response(ChallengeKind::App, r#"{"userId":"42","data":"p"}"#)
            .await;
        assert!(applied(&outcome));
        assert_eq!(store.snapshot()["42_2fa_app"], "p");
    }

    #[tokio::test]
    async fn test_store_failure_is_dropped() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StoreError("READONLY".to_string())));
        let relay = ChallengeRelay::new(Arc::new(store), KeySpace::default(), None);

        let outcome = relay
            .submit_response(ChallengeKind::OtpWhatsapp, r#"{"userId":"u1","data":"p"}"#)
            .await;

        assert!(matches!(outcome, RelayOutcome::Dropped(DropReason::Store(_))));
    }

    #[tokio::test]
    async fn test_ttl_uses_expiring_write() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().never();
        store
            .expect_set_with_ttl()
            .withf(|key, value, ttl| key == "challenge:u1_2fa_app" && value == r#"{"code":"123456"}"# && *ttl == 300)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let relay = ChallengeRelay::new(Arc::new(store), KeySpace::default(), Some(300));

        let outcome = relay
            .submit_response(ChallengeKind::App, r#"{"userId":"u1","data":{"code":"123456"}}"#)
            .await;

        assert!(applied(&outcome));
    }

    #[tokio::test]
    async fn test_submit_event_dispatches_by_name() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let relay = relay_with(store.clone());

        let outcome = relay
            .submit_event("response_2fa_otp_whatsapp", r#"{"userId":"u9","data":"ok"}"#)
            .await;
        assert!(outcome.as_ref().is_some_and(applied));
        assert!(store.snapshot().contains_key("challenge:u9_2fa_otp_whatsapp"));

        assert!(relay.submit_event("response_2fa_email", "{}").await.is_none());
    }
}
