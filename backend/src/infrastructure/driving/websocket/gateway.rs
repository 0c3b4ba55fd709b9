use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::ports::ConnectionNotifier;
use crate::application::challenge::RelayOutcome;
use crate::application::presence::RegistryError;
use crate::domain::{ConnectionId, UserId};
use crate::infrastructure::AppState;
use shared::{events, replies, EventFrame, RegisterReply, RegisterRequest};

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::generate();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    state.hub.attach(connection_id.clone(), tx).await;
    info!(connection_id = %connection_id, "A user connected");

    // Outbound frames are queued through the hub so the core can push from anywhere.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                info!(connection_id = %connection_id, "Closing connection for shutdown");
                break;
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch(&state, &connection_id, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    state.hub.detach(&connection_id).await;
    writer.abort();
    info!(connection_id = %connection_id, "User disconnected");

    match state.registry.handle_disconnect(&connection_id).await {
        Ok(outcome) => debug!(connection_id = %connection_id, ?outcome, "Disconnect cleanup finished"),
        Err(e) => error!(connection_id = %connection_id, error = %e, "Error during disconnect handling"),
    }
}

/// Route one inbound text frame to the core.
pub async fn dispatch(state: &AppState, connection_id: &ConnectionId, text: &str) {
    let frame: EventFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "Ignoring malformed frame");
            return;
        }
    };
    debug!(connection_id = %connection_id, event = %frame.event, "Received event");

    if frame.event == events::REGISTER_USER {
        handle_register(state, connection_id, frame.data).await;
        return;
    }

    let Value::String(raw) = frame.data else {
        if frame.event.starts_with("response_2fa_") {
            warn!(connection_id = %connection_id, event = %frame.event, "Dropping 2FA response whose body is not a string");
        } else {
            warn!(connection_id = %connection_id, event = %frame.event, "Ignoring unknown event");
        }
        return;
    };
    match state.relay.submit_event(&frame.event, &raw).await {
        Some(RelayOutcome::Applied { key, replaced }) => {
            debug!(connection_id = %connection_id, key = %key, replaced, "2FA response relayed")
        }
        Some(RelayOutcome::Dropped(reason)) => {
            debug!(connection_id = %connection_id, reason = %reason, "2FA response dropped")
        }
        None => warn!(connection_id = %connection_id, event = %frame.event, "Ignoring unknown event"),
    }
}

async fn handle_register(state: &AppState, connection_id: &ConnectionId, data: Value) {
    let user_id = match RegisterRequest::from_value(data) {
        Some(RegisterRequest::Announce { user_id }) => user_id,
        Some(RegisterRequest::Forward { socket_id, payload }) => {
            state
                .registry
                .forward(connection_id, &ConnectionId::from(socket_id), payload)
                .await;
            return;
        }
        None => {
            warn!(connection_id = %connection_id, "register_user payload is neither a user id nor addressed");
            return;
        }
    };

    let reply = match UserId::new(user_id) {
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "Rejecting register_user");
            RegisterReply::failure(replies::INVALID_USER_ID)
        }
        Ok(user_id) => match state.registry.register(&user_id, connection_id).await {
            Ok(outcome) => RegisterReply::success(outcome.connection_id.as_str()),
            Err(RegistryError::AlreadyRegistered { .. }) => RegisterReply::failure(replies::ALREADY_REGISTERED),
            Err(e) => {
                error!(user_id = %user_id, connection_id = %connection_id, error = %e, "Error handling register_user");
                RegisterReply::failure(replies::REGISTER_FAILED)
            }
        },
    };

    match serde_json::to_value(&reply) {
        Ok(payload) => {
            state
                .hub
                .send_to_connection(connection_id, events::REGISTER_USER, payload)
                .await;
        }
        Err(e) => error!(connection_id = %connection_id, error = %e, "Failed to encode register_user reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::challenge::ChallengeRelay;
    use crate::application::ports::KeyValueStore;
    use crate::application::presence::{ConnectionRegistry, DuplicatePolicy};
    use crate::domain::KeySpace;
    use crate::infrastructure::driven::persistence::InMemoryKeyValueStore;
    use crate::infrastructure::driving::ConnectionHub;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_util::sync::CancellationToken;

    fn state_with(store: Arc<InMemoryKeyValueStore>, policy: DuplicatePolicy) -> AppState {
        let hub = Arc::new(ConnectionHub::new());
        AppState {
            registry: Arc::new(ConnectionRegistry::new(store.clone(), hub.clone(), KeySpace::default(), policy)),
            relay: Arc::new(ChallengeRelay::new(store, KeySpace::default(), None)),
            hub,
            shutdown: CancellationToken::new(),
        }
    }

    async fn connect(state: &AppState, id: &str) -> (ConnectionId, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::from(id);
        state.hub.attach(id.clone(), tx).await;
        (id, rx)
    }

    fn next_frame(rx: &mut UnboundedReceiver<Message>) -> EventFrame {
        match rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    fn frame(event: &str, data: Value) -> String {
        serde_json::to_string(&EventFrame::new(event, data)).unwrap()
    }

    #[tokio::test]
    async fn test_register_replies_with_socket_id() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let state = state_with(store.clone(), DuplicatePolicy::Refresh);
        let (c1, mut rx) = connect(&state, "c1").await;

        dispatch(&state, &c1, &frame("register_user", json!("alice"))).await;

        let reply = next_frame(&mut rx);
        assert_eq!(reply.event, "register_user");
        assert_eq!(
            reply.data,
            json!({"message": "User registered successfully", "socketId": "c1"})
        );
        assert_eq!(store.get("presence:user:alice").await.unwrap().as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_duplicate_register_is_echoed_under_reject() {
        let state = state_with(Arc::new(InMemoryKeyValueStore::new()), DuplicatePolicy::Reject);
        let (c1, mut rx) = connect(&state, "c1").await;

        dispatch(&state, &c1, &frame("register_user", json!("alice"))).await;
        next_frame(&mut rx);
        dispatch(&state, &c1, &frame("register_user", json!("alice"))).await;

        assert_eq!(
            next_frame(&mut rx).data,
            json!({"error": "User is already registered with this socket ID."})
        );
    }

    #[tokio::test]
    async fn test_blank_user_id_is_rejected() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let state = state_with(store.clone(), DuplicatePolicy::Refresh);
        let (c1, mut rx) = connect(&state, "c1").await;

        dispatch(&state, &c1, &frame("register_user", json!(""))).await;

        assert_eq!(next_frame(&mut rx).data, json!({"error": "Invalid user id."}));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_addressed_register_is_forwarded() {
        let state = state_with(Arc::new(InMemoryKeyValueStore::new()), DuplicatePolicy::Refresh);
        let (c1, mut rx1) = connect(&state, "c1").await;
        let (_c2, mut rx2) = connect(&state, "c2").await;

        let payload = json!({"socketId": "c2", "status": "approved"});
        dispatch(&state, &c1, &frame("register_user", payload.clone())).await;

        assert_eq!(next_frame(&mut rx2), EventFrame::new("register_user", payload));
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_challenge_response_is_silent_on_the_wire() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let state = state_with(store.clone(), DuplicatePolicy::Refresh);
        let (c1, mut rx) = connect(&state, "c1").await;

        let envelope = r#"{"userId":"alice","data":"{\"approved\":true}"}"#;
        dispatch(&state, &c1, &frame("response_2fa_otp_phone", json!(envelope))).await;
        dispatch(&state, &c1, &frame("response_2fa_app", json!("not json"))).await;
        dispatch(&state, &c1, &frame("response_2fa_app", json!({"userId": "alice"}))).await;

        assert!(rx.try_recv().is_err());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["challenge:alice_2fa_otp_phone"], r#"{"approved":true}"#);
    }

    #[tokio::test]
    async fn test_garbage_and_unknown_events_are_ignored() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let state = state_with(store.clone(), DuplicatePolicy::Refresh);
        let (c1, mut rx) = connect(&state, "c1").await;

        dispatch(&state, &c1, "{{{").await;
        dispatch(&state, &c1, &frame("response_2fa_email", json!("{}"))).await;
        dispatch(&state, &c1, &frame("register_user", json!(12))).await;

        assert!(rx.try_recv().is_err());
        assert!(store.snapshot().is_empty());
    }
}
