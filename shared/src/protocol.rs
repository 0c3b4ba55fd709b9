use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names exchanged over the socket. These are the wire contract.
pub mod events {
    pub const REGISTER_USER: &str = "register_user";
    pub const RESPONSE_2FA_APP: &str = "response_2fa_app";
    pub const RESPONSE_2FA_OTP_PHONE: &str = "response_2fa_otp_phone";
    pub const RESPONSE_2FA_OTP_WHATSAPP: &str = "response_2fa_otp_whatsapp";
}

/// Replies sent back on `register_user`
pub mod replies {
    pub const REGISTERED: &str = "User registered successfully";
    pub const ALREADY_REGISTERED: &str = "User is already registered with this socket ID.";
    pub const REGISTER_FAILED: &str = "An error occurred while registering the user.";
    pub const INVALID_USER_ID: &str = "Invalid user id.";
}

/// A single text frame in either direction: `{"event": "...", "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Payload of an inbound `register_user` event.
///
/// A bare string announces the sender's user id. An object carrying a
/// `socketId` is an already-addressed message that gets forwarded verbatim
/// to that connection.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterRequest {
    Announce { user_id: String },
    Forward { socket_id: String, payload: Value },
}

impl RegisterRequest {
    pub fn from_value(data: Value) -> Option<Self> {
        match data {
            Value::String(user_id) => Some(Self::Announce { user_id }),
            Value::Object(ref map) => {
                let socket_id = map.get("socketId")?.as_str()?.to_string();
                Some(Self::Forward {
                    socket_id,
                    payload: data,
                })
            }
            _ => None,
        }
    }
}

/// Outbound `register_user` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterReply {
    Success {
        message: String,
        #[serde(rename = "socketId")]
        socket_id: String,
    },
    Failure {
        error: String,
    },
}

impl RegisterReply {
    pub fn success(socket_id: impl Into<String>) -> Self {
        Self::Success {
            message: replies::REGISTERED.to_string(),
            socket_id: socket_id.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }
}

/// Body of a `response_2fa_*` event, itself JSON-encoded inside a string.
/// `data` is opaque to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeEnvelope {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub data: Value,
}
