pub mod user_id;
pub mod connection_id;
pub mod challenge_kind;
pub mod key_space;

pub use user_id::UserId;
pub use connection_id::ConnectionId;
pub use challenge_kind::ChallengeKind;
pub use key_space::KeySpace;
