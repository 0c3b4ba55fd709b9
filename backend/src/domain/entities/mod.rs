pub mod presence_entry;
pub mod challenge_entry;

pub use presence_entry::PresenceEntry;
pub use challenge_entry::ChallengeEntry;
