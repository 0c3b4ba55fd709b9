pub mod relay;

pub use relay::{ChallengeRelay, RelayOutcome};
