use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied application user identifier. Opaque, but never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: String) -> Result<Self, String> {
        if id.trim().is_empty() {
            return Err("User id must not be empty".to_string());
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_ids() {
        assert!(UserId::new(String::new()).is_err());
        assert!(UserId::new("   ".to_string()).is_err());
    }

    #[test]
    fn test_keeps_id_verbatim() {
        let id = UserId::new(" user-42".to_string()).unwrap();
        assert_eq!(id.as_str(), " user-42");
    }
}
