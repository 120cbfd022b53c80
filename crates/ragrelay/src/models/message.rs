use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One turn of a conversation, to or from the assistant
pub struct Message {
    pub role: Role,
    #[serde(default = "timestamp")]
    pub created: i64,
    pub content: String,
}

fn timestamp() -> i64 {
    Utc::now().timestamp()
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            created: timestamp(),
            content: content.into(),
        }
    }

    /// Create a new user message with the current timestamp
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }
}
