//! Chat message types and time-derived identifiers.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Next unique, monotonically increasing identifier.
///
/// Derived from the wall clock in milliseconds; when two ids are requested
/// within the same millisecond the later one is bumped past the earlier.
pub fn next_id() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn in a note's chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: next_id(),
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }

    pub fn is_model(&self) -> bool {
        self.role == ChatRole::Model
    }
}
