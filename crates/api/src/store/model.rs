//! Documents persisted by the API.
//!
//! Identifiers are UUID strings stored in `_id`, so documents round-trip
//! through JSON and BSON without driver-specific id types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform user mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject id (`user_...`).
    pub clerk_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// An interview session hosted by one user, optionally joined by another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    pub problem: String,
    pub difficulty: Difficulty,
    pub host_id: String,
    #[serde(default)]
    pub participant_id: Option<String>,
    pub status: SessionStatus,
    /// Creation time, unix milliseconds.
    pub created_at: i64,
}

impl Session {
    pub fn new(problem: String, difficulty: Difficulty, host_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            problem,
            difficulty,
            host_id,
            participant_id: None,
            status: SessionStatus::Active,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A chat message posted inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub session_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: i64,
}

impl ChatMessage {
    pub fn new(session_id: String, sender_id: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            sender_id,
            content,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_serialises_id_as_underscore_id() {
        let s = Session::new("two-sum".into(), Difficulty::Easy, "user_1".into());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["_id"], s.id.as_str());
        assert_eq!(v["status"], "active");
        assert_eq!(v["difficulty"], "easy");
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        let a = Session::new("p".into(), Difficulty::Hard, "h".into());
        let b = Session::new("p".into(), Difficulty::Hard, "h".into());
        assert_ne!(a.id, b.id);
    }
}
