use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Progress event published on the status bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessingUpdate {
    #[serde(rename = "emoteID")]
    pub emote_id: Uuid,
    /// (completed, total)
    #[schema(value_type = Vec<u32>)]
    pub tasks: (u32, u32),
    pub message: String,
    pub done: bool,
    pub error: bool,
}

impl ProcessingUpdate {
    pub fn progress(emote_id: Uuid, completed: u32, total: u32, message: impl Into<String>) -> Self {
        Self {
            emote_id,
            tasks: (completed, total),
            message: message.into(),
            done: false,
            error: false,
        }
    }

    pub fn completed(emote_id: Uuid, total: u32, message: impl Into<String>) -> Self {
        Self {
            emote_id,
            tasks: (total, total),
            message: message.into(),
            done: true,
            error: false,
        }
    }

    pub fn failed(emote_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            emote_id,
            tasks: (0, 0),
            message: message.into(),
            done: false,
            error: true,
        }
    }

    /// Last event for this emote
    pub fn is_terminal(&self) -> bool {
        self.done || self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let id = Uuid::nil();
        let update = ProcessingUpdate::progress(id, 3, 13, "Resized 2x");
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["emoteID"], serde_json::json!(id));
        assert_eq!(value["tasks"], serde_json::json!([3, 13]));
        assert_eq!(value["done"], false);
        assert_eq!(value["error"], false);
    }

    #[test]
    fn test_terminal_updates() {
        let id = Uuid::new_v4();
        assert!(!ProcessingUpdate::progress(id, 1, 13, "x").is_terminal());
        assert!(ProcessingUpdate::completed(id, 13, "done").is_terminal());
        let failed = ProcessingUpdate::failed(id, "boom");
        assert!(failed.is_terminal());
        assert!(failed.error);
        assert_eq!(failed.tasks, (0, 0));
    }
}
