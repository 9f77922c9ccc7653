//! Messages exchanged between the orchestrator and a worker unit.
//!
//! Both directions are tagged unions; the tag names are the ones written to
//! logs and used on the wire (`{"tag": ..., "data": ...}`).

use bytes::Bytes;
use emotes_core::ProcessingUpdate;
use serde::{Deserialize, Serialize};

/// A message kind that can be named without looking at its payload
pub trait Tagged {
    fn tag(&self) -> &'static str;
}

/// Orchestrator to worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorMessage {
    /// Next piece of the original upload, in order
    FileStreamChunk(Bytes),
    /// No more chunks follow
    FileStreamEnd,
}

impl Tagged for OrchestratorMessage {
    fn tag(&self) -> &'static str {
        match self {
            OrchestratorMessage::FileStreamChunk(_) => "FileStreamChunk",
            OrchestratorMessage::FileStreamEnd => "FileStreamEnd",
        }
    }
}

/// Worker to orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data")]
pub enum WorkerMessage {
    /// The original is on disk; persist the emote record
    #[serde(rename = "WriteDB")]
    WriteDb,
    ProcessingUpdate(ProcessingUpdate),
    /// Every rendition is uploaded
    ProcessingComplete,
    Error(String),
}

impl Tagged for WorkerMessage {
    fn tag(&self) -> &'static str {
        match self {
            WorkerMessage::WriteDb => "WriteDB",
            WorkerMessage::ProcessingUpdate(_) => "ProcessingUpdate",
            WorkerMessage::ProcessingComplete => "ProcessingComplete",
            WorkerMessage::Error(_) => "Error",
        }
    }
}

/// Everything a worker starts with
#[derive(Debug, Clone)]
pub struct WorkerInit {
    /// Serialized emote state
    pub emote_state: String,
    /// Upper bound on the original's size
    pub max_upload_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_worker_message_wire_shape() {
        let value = serde_json::to_value(WorkerMessage::WriteDb).unwrap();
        assert_eq!(value, serde_json::json!({ "tag": "WriteDB" }));

        let value = serde_json::to_value(WorkerMessage::Error("boom".into())).unwrap();
        assert_eq!(value, serde_json::json!({ "tag": "Error", "data": "boom" }));

        let update = ProcessingUpdate::progress(Uuid::nil(), 1, 13, "Resized 4x");
        let value = serde_json::to_value(WorkerMessage::ProcessingUpdate(update)).unwrap();
        assert_eq!(value["tag"], "ProcessingUpdate");
        assert_eq!(value["data"]["tasks"], serde_json::json!([1, 13]));
    }

    #[test]
    fn test_tags_match_wire_names() {
        for message in [
            WorkerMessage::WriteDb,
            WorkerMessage::ProcessingComplete,
            WorkerMessage::Error("x".into()),
        ] {
            let value = serde_json::to_value(&message).unwrap();
            assert_eq!(value["tag"], message.tag());
        }
        assert_eq!(
            OrchestratorMessage::FileStreamChunk(Bytes::from_static(b"x")).tag(),
            "FileStreamChunk"
        );
        assert_eq!(OrchestratorMessage::FileStreamEnd.tag(), "FileStreamEnd");
    }
}
