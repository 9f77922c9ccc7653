use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Lifecycle status of an emote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "emote_status", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmoteStatus {
    Processing,
    Live,
    Deleted,
}

impl EmoteStatus {
    /// Status only moves forward; DELETED is terminal.
    pub fn can_transition_to(self, next: EmoteStatus) -> bool {
        matches!(
            (self, next),
            (EmoteStatus::Processing, EmoteStatus::Live)
                | (EmoteStatus::Processing, EmoteStatus::Deleted)
                | (EmoteStatus::Live, EmoteStatus::Deleted)
        )
    }
}

/// Whether a source decodes to a single frame or an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Static,
    Animated,
}

impl SourceKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.eq_ignore_ascii_case("image/gif") {
            SourceKind::Animated
        } else {
            SourceKind::Static
        }
    }

    /// Extension of the rendition files produced for this kind of source
    pub fn extension(self) -> &'static str {
        match self {
            SourceKind::Static => "png",
            SourceKind::Animated => "gif",
        }
    }
}

/// Persisted emote record, also used as the public projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct EmoteData {
    pub id: Uuid,
    pub name: String,
    pub private: bool,
    pub mime: String,
    pub owner: Uuid,
    pub owner_name: Option<String>,
    pub status: EmoteStatus,
    pub global: bool,
    pub tags: Vec<String>,
}

impl EmoteData {
    /// New in-memory emote for an upload that just started
    pub fn new_processing(name: impl Into<String>, mime: impl Into<String>, owner: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            private: true,
            mime: mime.into(),
            owner,
            owner_name: None,
            status: EmoteStatus::Processing,
            global: false,
            tags: Vec::new(),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        SourceKind::from_mime(&self.mime)
    }
}

/// Set of field changes applied to a persisted emote in one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotePatch {
    pub name: Option<String>,
    pub owner: Option<Uuid>,
    pub owner_name: Option<String>,
    pub global: Option<bool>,
    pub private: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl EmotePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.owner.is_none()
            && self.global.is_none()
            && self.private.is_none()
            && self.tags.is_none()
    }

    /// Apply the patch to an in-memory copy
    pub fn apply_to(&self, data: &mut EmoteData) {
        if let Some(name) = &self.name {
            data.name = name.clone();
        }
        if let Some(owner) = self.owner {
            data.owner = owner;
            data.owner_name = self.owner_name.clone();
        }
        if let Some(global) = self.global {
            data.global = global;
        }
        if let Some(private) = self.private {
            data.private = private;
        }
        if let Some(tags) = &self.tags {
            data.tags = tags.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_only_move_forward() {
        assert!(EmoteStatus::Processing.can_transition_to(EmoteStatus::Live));
        assert!(EmoteStatus::Processing.can_transition_to(EmoteStatus::Deleted));
        assert!(EmoteStatus::Live.can_transition_to(EmoteStatus::Deleted));
        assert!(!EmoteStatus::Live.can_transition_to(EmoteStatus::Processing));
        assert!(!EmoteStatus::Deleted.can_transition_to(EmoteStatus::Live));
        assert!(!EmoteStatus::Deleted.can_transition_to(EmoteStatus::Processing));
    }

    #[test]
    fn test_new_processing_defaults() {
        let owner = Uuid::new_v4();
        let data = EmoteData::new_processing("PepeHands", "image/png", owner);
        assert_eq!(data.status, EmoteStatus::Processing);
        assert!(data.private);
        assert!(!data.global);
        assert_eq!(data.owner, owner);
        assert!(data.tags.is_empty());
    }

    #[test]
    fn test_source_kind_from_mime() {
        assert_eq!(SourceKind::from_mime("image/gif"), SourceKind::Animated);
        assert_eq!(SourceKind::from_mime("image/png"), SourceKind::Static);
        assert_eq!(SourceKind::Animated.extension(), "gif");
        assert_eq!(SourceKind::Static.extension(), "png");
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&EmoteStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }

    #[test]
    fn test_patch_apply_to() {
        let mut data = EmoteData::new_processing("old", "image/png", Uuid::new_v4());
        let patch = EmotePatch {
            name: Some("new".into()),
            tags: Some(vec!["cute".into()]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut data);
        assert_eq!(data.name, "new");
        assert_eq!(data.tags, vec!["cute".to_string()]);
        assert!(EmotePatch::default().is_empty());
    }
}
