//! Emote entity
//!
//! An [`Emote`] pairs the persisted record with the collaborators it needs to
//! transform, publish, edit and remove itself.

mod lifecycle;
mod transform;
mod update;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use emotes_core::constants::ORIGINAL_FILE_NAME;
use emotes_core::validation::{self, EmoteField, FieldValidation};
use emotes_core::{AppError, EmoteData, EmoteStatus};
use uuid::Uuid;

use crate::EmoteContext;

pub use transform::ResizeSequence;
pub use update::{Rejection, UpdateOptions, UpdateOutcome};

#[derive(Clone)]
pub struct Emote {
    data: EmoteData,
    ctx: Arc<EmoteContext>,
}

/// One pass/fail result per checked field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteValidation {
    pub results: Vec<FieldValidation>,
}

impl EmoteValidation {
    pub fn valid(&self) -> bool {
        self.results.iter().all(FieldValidation::passed)
    }

    pub fn first_error(&self) -> Option<&validation::ValidationError> {
        self.results.iter().find_map(|r| r.error.as_ref())
    }
}

impl Emote {
    pub fn new(data: EmoteData, ctx: Arc<EmoteContext>) -> Self {
        Self { data, ctx }
    }

    /// Fresh PROCESSING emote for an upload that is about to start
    pub fn synthesize(
        name: impl Into<String>,
        mime: impl Into<String>,
        owner: Uuid,
        ctx: Arc<EmoteContext>,
    ) -> Self {
        Self::new(EmoteData::new_processing(name, mime, owner), ctx)
    }

    /// Rebuild an emote from its serialized state
    pub fn from_json(state: &str, ctx: Arc<EmoteContext>) -> Result<Self, AppError> {
        let data: EmoteData = serde_json::from_str(state)?;
        Ok(Self::new(data, ctx))
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(&self.data)?)
    }

    pub fn id(&self) -> Uuid {
        self.data.id
    }

    pub fn status(&self) -> EmoteStatus {
        self.data.status
    }

    pub fn data(&self) -> &EmoteData {
        &self.data
    }

    /// Initial tags of a not yet persisted emote
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.data.tags = tags;
    }

    pub(crate) fn ctx(&self) -> &EmoteContext {
        &self.ctx
    }

    /// Scratch directory holding the original upload and renditions
    pub fn filepath(&self) -> PathBuf {
        self.ctx.scratch_dir(self.data.id)
    }

    pub fn original_path(&self) -> PathBuf {
        self.filepath().join(ORIGINAL_FILE_NAME)
    }

    /// Create the scratch directory
    pub async fn ensure_filepath(&self) -> Result<PathBuf, AppError> {
        let dir = self.filepath();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Public projection
    pub fn resolve(&self) -> EmoteData {
        self.data.clone()
    }

    /// Check every user-controlled field without touching storage
    pub fn validate(&self) -> EmoteValidation {
        EmoteValidation {
            results: vec![
                FieldValidation::from_result(
                    EmoteField::Name,
                    validation::validate_name(&self.data.name),
                ),
                FieldValidation::from_result(
                    EmoteField::Mime,
                    validation::validate_mime(&self.data.mime),
                ),
                FieldValidation::from_result(
                    EmoteField::Tags,
                    validation::validate_tags(&self.data.tags),
                ),
            ],
        }
    }

    /// Persist the current state, refreshing the owner's display name
    #[tracing::instrument(skip(self), fields(emote_id = %self.data.id))]
    pub async fn write(&mut self) -> Result<(), AppError> {
        if let Some(owner) = self.ctx.users.find_by_id(self.data.owner).await? {
            self.data.owner_name = Some(owner.display_name);
        }
        self.data = self.ctx.emotes.upsert(&self.data).await?;
        Ok(())
    }
}

impl fmt::Display for Emote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Emote({} {:?})", self.data.id, self.data.name)
    }
}

impl fmt::Debug for Emote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emote").field("data", &self.data).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::harness;
    use emotes_core::UserRank;

    #[test]
    fn test_validate_reports_each_field() {
        let h = harness();
        let mut emote = Emote::synthesize("x", "video/mp4", Uuid::new_v4(), h.ctx.clone());
        emote.data.tags = vec!["ok".into()];
        let report = emote.validate();
        assert_eq!(report.results.len(), 3);
        assert!(!report.valid());
        let failed: Vec<EmoteField> = report
            .results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.field)
            .collect();
        assert_eq!(failed, vec![EmoteField::Name, EmoteField::Mime]);
    }

    #[test]
    fn test_json_round_trip_keeps_identity() {
        let h = harness();
        let emote = Emote::synthesize("PepeHands", "image/png", Uuid::new_v4(), h.ctx.clone());
        let restored = Emote::from_json(&emote.to_json().unwrap(), h.ctx.clone()).unwrap();
        assert_eq!(restored.resolve(), emote.resolve());
        assert_eq!(restored.filepath(), h.scratch.path().join(emote.id().to_string()));
    }

    #[tokio::test]
    async fn test_write_fills_owner_name() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = Emote::synthesize("forsenE", "image/png", owner.id, h.ctx.clone());

        emote.write().await.unwrap();

        let stored = h.emotes.get(emote.id()).unwrap();
        assert_eq!(stored.owner_name.as_deref(), Some("forsen"));
        assert_eq!(stored.status, EmoteStatus::Processing);
        assert!(stored.private);
    }
}
