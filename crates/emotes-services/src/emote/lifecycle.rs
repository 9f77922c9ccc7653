use std::time::Instant;

use emotes_core::{AppError, EmoteStatus, User};

use super::Emote;

impl Emote {
    fn ensure_editable(&self) -> Result<(), AppError> {
        if self.status() == EmoteStatus::Processing {
            return Err(AppError::Locked(format!(
                "emote {} is still processing",
                self.id()
            )));
        }
        Ok(())
    }

    /// Owner or moderator
    pub fn authorize_delete(&self, actor: &User) -> Result<(), AppError> {
        if actor.can_manage(self.data.owner) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "only the owner or a moderator may delete this emote".to_string(),
            ))
        }
    }

    /// Remove every stored rendition, then the record.
    ///
    /// Storage goes first. If it fails the record is kept so the objects
    /// stay reachable through it. A PROCESSING emote is locked until its
    /// worker finishes.
    #[tracing::instrument(skip(self), fields(emote_id = %self.id()))]
    pub async fn delete(&mut self) -> Result<(), AppError> {
        self.ensure_editable()?;
        let start = Instant::now();

        let removed = self.purge_objects().await?;
        self.ctx().emotes.delete(self.id()).await?;
        self.data.status = EmoteStatus::Deleted;

        tracing::info!(
            objects = removed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Emote deleted"
        );
        Ok(())
    }

    async fn purge_objects(&self) -> Result<usize, AppError> {
        let prefix = format!("{}/", self.ctx().keys.emote_prefix(self.id()));
        let keys = self.ctx().storage.list_prefix(&prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        Ok(self.ctx().storage.delete_many(&keys).await?)
    }

    /// Flip the stored record from PROCESSING to LIVE.
    ///
    /// Fails with `NotFound` if the record vanished or left PROCESSING while
    /// the worker ran. The renditions uploaded for it are removed then.
    #[tracing::instrument(skip(self), fields(emote_id = %self.id()))]
    pub async fn mark_live(&mut self) -> Result<(), AppError> {
        if !self.status().can_transition_to(EmoteStatus::Live) {
            return Err(AppError::InvalidInput(format!(
                "emote {} cannot go live from {:?}",
                self.id(),
                self.status()
            )));
        }

        match self.ctx().emotes.mark_live(self.id()).await? {
            Some(data) => {
                self.data = data;
                Ok(())
            }
            None => {
                match self.purge_objects().await {
                    Ok(removed) => {
                        tracing::info!(objects = removed, "Removed renditions of a vanished emote")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to remove renditions of a vanished emote")
                    }
                }
                Err(AppError::NotFound(format!(
                    "emote {} was removed while processing",
                    self.id()
                )))
            }
        }
    }

    /// Enable this emote in `channel`'s emote set
    #[tracing::instrument(skip(self, channel), fields(emote_id = %self.id(), channel_id = %channel.id))]
    pub async fn add_to_channel(&self, channel: &User) -> Result<User, AppError> {
        self.ensure_channel_mutable()?;
        self.ctx()
            .users
            .add_emote(channel.id, self.id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", channel.id)))
    }

    /// Disable this emote in `channel`'s emote set
    #[tracing::instrument(skip(self, channel), fields(emote_id = %self.id(), channel_id = %channel.id))]
    pub async fn remove_from_channel(&self, channel: &User) -> Result<User, AppError> {
        self.ensure_channel_mutable()?;
        self.ctx()
            .users
            .remove_emote(channel.id, self.id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", channel.id)))
    }

    fn ensure_channel_mutable(&self) -> Result<(), AppError> {
        self.ensure_editable()?;
        if self.data.global {
            return Err(AppError::Forbidden(
                "global emotes are enabled in every channel".to_string(),
            ));
        }
        Ok(())
    }
}
