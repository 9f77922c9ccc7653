use emotes_core::validation::{self, EmoteField};
use emotes_core::{AppError, EmotePatch, EmoteStatus, ErrorMetadata, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Emote;

/// Requested field changes. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateOptions {
    pub name: Option<String>,
    pub owner: Option<Uuid>,
    pub global: Option<bool>,
    pub private: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl UpdateOptions {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.owner.is_none()
            && self.global.is_none()
            && self.private.is_none()
            && self.tags.is_none()
    }
}

/// Which requested fields were applied and why the others were refused
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct UpdateOutcome {
    #[schema(value_type = Vec<String>)]
    pub applied: Vec<EmoteField>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Rejection {
    #[schema(value_type = String)]
    pub field: EmoteField,
    pub reason: String,
}

struct Review {
    patch: EmotePatch,
    outcome: UpdateOutcome,
    first_error: Option<AppError>,
    only_forbidden: bool,
}

impl Review {
    fn new() -> Self {
        Self {
            patch: EmotePatch::default(),
            outcome: UpdateOutcome::default(),
            first_error: None,
            only_forbidden: true,
        }
    }

    fn accept(&mut self, field: EmoteField) {
        self.outcome.applied.push(field);
    }

    fn reject(&mut self, field: EmoteField, err: AppError) {
        tracing::debug!(field = %field, reason = %err, "Emote field rejected");
        self.outcome.rejected.push(Rejection {
            field,
            reason: err.to_string(),
        });
        self.only_forbidden &= matches!(err, AppError::Forbidden(_));
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }

    /// Error for a request where nothing could be applied
    fn into_error(self) -> AppError {
        match self.first_error {
            Some(err) if self.only_forbidden => err,
            Some(err) => AppError::NoChange(format!(
                "no field could be changed: {}",
                err.client_message()
            )),
            None => AppError::NoChange("no fields to update".to_string()),
        }
    }
}

fn forbidden(field: EmoteField) -> AppError {
    AppError::Forbidden(format!("not allowed to change {}", field))
}

impl Emote {
    /// Apply the fields `actor` may change in one atomic write.
    ///
    /// Fields the actor lacks permission for, or that fail validation, are
    /// skipped and reported. If nothing is left to apply the call fails:
    /// `Forbidden` when the actor may change none of the requested fields,
    /// `NoChange` otherwise.
    #[tracing::instrument(skip(self, options, actor), fields(emote_id = %self.id(), actor_id = %actor.id))]
    pub async fn update(
        &mut self,
        options: UpdateOptions,
        actor: &User,
    ) -> Result<UpdateOutcome, AppError> {
        if self.status() == EmoteStatus::Processing {
            return Err(AppError::Locked(format!(
                "emote {} is still processing",
                self.id()
            )));
        }

        let manages = actor.can_manage(self.data.owner);
        let mut review = Review::new();

        if let Some(name) = options.name {
            if !manages {
                review.reject(EmoteField::Name, forbidden(EmoteField::Name));
            } else if let Err(e) = validation::validate_name(&name) {
                review.reject(EmoteField::Name, e.into());
            } else {
                review.patch.name = Some(name);
                review.accept(EmoteField::Name);
            }
        }

        if let Some(owner) = options.owner {
            if !manages {
                review.reject(EmoteField::Owner, forbidden(EmoteField::Owner));
            } else {
                match self.ctx().users.find_by_id(owner).await? {
                    Some(new_owner) => {
                        review.patch.owner = Some(new_owner.id);
                        review.patch.owner_name = Some(new_owner.display_name);
                        review.accept(EmoteField::Owner);
                    }
                    None => review.reject(
                        EmoteField::Owner,
                        AppError::NotFound(format!("user {}", owner)),
                    ),
                }
            }
        }

        if let Some(global) = options.global {
            if actor.is_moderator() {
                review.patch.global = Some(global);
                review.accept(EmoteField::Global);
            } else {
                review.reject(EmoteField::Global, forbidden(EmoteField::Global));
            }
        }

        if let Some(private) = options.private {
            if manages {
                review.patch.private = Some(private);
                review.accept(EmoteField::Private);
            } else {
                review.reject(EmoteField::Private, forbidden(EmoteField::Private));
            }
        }

        if let Some(tags) = options.tags {
            if !manages {
                review.reject(EmoteField::Tags, forbidden(EmoteField::Tags));
            } else if let Err(e) = validation::validate_tags(&tags) {
                review.reject(EmoteField::Tags, e.into());
            } else {
                review.patch.tags = Some(tags);
                review.accept(EmoteField::Tags);
            }
        }

        if review.patch.is_empty() {
            return Err(review.into_error());
        }

        let updated = self
            .ctx()
            .emotes
            .apply_patch(self.id(), &review.patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("emote {}", self.id())))?;
        self.data = updated;

        tracing::info!(
            applied = ?review.outcome.applied,
            rejected = review.outcome.rejected.len(),
            "Emote updated"
        );

        Ok(review.outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::{harness, Harness};
    use super::*;
    use emotes_core::UserRank;

    async fn live_emote(h: &Harness, owner: &User) -> Emote {
        let mut emote = Emote::synthesize("forsenE", "image/png", owner.id, h.ctx.clone());
        emote.data.status = EmoteStatus::Live;
        emote.write().await.unwrap();
        emote
    }

    #[tokio::test]
    async fn test_owner_renames_and_tags() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let outcome = emote
            .update(
                UpdateOptions {
                    name: Some("forsenPls".into()),
                    tags: Some(vec!["dance".into()]),
                    private: Some(false),
                    ..Default::default()
                },
                &owner,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.applied,
            vec![EmoteField::Name, EmoteField::Private, EmoteField::Tags]
        );
        let stored = h.emotes.get(emote.id()).unwrap();
        assert_eq!(stored.name, "forsenPls");
        assert_eq!(stored.tags, vec!["dance".to_string()]);
        assert!(!stored.private);
        assert_eq!(emote.data().name, "forsenPls");
    }

    #[tokio::test]
    async fn test_stranger_cannot_rename() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let stranger = h.users.add_user("xqc", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let err = emote
            .update(
                UpdateOptions {
                    name: Some("stolen".into()),
                    ..Default::default()
                },
                &stranger,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(h.emotes.get(emote.id()).unwrap().name, "forsenE");
    }

    #[tokio::test]
    async fn test_owner_cannot_set_global_but_other_fields_apply() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let outcome = emote
            .update(
                UpdateOptions {
                    name: Some("forsenLUL".into()),
                    global: Some(true),
                    ..Default::default()
                },
                &owner,
            )
            .await
            .unwrap();

        assert_eq!(outcome.applied, vec![EmoteField::Name]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].field, EmoteField::Global);
        let stored = h.emotes.get(emote.id()).unwrap();
        assert_eq!(stored.name, "forsenLUL");
        assert!(!stored.global);
    }

    #[tokio::test]
    async fn test_moderator_sets_global_and_transfers_owner() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let heir = h.users.add_user("nymn", UserRank::Default);
        let moderator = h.users.add_user("mod", UserRank::Moderator);
        let mut emote = live_emote(&h, &owner).await;

        emote
            .update(
                UpdateOptions {
                    global: Some(true),
                    owner: Some(heir.id),
                    ..Default::default()
                },
                &moderator,
            )
            .await
            .unwrap();

        let stored = h.emotes.get(emote.id()).unwrap();
        assert!(stored.global);
        assert_eq!(stored.owner, heir.id);
        assert_eq!(stored.owner_name.as_deref(), Some("nymn"));
    }

    #[tokio::test]
    async fn test_invalid_name_only_is_no_change() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let err = emote
            .update(
                UpdateOptions {
                    name: Some("a".into()),
                    ..Default::default()
                },
                &owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoChange(_)));
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_user_is_rejected() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let err = emote
            .update(
                UpdateOptions {
                    owner: Some(Uuid::new_v4()),
                    ..Default::default()
                },
                &owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoChange(_)));
        assert_eq!(h.emotes.get(emote.id()).unwrap().owner, owner.id);
    }

    #[tokio::test]
    async fn test_empty_update_is_no_change() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = live_emote(&h, &owner).await;

        let err = emote
            .update(UpdateOptions::default(), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoChange(_)));
    }

    #[tokio::test]
    async fn test_processing_emote_is_locked() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let mut emote = Emote::synthesize("forsenE", "image/png", owner.id, h.ctx.clone());
        emote.write().await.unwrap();

        let err = emote
            .update(
                UpdateOptions {
                    name: Some("forsenPls".into()),
                    ..Default::default()
                },
                &owner,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Locked(_)));
    }
}
