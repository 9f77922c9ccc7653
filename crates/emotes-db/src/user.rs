use async_trait::async_trait;
use emotes_core::{AppError, User};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Users and their channel emote sets
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Add an emote to the user's channel set if absent
    async fn add_emote(&self, user_id: Uuid, emote_id: Uuid) -> Result<Option<User>, AppError>;

    /// Remove an emote from the user's channel set
    async fn remove_emote(&self, user_id: Uuid, emote_id: Uuid)
        -> Result<Option<User>, AppError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<Postgres, User>(
            "SELECT id, display_name, rank, emotes FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    async fn add_emote(&self, user_id: Uuid, emote_id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET emotes = CASE WHEN $2 = ANY(emotes) THEN emotes ELSE array_append(emotes, $2) END
            WHERE id = $1
            RETURNING id, display_name, rank, emotes
            "#,
        )
        .bind(user_id)
        .bind(emote_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_emote(
        &self,
        user_id: Uuid,
        emote_id: Uuid,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<Postgres, User>(
            r#"
            UPDATE users
            SET emotes = array_remove(emotes, $2)
            WHERE id = $1
            RETURNING id, display_name, rank, emotes
            "#,
        )
        .bind(user_id)
        .bind(emote_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
