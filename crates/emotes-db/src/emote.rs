use async_trait::async_trait;
use emotes_core::{AppError, EmoteData, EmotePatch};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const EMOTE_COLUMNS: &str = "id, name, private, mime, owner, owner_name, status, global, tags";

/// Durable storage of emote records
#[async_trait]
pub trait EmoteRepository: Send + Sync {
    /// Insert or fully overwrite the record with this id
    async fn upsert(&self, emote: &EmoteData) -> Result<EmoteData, AppError>;

    /// Non-deleted record by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EmoteData>, AppError>;

    /// Apply every field of `patch` in a single statement.
    ///
    /// Returns `None` when no non-deleted record exists.
    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &EmotePatch,
    ) -> Result<Option<EmoteData>, AppError>;

    /// Flip a PROCESSING record to LIVE.
    ///
    /// Returns `None` when the record is gone or no longer PROCESSING.
    async fn mark_live(&self, id: Uuid) -> Result<Option<EmoteData>, AppError>;

    /// Remove the record. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgEmoteRepository {
    pool: PgPool,
}

impl PgEmoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmoteRepository for PgEmoteRepository {
    #[tracing::instrument(skip(self, emote), fields(emote_id = %emote.id))]
    async fn upsert(&self, emote: &EmoteData) -> Result<EmoteData, AppError> {
        let row = sqlx::query_as::<Postgres, EmoteData>(&format!(
            r#"
            INSERT INTO emotes (id, name, private, mime, owner, owner_name, status, global, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                private = EXCLUDED.private,
                mime = EXCLUDED.mime,
                owner = EXCLUDED.owner,
                owner_name = EXCLUDED.owner_name,
                status = EXCLUDED.status,
                global = EXCLUDED.global,
                tags = EXCLUDED.tags,
                updated_at = NOW()
            RETURNING {}
            "#,
            EMOTE_COLUMNS
        ))
        .bind(emote.id)
        .bind(&emote.name)
        .bind(emote.private)
        .bind(&emote.mime)
        .bind(emote.owner)
        .bind(&emote.owner_name)
        .bind(emote.status)
        .bind(emote.global)
        .bind(&emote.tags)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(status = ?row.status, "Emote record written");
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EmoteData>, AppError> {
        let row = sqlx::query_as::<Postgres, EmoteData>(&format!(
            "SELECT {} FROM emotes WHERE id = $1 AND status <> 'DELETED'",
            EMOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, patch), fields(emote_id = %id))]
    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &EmotePatch,
    ) -> Result<Option<EmoteData>, AppError> {
        let row = sqlx::query_as::<Postgres, EmoteData>(&format!(
            r#"
            UPDATE emotes SET
                name = COALESCE($2, name),
                owner = COALESCE($3, owner),
                owner_name = CASE WHEN $3::uuid IS NULL THEN owner_name ELSE $4 END,
                global = COALESCE($5, global),
                private = COALESCE($6, private),
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1 AND status <> 'DELETED'
            RETURNING {}
            "#,
            EMOTE_COLUMNS
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(patch.owner)
        .bind(&patch.owner_name)
        .bind(patch.global)
        .bind(patch.private)
        .bind(&patch.tags)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(emote_id = %id))]
    async fn mark_live(&self, id: Uuid) -> Result<Option<EmoteData>, AppError> {
        let row = sqlx::query_as::<Postgres, EmoteData>(&format!(
            r#"
            UPDATE emotes SET status = 'LIVE', updated_at = NOW()
            WHERE id = $1 AND status = 'PROCESSING'
            RETURNING {}
            "#,
            EMOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(emote_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM emotes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
