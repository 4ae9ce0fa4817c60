/// Message (comment) model
///
/// Messages are the discussion thread of a bug resolution. Each message may
/// reference previously uploaded media as attachments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE messages (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     resolution_id UUID NOT NULL REFERENCES bug_resolutions(id),
///     author_id UUID NOT NULL REFERENCES users(id),
///     body TEXT NOT NULL,
///     -- audit columns
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};

/// Longest accepted message body, in characters
pub const MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub resolution_id: Uuid,
    pub author_id: Uuid,
    pub body: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for Message {
    const TABLE: Table = Table::Messages;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub resolution_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

impl Message {
    pub async fn create<'e, E>(executor: E, data: CreateMessage, audit: &AuditTrail) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (resolution_id, author_id, body,
                                  created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.resolution_id)
        .bind(data.author_id)
        .bind(data.body)
        .bind(audit.created_at)
        .bind(audit.modified_at)
        .bind(audit.created_by)
        .bind(audit.modified_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Live messages of a resolution, oldest first
    pub async fn list_for_resolution<'e, E>(executor: E, resolution_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE resolution_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(resolution_id)
        .fetch_all(executor)
        .await
    }

    pub async fn attach_media<'e, E>(executor: E, message_id: Uuid, media_ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO message_attachments (message_id, media_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(media_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        audit::soft_delete(executor, Self::TABLE, id, stamp).await
    }
}
