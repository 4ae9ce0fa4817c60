/// MediaStore model
///
/// A media row records one stored file: the reference returned by the
/// [`MediaStorage`](crate::storage::MediaStorage) backend plus its original
/// name and content type. The creator in the audit trail is the file owner.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE media (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     file_name VARCHAR(255) NOT NULL,
///     storage_ref VARCHAR(512) NOT NULL,
///     media_type VARCHAR(100) NOT NULL DEFAULT 'etc',
///     size_bytes BIGINT NOT NULL DEFAULT 0,
///     -- audit columns
/// );
///
/// CREATE TABLE bug_attachments (bug_id UUID, media_id UUID, PRIMARY KEY (bug_id, media_id));
/// CREATE TABLE message_attachments (message_id UUID, media_id UUID, PRIMARY KEY (message_id, media_id));
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};

/// Content type recorded when the upload did not carry one
pub const DEFAULT_MEDIA_TYPE: &str = "etc";
pub const MAX_MEDIA_TYPE_LENGTH: usize = 100;
pub const MAX_FILE_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    pub id: Uuid,
    pub file_name: String,
    pub storage_ref: String,
    pub media_type: String,
    pub size_bytes: i64,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for Media {
    const TABLE: Table = Table::Media;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedia {
    pub file_name: String,
    pub storage_ref: String,
    pub media_type: String,
    pub size_bytes: i64,
}

impl Media {
    pub async fn create<'e, E>(executor: E, data: CreateMedia, audit: &AuditTrail) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Media>(
            r#"
            INSERT INTO media (file_name, storage_ref, media_type, size_bytes,
                               created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.file_name)
        .bind(data.storage_ref)
        .bind(data.media_type)
        .bind(data.size_bytes)
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
        sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Ids from `ids` that do not name a live media row
    pub async fn missing_ids<'e, E>(executor: E, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT r.id
            FROM UNNEST($1::uuid[]) AS r(id)
            WHERE NOT EXISTS (
                SELECT 1 FROM media m WHERE m.id = r.id AND m.deleted_at IS NULL
            )
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    /// Live attachments of a bug
    pub async fn list_for_bug<'e, E>(executor: E, bug_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Media>(
            r#"
            SELECT m.*
            FROM media m
            JOIN bug_attachments ba ON ba.media_id = m.id
            WHERE ba.bug_id = $1 AND m.deleted_at IS NULL
            ORDER BY m.created_at
            "#,
        )
        .bind(bug_id)
        .fetch_all(executor)
        .await
    }

    /// Live attachments of a message
    pub async fn list_for_message<'e, E>(executor: E, message_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Media>(
            r#"
            SELECT m.*
            FROM media m
            JOIN message_attachments ma ON ma.media_id = m.id
            WHERE ma.message_id = $1 AND m.deleted_at IS NULL
            ORDER BY m.created_at
            "#,
        )
        .bind(message_id)
        .fetch_all(executor)
        .await
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        audit::soft_delete(executor, Self::TABLE, id, stamp).await
    }
}

/// Content type to record for an upload
///
/// Blank or over-long values fall back to [`DEFAULT_MEDIA_TYPE`].
pub fn media_type_or_default(content_type: Option<&str>) -> String {
    match content_type.map(str::trim) {
        Some(value) if !value.is_empty() && value.chars().count() <= MAX_MEDIA_TYPE_LENGTH => {
            value.to_string()
        }
        _ => DEFAULT_MEDIA_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_or_default() {
        assert_eq!(media_type_or_default(Some("image/png")), "image/png");
        assert_eq!(media_type_or_default(Some("  ")), DEFAULT_MEDIA_TYPE);
        assert_eq!(media_type_or_default(None), DEFAULT_MEDIA_TYPE);
        assert_eq!(
            media_type_or_default(Some(&"x".repeat(MAX_MEDIA_TYPE_LENGTH + 1))),
            DEFAULT_MEDIA_TYPE
        );
    }
}
