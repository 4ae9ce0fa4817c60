/// Media records
///
/// Bytes are written by a [`MediaStorage`](crate::storage::MediaStorage)
/// backend first; [`record_uploads`] then inserts one `media` row per stored
/// file in a single transaction.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditTrail;
use crate::auth::authorization::{require, Action, Resource};
use crate::auth::context::AuthContext;
use crate::error::{CoreError, CoreResult};
use crate::models::media::{media_type_or_default, CreateMedia, Media, MAX_FILE_NAME_LENGTH};
use crate::storage::StoredFile;

/// A file already written to storage, waiting for its row
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub stored: StoredFile,
}

/// Checks an uploaded file's name before its bytes are stored
pub fn validate_file_name(file_name: &str) -> CoreResult<()> {
    if file_name.trim().is_empty() {
        return Err(CoreError::Validation("File name is required".to_string()));
    }
    if file_name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "File name must be at most {} characters",
            MAX_FILE_NAME_LENGTH
        )));
    }
    Ok(())
}

pub async fn record_uploads(
    pool: &PgPool,
    auth: &AuthContext,
    uploads: Vec<StoredUpload>,
) -> CoreResult<Vec<Media>> {
    let stamp = auth.stamp();
    require(auth, Action::Create, &Resource::Media { created_by: None })?;

    if uploads.is_empty() {
        return Err(CoreError::Validation("At least one file is required".to_string()));
    }
    for upload in &uploads {
        validate_file_name(&upload.file_name)?;
    }

    let trail = AuditTrail::created(&stamp);
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(uploads.len());

    for upload in uploads {
        let media = Media::create(
            &mut *tx,
            CreateMedia {
                media_type: media_type_or_default(upload.content_type.as_deref()),
                file_name: upload.file_name,
                storage_ref: upload.stored.reference,
                size_bytes: upload.stored.size,
            },
            &trail,
        )
        .await?;
        created.push(media);
    }

    tx.commit().await?;

    info!(count = created.len(), uploaded_by = %stamp.actor, "Media recorded");
    Ok(created)
}

pub async fn get(pool: &PgPool, id: Uuid) -> CoreResult<Media> {
    Media::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("Media", id))
}

pub async fn delete(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();
    let media = get(pool, id).await?;

    require(
        auth,
        Action::Delete,
        &Resource::Media {
            created_by: media.audit.created_by,
        },
    )?;

    if !Media::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("Media", id));
    }

    info!(media_id = %id, deleted_by = %stamp.actor, "Media deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("crash.png").is_ok());
        assert!(validate_file_name(&"a".repeat(MAX_FILE_NAME_LENGTH)).is_ok());
        assert!(matches!(
            validate_file_name(&"a".repeat(MAX_FILE_NAME_LENGTH + 1)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(validate_file_name("  "), Err(CoreError::Validation(_))));
    }
}
