/// Resolution discussion threads

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ensure_none_missing, team_scope, unique_ids};
use crate::audit::AuditTrail;
use crate::auth::authorization::{require, Action, Resource, TeamScope};
use crate::auth::context::AuthContext;
use crate::error::{CoreError, CoreResult};
use crate::models::bug_resolution::BugResolution;
use crate::models::media::Media;
use crate::models::message::{CreateMessage, Message, MAX_MESSAGE_LENGTH};

#[derive(Debug, Clone, Serialize)]
pub struct MessageDetail {
    #[serde(flatten)]
    pub message: Message,
    pub attachments: Vec<Media>,
}

fn validate_body(body: &str) -> CoreResult<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(CoreError::Validation("Message text is required".to_string()));
    }
    if body.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Message text must be at most {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(body.to_string())
}

async fn resolution_scope(pool: &PgPool, resolution_id: Uuid) -> CoreResult<TeamScope> {
    let found = BugResolution::find_scoped(pool, resolution_id)
        .await?
        .ok_or(CoreError::not_found("BugResolution", resolution_id))?;
    team_scope(pool, found.team_id).await
}

pub async fn create(
    pool: &PgPool,
    auth: &AuthContext,
    resolution_id: Uuid,
    body: &str,
    attachments: &[Uuid],
) -> CoreResult<MessageDetail> {
    let stamp = auth.stamp();
    let scope = resolution_scope(pool, resolution_id).await?;

    require(
        auth,
        Action::Create,
        &Resource::Message {
            scope,
            created_by: None,
        },
    )?;

    let body = validate_body(body)?;
    let attachments = unique_ids(attachments);
    ensure_none_missing("Media", &Media::missing_ids(pool, &attachments).await?)?;

    let mut tx = pool.begin().await?;

    let message = Message::create(
        &mut *tx,
        CreateMessage {
            resolution_id,
            author_id: stamp.actor,
            body,
        },
        &AuditTrail::created(&stamp),
    )
    .await?;
    if !attachments.is_empty() {
        Message::attach_media(&mut *tx, message.id, &attachments).await?;
    }

    tx.commit().await?;

    info!(
        message_id = %message.id,
        resolution_id = %resolution_id,
        attachments = attachments.len(),
        "Message posted"
    );

    let attachments = Media::list_for_message(pool, message.id).await?;
    Ok(MessageDetail { message, attachments })
}

/// Live messages of a resolution, oldest first
pub async fn list(pool: &PgPool, auth: &AuthContext, resolution_id: Uuid) -> CoreResult<Vec<MessageDetail>> {
    let scope = resolution_scope(pool, resolution_id).await?;

    require(
        auth,
        Action::Read,
        &Resource::Message {
            scope,
            created_by: None,
        },
    )?;

    let messages = Message::list_for_resolution(pool, resolution_id).await?;
    let mut details = Vec::with_capacity(messages.len());
    for message in messages {
        let attachments = Media::list_for_message(pool, message.id).await?;
        details.push(MessageDetail { message, attachments });
    }

    Ok(details)
}

pub async fn delete(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();

    let message = Message::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("Message", id))?;
    let scope = match BugResolution::find_scoped(pool, message.resolution_id).await? {
        Some(found) => team_scope(pool, found.team_id).await?,
        None => return Err(CoreError::not_found("Message", id)),
    };

    require(
        auth,
        Action::Delete,
        &Resource::Message {
            scope,
            created_by: message.audit.created_by,
        },
    )?;

    if !Message::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("Message", id));
    }

    info!(message_id = %id, deleted_by = %stamp.actor, "Message deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_body_bounds() {
        assert!(matches!(validate_body("  "), Err(CoreError::Validation(_))));
        assert_eq!(validate_body(" fixed in #42 ").unwrap(), "fixed in #42");
        assert!(validate_body(&"é".repeat(MAX_MESSAGE_LENGTH)).is_ok());
        assert!(validate_body(&"é".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }
}
