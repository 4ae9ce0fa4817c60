/// Bug operations, watches and duplicate marks
///
/// Any authenticated user may report and read bugs. A new bug is always under
/// review; acceptance only changes through [`reject`] or through creating its
/// resolution.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ensure_none_missing, team_scope, unique_ids, Page};
use crate::audit::AuditTrail;
use crate::auth::authorization::{require, Action, Resource};
use crate::auth::context::AuthContext;
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{check_rejectable, Acceptance};
use crate::models::bug::{Bug, CreateBug, UpdateBug};
use crate::models::bug_duplicate::BugDuplicate;
use crate::models::bug_watch::BugWatch;
use crate::models::media::Media;
use crate::models::team::Team;
use crate::models::user::User;

pub const MAX_TITLE_LENGTH: usize = 100;

/// Bug report input
#[derive(Debug, Clone)]
pub struct NewBug {
    pub title: String,
    pub description: Option<String>,
    pub reproduction_steps: Option<String>,

    /// Defaults to the reporter
    pub found_by: Option<Uuid>,
    pub team_id: Uuid,

    /// Previously uploaded media ids
    pub attachments: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BugDetail {
    #[serde(flatten)]
    pub bug: Bug,
    pub acceptance_state: Acceptance,
    pub attachments: Vec<Media>,
}

impl BugDetail {
    fn new(bug: Bug, attachments: Vec<Media>) -> Self {
        Self {
            acceptance_state: bug.acceptance_state(),
            bug,
            attachments,
        }
    }
}

fn validate_title(title: &str) -> CoreResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::Validation("Bug title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Bug title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

async fn live_bug(pool: &PgPool, id: Uuid) -> CoreResult<Bug> {
    Bug::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("Bug", id))
}

async fn bug_resource(pool: &PgPool, bug: &Bug) -> CoreResult<Resource<'static>> {
    Ok(Resource::Bug {
        scope: team_scope(pool, bug.team_id).await?,
        created_by: bug.audit.created_by,
    })
}

pub async fn create(pool: &PgPool, auth: &AuthContext, data: NewBug) -> CoreResult<BugDetail> {
    let stamp = auth.stamp();
    require(auth, Action::Create, &Resource::Bugs)?;

    let title = validate_title(&data.title)?;

    Team::find_by_id(pool, data.team_id)
        .await?
        .ok_or(CoreError::missing("Team", data.team_id))?;

    let found_by = data.found_by.unwrap_or(stamp.actor);
    if found_by != stamp.actor {
        User::find_by_id(pool, found_by)
            .await?
            .ok_or(CoreError::missing("User", found_by))?;
    }

    let attachments = unique_ids(&data.attachments);
    ensure_none_missing("Media", &Media::missing_ids(pool, &attachments).await?)?;

    let mut tx = pool.begin().await?;

    let bug = Bug::create(
        &mut *tx,
        CreateBug {
            title,
            description: data.description,
            reproduction_steps: data.reproduction_steps,
            found_by: Some(found_by),
            team_id: data.team_id,
        },
        &AuditTrail::created(&stamp),
    )
    .await?;
    if !attachments.is_empty() {
        Bug::attach_media(&mut *tx, bug.id, &attachments).await?;
    }

    tx.commit().await?;

    info!(bug_id = %bug.id, team_id = %bug.team_id, created_by = %stamp.actor, "Bug reported");

    let media = Media::list_for_bug(pool, bug.id).await?;
    Ok(BugDetail::new(bug, media))
}

pub async fn get(pool: &PgPool, id: Uuid) -> CoreResult<BugDetail> {
    let bug = live_bug(pool, id).await?;
    let media = Media::list_for_bug(pool, id).await?;
    Ok(BugDetail::new(bug, media))
}

pub async fn list(pool: &PgPool, team_id: Option<Uuid>, page: Page) -> CoreResult<Vec<Bug>> {
    Ok(Bug::list(pool, team_id, page.limit, page.offset).await?)
}

pub async fn update(pool: &PgPool, auth: &AuthContext, id: Uuid, data: UpdateBug) -> CoreResult<Bug> {
    let stamp = auth.stamp();
    let bug = live_bug(pool, id).await?;
    require(auth, Action::Update, &bug_resource(pool, &bug).await?)?;

    let title = data.title.as_deref().map(validate_title).transpose()?;

    let updated = Bug::update(
        pool,
        id,
        UpdateBug {
            title,
            description: data.description,
            reproduction_steps: data.reproduction_steps,
        },
        &stamp,
    )
    .await?
    .ok_or(CoreError::not_found("Bug", id))?;

    info!(bug_id = %id, modified_by = %stamp.actor, "Bug updated");
    Ok(updated)
}

pub async fn delete(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();
    let bug = live_bug(pool, id).await?;
    require(auth, Action::Delete, &bug_resource(pool, &bug).await?)?;

    if !Bug::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("Bug", id));
    }

    info!(bug_id = %id, deleted_by = %stamp.actor, "Bug deleted");
    Ok(())
}

/// Moves a bug under review to rejected
pub async fn reject(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<Bug> {
    let stamp = auth.stamp();
    let mut tx = pool.begin().await?;

    let bug = Bug::find_for_update(&mut *tx, id)
        .await?
        .ok_or(CoreError::not_found("Bug", id))?;

    require(
        auth,
        Action::Reject,
        &Resource::Bug {
            scope: team_scope(&mut *tx, bug.team_id).await?,
            created_by: bug.audit.created_by,
        },
    )?;
    check_rejectable(bug.acceptance_state())?;

    let rejected = Bug::set_acceptance(&mut *tx, id, Acceptance::Rejected, &stamp)
        .await?
        .ok_or(CoreError::not_found("Bug", id))?;

    tx.commit().await?;

    info!(bug_id = %id, rejected_by = %stamp.actor, "Bug rejected");
    Ok(rejected)
}

pub async fn watch(pool: &PgPool, auth: &AuthContext, bug_id: Uuid) -> CoreResult<BugWatch> {
    let stamp = auth.stamp();
    live_bug(pool, bug_id).await?;
    require(auth, Action::Create, &Resource::Watch { created_by: None })?;

    if BugWatch::find(pool, bug_id, stamp.actor).await?.is_some() {
        return Err(CoreError::Conflict("Already watching this bug".to_string()));
    }

    let watch = BugWatch::create(pool, bug_id, stamp.actor, &AuditTrail::created(&stamp)).await?;

    info!(bug_id = %bug_id, watcher_id = %stamp.actor, "Bug watched");
    Ok(watch)
}

/// Removes a watch; `watcher_id` defaults to the caller
pub async fn unwatch(
    pool: &PgPool,
    auth: &AuthContext,
    bug_id: Uuid,
    watcher_id: Option<Uuid>,
) -> CoreResult<()> {
    let stamp = auth.stamp();
    let watcher_id = watcher_id.unwrap_or(stamp.actor);

    live_bug(pool, bug_id).await?;
    let watch = BugWatch::find(pool, bug_id, watcher_id)
        .await?
        .ok_or(CoreError::not_found("BugWatch", bug_id))?;

    require(
        auth,
        Action::Delete,
        &Resource::Watch {
            created_by: watch.audit.created_by,
        },
    )?;

    if !BugWatch::soft_delete(pool, watch.id, &stamp).await? {
        return Err(CoreError::not_found("BugWatch", watch.id));
    }

    info!(bug_id = %bug_id, watcher_id = %watcher_id, removed_by = %stamp.actor, "Bug unwatched");
    Ok(())
}

pub async fn watchers(pool: &PgPool, bug_id: Uuid) -> CoreResult<Vec<BugWatch>> {
    live_bug(pool, bug_id).await?;
    Ok(BugWatch::list_for_bug(pool, bug_id).await?)
}

/// Marks `child_id` as a duplicate of `parent_id`
pub async fn mark_duplicate(
    pool: &PgPool,
    auth: &AuthContext,
    parent_id: Uuid,
    child_id: Uuid,
) -> CoreResult<BugDuplicate> {
    let stamp = auth.stamp();
    let parent = live_bug(pool, parent_id).await?;

    require(
        auth,
        Action::Create,
        &Resource::Duplicate {
            scope: team_scope(pool, parent.team_id).await?,
            created_by: None,
        },
    )?;

    if parent_id == child_id {
        return Err(CoreError::Validation(
            "A bug cannot be a duplicate of itself".to_string(),
        ));
    }
    Bug::find_by_id(pool, child_id)
        .await?
        .ok_or(CoreError::missing("Bug", child_id))?;

    let duplicate =
        BugDuplicate::create(pool, parent_id, child_id, &AuditTrail::created(&stamp)).await?;

    info!(parent_id = %parent_id, child_id = %child_id, created_by = %stamp.actor, "Duplicate marked");
    Ok(duplicate)
}

pub async fn duplicates(pool: &PgPool, parent_id: Uuid) -> CoreResult<Vec<BugDuplicate>> {
    live_bug(pool, parent_id).await?;
    Ok(BugDuplicate::list_for_parent(pool, parent_id).await?)
}

pub async fn remove_duplicate(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();

    let duplicate = BugDuplicate::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("BugDuplicate", id))?;
    let parent = Bug::find_by_id(pool, duplicate.parent_id)
        .await?
        .ok_or(CoreError::not_found("BugDuplicate", id))?;

    require(
        auth,
        Action::Delete,
        &Resource::Duplicate {
            scope: team_scope(pool, parent.team_id).await?,
            created_by: duplicate.audit.created_by,
        },
    )?;

    if !BugDuplicate::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("BugDuplicate", id));
    }

    info!(duplicate_id = %id, deleted_by = %stamp.actor, "Duplicate mark removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Stamp;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title(" Crash on save ").unwrap(), "Crash on save");
        assert!(matches!(validate_title(""), Err(CoreError::Validation(_))));
        assert!(validate_title(&"a".repeat(MAX_TITLE_LENGTH)).is_ok());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_detail_exposes_acceptance_state() {
        let stamp = Stamp::new(Uuid::new_v4());
        let bug = Bug {
            id: Uuid::new_v4(),
            title: "Crash".to_string(),
            description: None,
            reproduction_steps: None,
            found_by: Some(stamp.actor),
            acceptance: Some(false),
            team_id: Uuid::new_v4(),
            audit: AuditTrail::created(&stamp),
        };

        let json = serde_json::to_value(BugDetail::new(bug, vec![])).unwrap();
        assert_eq!(json["acceptance"], false);
        assert_eq!(json["acceptance_state"], "rejected");
        assert!(json["attachments"].as_array().unwrap().is_empty());
    }
}
