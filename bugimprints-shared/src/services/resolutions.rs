/// Bug resolution operations
///
/// Creating a resolution is the only way a bug becomes accepted. The bug row
/// is locked for the duration of the transaction so two leaders racing to
/// resolve the same bug cannot both succeed.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use super::{team_scope, unique_ids};
use crate::audit::AuditTrail;
use crate::auth::authorization::{require, Action, Resource, TeamScope};
use crate::auth::context::AuthContext;
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{check_resolvable, Acceptance};
use crate::models::bug::Bug;
use crate::models::bug_resolution::{BugResolution, CreateResolution, ScopedResolution, UpdateResolution};
use crate::models::team::Team;

/// A resolution with its owning team and current assignees
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionDetail {
    #[serde(flatten)]
    pub resolution: BugResolution,
    pub team_id: Uuid,
    pub assigned_members: Vec<Uuid>,
}

/// Loads a live resolution of a live bug, plus its permission scope
async fn scoped(pool: &PgPool, id: Uuid) -> CoreResult<(ScopedResolution, TeamScope)> {
    let found = BugResolution::find_scoped(pool, id)
        .await?
        .ok_or(CoreError::not_found("BugResolution", id))?;
    let scope = team_scope(pool, found.team_id).await?;
    Ok((found, scope))
}

/// Checks the assignee list: non-empty and every user a live team member
async fn checked_assignees(conn: &mut PgConnection, team_id: Uuid, assignees: &[Uuid]) -> CoreResult<Vec<Uuid>> {
    let assignees = unique_ids(assignees);
    if assignees.is_empty() {
        return Err(CoreError::Validation(
            "At least one assigned member is required".to_string(),
        ));
    }

    let members = Team::count_members_among(&mut *conn, team_id, &assignees).await?;
    if members != assignees.len() as i64 {
        return Err(CoreError::Validation(
            "Assigned members must belong to the bug's team".to_string(),
        ));
    }

    Ok(assignees)
}

/// Creates the resolution for a bug and accepts the bug
///
/// Runs in one transaction:
///
/// 1. lock the bug (`MissingReference` if absent or deleted)
/// 2. check the caller leads the bug's team or is a superuser
/// 3. refuse rejected bugs and bugs that already have a resolution
/// 4. validate assignees, accept the bug, insert the resolution and its
///    assignments
///
/// Any failure rolls the whole thing back; the bug is left untouched.
pub async fn create(
    pool: &PgPool,
    auth: &AuthContext,
    data: CreateResolution,
    assigned_members: &[Uuid],
) -> CoreResult<ResolutionDetail> {
    let stamp = auth.stamp();
    let bug_id = data.bug_id;

    let mut tx = pool.begin().await?;

    let bug = Bug::find_for_update(&mut *tx, bug_id)
        .await?
        .ok_or(CoreError::missing("Bug", bug_id))?;

    let scope = team_scope(&mut *tx, bug.team_id).await?;
    require(
        auth,
        Action::Create,
        &Resource::Resolution {
            scope,
            assignees: &[],
        },
    )?;

    let has_resolution = Bug::has_resolution(&mut *tx, bug_id).await?;
    if let Err(err) = check_resolvable(bug_id, Some(&bug.snapshot(has_resolution))) {
        warn!(bug_id = %bug_id, error = %err, "Resolution refused");
        return Err(err);
    }

    let assignees = checked_assignees(&mut tx, bug.team_id, assigned_members).await?;

    Bug::set_acceptance(&mut *tx, bug_id, Acceptance::Accepted, &stamp)
        .await?
        .ok_or(CoreError::missing("Bug", bug_id))?;

    let resolution = BugResolution::create(&mut *tx, data, &AuditTrail::created(&stamp)).await?;
    BugResolution::replace_assignees(&mut tx, resolution.id, &assignees).await?;

    tx.commit().await?;

    info!(
        resolution_id = %resolution.id,
        bug_id = %bug_id,
        assignees = assignees.len(),
        created_by = %stamp.actor,
        "Resolution created, bug accepted"
    );

    Ok(ResolutionDetail {
        resolution,
        team_id: bug.team_id,
        assigned_members: assignees,
    })
}

pub async fn get(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<ResolutionDetail> {
    let (found, scope) = scoped(pool, id).await?;
    let assignees = BugResolution::assignee_ids(pool, id).await?;

    require(
        auth,
        Action::Read,
        &Resource::Resolution {
            scope,
            assignees: &assignees,
        },
    )?;

    Ok(ResolutionDetail {
        resolution: found.resolution,
        team_id: found.team_id,
        assigned_members: assignees,
    })
}

/// Resolutions visible to the caller, newest first
///
/// Superusers see every live resolution, everyone else only those of their
/// own teams.
pub async fn list(pool: &PgPool, auth: &AuthContext) -> CoreResult<Vec<BugResolution>> {
    if auth.is_superuser() {
        return Ok(BugResolution::list_all(pool).await?);
    }
    if auth.team_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(BugResolution::list_for_teams(pool, &auth.team_ids).await?)
}

/// Edits a resolution; only its current assignees may do so
///
/// `assigned_members`, when given, replaces the assignee set under the same
/// rules as on creation.
pub async fn update(
    pool: &PgPool,
    auth: &AuthContext,
    id: Uuid,
    data: UpdateResolution,
    assigned_members: Option<&[Uuid]>,
) -> CoreResult<ResolutionDetail> {
    let stamp = auth.stamp();
    let (found, scope) = scoped(pool, id).await?;
    let current = BugResolution::assignee_ids(pool, id).await?;

    require(
        auth,
        Action::Update,
        &Resource::Resolution {
            scope,
            assignees: &current,
        },
    )?;

    let mut tx = pool.begin().await?;

    let resolution = BugResolution::update(&mut *tx, id, data, &stamp)
        .await?
        .ok_or(CoreError::not_found("BugResolution", id))?;

    let assignees = match assigned_members {
        Some(members) => {
            let assignees = checked_assignees(&mut tx, found.team_id, members).await?;
            BugResolution::replace_assignees(&mut tx, id, &assignees).await?;
            assignees
        }
        None => current,
    };

    tx.commit().await?;

    info!(resolution_id = %id, modified_by = %stamp.actor, "Resolution updated");

    Ok(ResolutionDetail {
        resolution,
        team_id: found.team_id,
        assigned_members: assignees,
    })
}

/// Soft-deletes a resolution
///
/// The bug stays accepted and keeps its one-to-one slot: a deleted
/// resolution still blocks creating another for the same bug.
pub async fn delete(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();
    let (_, scope) = scoped(pool, id).await?;

    require(
        auth,
        Action::Delete,
        &Resource::Resolution {
            scope,
            assignees: &[],
        },
    )?;

    if !BugResolution::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("BugResolution", id));
    }

    info!(resolution_id = %id, deleted_by = %stamp.actor, "Resolution deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Stamp;

    #[test]
    fn test_detail_flattens_resolution() {
        let stamp = Stamp::new(Uuid::new_v4());
        let team_id = Uuid::new_v4();
        let detail = ResolutionDetail {
            resolution: BugResolution {
                id: Uuid::new_v4(),
                bug_id: Uuid::new_v4(),
                assigned_remarks: Some("look at the cache".to_string()),
                root_cause: None,
                error_function: None,
                error_function_owner: None,
                pull_req_id: None,
                merge_req_id: None,
                approved_by: None,
                end_time: None,
                audit: AuditTrail::created(&stamp),
            },
            team_id,
            assigned_members: vec![stamp.actor],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["team_id"], team_id.to_string());
        assert_eq!(json["assigned_remarks"], "look at the cache");
        assert_eq!(json["created_by"], stamp.actor.to_string());
        assert_eq!(json["assigned_members"][0], stamp.actor.to_string());
    }
}
