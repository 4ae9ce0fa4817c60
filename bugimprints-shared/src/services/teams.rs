/// Team operations
///
/// Creating a team links its leader as a member; handing leadership to
/// another user links the new leader too.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::scope_of;
use crate::audit::AuditTrail;
use crate::auth::authorization::{require, Action, Resource};
use crate::auth::context::AuthContext;
use crate::error::{CoreError, CoreResult};
use crate::models::bug_resolution::BugResolution;
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::User;

pub const MAX_TEAM_NAME_LENGTH: usize = 100;

/// A team with its current members
#[derive(Debug, Clone, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<User>,
}

/// A team with its live resolutions, newest first
#[derive(Debug, Clone, Serialize)]
pub struct TeamResolutions {
    #[serde(flatten)]
    pub team: Team,
    pub resolutions: Vec<BugResolution>,
}

fn validate_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Team name is required".to_string()));
    }
    if name.chars().count() > MAX_TEAM_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Team name must be at most {} characters",
            MAX_TEAM_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

async fn live_team(pool: &PgPool, id: Uuid) -> CoreResult<Team> {
    Team::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::not_found("Team", id))
}

pub async fn create(pool: &PgPool, auth: &AuthContext, data: CreateTeam) -> CoreResult<Team> {
    let stamp = auth.stamp();
    require(auth, Action::Create, &Resource::Teams)?;

    let name = validate_name(&data.name)?;
    User::find_by_id(pool, data.leader_id)
        .await?
        .ok_or(CoreError::missing("User", data.leader_id))?;

    let mut tx = pool.begin().await?;

    let team = Team::create(
        &mut *tx,
        CreateTeam {
            name,
            leader_id: data.leader_id,
        },
        &AuditTrail::created(&stamp),
    )
    .await?;
    if User::add_team(&mut *tx, team.leader_id, team.id).await? {
        User::touch(&mut *tx, team.leader_id, &stamp).await?;
    }

    tx.commit().await?;

    info!(team_id = %team.id, leader_id = %team.leader_id, created_by = %stamp.actor, "Team created");
    Ok(team)
}

pub async fn get(pool: &PgPool, id: Uuid) -> CoreResult<TeamDetail> {
    let team = live_team(pool, id).await?;
    let members = Team::members(pool, id).await?;
    Ok(TeamDetail { team, members })
}

pub async fn list(pool: &PgPool) -> CoreResult<Vec<Team>> {
    Ok(Team::list(pool).await?)
}

pub async fn update(pool: &PgPool, auth: &AuthContext, id: Uuid, data: UpdateTeam) -> CoreResult<Team> {
    let stamp = auth.stamp();
    let team = live_team(pool, id).await?;

    require(
        auth,
        Action::Update,
        &Resource::Team {
            scope: scope_of(&team),
            created_by: team.audit.created_by,
        },
    )?;

    let name = data.name.as_deref().map(validate_name).transpose()?;
    if let Some(leader_id) = data.leader_id {
        User::find_by_id(pool, leader_id)
            .await?
            .ok_or(CoreError::missing("User", leader_id))?;
    }

    let mut tx = pool.begin().await?;

    let updated = Team::update(
        &mut *tx,
        id,
        UpdateTeam {
            name,
            leader_id: data.leader_id,
        },
        &stamp,
    )
    .await?
    .ok_or(CoreError::not_found("Team", id))?;

    if updated.leader_id != team.leader_id && User::add_team(&mut *tx, updated.leader_id, id).await? {
        User::touch(&mut *tx, updated.leader_id, &stamp).await?;
    }

    tx.commit().await?;

    info!(team_id = %id, modified_by = %stamp.actor, "Team updated");
    Ok(updated)
}

pub async fn delete(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<()> {
    let stamp = auth.stamp();
    let team = live_team(pool, id).await?;

    require(
        auth,
        Action::Delete,
        &Resource::Team {
            scope: scope_of(&team),
            created_by: team.audit.created_by,
        },
    )?;

    if !Team::soft_delete(pool, id, &stamp).await? {
        return Err(CoreError::not_found("Team", id));
    }

    info!(team_id = %id, deleted_by = %stamp.actor, "Team deleted");
    Ok(())
}

/// Live resolutions of the team's bugs; members and superusers only
pub async fn resolutions(pool: &PgPool, auth: &AuthContext, id: Uuid) -> CoreResult<TeamResolutions> {
    let team = live_team(pool, id).await?;

    require(
        auth,
        Action::Read,
        &Resource::Resolution {
            scope: scope_of(&team),
            assignees: &[],
        },
    )?;

    let resolutions = BugResolution::list_for_teams(pool, &[id]).await?;
    Ok(TeamResolutions { team, resolutions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Platform ").unwrap(), "Platform");
        assert!(matches!(validate_name("   "), Err(CoreError::Validation(_))));
        assert!(validate_name(&"x".repeat(MAX_TEAM_NAME_LENGTH + 1)).is_err());
    }
}
