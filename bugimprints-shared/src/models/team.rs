/// Team model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     leader_id UUID NOT NULL REFERENCES users(id),
///     -- audit columns
/// );
///
/// CREATE UNIQUE INDEX teams_name_key ON teams (name) WHERE deleted_at IS NULL;
/// ```
///
/// Membership lives in `user_teams`. The leader is always linked as a member
/// when the team is created through the team service.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};
use crate::models::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub leader_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for Team {
    const TABLE: Table = Table::Teams;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub leader_id: Uuid,
}

/// Fields to update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub leader_id: Option<Uuid>,
}

impl UpdateTeam {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.leader_id.is_none()
    }
}

impl Team {
    pub async fn create<'e, E>(executor: E, data: CreateTeam, audit: &AuditTrail) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, leader_id, created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.name)
        .bind(data.leader_id)
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
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Leader of a live team
    pub async fn leader_of<'e, E>(executor: E, id: Uuid) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>("SELECT leader_id FROM teams WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists live teams by name
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE deleted_at IS NULL ORDER BY name")
            .fetch_all(executor)
            .await
    }

    /// Applies the non-`None` fields of `data` and re-stamps the modifier
    ///
    /// Returns `None` if the team is absent or soft-deleted.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTeam,
        stamp: &Stamp,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE teams SET modified_at = $2, modified_by = $3");
        let mut bind_count = 3;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.leader_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", leader_id = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 AND deleted_at IS NULL RETURNING *");

        let mut q = sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .bind(stamp.at)
            .bind(stamp.actor);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(leader_id) = data.leader_id {
            q = q.bind(leader_id);
        }

        q.fetch_optional(executor).await
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        audit::soft_delete(executor, Self::TABLE, id, stamp).await
    }

    /// Live, active members of the team
    pub async fn members<'e, E>(executor: E, team_id: Uuid) -> Result<Vec<User>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.*
            FROM users u
            JOIN user_teams ut ON ut.user_id = u.id
            WHERE ut.team_id = $1 AND u.deleted_at IS NULL AND u.is_active
            ORDER BY u.username
            "#,
        )
        .bind(team_id)
        .fetch_all(executor)
        .await
    }

    /// How many of `user_ids` are live members of the team
    pub async fn count_members_among<'e, E>(
        executor: E,
        team_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT u.id)
            FROM users u
            JOIN user_teams ut ON ut.user_id = u.id
            JOIN teams t ON t.id = ut.team_id AND t.deleted_at IS NULL
            WHERE ut.team_id = $1 AND u.id = ANY($2) AND u.deleted_at IS NULL AND u.is_active
            "#,
        )
        .bind(team_id)
        .bind(user_ids)
        .fetch_one(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_team_default_is_empty() {
        assert!(UpdateTeam::default().is_empty());

        let update = UpdateTeam {
            name: Some("Platform".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_team_serializes_audit_inline() {
        let stamp = Stamp::new(Uuid::new_v4());
        let team = Team {
            id: Uuid::new_v4(),
            name: "Platform".to_string(),
            leader_id: stamp.actor,
            audit: AuditTrail::created(&stamp),
        };

        let json = serde_json::to_value(&team).unwrap();
        assert_eq!(json["created_by"], stamp.actor.to_string());
        assert!(json["deleted_at"].is_null());
        assert_eq!(team.audit.created_by, Some(stamp.actor));
    }
}
