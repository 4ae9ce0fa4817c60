/// BugResolution model and database operations
///
/// A resolution tracks the work on an accepted bug: who is assigned, the root
/// cause, the offending function and the pull/merge requests that fix it.
/// There is at most one resolution per bug, enforced by
/// `bug_resolutions_bug_id_key`; a soft-deleted resolution still occupies
/// that slot.
///
/// Creating a resolution also accepts its bug. That cross-entity write lives in
/// [`services::resolutions`](crate::services::resolutions), never here.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE bug_resolutions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     bug_id UUID NOT NULL UNIQUE REFERENCES bugs(id),
///     assigned_remarks TEXT,
///     root_cause TEXT,
///     error_function TEXT,
///     error_function_owner UUID REFERENCES users(id),
///     pull_req_id VARCHAR(100),
///     merge_req_id VARCHAR(100),
///     approved_by UUID REFERENCES users(id),
///     end_time TIMESTAMPTZ,
///     -- audit columns
/// );
///
/// CREATE TABLE bug_resolution_assignees (
///     resolution_id UUID NOT NULL REFERENCES bug_resolutions(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     PRIMARY KEY (resolution_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BugResolution {
    pub id: Uuid,
    pub bug_id: Uuid,
    pub assigned_remarks: Option<String>,
    pub root_cause: Option<String>,
    pub error_function: Option<String>,
    pub error_function_owner: Option<Uuid>,
    pub pull_req_id: Option<String>,
    pub merge_req_id: Option<String>,
    pub approved_by: Option<Uuid>,
    pub end_time: Option<DateTime<Utc>>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for BugResolution {
    const TABLE: Table = Table::BugResolutions;
}

/// A resolution together with the team that owns its bug
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScopedResolution {
    #[sqlx(flatten)]
    pub resolution: BugResolution,

    pub team_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateResolution {
    pub bug_id: Uuid,
    pub assigned_remarks: Option<String>,
    pub root_cause: Option<String>,
    pub error_function: Option<String>,
    pub error_function_owner: Option<Uuid>,
    pub pull_req_id: Option<String>,
    pub merge_req_id: Option<String>,
    pub approved_by: Option<Uuid>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Editable resolution fields; `Some(None)` clears a column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResolution {
    pub assigned_remarks: Option<Option<String>>,
    pub root_cause: Option<Option<String>>,
    pub error_function: Option<Option<String>>,
    pub error_function_owner: Option<Option<Uuid>>,
    pub pull_req_id: Option<Option<String>>,
    pub merge_req_id: Option<Option<String>>,
    pub approved_by: Option<Option<Uuid>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
}

impl BugResolution {
    pub async fn create<'e, E>(
        executor: E,
        data: CreateResolution,
        audit: &AuditTrail,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugResolution>(
            r#"
            INSERT INTO bug_resolutions (
                bug_id, assigned_remarks, root_cause, error_function, error_function_owner,
                pull_req_id, merge_req_id, approved_by, end_time,
                created_at, modified_at, created_by, modified_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(data.bug_id)
        .bind(data.assigned_remarks)
        .bind(data.root_cause)
        .bind(data.error_function)
        .bind(data.error_function_owner)
        .bind(data.pull_req_id)
        .bind(data.merge_req_id)
        .bind(data.approved_by)
        .bind(data.end_time)
        .bind(audit.created_at)
        .bind(audit.modified_at)
        .bind(audit.created_by)
        .bind(audit.modified_by)
        .fetch_one(executor)
        .await
    }

    /// Finds a live resolution of a live bug of a live team, with the bug's team
    pub async fn find_scoped<'e, E>(executor: E, id: Uuid) -> Result<Option<ScopedResolution>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ScopedResolution>(
            r#"
            SELECT r.*, b.team_id
            FROM bug_resolutions r
            JOIN bugs b ON b.id = r.bug_id
            JOIN teams t ON t.id = b.team_id AND t.deleted_at IS NULL
            WHERE r.id = $1 AND r.deleted_at IS NULL AND b.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Live resolutions whose bug belongs to one of `team_ids`, newest first
    pub async fn list_for_teams<'e, E>(executor: E, team_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugResolution>(
            r#"
            SELECT r.*
            FROM bug_resolutions r
            JOIN bugs b ON b.id = r.bug_id
            JOIN teams t ON t.id = b.team_id AND t.deleted_at IS NULL
            WHERE b.team_id = ANY($1) AND r.deleted_at IS NULL AND b.deleted_at IS NULL
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(team_ids)
        .fetch_all(executor)
        .await
    }

    /// Every live resolution, newest first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugResolution>(
            r#"
            SELECT r.*
            FROM bug_resolutions r
            JOIN bugs b ON b.id = r.bug_id
            JOIN teams t ON t.id = b.team_id AND t.deleted_at IS NULL
            WHERE r.deleted_at IS NULL AND b.deleted_at IS NULL
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateResolution,
        stamp: &Stamp,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE bug_resolutions SET modified_at = $2, modified_by = $3");
        let mut bind_count = 3;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };

        push("assigned_remarks", data.assigned_remarks.is_some());
        push("root_cause", data.root_cause.is_some());
        push("error_function", data.error_function.is_some());
        push("error_function_owner", data.error_function_owner.is_some());
        push("pull_req_id", data.pull_req_id.is_some());
        push("merge_req_id", data.merge_req_id.is_some());
        push("approved_by", data.approved_by.is_some());
        push("end_time", data.end_time.is_some());

        query.push_str(" WHERE id = $1 AND deleted_at IS NULL RETURNING *");

        let mut q = sqlx::query_as::<_, BugResolution>(&query)
            .bind(id)
            .bind(stamp.at)
            .bind(stamp.actor);

        // Bind order must match the column order above
        if let Some(value) = data.assigned_remarks {
            q = q.bind(value);
        }
        if let Some(value) = data.root_cause {
            q = q.bind(value);
        }
        if let Some(value) = data.error_function {
            q = q.bind(value);
        }
        if let Some(value) = data.error_function_owner {
            q = q.bind(value);
        }
        if let Some(value) = data.pull_req_id {
            q = q.bind(value);
        }
        if let Some(value) = data.merge_req_id {
            q = q.bind(value);
        }
        if let Some(value) = data.approved_by {
            q = q.bind(value);
        }
        if let Some(value) = data.end_time {
            q = q.bind(value);
        }

        q.fetch_optional(executor).await
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        audit::soft_delete(executor, Self::TABLE, id, stamp).await
    }

    /// Live users assigned to the resolution
    pub async fn assignee_ids<'e, E>(executor: E, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT a.user_id
            FROM bug_resolution_assignees a
            JOIN users u ON u.id = a.user_id
            WHERE a.resolution_id = $1 AND u.deleted_at IS NULL
            ORDER BY u.username
            "#,
        )
        .bind(id)
        .fetch_all(executor)
        .await
    }

    /// Replaces the assignee set
    pub async fn replace_assignees(
        conn: &mut PgConnection,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM bug_resolution_assignees WHERE resolution_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO bug_resolution_assignees (resolution_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
