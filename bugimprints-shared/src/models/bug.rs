/// Bug model and database operations
///
/// A bug holds the details submitted by its reporter. Acceptance is decided
/// afterwards: see [`crate::lifecycle`] for the allowed transitions. Once
/// accepted, work on the bug is tracked in its
/// [`BugResolution`](crate::models::bug_resolution::BugResolution).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE bugs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(100) NOT NULL,
///     description TEXT,
///     reproduction_steps TEXT,
///     found_by UUID REFERENCES users(id),
///     acceptance BOOLEAN,            -- NULL under review, TRUE accepted, FALSE rejected
///     team_id UUID NOT NULL REFERENCES teams(id),
///     -- audit columns
/// );
/// ```
///
/// A bug whose team has been soft-deleted is treated like a deleted bug: the
/// lookups, lists and updates here skip it.
///
/// # Example
///
/// ```no_run
/// use bugimprints_shared::audit::{AuditTrail, Stamp};
/// use bugimprints_shared::models::bug::{Bug, CreateBug};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, reporter: Uuid, team_id: Uuid) -> Result<(), sqlx::Error> {
/// let bug = Bug::create(
///     &pool,
///     CreateBug {
///         title: "Login button does nothing".to_string(),
///         description: None,
///         reproduction_steps: Some("1. open /login\n2. click".to_string()),
///         found_by: Some(reporter),
///         team_id,
///     },
///     &AuditTrail::created(&Stamp::new(reporter)),
/// )
/// .await?;
///
/// assert!(bug.acceptance.is_none());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};
use crate::lifecycle::{Acceptance, BugSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bug {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub reproduction_steps: Option<String>,
    pub found_by: Option<Uuid>,

    /// `None` under review, `Some(true)` accepted, `Some(false)` rejected
    pub acceptance: Option<bool>,

    pub team_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for Bug {
    const TABLE: Table = Table::Bugs;
}

impl Bug {
    pub fn acceptance_state(&self) -> Acceptance {
        Acceptance::from_column(self.acceptance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBug {
    pub title: String,
    pub description: Option<String>,
    pub reproduction_steps: Option<String>,
    pub found_by: Option<Uuid>,
    pub team_id: Uuid,
}

/// Editable bug fields
///
/// Acceptance is not editable here; it only moves through the lifecycle
/// operations. `Some(None)` clears an optional text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBug {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub reproduction_steps: Option<Option<String>>,
}

impl Bug {
    pub async fn create<'e, E>(executor: E, data: CreateBug, audit: &AuditTrail) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Bug>(
            r#"
            INSERT INTO bugs (title, description, reproduction_steps, found_by, team_id,
                              created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.reproduction_steps)
        .bind(data.found_by)
        .bind(data.team_id)
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
        sqlx::query_as::<_, Bug>(
            r#"
            SELECT * FROM bugs
            WHERE id = $1 AND deleted_at IS NULL
              AND team_id IN (SELECT id FROM teams WHERE deleted_at IS NULL)
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a live bug and locks its row until the transaction ends
    pub async fn find_for_update<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Bug>(
            r#"
            SELECT * FROM bugs
            WHERE id = $1 AND deleted_at IS NULL
              AND team_id IN (SELECT id FROM teams WHERE deleted_at IS NULL)
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists live bugs, newest first, optionally limited to one team
    pub async fn list<'e, E>(
        executor: E,
        team_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Bug>(
            r#"
            SELECT * FROM bugs
            WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR team_id = $1)
              AND team_id IN (SELECT id FROM teams WHERE deleted_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(team_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateBug,
        stamp: &Stamp,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE bugs SET modified_at = $2, modified_by = $3");
        let mut bind_count = 3;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.reproduction_steps.is_some() {
            bind_count += 1;
            query.push_str(&format!(", reproduction_steps = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND deleted_at IS NULL \
             AND team_id IN (SELECT id FROM teams WHERE deleted_at IS NULL) RETURNING *",
        );

        let mut q = sqlx::query_as::<_, Bug>(&query)
            .bind(id)
            .bind(stamp.at)
            .bind(stamp.actor);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(steps) = data.reproduction_steps {
            q = q.bind(steps);
        }

        q.fetch_optional(executor).await
    }

    /// Writes a new acceptance state and re-stamps the modifier
    pub async fn set_acceptance<'e, E>(
        executor: E,
        id: Uuid,
        acceptance: Acceptance,
        stamp: &Stamp,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Bug>(
            r#"
            UPDATE bugs
            SET acceptance = $2, modified_at = $3, modified_by = $4
            WHERE id = $1 AND deleted_at IS NULL AND team_id IN (SELECT id FROM teams WHERE deleted_at IS NULL)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(acceptance.to_column())
        .bind(stamp.at)
        .bind(stamp.actor)
        .fetch_optional(executor)
        .await
    }

    pub async fn soft_delete<'e, E>(executor: E, id: Uuid, stamp: &Stamp) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        audit::soft_delete(executor, Self::TABLE, id, stamp).await
    }

    /// Links media rows to the bug
    pub async fn attach_media<'e, E>(executor: E, bug_id: Uuid, media_ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO bug_attachments (bug_id, media_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(bug_id)
        .bind(media_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Whether a resolution row exists for the bug, deleted or not
    pub async fn has_resolution<'e, E>(executor: E, bug_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bug_resolutions WHERE bug_id = $1)",
        )
        .bind(bug_id)
        .fetch_one(executor)
        .await
    }

    pub fn snapshot(&self, has_resolution: bool) -> BugSnapshot {
        BugSnapshot {
            acceptance: self.acceptance_state(),
            has_resolution,
        }
    }
}
