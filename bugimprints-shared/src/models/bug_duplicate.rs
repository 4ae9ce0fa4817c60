/// BugDuplicate model: marks `child` as a duplicate of `parent`
///
/// Resolving the parent resolves every child. A bug cannot duplicate itself
/// (`CHECK (parent_id <> child_id)`) and a pair is recorded at most once while
/// live.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BugDuplicate {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub child_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for BugDuplicate {
    const TABLE: Table = Table::BugDuplicates;
}

impl BugDuplicate {
    pub async fn create<'e, E>(
        executor: E,
        parent_id: Uuid,
        child_id: Uuid,
        audit: &AuditTrail,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugDuplicate>(
            r#"
            INSERT INTO bug_duplicates (parent_id, child_id, created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(parent_id)
        .bind(child_id)
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
        sqlx::query_as::<_, BugDuplicate>(
            "SELECT * FROM bug_duplicates WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Live duplicates of `parent_id` whose child bug is live
    pub async fn list_for_parent<'e, E>(executor: E, parent_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugDuplicate>(
            r#"
            SELECT d.*
            FROM bug_duplicates d
            JOIN bugs c ON c.id = d.child_id
            JOIN teams t ON t.id = c.team_id AND t.deleted_at IS NULL
            WHERE d.parent_id = $1 AND d.deleted_at IS NULL AND c.deleted_at IS NULL
            ORDER BY d.created_at
            "#,
        )
        .bind(parent_id)
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
