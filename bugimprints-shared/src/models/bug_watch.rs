/// BugWatch model: a user following a bug
///
/// ```sql
/// CREATE TABLE bug_watches (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     bug_id UUID NOT NULL REFERENCES bugs(id),
///     watcher_id UUID NOT NULL REFERENCES users(id),
///     -- audit columns
/// );
/// CREATE UNIQUE INDEX bug_watches_bug_watcher_key
///     ON bug_watches (bug_id, watcher_id) WHERE deleted_at IS NULL;
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::audit::{self, AuditTrail, Audited, Stamp, Table};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BugWatch {
    pub id: Uuid,
    pub bug_id: Uuid,
    pub watcher_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl Audited for BugWatch {
    const TABLE: Table = Table::BugWatches;
}

impl BugWatch {
    pub async fn create<'e, E>(
        executor: E,
        bug_id: Uuid,
        watcher_id: Uuid,
        audit: &AuditTrail,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugWatch>(
            r#"
            INSERT INTO bug_watches (bug_id, watcher_id, created_at, modified_at, created_by, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(bug_id)
        .bind(watcher_id)
        .bind(audit.created_at)
        .bind(audit.modified_at)
        .bind(audit.created_by)
        .bind(audit.modified_by)
        .fetch_one(executor)
        .await
    }

    /// The live watch of `watcher_id` on `bug_id`, if any
    pub async fn find<'e, E>(executor: E, bug_id: Uuid, watcher_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugWatch>(
            r#"
            SELECT * FROM bug_watches
            WHERE bug_id = $1 AND watcher_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(bug_id)
        .bind(watcher_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_for_bug<'e, E>(executor: E, bug_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BugWatch>(
            r#"
            SELECT w.*
            FROM bug_watches w
            JOIN users u ON u.id = w.watcher_id
            WHERE w.bug_id = $1 AND w.deleted_at IS NULL AND u.deleted_at IS NULL
            ORDER BY w.created_at
            "#,
        )
        .bind(bug_id)
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
