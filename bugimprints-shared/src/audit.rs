/// Audit stamping and soft delete
///
/// Every tracked row carries the same six columns:
///
/// ```sql
/// created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
/// modified_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
/// created_by  UUID REFERENCES users(id),
/// modified_by UUID REFERENCES users(id),
/// deleted_at  TIMESTAMPTZ,
/// deleted_by  UUID REFERENCES users(id)
/// ```
///
/// [`AuditTrail`] is the in-memory view of those columns and is flattened into
/// every model row. [`Stamp`] is the acting identity plus the instant of the
/// action; it is resolved once per operation from an explicit `Option<Uuid>`,
/// so there is no ambient "current user" anywhere in the crate.
///
/// Rows are never erased. [`soft_delete`] fills `deleted_at` / `deleted_by`
/// and re-stamps the modifier; every default query in `models` carries
/// `deleted_at IS NULL`.
///
/// # Example
///
/// ```
/// use bugimprints_shared::audit::{AuditTrail, Stamp};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), bugimprints_shared::error::CoreError> {
/// let author = Uuid::new_v4();
///
/// let trail = AuditTrail::created(&Stamp::resolve(Some(author))?);
///
/// assert_eq!(trail.created_by, Some(author));
/// assert_eq!(trail.modified_by, Some(author));
/// assert!(Stamp::resolve(None).is_err());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Acting identity and timestamp for one mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// User performing the action
    pub actor: Uuid,

    /// When the action happens
    pub at: DateTime<Utc>,
}

impl Stamp {
    /// Stamp for `actor` at the current instant
    pub fn new(actor: Uuid) -> Self {
        Self {
            actor,
            at: Utc::now(),
        }
    }

    /// Resolves an optional acting identity into a stamp
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingIdentity` when `actor` is `None`.
    pub fn resolve(actor: Option<Uuid>) -> CoreResult<Self> {
        actor.map(Self::new).ok_or(CoreError::MissingIdentity)
    }
}

/// Audit and soft-delete columns shared by every tracked entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditTrail {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// Empty only for self-registered users
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,

    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

impl AuditTrail {
    /// Trail for a freshly created row: creator = modifier = actor
    pub fn created(stamp: &Stamp) -> Self {
        Self {
            created_at: stamp.at,
            modified_at: stamp.at,
            created_by: Some(stamp.actor),
            modified_by: Some(stamp.actor),
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Trail for a user who registered themselves (no creator)
    pub fn self_registered(at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            modified_at: at,
            created_by: None,
            modified_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

/// Implemented by every model that embeds an [`AuditTrail`]
pub trait Audited {
    /// Table the entity lives in
    const TABLE: Table;
}

/// Tables that support soft delete
///
/// Table names never come from user input; this enum keeps the generic
/// soft-delete query free of string interpolation from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Teams,
    Media,
    Bugs,
    BugResolutions,
    Messages,
    BugWatches,
    BugDuplicates,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Teams => "teams",
            Table::Media => "media",
            Table::Bugs => "bugs",
            Table::BugResolutions => "bug_resolutions",
            Table::Messages => "messages",
            Table::BugWatches => "bug_watches",
            Table::BugDuplicates => "bug_duplicates",
        }
    }
}

/// Soft-deletes one row
///
/// Sets `deleted_at`, `deleted_by`, `modified_by` and `modified_at` in a single
/// statement guarded by `deleted_at IS NULL`.
///
/// # Returns
///
/// `true` if a live row was marked, `false` if the row is absent or already
/// deleted.
///
/// # Example
///
/// ```no_run
/// # use bugimprints_shared::audit::{soft_delete, Stamp, Table};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
/// # async fn example(pool: PgPool, team_id: Uuid, actor: Uuid) -> Result<(), sqlx::Error> {
/// let deleted = soft_delete(&pool, Table::Teams, team_id, &Stamp::new(actor)).await?;
/// assert!(deleted);
/// # Ok(())
/// # }
/// ```
pub async fn soft_delete<'e, E>(
    executor: E,
    table: Table,
    id: Uuid,
    stamp: &Stamp,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "UPDATE {} \
         SET deleted_at = $2, deleted_by = $3, modified_at = $2, modified_by = $3 \
         WHERE id = $1 AND deleted_at IS NULL",
        table.as_str()
    );

    let result = sqlx::query(&query)
        .bind(id)
        .bind(stamp.at)
        .bind(stamp.actor)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_identity() {
        assert!(matches!(Stamp::resolve(None), Err(CoreError::MissingIdentity)));

        let actor = Uuid::new_v4();
        let stamp = Stamp::resolve(Some(actor)).unwrap();
        assert_eq!(stamp.actor, actor);
    }

    #[test]
    fn test_created_sets_creator_and_modifier() {
        let stamp = Stamp::new(Uuid::new_v4());
        let trail = AuditTrail::created(&stamp);

        assert_eq!(trail.created_by, Some(stamp.actor));
        assert_eq!(trail.modified_by, Some(stamp.actor));
        assert_eq!(trail.created_at, stamp.at);
        assert_eq!(trail.modified_at, stamp.at);
        assert!(trail.deleted_at.is_none());
    }

    #[test]
    fn test_self_registered_has_no_creator() {
        let trail = AuditTrail::self_registered(Utc::now());
        assert!(trail.created_by.is_none());
        assert!(trail.modified_by.is_none());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::BugResolutions.as_str(), "bug_resolutions");
        assert_eq!(Table::Media.as_str(), "media");
    }
}
