/// Application services
///
/// One function per operation. Each takes the pool and the caller's
/// [`AuthContext`](crate::auth::context::AuthContext), loads what the
/// permission gate needs, evaluates it, and only then writes. Operations that
/// touch more than one row run in a single transaction; a failed check returns
/// before anything is written.
///
/// Absent or soft-deleted targets are reported as `NotFound`, existing ones the
/// caller may not touch as `Forbidden`.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::auth::authorization::TeamScope;
use crate::error::{CoreError, CoreResult};
use crate::models::team::Team;

pub mod accounts;
pub mod bugs;
pub mod media;
pub mod messages;
pub mod resolutions;
pub mod teams;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Limit/offset pair for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamps caller-supplied values into a sane window
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Team and leader for permission checks on team-owned rows
///
/// A soft-deleted team yields `MissingReference`, the same as an absent one.
pub(crate) async fn team_scope<'e, E>(executor: E, team_id: Uuid) -> CoreResult<TeamScope>
where
    E: PgExecutor<'e>,
{
    let leader_id = Team::leader_of(executor, team_id)
        .await?
        .ok_or(CoreError::missing("Team", team_id))?;

    Ok(TeamScope { team_id, leader_id })
}

/// Scope of an already loaded live team
pub(crate) fn scope_of(team: &Team) -> TeamScope {
    TeamScope {
        team_id: team.id,
        leader_id: team.leader_id,
    }
}

/// Deduplicates ids, keeping first-seen order
pub(crate) fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

/// Fails with `MissingReference` naming the first of `missing`
pub(crate) fn ensure_none_missing(entity: &'static str, missing: &[Uuid]) -> CoreResult<()> {
    match missing.first() {
        Some(id) => Err(CoreError::missing(entity, *id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps() {
        assert_eq!(Page::default(), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(1000), Some(-5)), Page { limit: 100, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(20)), Page { limit: 1, offset: 20 });
    }

    #[test]
    fn test_unique_ids_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(unique_ids(&[a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn test_ensure_none_missing() {
        assert!(ensure_none_missing("Media", &[]).is_ok());
        let id = Uuid::new_v4();
        let err = ensure_none_missing("Media", &[id]).unwrap_err();
        assert!(matches!(err, CoreError::MissingReference { entity: "Media", id: missing } if missing == id));
    }
}
