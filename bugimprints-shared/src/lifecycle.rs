/// Bug acceptance lifecycle
///
/// A bug starts under review. It becomes accepted exactly when a resolution
/// is created for it, or rejected through an explicit reject call. Both end
/// states are terminal:
///
/// ```text
///                 ┌──> Accepted   (resolution created)
/// UnderReview ────┤
///                 └──> Rejected   (reject)
/// ```
///
/// The checks here are pure. The resolution service evaluates them against a
/// bug row locked with `SELECT ... FOR UPDATE`, so the decision and the write
/// happen in the same transaction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Tri-state acceptance of a bug
///
/// Stored as a nullable boolean: `NULL` under review, `TRUE` accepted,
/// `FALSE` rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    UnderReview,
    Accepted,
    Rejected,
}

impl Acceptance {
    pub fn from_column(value: Option<bool>) -> Self {
        match value {
            None => Acceptance::UnderReview,
            Some(true) => Acceptance::Accepted,
            Some(false) => Acceptance::Rejected,
        }
    }

    pub fn to_column(self) -> Option<bool> {
        match self {
            Acceptance::UnderReview => None,
            Acceptance::Accepted => Some(true),
            Acceptance::Rejected => Some(false),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Acceptance::UnderReview => "under_review",
            Acceptance::Accepted => "accepted",
            Acceptance::Rejected => "rejected",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: Acceptance) -> bool {
        matches!(
            (self, next),
            (Acceptance::UnderReview, Acceptance::Accepted)
                | (Acceptance::UnderReview, Acceptance::Rejected)
        )
    }
}

/// What the resolution rules need to know about a bug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BugSnapshot {
    pub acceptance: Acceptance,

    /// A resolution row exists for this bug, deleted or not
    pub has_resolution: bool,
}

/// Checks that a resolution may be created for `bug_id`
///
/// `bug` is `None` when the bug is absent or soft-deleted.
///
/// # Errors
///
/// - `MissingReference` if the bug does not exist
/// - `InvalidState` if the bug is rejected
/// - `InvalidState` if the bug already has a resolution
///
/// # Example
///
/// ```
/// use bugimprints_shared::lifecycle::{check_resolvable, Acceptance, BugSnapshot};
/// use uuid::Uuid;
///
/// let bug = BugSnapshot { acceptance: Acceptance::UnderReview, has_resolution: false };
/// assert!(check_resolvable(Uuid::new_v4(), Some(&bug)).is_ok());
///
/// let rejected = BugSnapshot { acceptance: Acceptance::Rejected, has_resolution: false };
/// assert!(check_resolvable(Uuid::new_v4(), Some(&rejected)).is_err());
/// ```
pub fn check_resolvable(bug_id: Uuid, bug: Option<&BugSnapshot>) -> CoreResult<()> {
    let bug = bug.ok_or(CoreError::missing("Bug", bug_id))?;

    if bug.acceptance == Acceptance::Rejected {
        return Err(CoreError::InvalidState(
            "Bug is rejected, cannot resolve it".to_string(),
        ));
    }

    if bug.has_resolution {
        return Err(CoreError::InvalidState(
            "Bug already has a resolution".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a bug may be rejected
///
/// # Errors
///
/// Returns `InvalidState` unless the bug is still under review.
pub fn check_rejectable(current: Acceptance) -> CoreResult<()> {
    if !current.can_transition_to(Acceptance::Rejected) {
        return Err(CoreError::InvalidState(format!(
            "Bug is already {}, cannot reject it",
            current.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(acceptance: Acceptance, has_resolution: bool) -> BugSnapshot {
        BugSnapshot {
            acceptance,
            has_resolution,
        }
    }

    #[test]
    fn test_column_mapping() {
        assert_eq!(Acceptance::from_column(None), Acceptance::UnderReview);
        assert_eq!(Acceptance::from_column(Some(true)), Acceptance::Accepted);
        assert_eq!(Acceptance::from_column(Some(false)), Acceptance::Rejected);

        for state in [Acceptance::UnderReview, Acceptance::Accepted, Acceptance::Rejected] {
            assert_eq!(Acceptance::from_column(state.to_column()), state);
        }
    }

    #[test]
    fn test_transitions() {
        use Acceptance::*;

        assert!(UnderReview.can_transition_to(Accepted));
        assert!(UnderReview.can_transition_to(Rejected));
        assert!(!Accepted.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Accepted));
        assert!(!Accepted.can_transition_to(UnderReview));
        assert!(!UnderReview.can_transition_to(UnderReview));
    }

    #[test]
    fn test_resolvable_under_review() {
        let bug = snapshot(Acceptance::UnderReview, false);
        assert!(check_resolvable(Uuid::new_v4(), Some(&bug)).is_ok());
    }

    #[test]
    fn test_missing_bug_is_missing_reference() {
        let id = Uuid::new_v4();
        let err = check_resolvable(id, None).unwrap_err();
        assert!(matches!(err, CoreError::MissingReference { id: missing, .. } if missing == id));
    }

    #[test]
    fn test_rejected_bug_is_invalid_state() {
        let bug = snapshot(Acceptance::Rejected, false);
        let err = check_resolvable(Uuid::new_v4(), Some(&bug)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_second_resolution_is_invalid_state() {
        let bug = snapshot(Acceptance::Accepted, true);
        let err = check_resolvable(Uuid::new_v4(), Some(&bug)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_rejectable() {
        assert!(check_rejectable(Acceptance::UnderReview).is_ok());
        assert!(matches!(
            check_rejectable(Acceptance::Accepted),
            Err(CoreError::InvalidState(_))
        ));
        assert!(matches!(
            check_rejectable(Acceptance::Rejected),
            Err(CoreError::InvalidState(_))
        ));
    }

    #[test]
    fn test_acceptance_serde() {
        let json = serde_json::to_string(&Acceptance::UnderReview).unwrap();
        assert_eq!(json, "\"under_review\"");
    }
}
