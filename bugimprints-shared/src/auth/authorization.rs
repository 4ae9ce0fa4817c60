/// Permission gate
///
/// [`authorize`] is a pure function of the acting user, the action and a
/// description of the target resource. Services load the facts they need
/// (creator, owning team, team leader, assignees), evaluate the gate, and only
/// then write. Nothing here touches the database.
///
/// # Roles
///
/// - **superuser**: account type `superuser`; passes every creator/leader check
/// - **team leader**: `teams.leader_id` of the owning team; counts as a member
/// - **team member**: linked to the owning team through `user_teams`
/// - **creator**: `created_by` of the target row
/// - **assignee**: listed in `bug_resolution_assignees`
///
/// Absent and soft-deleted targets never reach the gate: services report them
/// as not found before authorizing.
///
/// # Example
///
/// ```
/// use bugimprints_shared::auth::authorization::{authorize, Action, Decision, Resource, TeamScope};
/// use bugimprints_shared::auth::context::AuthContext;
/// use bugimprints_shared::models::user::AccountType;
/// use uuid::Uuid;
///
/// let reporter = AuthContext::new(Uuid::new_v4(), AccountType::Contributor, vec![]);
/// let bug = Resource::Bug {
///     scope: TeamScope { team_id: Uuid::new_v4(), leader_id: Uuid::new_v4() },
///     created_by: Some(reporter.user_id),
/// };
///
/// assert!(authorize(&reporter, Action::Delete, &bug).is_allowed());
/// ```

use uuid::Uuid;

use super::context::AuthContext;
use crate::error::CoreError;

/// Error returned by [`require`]
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct AuthzError(pub &'static str);

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        CoreError::Forbidden(err.0.to_string())
    }
}

/// Operation being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Bug rejection
    Reject,
}

/// The team that owns a resource, and its leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamScope {
    pub team_id: Uuid,
    pub leader_id: Uuid,
}

/// Facts about the target of an action
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// The team collection (team creation)
    Teams,

    /// An existing team
    Team {
        scope: TeamScope,
        created_by: Option<Uuid>,
    },

    /// The bug collection (bug reporting)
    Bugs,

    Bug {
        scope: TeamScope,
        created_by: Option<Uuid>,
    },

    /// A resolution, or the resolutions of a team when `assignees` is empty
    /// and the action is `Read`. For `Create`, `scope` is the bug's team.
    Resolution {
        scope: TeamScope,
        assignees: &'a [Uuid],
    },

    /// A message; `created_by` is `None` when the message does not exist yet
    Message {
        scope: TeamScope,
        created_by: Option<Uuid>,
    },

    Media {
        created_by: Option<Uuid>,
    },

    /// Membership links of a team
    Membership {
        scope: TeamScope,
    },

    /// Another user's account (type change, disable)
    Account {
        user_id: Uuid,
    },

    Watch {
        created_by: Option<Uuid>,
    },

    /// A duplicate link; `scope` is the parent bug's team
    Duplicate {
        scope: TeamScope,
        created_by: Option<Uuid>,
    },
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn when(condition: bool, reason: &'static str) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(reason)
        }
    }
}

fn is_creator(actor: &AuthContext, created_by: Option<Uuid>) -> bool {
    created_by == Some(actor.user_id)
}

fn is_leader(actor: &AuthContext, scope: &TeamScope) -> bool {
    scope.leader_id == actor.user_id
}

fn is_member(actor: &AuthContext, scope: &TeamScope) -> bool {
    is_leader(actor, scope) || actor.belongs_to(scope.team_id)
}

/// Decides whether `actor` may perform `action` on `resource`
///
/// Any combination not listed below is denied.
///
/// | Resource | Action | Allowed |
/// |---|---|---|
/// | Teams | Create | superuser |
/// | Teams / Team / Bugs / Bug | Read | any authenticated user |
/// | Team | Update | creator, leader, superuser |
/// | Team | Delete | creator, superuser |
/// | Bugs | Create | any authenticated user |
/// | Bug | Update | creator, leader, superuser |
/// | Bug | Delete | creator, superuser |
/// | Bug | Reject | leader, superuser |
/// | Resolution | Create / Delete | leader, superuser |
/// | Resolution | Read | member, superuser |
/// | Resolution | Update | assignee |
/// | Message | Create / Read | member, superuser |
/// | Message | Delete | creator, superuser |
/// | Media | Create | any authenticated user |
/// | Media | Delete | creator, superuser |
/// | Membership | Update | leader, superuser |
/// | Account | Update / Delete | superuser |
/// | Watch | Create | any authenticated user |
/// | Watch | Delete | creator, superuser |
/// | Duplicate | Create | leader of parent's team, superuser |
/// | Duplicate | Delete | creator, superuser |
pub fn authorize(actor: &AuthContext, action: Action, resource: &Resource<'_>) -> Decision {
    let su = actor.is_superuser();

    match (resource, action) {
        (Resource::Teams, Action::Create) => {
            Decision::when(su, "Only superusers can create teams")
        }
        (Resource::Teams, Action::Read)
        | (Resource::Team { .. }, Action::Read)
        | (Resource::Bugs, Action::Read)
        | (Resource::Bug { .. }, Action::Read) => Decision::Allow,
        (Resource::Team { scope, created_by }, Action::Update) => Decision::when(
            su || is_creator(actor, *created_by) || is_leader(actor, scope),
            "Only the team's creator, its leader or a superuser can edit this team",
        ),
        (Resource::Team { created_by, .. }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the team's creator or a superuser can delete this team",
        ),

        (Resource::Bugs, Action::Create) => Decision::Allow,
        (Resource::Bug { scope, created_by }, Action::Update) => Decision::when(
            su || is_creator(actor, *created_by) || is_leader(actor, scope),
            "Only the bug's reporter, the team leader or a superuser can edit this bug",
        ),
        (Resource::Bug { created_by, .. }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the bug's creator or a superuser can delete this bug",
        ),
        (Resource::Bug { scope, .. }, Action::Reject) => Decision::when(
            su || is_leader(actor, scope),
            "Only the team leader or a superuser can reject this bug",
        ),

        (Resource::Resolution { scope, .. }, Action::Create) => Decision::when(
            su || is_leader(actor, scope),
            "Only the team leader or a superuser can create a resolution",
        ),
        (Resource::Resolution { scope, .. }, Action::Read) => Decision::when(
            su || is_member(actor, scope),
            "You are not a member of this team",
        ),
        (Resource::Resolution { assignees, .. }, Action::Update) => Decision::when(
            assignees.contains(&actor.user_id),
            "Only assigned members can edit this resolution",
        ),
        (Resource::Resolution { scope, .. }, Action::Delete) => Decision::when(
            su || is_leader(actor, scope),
            "Only the team leader or a superuser can delete this resolution",
        ),

        (Resource::Message { scope, .. }, Action::Create)
        | (Resource::Message { scope, .. }, Action::Read) => Decision::when(
            su || is_member(actor, scope),
            "You are not a member of this team",
        ),
        (Resource::Message { created_by, .. }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the author or a superuser can delete this message",
        ),

        (Resource::Media { .. }, Action::Create) => Decision::Allow,
        (Resource::Media { created_by }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the file owner or a superuser can delete this file",
        ),

        (Resource::Membership { scope }, Action::Update) => Decision::when(
            su || is_leader(actor, scope),
            "Only the team leader or a superuser can change team membership",
        ),

        (Resource::Account { .. }, Action::Update) | (Resource::Account { .. }, Action::Delete) => {
            Decision::when(su, "Only superusers can manage accounts")
        }

        (Resource::Watch { .. }, Action::Create) => Decision::Allow,
        (Resource::Watch { created_by }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the watcher or a superuser can remove this watch",
        ),

        (Resource::Duplicate { scope, .. }, Action::Create) => Decision::when(
            su || is_leader(actor, scope),
            "Only the team leader or a superuser can mark duplicates",
        ),
        (Resource::Duplicate { created_by, .. }, Action::Delete) => Decision::when(
            su || is_creator(actor, *created_by),
            "Only the creator or a superuser can remove this duplicate mark",
        ),

        _ => Decision::Deny("Operation not permitted"),
    }
}

/// [`authorize`] as a `Result`, for use with `?`
pub fn require(actor: &AuthContext, action: Action, resource: &Resource<'_>) -> Result<(), AuthzError> {
    match authorize(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::warn!(
                user_id = %actor.user_id,
                action = ?action,
                reason,
                "Permission denied"
            );
            Err(AuthzError(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::AccountType;

    struct World {
        team: TeamScope,
        leader: AuthContext,
        member: AuthContext,
        outsider: AuthContext,
        admin: AuthContext,
    }

    fn world() -> World {
        let team_id = Uuid::new_v4();
        let leader_id = Uuid::new_v4();

        World {
            team: TeamScope { team_id, leader_id },
            leader: AuthContext::new(leader_id, AccountType::TeamLeader, vec![team_id]),
            member: AuthContext::new(Uuid::new_v4(), AccountType::Contributor, vec![team_id]),
            outsider: AuthContext::new(Uuid::new_v4(), AccountType::Contributor, vec![]),
            admin: AuthContext::new(Uuid::new_v4(), AccountType::Superuser, vec![]),
        }
    }

    fn allowed(actor: &AuthContext, action: Action, resource: &Resource<'_>) -> bool {
        authorize(actor, action, resource).is_allowed()
    }

    #[test]
    fn test_team_create_superuser_only() {
        let w = world();
        assert!(allowed(&w.admin, Action::Create, &Resource::Teams));
        assert!(!allowed(&w.leader, Action::Create, &Resource::Teams));
        assert!(allowed(&w.outsider, Action::Read, &Resource::Teams));
    }

    #[test]
    fn test_team_update_and_delete() {
        let w = world();
        let team = Resource::Team {
            scope: w.team,
            created_by: Some(w.admin.user_id),
        };

        assert!(allowed(&w.leader, Action::Update, &team));
        assert!(allowed(&w.admin, Action::Update, &team));
        assert!(!allowed(&w.member, Action::Update, &team));

        assert!(allowed(&w.admin, Action::Delete, &team));
        assert!(!allowed(&w.leader, Action::Delete, &team));
    }

    #[test]
    fn test_bug_delete_creator_or_superuser_only() {
        let w = world();
        let bug = Resource::Bug {
            scope: w.team,
            created_by: Some(w.member.user_id),
        };

        assert!(allowed(&w.member, Action::Delete, &bug));
        assert!(allowed(&w.admin, Action::Delete, &bug));
        assert!(!allowed(&w.leader, Action::Delete, &bug));
        assert!(!allowed(&w.outsider, Action::Delete, &bug));
    }

    #[test]
    fn test_bug_update_and_reject() {
        let w = world();
        let bug = Resource::Bug {
            scope: w.team,
            created_by: Some(w.outsider.user_id),
        };

        assert!(allowed(&w.outsider, Action::Update, &bug));
        assert!(allowed(&w.leader, Action::Update, &bug));
        assert!(!allowed(&w.member, Action::Update, &bug));

        assert!(allowed(&w.leader, Action::Reject, &bug));
        assert!(allowed(&w.admin, Action::Reject, &bug));
        assert!(!allowed(&w.outsider, Action::Reject, &bug));
        assert!(allowed(&w.outsider, Action::Create, &Resource::Bugs));
    }

    #[test]
    fn test_resolution_rules() {
        let w = world();
        let assignees = [w.member.user_id];
        let resolution = Resource::Resolution {
            scope: w.team,
            assignees: &assignees,
        };

        assert!(allowed(&w.leader, Action::Create, &resolution));
        assert!(allowed(&w.admin, Action::Create, &resolution));
        assert!(!allowed(&w.member, Action::Create, &resolution));

        assert!(allowed(&w.member, Action::Read, &resolution));
        assert!(allowed(&w.leader, Action::Read, &resolution));
        assert!(allowed(&w.admin, Action::Read, &resolution));
        assert!(!allowed(&w.outsider, Action::Read, &resolution));

        assert!(allowed(&w.member, Action::Update, &resolution));
        assert!(!allowed(&w.leader, Action::Update, &resolution));
        assert!(!allowed(&w.admin, Action::Update, &resolution));

        assert!(allowed(&w.leader, Action::Delete, &resolution));
        assert!(!allowed(&w.member, Action::Delete, &resolution));
    }

    #[test]
    fn test_leader_counts_as_member_without_link() {
        let w = world();
        let unlinked_leader = AuthContext::new(w.team.leader_id, AccountType::TeamLeader, vec![]);
        let resolution = Resource::Resolution {
            scope: w.team,
            assignees: &[],
        };
        assert!(allowed(&unlinked_leader, Action::Read, &resolution));
    }

    #[test]
    fn test_message_rules() {
        let w = world();
        let new_message = Resource::Message {
            scope: w.team,
            created_by: None,
        };
        assert!(allowed(&w.member, Action::Create, &new_message));
        assert!(!allowed(&w.outsider, Action::Create, &new_message));

        let message = Resource::Message {
            scope: w.team,
            created_by: Some(w.member.user_id),
        };
        assert!(allowed(&w.member, Action::Delete, &message));
        assert!(allowed(&w.admin, Action::Delete, &message));
        assert!(!allowed(&w.leader, Action::Delete, &message));
    }

    #[test]
    fn test_media_membership_account() {
        let w = world();
        let media = Resource::Media {
            created_by: Some(w.outsider.user_id),
        };
        assert!(allowed(&w.outsider, Action::Delete, &media));
        assert!(!allowed(&w.member, Action::Delete, &media));

        let membership = Resource::Membership { scope: w.team };
        assert!(allowed(&w.leader, Action::Update, &membership));
        assert!(allowed(&w.admin, Action::Update, &membership));
        assert!(!allowed(&w.member, Action::Update, &membership));

        let account = Resource::Account {
            user_id: w.member.user_id,
        };
        assert!(allowed(&w.admin, Action::Update, &account));
        assert!(!allowed(&w.leader, Action::Delete, &account));
    }

    #[test]
    fn test_watch_and_duplicate() {
        let w = world();
        let watch = Resource::Watch {
            created_by: Some(w.outsider.user_id),
        };
        assert!(allowed(&w.member, Action::Create, &watch));
        assert!(allowed(&w.outsider, Action::Delete, &watch));
        assert!(!allowed(&w.member, Action::Delete, &watch));

        let duplicate = Resource::Duplicate {
            scope: w.team,
            created_by: Some(w.leader.user_id),
        };
        assert!(allowed(&w.leader, Action::Create, &duplicate));
        assert!(!allowed(&w.member, Action::Create, &duplicate));
        assert!(allowed(&w.leader, Action::Delete, &duplicate));
    }

    #[test]
    fn test_unlisted_combinations_denied() {
        let w = world();
        assert!(!allowed(&w.admin, Action::Reject, &Resource::Teams));
        assert!(!allowed(&w.admin, Action::Update, &Resource::Bugs));
        assert!(!allowed(&w.admin, Action::Read, &Resource::Membership { scope: w.team }));
    }

    #[test]
    fn test_require_maps_to_forbidden() {
        let w = world();
        let err = require(&w.member, Action::Create, &Resource::Teams).unwrap_err();
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Forbidden(_)));
    }
}
