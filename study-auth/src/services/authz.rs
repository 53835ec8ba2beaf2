//! Authorization decisions over roles and resource ownership.
//!
//! Every applicable rule is a grant path; a request is allowed when any one
//! of them matches. There are no deny rules.

use crate::models::{Capability, OwnershipFacts, Principal, Role};
use crate::services::AuthError;

const LEADER_OR_ADMIN: &[Role] = &[Role::Leader, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Principal holds any of these roles.
    Roles(&'static [Role]),
    /// Resource owner or the group's leader.
    OwnerOrLeader,
    /// Only the author of the resource.
    OwnerOnly,
    /// Any group member or the group's leader.
    MemberOrLeader,
}

fn rule_for(capability: Capability) -> Rule {
    use Capability::*;

    match capability {
        CreateGroup | CreateSession | SendReminders => Rule::Roles(LEADER_OR_ADMIN),
        GrantAdmin | RevokeAdmin | GrantLeader | RevokeLeader => Rule::Roles(ADMIN_ONLY),
        UpdateGroup | DeleteGroup | ManageMembers => Rule::OwnerOrLeader,
        UpdateContent | DeleteContent | DeleteChatMessage => Rule::OwnerOrLeader,
        UpdatePrayerRequest | DeletePrayerRequest => Rule::OwnerOrLeader,
        EditChatMessage => Rule::OwnerOnly,
        ViewGroup | ReadGroupContent | PostChatMessage => Rule::MemberOrLeader,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationResolver;

impl AuthorizationResolver {
    pub fn can_perform(
        principal: &Principal,
        capability: Capability,
        facts: &OwnershipFacts,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }

        let id = principal.subject_id;
        match rule_for(capability) {
            Rule::Roles(roles) => principal.has_any_role(roles),
            Rule::OwnerOrLeader => facts.is_owner(id) || facts.is_group_leader(id),
            Rule::OwnerOnly => facts.is_owner(id),
            Rule::MemberOrLeader => facts.is_member(id) || facts.is_group_leader(id),
        }
    }

    /// [`Self::can_perform`], with a denial turned into `Forbidden`.
    pub fn require(
        principal: &Principal,
        capability: Capability,
        facts: &OwnershipFacts,
    ) -> Result<(), AuthError> {
        if Self::can_perform(principal, capability, facts) {
            Ok(())
        } else {
            tracing::info!(
                subject_id = principal.subject_id,
                capability = ?capability,
                "Authorization denied"
            );
            Err(AuthError::forbidden())
        }
    }
}
