//! Grant and revoke the ADMIN and LEADER roles.
//!
//! A grant sets `{MEMBER, role}` and a revoke sets `{MEMBER}`, replacing
//! whatever the subject held before. Tokens already issued keep their role
//! snapshot until they expire.

use std::collections::BTreeSet;

use crate::models::{Capability, Credential, OwnershipFacts, Principal, Role, SubjectId};
use crate::services::authz::AuthorizationResolver;
use crate::services::registry::CredentialRegistry;
use crate::services::AuthError;

#[derive(Clone)]
pub struct PromotionService {
    registry: CredentialRegistry,
}

impl PromotionService {
    pub fn new(registry: CredentialRegistry) -> Self {
        Self { registry }
    }

    pub async fn grant_admin(
        &self,
        actor: &Principal,
        target: SubjectId,
    ) -> Result<Credential, AuthError> {
        self.apply(actor, Capability::GrantAdmin, target, Some(Role::Admin))
            .await
    }

    pub async fn revoke_admin(
        &self,
        actor: &Principal,
        target: SubjectId,
    ) -> Result<Credential, AuthError> {
        self.apply(actor, Capability::RevokeAdmin, target, None)
            .await
    }

    pub async fn grant_leader(
        &self,
        actor: &Principal,
        target: SubjectId,
    ) -> Result<Credential, AuthError> {
        self.apply(actor, Capability::GrantLeader, target, Some(Role::Leader))
            .await
    }

    pub async fn revoke_leader(
        &self,
        actor: &Principal,
        target: SubjectId,
    ) -> Result<Credential, AuthError> {
        self.apply(actor, Capability::RevokeLeader, target, None)
            .await
    }

    #[tracing::instrument(skip(self, actor), fields(actor = actor.subject_id))]
    async fn apply(
        &self,
        actor: &Principal,
        capability: Capability,
        target: SubjectId,
        granted: Option<Role>,
    ) -> Result<Credential, AuthError> {
        AuthorizationResolver::require(actor, capability, &OwnershipFacts::none())?;

        let mut roles = BTreeSet::from([Role::Member]);
        roles.extend(granted);

        self.registry.set_roles(target, roles).await
    }
}
