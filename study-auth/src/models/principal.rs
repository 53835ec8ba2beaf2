//! Principal - the identity and role set resolved from a validated token.

use serde::Serialize;
use std::collections::BTreeSet;

use super::{Role, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: SubjectId,
    pub username: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(subject_id: SubjectId, username: impl Into<String>, roles: BTreeSet<Role>) -> Self {
        Self {
            subject_id,
            username: username.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
