//! Role model - the fixed role enumeration and its external token mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use utoipa::ToSchema;

/// Role tags a credential can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_LEADER")]
    Leader,
    #[serde(rename = "ROLE_MEMBER")]
    Member,
}

/// Every external spelling accepted for a role, lowercased.
///
/// Sign-up requests, promotion calls and the persisted role table all go
/// through this one table.
const ROLE_TOKENS: &[(&str, Role)] = &[
    ("admin", Role::Admin),
    ("role_admin", Role::Admin),
    ("leader", Role::Leader),
    ("mod", Role::Leader),
    ("moderator", Role::Leader),
    ("role_leader", Role::Leader),
    ("member", Role::Member),
    ("user", Role::Member),
    ("role_member", Role::Member),
];

impl Role {
    /// Canonical authority string carried in tokens and stored in the role table.
    pub fn as_authority(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Leader => "ROLE_LEADER",
            Role::Member => "ROLE_MEMBER",
        }
    }

    /// Resolve an external role token (case-insensitive).
    pub fn from_token(token: &str) -> Option<Role> {
        let token = token.trim().to_ascii_lowercase();
        ROLE_TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, role)| *role)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_authority())
    }
}

/// Role set used when sign-up doesn't request any.
pub fn default_roles() -> BTreeSet<Role> {
    BTreeSet::from([Role::Member])
}

/// Map external tokens to a role set. Returns the first unknown token on failure.
pub fn parse_roles<I, S>(tokens: I) -> Result<BTreeSet<Role>, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|t| Role::from_token(t.as_ref()).ok_or_else(|| t.as_ref().to_string()))
        .collect()
}
