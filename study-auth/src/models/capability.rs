//! Capabilities and the ownership facts they are evaluated against.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::SubjectId;

/// A named permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateGroup,
    CreateSession,
    SendReminders,
    GrantAdmin,
    RevokeAdmin,
    GrantLeader,
    RevokeLeader,
    UpdateGroup,
    DeleteGroup,
    ManageMembers,
    UpdateContent,
    DeleteContent,
    UpdatePrayerRequest,
    DeletePrayerRequest,
    DeleteChatMessage,
    EditChatMessage,
    ViewGroup,
    ReadGroupContent,
    PostChatMessage,
}

/// Resource facts read from the domain entity being acted on.
///
/// Nothing here is persisted by the auth core; callers load it from the
/// group/content record and pass it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipFacts {
    /// Creator or author of the resource.
    pub owner: Option<SubjectId>,
    /// Leader of the group the resource belongs to.
    pub group_leader: Option<SubjectId>,
    pub group_members: HashSet<SubjectId>,
}

impl OwnershipFacts {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: SubjectId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner: SubjectId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_group_leader(mut self, leader: SubjectId) -> Self {
        self.group_leader = Some(leader);
        self
    }

    pub fn with_members<I: IntoIterator<Item = SubjectId>>(mut self, members: I) -> Self {
        self.group_members.extend(members);
        self
    }

    pub fn is_owner(&self, subject: SubjectId) -> bool {
        self.owner == Some(subject)
    }

    pub fn is_group_leader(&self, subject: SubjectId) -> bool {
        self.group_leader == Some(subject)
    }

    pub fn is_member(&self, subject: SubjectId) -> bool {
        self.group_members.contains(&subject)
    }
}
