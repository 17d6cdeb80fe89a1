use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{IdentityId, Member};

/// Group whose members may mutate every entity.
pub const ADMIN_GROUP: &str = "Administradores";

/// Authenticated caller, as resolved from the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub identity: IdentityId,
    pub username: String,
    pub groups: BTreeSet<String>,
}

impl Actor {
    pub fn new(identity: IdentityId, username: impl Into<String>) -> Self {
        Self {
            identity,
            username: username.into(),
            groups: BTreeSet::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }
}

/// True when the actor belongs to the administrators group.
pub fn is_admin(actor: &Actor) -> bool {
    actor.groups.contains(ADMIN_GROUP)
}

/// Which member records a lookup may return for a given actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    All,
    Own(IdentityId),
}

impl MemberScope {
    pub fn for_actor(actor: &Actor) -> Self {
        if is_admin(actor) {
            Self::All
        } else {
            Self::Own(actor.identity)
        }
    }

    pub fn admits(&self, member: &Member) -> bool {
        match self {
            MemberScope::All => true,
            MemberScope::Own(identity) => member.identity == *identity,
        }
    }
}
