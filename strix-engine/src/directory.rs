//! Identity/organization directory seam
//!
//! The engine only needs one fact about a user: which organization they
//! belong to, and who owns it. The concrete directory (LDAP, the web
//! application's user tables, ...) lives outside the core.

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// A user's organization membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub organization: Uuid,
    /// The organization owner; org-scoped parameter values are attributed
    /// to this user
    pub owner: Uuid,
}

/// Membership lookup
pub trait Directory: Send + Sync {
    /// `None` when the user belongs to no organization
    fn membership(&self, user: Uuid) -> Option<Membership>;
}

/// In-memory directory, also the test double
#[derive(Default)]
pub struct StaticDirectory {
    memberships: RwLock<HashMap<Uuid, Membership>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll `user` into `organization` owned by `owner`
    pub fn enroll(&self, user: Uuid, organization: Uuid, owner: Uuid) {
        self.memberships
            .write()
            .expect("directory lock poisoned")
            .insert(
                user,
                Membership {
                    organization,
                    owner,
                },
            );
    }

    pub fn remove(&self, user: Uuid) {
        self.memberships
            .write()
            .expect("directory lock poisoned")
            .remove(&user);
    }
}

impl Directory for StaticDirectory {
    fn membership(&self, user: Uuid) -> Option<Membership> {
        self.memberships
            .read()
            .expect("directory lock poisoned")
            .get(&user)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_and_lookup() {
        let directory = StaticDirectory::new();
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let owner = Uuid::new_v4();

        assert_eq!(directory.membership(user), None);
        directory.enroll(user, org, owner);
        let membership = directory.membership(user).expect("enrolled");
        assert_eq!(membership.organization, org);
        assert_eq!(membership.owner, owner);

        directory.remove(user);
        assert_eq!(directory.membership(user), None);
    }
}
