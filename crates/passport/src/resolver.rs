//! Role-grant resolution capability.
//!
//! Member passports need the grants attached to the member's assigned role.
//! That lookup is an explicit injected dependency rather than a hidden
//! global, so there is no process-wide mutable state and tests can supply
//! fixed grant tables.

use std::collections::HashMap;

use strata_core::RoleId;

use crate::permissions::RoleGrants;

/// Maps a role to the grants it carries.
///
/// `None` means the role is unknown; callers treat that as an empty grant
/// set, never as an error.
pub trait RoleGrantResolver: core::fmt::Debug + Send + Sync {
    fn grants_for(&self, role_id: &RoleId) -> Option<RoleGrants>;
}

/// Fixed-table resolver for tests/dev.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleResolver {
    grants: HashMap<RoleId, RoleGrants>,
}

impl StaticRoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role_id: RoleId, grants: RoleGrants) -> Self {
        self.grants.insert(role_id, grants);
        self
    }

    pub fn insert(&mut self, role_id: RoleId, grants: RoleGrants) {
        self.grants.insert(role_id, grants);
    }
}

impl RoleGrantResolver for StaticRoleResolver {
    fn grants_for(&self, role_id: &RoleId) -> Option<RoleGrants> {
        self.grants.get(role_id).cloned()
    }
}
