//! Role-grant resolution backed by the document store.

use strata_community::{Role, RoleProps};
use strata_core::RoleId;
use strata_passport::{RoleGrantResolver, RoleGrants};

use crate::converters::DocumentBacked;
use crate::store::{DocumentSession, DocumentStore};

/// Resolves a member's grants from the committed `roles` collection.
///
/// This is what a [`MemberPassport`] gets injected with in a deployed
/// process; the static resolver stays a test convenience. Lookup failures
/// resolve to `None`, which the passport treats as an all-deny role.
///
/// [`MemberPassport`]: strata_passport::MemberPassport
#[derive(Debug)]
pub struct StoreRoleResolver<St> {
    store: St,
}

impl<St> StoreRoleResolver<St> {
    pub fn new(store: St) -> Self {
        Self { store }
    }
}

impl<St> RoleGrantResolver for StoreRoleResolver<St>
where
    St: DocumentStore + core::fmt::Debug + Send + Sync,
{
    fn grants_for(&self, role_id: &RoleId) -> Option<RoleGrants> {
        let session = match self.store.begin() {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(?err, %role_id, "role lookup failed; resolving to no grants");
                return None;
            }
        };
        let doc = session.find_by_id(Role::COLLECTION, *role_id.as_uuid())?;
        let props: RoleProps = match serde_json::from_value(doc) {
            Ok(props) => props,
            Err(err) => {
                tracing::warn!(?err, %role_id, "stored role is unreadable; resolving to no grants");
                return None;
            }
        };
        if props.root.is_deleted() {
            return None;
        }
        Some(props.grants)
    }
}
