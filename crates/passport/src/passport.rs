//! The passport contract: per-actor-class factories of per-context visas.

use strata_core::{CommunityId, MemberId};

use crate::permissions::{CommunityPermissions, PropertyPermissions, TicketPermissions};
use crate::visa::Visa;

/// The fields of a community instance ownership-relative checks compare
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityRefs {
    pub community_id: CommunityId,
}

/// The fields of a member instance ownership-relative checks compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRefs {
    pub community_id: CommunityId,
    pub member_id: MemberId,
}

/// The fields of a property instance ownership-relative checks compare
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRefs {
    pub community_id: CommunityId,
    pub owner_id: Option<MemberId>,
}

/// The fields of a ticket instance ownership-relative checks compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRefs {
    pub community_id: CommunityId,
    pub requestor_id: Option<MemberId>,
    pub assigned_to_id: Option<MemberId>,
}

/// Visa factory for the community context (Community, Member, Role
/// aggregates).
pub trait CommunityPassport {
    fn for_community(&self, refs: &CommunityRefs) -> Visa<CommunityPermissions>;

    fn for_member(&self, refs: &MemberRefs) -> Visa<CommunityPermissions>;
}

/// Visa factory for the property context.
pub trait PropertyPassport {
    fn for_property(&self, refs: &PropertyRefs) -> Visa<PropertyPermissions>;
}

/// Visa factory for a ticket context (service tickets and violation cases use
/// the same shape).
pub trait TicketPassport {
    fn for_ticket(&self, refs: &TicketRefs) -> Visa<TicketPermissions>;
}

/// Request-scoped actor context.
///
/// Exactly one passport per unit-of-work execution. Each accessor returns the
/// visa factory for one bounded context; implementations may build the
/// factory lazily on first access and cache it for the passport's lifetime.
/// The kernel trusts whichever passport it is handed; mapping an
/// authenticated session to the right actor class happens upstream.
pub trait Passport: core::fmt::Debug + Send + Sync {
    fn community(&self) -> &dyn CommunityPassport;

    fn property(&self) -> &dyn PropertyPassport;

    /// Service-ticket context.
    fn service(&self) -> &dyn TicketPassport;

    /// Violation-case context.
    fn case(&self) -> &dyn TicketPassport;
}
