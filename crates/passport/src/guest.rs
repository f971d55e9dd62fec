//! Guest actor: reads where reads aren't gated, never mutates.

use crate::passport::{
    CommunityPassport, CommunityRefs, MemberRefs, Passport, PropertyPassport, PropertyRefs,
    TicketPassport, TicketRefs,
};
use crate::permissions::{CommunityPermissions, PropertyPermissions, TicketPermissions};
use crate::visa::Visa;

/// Passport for unauthenticated callers.
///
/// Every visa it returns evaluates every predicate to `false`.
#[derive(Debug, Clone, Default)]
pub struct GuestPassport;

impl GuestPassport {
    pub fn new() -> Self {
        Self
    }
}

impl CommunityPassport for GuestPassport {
    fn for_community(&self, _refs: &CommunityRefs) -> Visa<CommunityPermissions> {
        Visa::Deny
    }

    fn for_member(&self, _refs: &MemberRefs) -> Visa<CommunityPermissions> {
        Visa::Deny
    }
}

impl PropertyPassport for GuestPassport {
    fn for_property(&self, _refs: &PropertyRefs) -> Visa<PropertyPermissions> {
        Visa::Deny
    }
}

impl TicketPassport for GuestPassport {
    fn for_ticket(&self, _refs: &TicketRefs) -> Visa<TicketPermissions> {
        Visa::Deny
    }
}

impl Passport for GuestPassport {
    fn community(&self) -> &dyn CommunityPassport {
        self
    }

    fn property(&self) -> &dyn PropertyPassport {
        self
    }

    fn service(&self) -> &dyn TicketPassport {
        self
    }

    fn case(&self) -> &dyn TicketPassport {
        self
    }
}

#[cfg(test)]
mod tests {
    use strata_core::{CommunityId, MemberId};

    use super::GuestPassport;
    use crate::passport::{Passport, TicketRefs};

    #[test]
    fn guest_visas_deny_every_predicate() {
        let passport = GuestPassport::new();
        let refs = TicketRefs {
            community_id: CommunityId::new(),
            requestor_id: Some(MemberId::new()),
            assigned_to_id: None,
        };

        let visa = passport.service().for_ticket(&refs);
        assert!(!visa.determine_if(|_| true));
        assert!(!visa.determine_if(|p| p.can_create_tickets || !p.can_create_tickets));
    }
}
