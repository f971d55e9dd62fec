//! Staff actor: administrative back-office users.

use crate::passport::{
    CommunityPassport, CommunityRefs, MemberRefs, Passport, PropertyPassport, PropertyRefs,
    TicketPassport, TicketRefs,
};
use crate::permissions::{CommunityPermissions, PropertyPermissions, TicketPermissions};
use crate::visa::Visa;

/// Passport for staff users.
///
/// Staff carry a fixed administrative permission set per context (full
/// ticket and property management) independent of any community-scoped
/// role. Community-context snapshots are granted but all-false: staff are
/// authenticated (unlike guests) yet hold no community management rights.
#[derive(Debug, Clone, Default)]
pub struct StaffPassport {
    ticket_context: StaffTicketPassport,
}

impl StaffPassport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
struct StaffTicketPassport;

impl TicketPassport for StaffTicketPassport {
    fn for_ticket(&self, _refs: &TicketRefs) -> Visa<TicketPermissions> {
        Visa::Grant(TicketPermissions {
            can_manage_tickets: true,
            can_assign_tickets: true,
            can_work_on_tickets: true,
            ..Default::default()
        })
    }
}

impl CommunityPassport for StaffPassport {
    fn for_community(&self, _refs: &CommunityRefs) -> Visa<CommunityPermissions> {
        Visa::Grant(CommunityPermissions::default())
    }

    fn for_member(&self, _refs: &MemberRefs) -> Visa<CommunityPermissions> {
        Visa::Grant(CommunityPermissions::default())
    }
}

impl PropertyPassport for StaffPassport {
    fn for_property(&self, _refs: &PropertyRefs) -> Visa<PropertyPermissions> {
        Visa::Grant(PropertyPermissions {
            can_manage_properties: true,
            ..Default::default()
        })
    }
}

impl Passport for StaffPassport {
    fn community(&self) -> &dyn CommunityPassport {
        self
    }

    fn property(&self) -> &dyn PropertyPassport {
        self
    }

    fn service(&self) -> &dyn TicketPassport {
        &self.ticket_context
    }

    fn case(&self) -> &dyn TicketPassport {
        &self.ticket_context
    }
}

#[cfg(test)]
mod tests {
    use strata_core::CommunityId;

    use super::StaffPassport;
    use crate::passport::{CommunityRefs, Passport, TicketRefs};

    #[test]
    fn staff_manage_tickets_in_any_community() {
        let passport = StaffPassport::new();
        let refs = TicketRefs {
            community_id: CommunityId::new(),
            requestor_id: None,
            assigned_to_id: None,
        };

        let visa = passport.case().for_ticket(&refs);
        assert!(visa.determine_if(|p| p.can_manage_tickets && p.can_assign_tickets));
        assert!(!visa.determine_if(|p| p.is_system_account));
    }

    #[test]
    fn staff_hold_no_community_management_rights() {
        let passport = StaffPassport::new();
        let refs = CommunityRefs {
            community_id: CommunityId::new(),
        };

        let visa = passport.community().for_community(&refs);
        // Authenticated, so the trivially-true predicate passes (unlike guest)
        // while no management flag is set.
        assert!(visa.determine_if(|_| true));
        assert!(!visa.determine_if(|p| p.can_manage_community_settings));
    }
}
