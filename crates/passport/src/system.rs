//! System actor: trusted background/automated processes with explicit
//! permission overrides.

use crate::passport::{
    CommunityPassport, CommunityRefs, MemberRefs, Passport, PropertyPassport, PropertyRefs,
    TicketPassport, TicketRefs,
};
use crate::permissions::{CommunityPermissions, PropertyPermissions, TicketPermissions};
use crate::visa::Visa;

/// Explicit per-context permission overrides for a system passport.
///
/// Anything not supplied stays `false`, including `is_system_account`, which
/// a trusted caller must opt into like any other flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemPermissionBag {
    pub community: CommunityPermissions,
    pub property: PropertyPermissions,
    pub service: TicketPermissions,
    pub case: TicketPermissions,
}

/// Ticket-context factory handing out one fixed snapshot.
#[derive(Debug, Clone)]
struct SystemTicketPassport {
    permissions: TicketPermissions,
}

impl TicketPassport for SystemTicketPassport {
    fn for_ticket(&self, _refs: &TicketRefs) -> Visa<TicketPermissions> {
        Visa::Grant(self.permissions.clone())
    }
}

/// Passport for trusted internal callers (migrations, schedulers, sagas).
///
/// Visas evaluate predicates directly against the constructor-supplied bag.
/// Instance refs are ignored: ownership-relative flags keep whatever value
/// the bag supplied. The bag is read-only for the passport's lifetime.
#[derive(Debug, Clone)]
pub struct SystemPassport {
    bag: SystemPermissionBag,
    service_context: SystemTicketPassport,
    case_context: SystemTicketPassport,
}

impl SystemPassport {
    pub fn new(bag: SystemPermissionBag) -> Self {
        let service_context = SystemTicketPassport {
            permissions: bag.service.clone(),
        };
        let case_context = SystemTicketPassport {
            permissions: bag.case.clone(),
        };
        Self {
            bag,
            service_context,
            case_context,
        }
    }
}

impl CommunityPassport for SystemPassport {
    fn for_community(&self, _refs: &CommunityRefs) -> Visa<CommunityPermissions> {
        Visa::Grant(self.bag.community.clone())
    }

    fn for_member(&self, _refs: &MemberRefs) -> Visa<CommunityPermissions> {
        Visa::Grant(self.bag.community.clone())
    }
}

impl PropertyPassport for SystemPassport {
    fn for_property(&self, _refs: &PropertyRefs) -> Visa<PropertyPermissions> {
        Visa::Grant(self.bag.property.clone())
    }
}

impl Passport for SystemPassport {
    fn community(&self) -> &dyn CommunityPassport {
        self
    }

    fn property(&self) -> &dyn PropertyPassport {
        self
    }

    fn service(&self) -> &dyn TicketPassport {
        &self.service_context
    }

    fn case(&self) -> &dyn TicketPassport {
        &self.case_context
    }
}

#[cfg(test)]
mod tests {
    use strata_core::CommunityId;

    use super::{SystemPassport, SystemPermissionBag};
    use crate::passport::{Passport, PropertyRefs};
    use crate::permissions::PropertyPermissions;

    fn property_refs() -> PropertyRefs {
        PropertyRefs {
            community_id: CommunityId::new(),
            owner_id: None,
        }
    }

    #[test]
    fn supplied_overrides_hold_and_omitted_fields_default_falsy() {
        let passport = SystemPassport::new(SystemPermissionBag {
            property: PropertyPermissions {
                can_manage_properties: true,
                ..Default::default()
            },
            ..Default::default()
        });

        let visa = passport.property().for_property(&property_refs());
        assert!(visa.determine_if(|p| p.can_manage_properties));
        assert!(!visa.determine_if(|p| p.is_system_account));
    }

    #[test]
    fn contexts_are_independent() {
        let passport = SystemPassport::new(SystemPermissionBag {
            property: PropertyPermissions {
                can_manage_properties: true,
                ..Default::default()
            },
            ..Default::default()
        });

        let ticket_visa = passport.service().for_ticket(&crate::passport::TicketRefs {
            community_id: CommunityId::new(),
            requestor_id: None,
            assigned_to_id: None,
        });
        assert!(!ticket_visa.determine_if(|p| p.can_manage_tickets));
    }
}
