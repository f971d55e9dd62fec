//! Member actor: an authenticated end user acting inside one community.

use std::sync::{Arc, OnceLock};

use strata_core::{CommunityId, MemberId, RoleId};

use crate::passport::{
    CommunityPassport, CommunityRefs, MemberRefs, Passport, PropertyPassport, PropertyRefs,
    TicketPassport, TicketRefs,
};
use crate::permissions::{
    CommunityGrants, CommunityPermissions, PropertyGrants, PropertyPermissions, RoleGrants,
    TicketGrants, TicketPermissions,
};
use crate::resolver::RoleGrantResolver;
use crate::visa::Visa;

/// Passport for an authenticated community member.
///
/// Permissions come from the member's assigned role, resolved once through
/// the injected [`RoleGrantResolver`] on first context access and cached for
/// the passport's lifetime. Ownership-relative flags are computed per
/// aggregate instance from the refs handed to the visa factory and frozen
/// into the snapshot.
///
/// Refs naming a different community always produce a denying visa.
#[derive(Debug)]
pub struct MemberPassport {
    member_id: MemberId,
    community_id: CommunityId,
    role_id: RoleId,
    resolver: Arc<dyn RoleGrantResolver>,
    grants: OnceLock<RoleGrants>,
    community_context: OnceLock<MemberCommunityPassport>,
    property_context: OnceLock<MemberPropertyPassport>,
    service_context: OnceLock<MemberTicketPassport>,
    case_context: OnceLock<MemberTicketPassport>,
}

impl MemberPassport {
    pub fn new(
        member_id: MemberId,
        community_id: CommunityId,
        role_id: RoleId,
        resolver: Arc<dyn RoleGrantResolver>,
    ) -> Self {
        Self {
            member_id,
            community_id,
            role_id,
            resolver,
            grants: OnceLock::new(),
            community_context: OnceLock::new(),
            property_context: OnceLock::new(),
            service_context: OnceLock::new(),
            case_context: OnceLock::new(),
        }
    }

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn community_id(&self) -> CommunityId {
        self.community_id
    }

    fn grants(&self) -> &RoleGrants {
        self.grants.get_or_init(|| {
            self.resolver.grants_for(&self.role_id).unwrap_or_else(|| {
                tracing::warn!(role_id = %self.role_id, "role not resolvable; treating as empty grants");
                RoleGrants::default()
            })
        })
    }
}

impl Passport for MemberPassport {
    fn community(&self) -> &dyn CommunityPassport {
        self.community_context.get_or_init(|| MemberCommunityPassport {
            member_id: self.member_id,
            community_id: self.community_id,
            grants: self.grants().community.clone(),
        })
    }

    fn property(&self) -> &dyn PropertyPassport {
        self.property_context.get_or_init(|| MemberPropertyPassport {
            member_id: self.member_id,
            community_id: self.community_id,
            grants: self.grants().property.clone(),
        })
    }

    fn service(&self) -> &dyn TicketPassport {
        self.service_context.get_or_init(|| MemberTicketPassport {
            member_id: self.member_id,
            community_id: self.community_id,
            grants: self.grants().service.clone(),
        })
    }

    fn case(&self) -> &dyn TicketPassport {
        self.case_context.get_or_init(|| MemberTicketPassport {
            member_id: self.member_id,
            community_id: self.community_id,
            grants: self.grants().case.clone(),
        })
    }
}

#[derive(Debug, Clone)]
struct MemberCommunityPassport {
    member_id: MemberId,
    community_id: CommunityId,
    grants: CommunityGrants,
}

impl CommunityPassport for MemberCommunityPassport {
    fn for_community(&self, refs: &CommunityRefs) -> Visa<CommunityPermissions> {
        if refs.community_id != self.community_id {
            return Visa::Deny;
        }
        Visa::Grant(self.grants.to_permissions())
    }

    fn for_member(&self, refs: &MemberRefs) -> Visa<CommunityPermissions> {
        if refs.community_id != self.community_id {
            return Visa::Deny;
        }
        let mut permissions = self.grants.to_permissions();
        permissions.is_editing_own_member_account = refs.member_id == self.member_id;
        Visa::Grant(permissions)
    }
}

#[derive(Debug, Clone)]
struct MemberPropertyPassport {
    member_id: MemberId,
    community_id: CommunityId,
    grants: PropertyGrants,
}

impl PropertyPassport for MemberPropertyPassport {
    fn for_property(&self, refs: &PropertyRefs) -> Visa<PropertyPermissions> {
        if refs.community_id != self.community_id {
            return Visa::Deny;
        }
        let mut permissions = self.grants.to_permissions();
        permissions.is_editing_own_property = refs.owner_id == Some(self.member_id);
        Visa::Grant(permissions)
    }
}

#[derive(Debug, Clone)]
struct MemberTicketPassport {
    member_id: MemberId,
    community_id: CommunityId,
    grants: TicketGrants,
}

impl TicketPassport for MemberTicketPassport {
    fn for_ticket(&self, refs: &TicketRefs) -> Visa<TicketPermissions> {
        if refs.community_id != self.community_id {
            return Visa::Deny;
        }
        let mut permissions = self.grants.to_permissions();
        permissions.is_editing_own_ticket = refs.requestor_id == Some(self.member_id);
        permissions.is_editing_assigned_ticket = refs.assigned_to_id == Some(self.member_id);
        Visa::Grant(permissions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::{CommunityId, MemberId, RoleId};

    use super::MemberPassport;
    use crate::passport::{MemberRefs, Passport, TicketRefs};
    use crate::permissions::{RoleGrants, TicketGrants};
    use crate::resolver::StaticRoleResolver;

    fn resident_grants() -> RoleGrants {
        RoleGrants {
            service: TicketGrants {
                can_create_tickets: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn passport_for(member_id: MemberId, community_id: CommunityId) -> MemberPassport {
        let role_id = RoleId::new();
        let resolver = StaticRoleResolver::new().with_role(role_id, resident_grants());
        MemberPassport::new(member_id, community_id, role_id, Arc::new(resolver))
    }

    #[test]
    fn requestor_gets_ownership_flag_other_members_do_not() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let m2 = MemberId::new();
        let refs = TicketRefs {
            community_id,
            requestor_id: Some(m1),
            assigned_to_id: None,
        };

        let own = passport_for(m1, community_id).service().for_ticket(&refs);
        assert!(own.determine_if(|p| p.can_create_tickets && p.is_editing_own_ticket));

        let other = passport_for(m2, community_id).service().for_ticket(&refs);
        assert!(other.determine_if(|p| p.can_create_tickets));
        assert!(!other.determine_if(|p| p.is_editing_own_ticket));
    }

    #[test]
    fn assigned_ticket_flag_tracks_the_assignee() {
        let community_id = CommunityId::new();
        let assignee = MemberId::new();
        let refs = TicketRefs {
            community_id,
            requestor_id: Some(MemberId::new()),
            assigned_to_id: Some(assignee),
        };

        let visa = passport_for(assignee, community_id).service().for_ticket(&refs);
        assert!(visa.determine_if(|p| p.is_editing_assigned_ticket));
        assert!(!visa.determine_if(|p| p.is_editing_own_ticket));
    }

    #[test]
    fn refs_from_another_community_deny_outright() {
        let member_id = MemberId::new();
        let passport = passport_for(member_id, CommunityId::new());
        let foreign = TicketRefs {
            community_id: CommunityId::new(),
            requestor_id: Some(member_id),
            assigned_to_id: None,
        };

        let visa = passport.service().for_ticket(&foreign);
        assert!(visa.is_deny());
        assert!(!visa.determine_if(|_| true));
    }

    #[test]
    fn unknown_role_means_no_grants_but_ownership_still_computes() {
        let community_id = CommunityId::new();
        let member_id = MemberId::new();
        let passport = MemberPassport::new(
            member_id,
            community_id,
            RoleId::new(),
            Arc::new(StaticRoleResolver::new()),
        );

        let refs = MemberRefs {
            community_id,
            member_id,
        };
        let visa = passport.community().for_member(&refs);
        assert!(visa.determine_if(|p| p.is_editing_own_member_account));
        assert!(!visa.determine_if(|p| p.can_manage_members));
    }
}
