//! Permission-set shapes per bounded context, and the role-grant bundles
//! community roles persist.
//!
//! A *permission set* is what a visa predicate sees: role-derived flags plus
//! instance-relative flags (`is_editing_own_*`) the passport computes against
//! one specific aggregate instance. A *grant* is the role-stored subset: no
//! instance-relative fields, no system flag.

use serde::{Deserialize, Serialize};

/// Permissions for the community context (Community, Member, and Role
/// aggregates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPermissions {
    pub is_system_account: bool,
    pub can_manage_roles_and_permissions: bool,
    pub can_manage_community_settings: bool,
    pub can_manage_members: bool,
    pub can_edit_own_member_profile: bool,
    pub can_edit_own_member_accounts: bool,
    /// Instance-relative: the actor is the member this visa was built for.
    pub is_editing_own_member_account: bool,
}

/// Permissions for the property context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPermissions {
    pub is_system_account: bool,
    pub can_manage_properties: bool,
    pub can_edit_own_property: bool,
    /// Instance-relative: the actor owns the property this visa was built for.
    pub is_editing_own_property: bool,
}

/// Permissions for the service and case (ticket) contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPermissions {
    pub is_system_account: bool,
    pub can_create_tickets: bool,
    pub can_manage_tickets: bool,
    pub can_assign_tickets: bool,
    pub can_work_on_tickets: bool,
    /// Instance-relative: the actor is the ticket's requestor.
    pub is_editing_own_ticket: bool,
    /// Instance-relative: the ticket is assigned to the actor.
    pub is_editing_assigned_ticket: bool,
}

/// Community-context grants a role stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityGrants {
    pub can_manage_roles_and_permissions: bool,
    pub can_manage_community_settings: bool,
    pub can_manage_members: bool,
    pub can_edit_own_member_profile: bool,
    pub can_edit_own_member_accounts: bool,
}

impl CommunityGrants {
    /// Base permission snapshot; instance-relative fields start false.
    pub fn to_permissions(&self) -> CommunityPermissions {
        CommunityPermissions {
            is_system_account: false,
            can_manage_roles_and_permissions: self.can_manage_roles_and_permissions,
            can_manage_community_settings: self.can_manage_community_settings,
            can_manage_members: self.can_manage_members,
            can_edit_own_member_profile: self.can_edit_own_member_profile,
            can_edit_own_member_accounts: self.can_edit_own_member_accounts,
            is_editing_own_member_account: false,
        }
    }
}

/// Property-context grants a role stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGrants {
    pub can_manage_properties: bool,
    pub can_edit_own_property: bool,
}

impl PropertyGrants {
    pub fn to_permissions(&self) -> PropertyPermissions {
        PropertyPermissions {
            is_system_account: false,
            can_manage_properties: self.can_manage_properties,
            can_edit_own_property: self.can_edit_own_property,
            is_editing_own_property: false,
        }
    }
}

/// Ticket-context grants a role stores (service and case alike).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketGrants {
    pub can_create_tickets: bool,
    pub can_manage_tickets: bool,
    pub can_assign_tickets: bool,
    pub can_work_on_tickets: bool,
}

impl TicketGrants {
    pub fn to_permissions(&self) -> TicketPermissions {
        TicketPermissions {
            is_system_account: false,
            can_create_tickets: self.can_create_tickets,
            can_manage_tickets: self.can_manage_tickets,
            can_assign_tickets: self.can_assign_tickets,
            can_work_on_tickets: self.can_work_on_tickets,
            is_editing_own_ticket: false,
            is_editing_assigned_ticket: false,
        }
    }
}

/// Everything a role grants, one bundle per bounded context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrants {
    pub community: CommunityGrants,
    pub property: PropertyGrants,
    pub service: TicketGrants,
    pub case: TicketGrants,
}
