use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use strata_core::{
    AggregateRoot, CommunityId, DomainError, DomainResult, Entity, RoleId, RootState,
    bounded_string,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{CommunityPermissions, CommunityRefs, Passport, RoleGrants, Visa};

bounded_string!(pub RoleName, min = 1, max = 50);

/// Aggregate root: a community role, a named bundle of permission grants.
///
/// What a role grants is exactly what a [`MemberPassport`] resolves when a
/// member acts under that role, so changing a role here changes what future
/// passports hand out (in-flight visas keep their frozen snapshots).
///
/// [`MemberPassport`]: strata_passport::MemberPassport
#[derive(Debug, Clone)]
pub struct Role {
    root: RootState<RoleId>,
    community_id: CommunityId,
    role_name: RoleName,
    /// The community's fallback role for new members; protected from deletion.
    is_default: bool,
    grants: RoleGrants,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<CommunityPermissions>>,
    events: EventQueue<RoleEvent>,
}

impl Role {
    pub fn get_new_instance(
        passport: Arc<dyn Passport>,
        community_id: CommunityId,
        role_name: RoleName,
        is_default: bool,
    ) -> Self {
        let mut role = Self {
            root: RootState::new_transient(RoleId::new()),
            community_id,
            role_name,
            is_default,
            grants: RoleGrants::default(),
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        };
        role.events.push(RoleEvent::Created(RoleCreated {
            role_id: *role.root.id(),
            community_id,
            occurred_at: Utc::now(),
        }));
        role.root.finish_new();
        role
    }

    pub fn from_props(props: RoleProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            community_id: props.community_id,
            role_name: props.role_name,
            is_default: props.is_default,
            grants: props.grants,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> RoleProps {
        RoleProps {
            root: self.root.clone(),
            community_id: self.community_id,
            role_name: self.role_name.clone(),
            is_default: self.is_default,
            grants: self.grants.clone(),
        }
    }

    pub fn community_id(&self) -> CommunityId {
        self.community_id
    }

    pub fn role_name(&self) -> &RoleName {
        &self.role_name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn grants(&self) -> &RoleGrants {
        &self.grants
    }

    pub fn pending_events(&self) -> &[RoleEvent] {
        self.events.as_slice()
    }

    fn visa(&self) -> &Visa<CommunityPermissions> {
        self.visa.get_or_init(|| {
            let refs = CommunityRefs {
                community_id: self.community_id,
            };
            self.passport.community().for_community(&refs)
        })
    }

    fn guard(&self, field: &'static str) -> DomainResult<()> {
        self.root.ensure_mutable()?;
        if self.root.bypasses_visa() {
            return Ok(());
        }
        if self
            .visa()
            .determine_if(|p| p.is_system_account || p.can_manage_roles_and_permissions)
        {
            Ok(())
        } else {
            Err(DomainError::permission(field))
        }
    }

    pub fn set_role_name(&mut self, role_name: RoleName) -> DomainResult<()> {
        self.guard("role.name")?;
        self.role_name = role_name;
        self.root.touch();
        Ok(())
    }

    pub fn set_grants(&mut self, grants: RoleGrants) -> DomainResult<()> {
        self.guard("role.grants")?;
        self.grants = grants;
        self.root.touch();
        Ok(())
    }

    /// Soft delete. The community's default role can never be deleted.
    pub fn request_delete(&mut self) -> DomainResult<()> {
        if self.root.is_deleted() {
            return Ok(());
        }
        if self.is_default {
            return Err(DomainError::structural("default role cannot be deleted"));
        }
        if !self
            .visa()
            .determine_if(|p| p.is_system_account || p.can_manage_roles_and_permissions)
        {
            return Err(DomainError::permission("role.delete"));
        }
        self.root.mark_deleted();
        self.events.push(RoleEvent::Deleted(RoleDeleted {
            role_id: *self.root.id(),
            community_id: self.community_id,
            occurred_at: Utc::now(),
        }));
        Ok(())
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &RoleId {
        self.root.id()
    }
}

impl AggregateRoot for Role {
    type Event = RoleEvent;

    fn root(&self) -> &RootState<RoleId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events.push(RoleEvent::Updated(RoleUpdated {
                role_id: *self.root.id(),
                community_id: self.community_id,
                occurred_at: Utc::now(),
            }));
        }
    }

    fn drain_events(&mut self) -> Vec<RoleEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProps {
    #[serde(flatten)]
    pub root: RootState<RoleId>,
    pub community_id: CommunityId,
    pub role_name: RoleName,
    pub is_default: bool,
    pub grants: RoleGrants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCreated {
    pub role_id: RoleId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleUpdated {
    pub role_id: RoleId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDeleted {
    pub role_id: RoleId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoleEvent {
    Created(RoleCreated),
    Updated(RoleUpdated),
    Deleted(RoleDeleted),
}

impl DomainEvent for RoleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RoleEvent::Created(_) => "community.role.created",
            RoleEvent::Updated(_) => "community.role.updated",
            RoleEvent::Deleted(_) => "community.role.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RoleEvent::Created(e) => e.occurred_at,
            RoleEvent::Updated(e) => e.occurred_at,
            RoleEvent::Deleted(e) => e.occurred_at,
        }
    }
}
