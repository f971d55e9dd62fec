use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use strata_core::{
    AggregateRoot, CommunityId, DomainError, DomainResult, Entity, MemberId, RootState,
    bounded_string,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{CommunityPermissions, CommunityRefs, Passport, Visa};

bounded_string!(
    /// Display name of a community.
    pub CommunityName, min = 1, max = 200
);
bounded_string!(
    /// URL-safe short handle.
    pub CommunityHandle, min = 1, max = 50
);
bounded_string!(
    /// Custom white-label domain.
    pub CommunityDomain, min = 4, max = 253
);

/// Aggregate root: a community (the tenancy and membership boundary).
#[derive(Debug, Clone)]
pub struct Community {
    root: RootState<CommunityId>,
    name: CommunityName,
    handle: Option<CommunityHandle>,
    white_label_domain: Option<CommunityDomain>,
    created_by: MemberId,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<CommunityPermissions>>,
    events: EventQueue<CommunityEvent>,
}

impl Community {
    /// Creation factory. The instance starts inside the `is_new` window and
    /// leaves it before being returned; a `Created` event is queued.
    pub fn get_new_instance(
        passport: Arc<dyn Passport>,
        name: CommunityName,
        created_by: MemberId,
    ) -> Self {
        let mut community = Self {
            root: RootState::new_transient(CommunityId::new()),
            name,
            handle: None,
            white_label_domain: None,
            created_by,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        };
        community.events.push(CommunityEvent::Created(CommunityCreated {
            community_id: *community.root.id(),
            name: community.name.value().to_string(),
            created_by: community.created_by,
            occurred_at: Utc::now(),
        }));
        community.root.finish_new();
        community
    }

    /// Rehydrate from persisted props. The instance behaves as
    /// persisted-clean: no events, full visa gating.
    pub fn from_props(props: CommunityProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            name: props.name,
            handle: props.handle,
            white_label_domain: props.white_label_domain,
            created_by: props.created_by,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> CommunityProps {
        CommunityProps {
            root: self.root.clone(),
            name: self.name.clone(),
            handle: self.handle.clone(),
            white_label_domain: self.white_label_domain.clone(),
            created_by: self.created_by,
        }
    }

    pub fn name(&self) -> &CommunityName {
        &self.name
    }

    pub fn handle(&self) -> Option<&CommunityHandle> {
        self.handle.as_ref()
    }

    pub fn white_label_domain(&self) -> Option<&CommunityDomain> {
        self.white_label_domain.as_ref()
    }

    pub fn created_by(&self) -> MemberId {
        self.created_by
    }

    /// Pending, not-yet-published events (tests/assertions).
    pub fn pending_events(&self) -> &[CommunityEvent] {
        self.events.as_slice()
    }

    // Computed once per instance; ownership-relative permissions require the
    // instance to exist first.
    fn visa(&self) -> &Visa<CommunityPermissions> {
        self.visa.get_or_init(|| {
            let refs = CommunityRefs {
                community_id: *self.root.id(),
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
            .determine_if(|p| p.is_system_account || p.can_manage_community_settings)
        {
            Ok(())
        } else {
            Err(DomainError::permission(field))
        }
    }

    pub fn set_name(&mut self, name: CommunityName) -> DomainResult<()> {
        self.guard("community.name")?;
        self.name = name;
        self.root.touch();
        Ok(())
    }

    pub fn set_handle(&mut self, handle: Option<CommunityHandle>) -> DomainResult<()> {
        self.guard("community.handle")?;
        self.handle = handle;
        self.root.touch();
        Ok(())
    }

    pub fn set_white_label_domain(
        &mut self,
        domain: Option<CommunityDomain>,
    ) -> DomainResult<()> {
        self.guard("community.white_label_domain")?;
        self.white_label_domain = domain;
        self.root.touch();
        Ok(())
    }

    /// Soft delete. Idempotent: a repeat call is a no-op and does not queue a
    /// second `Deleted` event.
    pub fn request_delete(&mut self) -> DomainResult<()> {
        if self.root.is_deleted() {
            return Ok(());
        }
        if !self
            .visa()
            .determine_if(|p| p.is_system_account || p.can_manage_community_settings)
        {
            return Err(DomainError::permission("community.delete"));
        }
        self.root.mark_deleted();
        self.events.push(CommunityEvent::Deleted(CommunityDeleted {
            community_id: *self.root.id(),
            occurred_at: Utc::now(),
        }));
        Ok(())
    }
}

impl Entity for Community {
    type Id = CommunityId;

    fn id(&self) -> &CommunityId {
        self.root.id()
    }
}

impl AggregateRoot for Community {
    type Event = CommunityEvent;

    fn root(&self) -> &RootState<CommunityId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events.push(CommunityEvent::Updated(CommunityUpdated {
                community_id: *self.root.id(),
                occurred_at: Utc::now(),
            }));
        }
    }

    fn drain_events(&mut self) -> Vec<CommunityEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityProps {
    #[serde(flatten)]
    pub root: RootState<CommunityId>,
    pub name: CommunityName,
    pub handle: Option<CommunityHandle>,
    pub white_label_domain: Option<CommunityDomain>,
    pub created_by: MemberId,
}

/// Event: community created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityCreated {
    pub community_id: CommunityId,
    pub name: String,
    pub created_by: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: community changed (raised by the save hook, once per flush).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityUpdated {
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: community soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityDeleted {
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommunityEvent {
    Created(CommunityCreated),
    Updated(CommunityUpdated),
    Deleted(CommunityDeleted),
}

impl DomainEvent for CommunityEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CommunityEvent::Created(_) => "community.created",
            CommunityEvent::Updated(_) => "community.updated",
            CommunityEvent::Deleted(_) => "community.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CommunityEvent::Created(e) => e.occurred_at,
            CommunityEvent::Updated(e) => e.occurred_at,
            CommunityEvent::Deleted(e) => e.occurred_at,
        }
    }
}
