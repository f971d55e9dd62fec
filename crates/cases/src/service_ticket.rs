use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use strata_core::{
    AggregateRoot, CommunityId, DomainError, DomainResult, Entity, MemberId, PropertyId,
    RootState, TicketId, bounded_number, bounded_string,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{Passport, TicketPermissions, TicketRefs, Visa};

use crate::activity::{ActivityDescription, ActivityDetail, ActivityType};

bounded_string!(pub Title, min = 5, max = 200);
bounded_string!(pub Description, min = 0, max = 2000);
bounded_number!(
    /// 1 = most urgent, 5 = least.
    pub Priority(i64), min = 1, max = 5
);

/// Service-ticket lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceTicketStatus {
    Draft,
    Submitted,
    Assigned,
    InProgress,
    Completed,
    Closed,
}

impl ServiceTicketStatus {
    /// Structural validity of a transition, before any permission question.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ServiceTicketStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Draft)
                | (Submitted, Assigned)
                | (Assigned, Submitted)
                | (Assigned, InProgress)
                | (InProgress, Assigned)
                | (InProgress, Completed)
                | (Completed, InProgress)
                | (Completed, Closed)
        )
    }

    fn activity_type(self) -> ActivityType {
        use ServiceTicketStatus::*;
        match self {
            Draft => ActivityType::Note,
            Submitted => ActivityType::Submitted,
            Assigned => ActivityType::Assigned,
            InProgress => ActivityType::InProgress,
            Completed => ActivityType::Completed,
            Closed => ActivityType::Closed,
        }
    }
}

impl core::fmt::Display for ServiceTicketStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ServiceTicketStatus::Draft => "DRAFT",
            ServiceTicketStatus::Submitted => "SUBMITTED",
            ServiceTicketStatus::Assigned => "ASSIGNED",
            ServiceTicketStatus::InProgress => "INPROGRESS",
            ServiceTicketStatus::Completed => "COMPLETED",
            ServiceTicketStatus::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Aggregate root: a maintenance/service request raised by a member.
///
/// The visa is computed lazily per instance and requires the owning
/// community reference to exist first, since ownership-relative permissions
/// cannot be answered for an orphan ticket.
#[derive(Debug, Clone)]
pub struct ServiceTicket {
    root: RootState<TicketId>,
    community_id: Option<CommunityId>,
    property_id: Option<PropertyId>,
    requestor_id: Option<MemberId>,
    assigned_to_id: Option<MemberId>,
    title: Title,
    description: Option<Description>,
    priority: Priority,
    status: ServiceTicketStatus,
    activity_log: Vec<ActivityDetail>,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<TicketPermissions>>,
    events: EventQueue<ServiceTicketEvent>,
}

impl ServiceTicket {
    /// Creation factory.
    ///
    /// Runs inside the `is_new` window: `community_id` and `requestor_id`
    /// must be set before any visa exists, so the accessors used here bypass
    /// permission checks. The window closes before the instance is returned.
    pub fn get_new_instance(
        passport: Arc<dyn Passport>,
        community_id: CommunityId,
        requestor_id: MemberId,
        title: Title,
        priority: Priority,
    ) -> DomainResult<Self> {
        let mut ticket = Self {
            root: RootState::new_transient(TicketId::new()),
            community_id: None,
            property_id: None,
            requestor_id: None,
            assigned_to_id: None,
            title,
            description: None,
            priority,
            status: ServiceTicketStatus::Draft,
            activity_log: Vec::new(),
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        };
        ticket.set_community(community_id)?;
        ticket.set_requestor(requestor_id)?;
        ticket
            .activity_log
            .push(ActivityDetail::new(ActivityType::Created, None, Some(requestor_id)));
        ticket.events.push(ServiceTicketEvent::Created(ServiceTicketCreated {
            ticket_id: *ticket.root.id(),
            community_id,
            requestor_id,
            occurred_at: Utc::now(),
        }));
        ticket.root.finish_new();
        Ok(ticket)
    }

    pub fn from_props(props: ServiceTicketProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            community_id: props.community_id,
            property_id: props.property_id,
            requestor_id: props.requestor_id,
            assigned_to_id: props.assigned_to_id,
            title: props.title,
            description: props.description,
            priority: props.priority,
            status: props.status,
            activity_log: props.activity_log,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> ServiceTicketProps {
        ServiceTicketProps {
            root: self.root.clone(),
            community_id: self.community_id,
            property_id: self.property_id,
            requestor_id: self.requestor_id,
            assigned_to_id: self.assigned_to_id,
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
            activity_log: self.activity_log.clone(),
        }
    }

    pub fn community_id(&self) -> Option<CommunityId> {
        self.community_id
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn requestor_id(&self) -> Option<MemberId> {
        self.requestor_id
    }

    pub fn assigned_to_id(&self) -> Option<MemberId> {
        self.assigned_to_id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> ServiceTicketStatus {
        self.status
    }

    /// Read-only view; entries are appended only by the owner's methods.
    pub fn activity_log(&self) -> &[ActivityDetail] {
        &self.activity_log
    }

    pub fn pending_events(&self) -> &[ServiceTicketEvent] {
        self.events.as_slice()
    }

    /// Lazy per-instance visa with a structural precondition: the owning
    /// community reference must exist before permissions can be evaluated.
    fn visa(&self) -> DomainResult<&Visa<TicketPermissions>> {
        if let Some(visa) = self.visa.get() {
            return Ok(visa);
        }
        let community_id = self.community_id.ok_or_else(|| {
            DomainError::structural("ticket has no owning community; permissions unavailable")
        })?;
        let refs = TicketRefs {
            community_id,
            requestor_id: self.requestor_id,
            assigned_to_id: self.assigned_to_id,
        };
        Ok(self
            .visa
            .get_or_init(|| self.passport.service().for_ticket(&refs)))
    }

    fn guard(
        &self,
        field: &'static str,
        predicate: fn(&TicketPermissions) -> bool,
    ) -> DomainResult<()> {
        self.root.ensure_mutable()?;
        if self.root.bypasses_visa() {
            return Ok(());
        }
        if self.visa()?.determine_if(predicate) {
            Ok(())
        } else {
            Err(DomainError::permission(field))
        }
    }

    fn editor(p: &TicketPermissions) -> bool {
        p.is_system_account
            || p.can_manage_tickets
            || (p.can_create_tickets && p.is_editing_own_ticket)
    }

    /// Only assignable inside the creation window; the owning community is
    /// fixed for the ticket's lifetime.
    fn set_community(&mut self, community_id: CommunityId) -> DomainResult<()> {
        if !self.root.bypasses_visa() {
            return Err(DomainError::structural(
                "ticket community cannot change after creation",
            ));
        }
        self.community_id = Some(community_id);
        Ok(())
    }

    /// Only assignable inside the creation window.
    fn set_requestor(&mut self, requestor_id: MemberId) -> DomainResult<()> {
        if !self.root.bypasses_visa() {
            return Err(DomainError::structural(
                "ticket requestor cannot change after creation",
            ));
        }
        self.requestor_id = Some(requestor_id);
        Ok(())
    }

    pub fn set_title(&mut self, title: Title) -> DomainResult<()> {
        self.guard("ticket.title", Self::editor)?;
        self.title = title;
        self.root.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<Description>) -> DomainResult<()> {
        self.guard("ticket.description", Self::editor)?;
        self.description = description;
        self.root.touch();
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) -> DomainResult<()> {
        self.guard("ticket.priority", Self::editor)?;
        self.priority = priority;
        self.root.touch();
        Ok(())
    }

    pub fn set_property(&mut self, property_id: Option<PropertyId>) -> DomainResult<()> {
        self.guard("ticket.property", Self::editor)?;
        self.property_id = property_id;
        self.root.touch();
        Ok(())
    }

    /// Assign or clear the working member. Does not transition state.
    pub fn set_assigned_to(&mut self, assigned_to_id: Option<MemberId>) -> DomainResult<()> {
        self.guard("ticket.assigned_to", |p| {
            p.is_system_account || p.can_manage_tickets || p.can_assign_tickets
        })?;
        self.assigned_to_id = assigned_to_id;
        self.root.touch();
        Ok(())
    }

    /// Move the ticket through its state machine.
    ///
    /// Invalid edges are structural errors; valid edges are gated by a
    /// per-target permission predicate. Every applied transition appends one
    /// activity-log entry.
    pub fn request_state_transition(
        &mut self,
        next: ServiceTicketStatus,
        activity_by: Option<MemberId>,
        note: Option<ActivityDescription>,
    ) -> DomainResult<()> {
        self.root.ensure_mutable()?;
        if !self.status.can_transition_to(next) {
            return Err(DomainError::structural(format!(
                "invalid ticket transition {} -> {}",
                self.status, next
            )));
        }

        let allowed: fn(&TicketPermissions) -> bool = match next {
            ServiceTicketStatus::Draft | ServiceTicketStatus::Submitted => Self::editor,
            ServiceTicketStatus::Assigned => |p| {
                p.is_system_account || p.can_manage_tickets || p.can_assign_tickets
            },
            ServiceTicketStatus::InProgress | ServiceTicketStatus::Completed => |p| {
                p.is_system_account
                    || p.can_manage_tickets
                    || (p.can_work_on_tickets && p.is_editing_assigned_ticket)
            },
            ServiceTicketStatus::Closed => |p| p.is_system_account || p.can_manage_tickets,
        };
        if !self.visa()?.determine_if(allowed) {
            return Err(DomainError::permission("ticket.status"));
        }

        self.status = next;
        self.activity_log
            .push(ActivityDetail::new(next.activity_type(), note, activity_by));
        self.root.touch();
        Ok(())
    }

    /// Append a free-text note to the activity log.
    pub fn request_add_activity(
        &mut self,
        note: ActivityDescription,
        activity_by: Option<MemberId>,
    ) -> DomainResult<()> {
        self.guard("ticket.activity", |p| {
            p.is_system_account
                || p.can_manage_tickets
                || p.can_work_on_tickets
                || p.is_editing_own_ticket
        })?;
        self.activity_log
            .push(ActivityDetail::new(ActivityType::Note, Some(note), activity_by));
        self.root.touch();
        Ok(())
    }

    pub fn request_delete(&mut self) -> DomainResult<()> {
        if self.root.is_deleted() {
            return Ok(());
        }
        if !self
            .visa()?
            .determine_if(|p| p.is_system_account || p.can_manage_tickets)
        {
            return Err(DomainError::permission("ticket.delete"));
        }
        self.root.mark_deleted();
        self.events.push(ServiceTicketEvent::Deleted(ServiceTicketDeleted {
            ticket_id: *self.root.id(),
            occurred_at: Utc::now(),
        }));
        Ok(())
    }
}

impl Entity for ServiceTicket {
    type Id = TicketId;

    fn id(&self) -> &TicketId {
        self.root.id()
    }
}

impl AggregateRoot for ServiceTicket {
    type Event = ServiceTicketEvent;

    fn root(&self) -> &RootState<TicketId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events.push(ServiceTicketEvent::Updated(ServiceTicketUpdated {
                ticket_id: *self.root.id(),
                occurred_at: Utc::now(),
            }));
        }
    }

    fn drain_events(&mut self) -> Vec<ServiceTicketEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a service ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTicketProps {
    #[serde(flatten)]
    pub root: RootState<TicketId>,
    pub community_id: Option<CommunityId>,
    pub property_id: Option<PropertyId>,
    pub requestor_id: Option<MemberId>,
    pub assigned_to_id: Option<MemberId>,
    pub title: Title,
    pub description: Option<Description>,
    pub priority: Priority,
    pub status: ServiceTicketStatus,
    pub activity_log: Vec<ActivityDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTicketCreated {
    pub ticket_id: TicketId,
    pub community_id: CommunityId,
    pub requestor_id: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTicketUpdated {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTicketDeleted {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceTicketEvent {
    Created(ServiceTicketCreated),
    Updated(ServiceTicketUpdated),
    Deleted(ServiceTicketDeleted),
}

impl DomainEvent for ServiceTicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ServiceTicketEvent::Created(_) => "service.ticket.created",
            ServiceTicketEvent::Updated(_) => "service.ticket.updated",
            ServiceTicketEvent::Deleted(_) => "service.ticket.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ServiceTicketEvent::Created(e) => e.occurred_at,
            ServiceTicketEvent::Updated(e) => e.occurred_at,
            ServiceTicketEvent::Deleted(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::RoleId;
    use strata_passport::{
        MemberPassport, RoleGrants, StaffPassport, StaticRoleResolver, SystemPassport,
        SystemPermissionBag, TicketGrants,
    };

    use super::*;

    fn member_passport(
        member_id: MemberId,
        community_id: CommunityId,
        grants: TicketGrants,
    ) -> Arc<dyn Passport> {
        let role_id = RoleId::new();
        let resolver = StaticRoleResolver::new().with_role(
            role_id,
            RoleGrants {
                service: grants,
                ..Default::default()
            },
        );
        Arc::new(MemberPassport::new(
            member_id,
            community_id,
            role_id,
            Arc::new(resolver),
        ))
    }

    fn creator_grants() -> TicketGrants {
        TicketGrants {
            can_create_tickets: true,
            ..Default::default()
        }
    }

    fn new_ticket(passport: Arc<dyn Passport>, community_id: CommunityId, requestor: MemberId) -> ServiceTicket {
        ServiceTicket::get_new_instance(
            passport,
            community_id,
            requestor,
            Title::new("Broken gate latch").unwrap(),
            Priority::new(3).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn requestor_edits_own_ticket_other_member_cannot() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let m2 = MemberId::new();

        let ticket = new_ticket(
            member_passport(m1, community_id, creator_grants()),
            community_id,
            m1,
        );
        let props = ticket.to_props();

        let mut as_m1 = ServiceTicket::from_props(
            props.clone(),
            member_passport(m1, community_id, creator_grants()),
        );
        as_m1.set_title(Title::new("new title").unwrap()).unwrap();
        assert_eq!(as_m1.title().value(), "new title");

        let mut as_m2 = ServiceTicket::from_props(
            props,
            member_passport(m2, community_id, creator_grants()),
        );
        let err = as_m2.set_title(Title::new("new title").unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
        assert_eq!(as_m2.title().value(), "Broken gate latch");
    }

    #[test]
    fn creation_logs_activity_and_queues_one_event() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let ticket = new_ticket(
            member_passport(m1, community_id, creator_grants()),
            community_id,
            m1,
        );

        assert_eq!(ticket.status(), ServiceTicketStatus::Draft);
        assert_eq!(ticket.activity_log().len(), 1);
        assert_eq!(ticket.activity_log()[0].activity_type(), ActivityType::Created);
        assert_eq!(ticket.pending_events().len(), 1);
        assert!(!ticket.root().is_new());
    }

    #[test]
    fn owner_submits_then_staff_assign_and_close() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let ticket = new_ticket(
            member_passport(m1, community_id, creator_grants()),
            community_id,
            m1,
        );
        let props = ticket.to_props();

        let mut as_owner = ServiceTicket::from_props(
            props,
            member_passport(m1, community_id, creator_grants()),
        );
        as_owner
            .request_state_transition(ServiceTicketStatus::Submitted, Some(m1), None)
            .unwrap();

        let mut as_staff =
            ServiceTicket::from_props(as_owner.to_props(), Arc::new(StaffPassport::new()));
        let worker = MemberId::new();
        as_staff.set_assigned_to(Some(worker)).unwrap();
        as_staff
            .request_state_transition(ServiceTicketStatus::Assigned, None, None)
            .unwrap();
        as_staff
            .request_state_transition(ServiceTicketStatus::InProgress, None, None)
            .unwrap();
        as_staff
            .request_state_transition(ServiceTicketStatus::Completed, None, None)
            .unwrap();
        as_staff
            .request_state_transition(ServiceTicketStatus::Closed, None, None)
            .unwrap();
        assert_eq!(as_staff.status(), ServiceTicketStatus::Closed);
        // Created + 5 transitions.
        assert_eq!(as_staff.activity_log().len(), 6);
    }

    #[test]
    fn owner_cannot_assign_or_skip_states() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let mut ticket = new_ticket(
            member_passport(m1, community_id, creator_grants()),
            community_id,
            m1,
        );

        let skip = ticket
            .request_state_transition(ServiceTicketStatus::Completed, Some(m1), None)
            .unwrap_err();
        assert!(matches!(skip, DomainError::Structural(_)));

        ticket
            .request_state_transition(ServiceTicketStatus::Submitted, Some(m1), None)
            .unwrap();
        let assign = ticket
            .request_state_transition(ServiceTicketStatus::Assigned, Some(m1), None)
            .unwrap_err();
        assert!(matches!(assign, DomainError::Permission(_)));
    }

    #[test]
    fn work_transitions_require_assignment_to_the_actor() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let worker = MemberId::new();
        let staff_held = new_ticket(Arc::new(StaffPassport::new()), community_id, m1);

        let mut as_staff = ServiceTicket::from_props(
            staff_held.to_props(),
            Arc::new(StaffPassport::new()),
        );
        as_staff
            .request_state_transition(ServiceTicketStatus::Submitted, None, None)
            .unwrap();
        as_staff.set_assigned_to(Some(worker)).unwrap();
        as_staff
            .request_state_transition(ServiceTicketStatus::Assigned, None, None)
            .unwrap();

        let worker_grants = TicketGrants {
            can_work_on_tickets: true,
            ..Default::default()
        };
        let mut as_worker = ServiceTicket::from_props(
            as_staff.to_props(),
            member_passport(worker, community_id, worker_grants.clone()),
        );
        as_worker
            .request_state_transition(ServiceTicketStatus::InProgress, Some(worker), None)
            .unwrap();

        let mut as_bystander = ServiceTicket::from_props(
            as_worker.to_props(),
            member_passport(MemberId::new(), community_id, worker_grants),
        );
        let err = as_bystander
            .request_state_transition(ServiceTicketStatus::Completed, None, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
    }

    #[test]
    fn visa_before_community_reference_is_structural() {
        let mut props = new_ticket(
            Arc::new(SystemPassport::new(SystemPermissionBag::default())),
            CommunityId::new(),
            MemberId::new(),
        )
        .to_props();
        props.community_id = None;

        let mut orphan = ServiceTicket::from_props(
            props,
            Arc::new(SystemPassport::new(SystemPermissionBag::default())),
        );
        let err = orphan.set_title(Title::new("still broken").unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::Structural(_)));
    }

    #[test]
    fn delete_requires_management_and_is_idempotent() {
        let community_id = CommunityId::new();
        let m1 = MemberId::new();
        let mut own = new_ticket(
            member_passport(m1, community_id, creator_grants()),
            community_id,
            m1,
        );
        let err = own.request_delete().unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));

        let mut as_staff =
            ServiceTicket::from_props(own.to_props(), Arc::new(StaffPassport::new()));
        as_staff.request_delete().unwrap();
        as_staff.request_delete().unwrap();
        let deleted: Vec<_> = as_staff
            .pending_events()
            .iter()
            .filter(|e| matches!(e, ServiceTicketEvent::Deleted(_)))
            .collect();
        assert_eq!(deleted.len(), 1);

        let err = as_staff
            .set_description(Some(Description::new("late edit").unwrap()))
            .unwrap_err();
        assert!(matches!(err, DomainError::Structural(_)));
    }
}
