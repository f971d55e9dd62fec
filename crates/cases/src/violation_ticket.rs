use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use strata_core::{
    AggregateRoot, CommunityId, DomainError, DomainResult, Entity, MemberId, PropertyId,
    RootState, TicketId, bounded_number,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{Passport, TicketPermissions, TicketRefs, Visa};

use crate::activity::{ActivityDescription, ActivityDetail, ActivityType};
use crate::service_ticket::{Description, Priority, Title};

bounded_number!(
    /// Monetary penalty in cents; capped at $10,000.
    pub PenaltyCents(i64), min = 0, max = 1_000_000
);

/// Violation-ticket lifecycle states. Unlike service tickets there is no
/// work-in-progress stage; the cited member settles the penalty instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationTicketStatus {
    Draft,
    Submitted,
    Assigned,
    Paid,
    Closed,
}

impl ViolationTicketStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use ViolationTicketStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Draft)
                | (Submitted, Assigned)
                | (Assigned, Submitted)
                | (Assigned, Paid)
                | (Paid, Closed)
        )
    }

    fn activity_type(self) -> ActivityType {
        use ViolationTicketStatus::*;
        match self {
            Draft => ActivityType::Note,
            Submitted => ActivityType::Submitted,
            Assigned => ActivityType::Assigned,
            Paid => ActivityType::Paid,
            Closed => ActivityType::Closed,
        }
    }
}

impl core::fmt::Display for ViolationTicketStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ViolationTicketStatus::Draft => "DRAFT",
            ViolationTicketStatus::Submitted => "SUBMITTED",
            ViolationTicketStatus::Assigned => "ASSIGNED",
            ViolationTicketStatus::Paid => "PAID",
            ViolationTicketStatus::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Aggregate root: a rule-violation citation raised against a member.
///
/// Here `assigned_to_id` names the cited member, not a worker; the Paid
/// transition is theirs to make once a penalty amount exists.
#[derive(Debug, Clone)]
pub struct ViolationTicket {
    root: RootState<TicketId>,
    community_id: Option<CommunityId>,
    property_id: Option<PropertyId>,
    requestor_id: Option<MemberId>,
    assigned_to_id: Option<MemberId>,
    title: Title,
    description: Option<Description>,
    priority: Priority,
    penalty_amount: Option<PenaltyCents>,
    status: ViolationTicketStatus,
    activity_log: Vec<ActivityDetail>,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<TicketPermissions>>,
    events: EventQueue<ViolationTicketEvent>,
}

impl ViolationTicket {
    /// Creation factory; see [`crate::ServiceTicket::get_new_instance`] for
    /// the creation-window rules shared by both ticket kinds.
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
            penalty_amount: None,
            status: ViolationTicketStatus::Draft,
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
        ticket
            .events
            .push(ViolationTicketEvent::Created(ViolationTicketCreated {
                ticket_id: *ticket.root.id(),
                community_id,
                requestor_id,
                occurred_at: Utc::now(),
            }));
        ticket.root.finish_new();
        Ok(ticket)
    }

    pub fn from_props(props: ViolationTicketProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            community_id: props.community_id,
            property_id: props.property_id,
            requestor_id: props.requestor_id,
            assigned_to_id: props.assigned_to_id,
            title: props.title,
            description: props.description,
            priority: props.priority,
            penalty_amount: props.penalty_amount,
            status: props.status,
            activity_log: props.activity_log,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> ViolationTicketProps {
        ViolationTicketProps {
            root: self.root.clone(),
            community_id: self.community_id,
            property_id: self.property_id,
            requestor_id: self.requestor_id,
            assigned_to_id: self.assigned_to_id,
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            penalty_amount: self.penalty_amount,
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

    /// The cited member.
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

    pub fn penalty_amount(&self) -> Option<PenaltyCents> {
        self.penalty_amount
    }

    pub fn status(&self) -> ViolationTicketStatus {
        self.status
    }

    pub fn activity_log(&self) -> &[ActivityDetail] {
        &self.activity_log
    }

    pub fn pending_events(&self) -> &[ViolationTicketEvent] {
        self.events.as_slice()
    }

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
            .get_or_init(|| self.passport.case().for_ticket(&refs)))
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

    fn set_community(&mut self, community_id: CommunityId) -> DomainResult<()> {
        if !self.root.bypasses_visa() {
            return Err(DomainError::structural(
                "ticket community cannot change after creation",
            ));
        }
        self.community_id = Some(community_id);
        Ok(())
    }

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

    /// Cite a member. Only managers set or change who the violation targets.
    pub fn set_assigned_to(&mut self, assigned_to_id: Option<MemberId>) -> DomainResult<()> {
        self.guard("ticket.assigned_to", |p| {
            p.is_system_account || p.can_manage_tickets || p.can_assign_tickets
        })?;
        self.assigned_to_id = assigned_to_id;
        self.root.touch();
        Ok(())
    }

    /// Setting the fine is a management action, not the citing member's.
    pub fn set_penalty_amount(&mut self, amount: Option<PenaltyCents>) -> DomainResult<()> {
        self.guard("ticket.penalty_amount", |p| {
            p.is_system_account || p.can_manage_tickets
        })?;
        self.penalty_amount = amount;
        self.root.touch();
        Ok(())
    }

    /// Move the ticket through its state machine.
    ///
    /// The Paid edge belongs to the cited member and requires a penalty
    /// amount to exist; the rest mirror the service-ticket rules.
    pub fn request_state_transition(
        &mut self,
        next: ViolationTicketStatus,
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
        if next == ViolationTicketStatus::Paid && self.penalty_amount.is_none() {
            return Err(DomainError::structural(
                "violation cannot be paid before a penalty amount is set",
            ));
        }

        let allowed: fn(&TicketPermissions) -> bool = match next {
            ViolationTicketStatus::Draft | ViolationTicketStatus::Submitted => Self::editor,
            ViolationTicketStatus::Assigned => |p| {
                p.is_system_account || p.can_manage_tickets || p.can_assign_tickets
            },
            ViolationTicketStatus::Paid => |p| {
                p.is_system_account || p.can_manage_tickets || p.is_editing_assigned_ticket
            },
            ViolationTicketStatus::Closed => |p| p.is_system_account || p.can_manage_tickets,
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

    pub fn request_add_activity(
        &mut self,
        note: ActivityDescription,
        activity_by: Option<MemberId>,
    ) -> DomainResult<()> {
        self.guard("ticket.activity", |p| {
            p.is_system_account
                || p.can_manage_tickets
                || p.is_editing_own_ticket
                || p.is_editing_assigned_ticket
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
        self.events
            .push(ViolationTicketEvent::Deleted(ViolationTicketDeleted {
                ticket_id: *self.root.id(),
                occurred_at: Utc::now(),
            }));
        Ok(())
    }
}

impl Entity for ViolationTicket {
    type Id = TicketId;

    fn id(&self) -> &TicketId {
        self.root.id()
    }
}

impl AggregateRoot for ViolationTicket {
    type Event = ViolationTicketEvent;

    fn root(&self) -> &RootState<TicketId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events
                .push(ViolationTicketEvent::Updated(ViolationTicketUpdated {
                    ticket_id: *self.root.id(),
                    occurred_at: Utc::now(),
                }));
        }
    }

    fn drain_events(&mut self) -> Vec<ViolationTicketEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a violation ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationTicketProps {
    #[serde(flatten)]
    pub root: RootState<TicketId>,
    pub community_id: Option<CommunityId>,
    pub property_id: Option<PropertyId>,
    pub requestor_id: Option<MemberId>,
    pub assigned_to_id: Option<MemberId>,
    pub title: Title,
    pub description: Option<Description>,
    pub priority: Priority,
    pub penalty_amount: Option<PenaltyCents>,
    pub status: ViolationTicketStatus,
    pub activity_log: Vec<ActivityDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationTicketCreated {
    pub ticket_id: TicketId,
    pub community_id: CommunityId,
    pub requestor_id: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationTicketUpdated {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationTicketDeleted {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolationTicketEvent {
    Created(ViolationTicketCreated),
    Updated(ViolationTicketUpdated),
    Deleted(ViolationTicketDeleted),
}

impl DomainEvent for ViolationTicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ViolationTicketEvent::Created(_) => "violation.ticket.created",
            ViolationTicketEvent::Updated(_) => "violation.ticket.updated",
            ViolationTicketEvent::Deleted(_) => "violation.ticket.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ViolationTicketEvent::Created(e) => e.occurred_at,
            ViolationTicketEvent::Updated(e) => e.occurred_at,
            ViolationTicketEvent::Deleted(e) => e.occurred_at,
        }
    }
}
