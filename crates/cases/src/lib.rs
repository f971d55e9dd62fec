//! Cases bounded context: service tickets and violation tickets.
//!
//! Both aggregates share the activity-log entity and the lazy, structurally
//! guarded visa pattern: a ticket must reference its owning community before
//! any permission can be evaluated.

pub mod activity;
pub mod service_ticket;
pub mod violation_ticket;

pub use activity::{ActivityDescription, ActivityDetail, ActivityDetailId, ActivityType};
pub use service_ticket::{
    Description, Priority, ServiceTicket, ServiceTicketEvent, ServiceTicketProps, ServiceTicketStatus,
    Title,
};
pub use violation_ticket::{
    PenaltyCents, ViolationTicket, ViolationTicketEvent, ViolationTicketProps,
    ViolationTicketStatus,
};
