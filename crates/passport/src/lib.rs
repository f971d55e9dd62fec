//! `strata-passport`: the passport/visa authorization kernel.
//!
//! A **passport** is the process/request-scoped actor context: one per unit of
//! work execution, handing out per-bounded-context visa factories. A **visa**
//! is a capability evaluator computed for one specific aggregate instance; it
//! freezes a permission snapshot for the current actor and answers yes/no to
//! permission predicates.
//!
//! One passport implementation exists per actor class:
//! - [`GuestPassport`]: every visa denies every predicate
//! - [`MemberPassport`]: role-grant resolution plus ownership-relative flags
//! - [`SystemPassport`]: explicit permission-override bag for trusted callers
//! - [`StaffPassport`]: fixed administrative set, independent of community roles

pub mod guest;
pub mod member;
pub mod passport;
pub mod permissions;
pub mod resolver;
pub mod staff;
pub mod system;
pub mod visa;

pub use guest::GuestPassport;
pub use member::MemberPassport;
pub use passport::{
    CommunityPassport, CommunityRefs, MemberRefs, Passport, PropertyPassport, PropertyRefs,
    TicketPassport, TicketRefs,
};
pub use permissions::{
    CommunityGrants, CommunityPermissions, PropertyGrants, PropertyPermissions, RoleGrants,
    TicketGrants, TicketPermissions,
};
pub use resolver::{RoleGrantResolver, StaticRoleResolver};
pub use staff::StaffPassport;
pub use system::{SystemPassport, SystemPermissionBag};
pub use visa::Visa;
