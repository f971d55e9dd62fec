//! Community bounded context: Community, Member, and Role aggregates.
//!
//! Pure domain logic: no IO, no transport, no storage. Every mutation on a
//! persisted aggregate passes a visa check derived from the caller's
//! passport before taking effect.

pub mod community;
pub mod member;
pub mod role;

pub use community::{
    Community, CommunityDomain, CommunityEvent, CommunityHandle, CommunityName, CommunityProps,
};
pub use member::{
    AccountStatus, Member, MemberAccount, MemberAccountId, MemberEvent, MemberName, MemberProps,
};
pub use role::{Role, RoleEvent, RoleName, RoleProps};
