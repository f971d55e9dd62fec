//! `strata-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy, strongly-typed identifiers, self-validating value
//! objects, and the entity/aggregate-root contracts every bounded context
//! builds on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, RootState};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ValidationError};
pub use id::{CommunityId, MemberId, PropertyId, RoleId, TicketId, UserId};
pub use value_object::{BoundedList, ValueObject};
