//! Entity trait: identity + continuity across state changes.
//!
//! Entities are owned exclusively by the aggregate root (or parent entity)
//! that created them; they never outlive their owner and are never shared
//! across aggregates.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
