//! Aggregate root contract and shared lifecycle book-keeping.
//!
//! An aggregate root is an entity that is additionally a consistency boundary:
//! it owns nested entities, queues domain/integration events, and is the unit
//! the repository loads and saves. Every externally observable mutation on a
//! persisted instance must pass a visa check first; the shared [`RootState`]
//! carries the lifecycle flags those checks depend on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// Lifecycle book-keeping shared by every aggregate root.
///
/// Aggregates embed this by composition and expose it through
/// [`AggregateRoot::root`]. `is_new` is only true during the
/// `get_new_instance` construction window, where visa checks are bypassed for
/// fields that must be set before any permission context exists; it is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootState<Id> {
    id: Id,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Persistence-assigned, read-only from the domain's point of view.
    schema_version: u32,
    is_deleted: bool,
    #[serde(skip, default)]
    is_new: bool,
}

impl<Id> RootState<Id> {
    /// State for a brand-new aggregate inside the construction window.
    pub fn new_transient(id: Id) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            schema_version: 1,
            is_deleted: false,
            is_new: true,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether the current mutation may skip its visa check.
    ///
    /// Only true inside the `get_new_instance` window (e.g. `requestor_id`
    /// must be set before "is this my own ticket" can be answered).
    pub fn bypasses_visa(&self) -> bool {
        self.is_new
    }

    /// Reject any mutation of a soft-deleted aggregate.
    pub fn ensure_mutable(&self) -> DomainResult<()> {
        if self.is_deleted {
            Err(DomainError::structural("aggregate is deleted"))
        } else {
            Ok(())
        }
    }

    /// Close the construction window; the instance now behaves as persisted.
    pub fn finish_new(&mut self) {
        self.is_new = false;
    }

    /// Record a successful mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Soft-delete marker. Further mutation is rejected by `ensure_mutable`.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.updated_at = Utc::now();
    }
}

/// Aggregate root: entity + consistency boundary + event source.
pub trait AggregateRoot: Entity {
    /// Domain/integration event type this aggregate queues.
    type Event: Clone + core::fmt::Debug;

    /// Shared lifecycle state.
    fn root(&self) -> &RootState<Self::Id>;

    /// Hook invoked by the unit of work after diff detection.
    ///
    /// Must append exactly one `Updated`-kind event when `modified` is true
    /// and the aggregate is not deleted; nothing otherwise. The delete path
    /// raises its own event.
    fn on_save(&mut self, modified: bool);

    /// Hand the queued events to the unit of work. Called strictly after a
    /// successful commit; the queue is empty afterwards.
    fn drain_events(&mut self) -> Vec<Self::Event>;
}
