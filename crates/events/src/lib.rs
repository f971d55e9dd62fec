//! `strata-events`: domain/integration event contracts and distribution.
//!
//! Aggregates queue typed events while they mutate; the unit of work drains
//! the queue after a successful commit and publishes envelopes to an event
//! bus. Nothing in this crate persists anything.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod queue;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::DomainEvent;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use queue::EventQueue;
