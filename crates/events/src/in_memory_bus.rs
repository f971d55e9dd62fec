//! Single-process envelope bus for tests and development.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};
use crate::envelope::EventEnvelope;

#[derive(Debug)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned by a panicking publisher.
    Poisoned,
}

/// Broadcast bus over std mpsc channels.
///
/// Every live subscriber gets its own copy of each envelope. A subscriber
/// whose receiving end has been dropped is forgotten by the next publish
/// that reaches it.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    senders: Mutex<Vec<mpsc::Sender<EventEnvelope>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for InMemoryEventBus {
    type Error = InMemoryBusError;

    fn publish(&self, envelope: EventEnvelope) -> Result<(), Self::Error> {
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;
        senders.retain(|sender| sender.send(envelope.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        // A poisoned list cannot register the sender; the subscription stays
        // valid but will never see an envelope.
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(sender);
        }
        Subscription::new(receiver)
    }
}
