//! Distribution of committed event envelopes.
//!
//! The bus sits strictly after the transaction boundary: by the time an
//! envelope reaches `publish`, the document changes it describes are already
//! durable. Delivery is best-effort and at-least-once; consumers must be
//! idempotent and can rebuild from the store when they miss an envelope.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::envelope::EventEnvelope;

/// Consumer end of one bus subscription.
///
/// Receives a copy of every envelope published after the subscription was
/// created, in publish order.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<EventEnvelope>,
}

impl Subscription {
    pub fn new(receiver: Receiver<EventEnvelope>) -> Self {
        Self { receiver }
    }

    /// Next envelope, if one is already waiting.
    pub fn try_recv(&self) -> Result<EventEnvelope, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Every envelope currently waiting, in publish order.
    pub fn drain(&self) -> Vec<EventEnvelope> {
        let mut received = Vec::new();
        while let Ok(envelope) = self.receiver.try_recv() {
            received.push(envelope);
        }
        received
    }
}

/// Envelope pub/sub seam between the unit of work and consumers.
///
/// The unit of work publishes exactly the envelopes staged during a
/// committed transaction, in staging order. Publish failures surface to the
/// caller; the commit already happened, so republishing is always safe.
pub trait EventBus: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, envelope: EventEnvelope) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription;
}

impl<B> EventBus for Arc<B>
where
    B: EventBus + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, envelope: EventEnvelope) -> Result<(), Self::Error> {
        (**self).publish(envelope)
    }

    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }
}
