//! Per-aggregate pending-event queue.

/// Append-only queue of events an aggregate has raised but the unit of work
/// has not yet published.
///
/// Aggregates own one of these by composition; only the unit of work drains
/// it, and only after a successful commit. Order is append order.
#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    pending: Vec<E>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Take every queued event, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<E> {
        core::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Read-only view for tests/assertions.
    pub fn as_slice(&self) -> &[E] {
        &self.pending
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::EventQueue;

    #[test]
    fn drain_empties_the_queue_in_append_order() {
        let mut q = EventQueue::new();
        q.push("a");
        q.push("b");
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec!["a", "b"]);
        assert!(q.is_empty());
        assert!(q.drain().is_empty());
    }
}
