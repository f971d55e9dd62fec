//! Generic repository over a document session.
//!
//! The repository never applies business rules: by the time `save` runs, the
//! aggregate has already enforced its own invariants and permission checks.
//! Its jobs are hydration, dirty detection, and turning queued events into
//! envelopes for post-commit publication.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use strata_core::{DomainError, DomainResult};
use strata_events::{DomainEvent, EventEnvelope};
use strata_passport::Passport;

use crate::converters::DocumentBacked;
use crate::store::DocumentSession;

fn codec(err: serde_json::Error) -> DomainError {
    DomainError::structural(format!("document codec failure: {err}"))
}

pub struct Repository<A, S> {
    session: S,
    passport: Arc<dyn Passport>,
    pending: Vec<EventEnvelope>,
    _aggregate: PhantomData<A>,
}

impl<A, S> Repository<A, S>
where
    A: DocumentBacked,
    A::Event: DomainEvent + Serialize,
    S: DocumentSession,
{
    pub(crate) fn new(session: S, passport: Arc<dyn Passport>) -> Self {
        Self {
            session,
            passport,
            pending: Vec::new(),
            _aggregate: PhantomData,
        }
    }

    pub(crate) fn into_parts(self) -> (S, Vec<EventEnvelope>) {
        (self.session, self.pending)
    }

    pub fn get_by_id(&self, id: &A::Id) -> DomainResult<A> {
        let doc = self
            .session
            .find_by_id(A::COLLECTION, A::uuid_of(id))
            .ok_or_else(DomainError::not_found)?;
        self.hydrate(doc)
    }

    pub fn find_one(&self, predicate: impl Fn(&JsonValue) -> bool) -> DomainResult<Option<A>> {
        match self.session.find_one(A::COLLECTION, &predicate) {
            Some(doc) => Ok(Some(self.hydrate(doc)?)),
            None => Ok(None),
        }
    }

    fn hydrate(&self, doc: JsonValue) -> DomainResult<A> {
        let props = serde_json::from_value(doc).map_err(codec)?;
        Ok(A::from_props(props, Arc::clone(&self.passport)))
    }

    /// Persist the aggregate and stage its events for post-commit publish.
    ///
    /// Dirty detection is a document-level diff against the stored copy, so
    /// `on_save` fires with `modified = true` only when a persisted aggregate
    /// actually changed; first save of a new aggregate publishes its Created
    /// event without an extra Updated.
    pub fn save(&mut self, aggregate: &mut A) -> DomainResult<()> {
        let id = aggregate.document_id();
        let doc = serde_json::to_value(aggregate.to_props()).map_err(codec)?;
        let stored = self.session.find_by_id(A::COLLECTION, id);

        let modified = stored.as_ref().is_some_and(|existing| existing != &doc);
        aggregate.on_save(modified);

        if stored.as_ref() != Some(&doc) {
            self.session.upsert(A::COLLECTION, id, doc);
        }
        self.stage_events(aggregate)
    }

    /// Hard removal. Soft delete is the aggregate's `request_delete` + `save`;
    /// this erases the document entirely.
    pub fn purge(&mut self, aggregate: &mut A) -> DomainResult<()> {
        self.session.delete_by_id(A::COLLECTION, aggregate.document_id());
        self.stage_events(aggregate)
    }

    fn stage_events(&mut self, aggregate: &mut A) -> DomainResult<()> {
        let aggregate_id = aggregate.document_id();
        for event in aggregate.drain_events() {
            let payload = serde_json::to_value(&event).map_err(codec)?;
            self.pending.push(EventEnvelope::new(
                Uuid::now_v7(),
                aggregate_id,
                A::AGGREGATE_TYPE,
                event.event_type(),
                event.version(),
                event.occurred_at(),
                payload,
            ));
        }
        Ok(())
    }
}
