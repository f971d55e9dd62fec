//! Unit of work: transaction scope + post-commit event publication.
//!
//! Ordering contract: state commits first, then the envelopes staged during
//! the transaction go to the bus in the order the aggregates queued them. A
//! failed transaction publishes nothing. Publishing is best-effort; the
//! committed documents remain the source of truth, so a consumer that missed
//! an envelope can always resync from the store.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use strata_core::{DomainError, DomainResult};
use strata_events::{DomainEvent, EventBus, EventEnvelope};
use strata_passport::Passport;

use crate::converters::DocumentBacked;
use crate::repository::Repository;
use crate::store::{DocumentSession, DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum UnitOfWorkError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

pub struct UnitOfWork<St, B> {
    store: St,
    bus: B,
    passport: Arc<dyn Passport>,
}

impl<St, B> UnitOfWork<St, B>
where
    St: DocumentStore,
    B: EventBus,
{
    /// A unit of work acts on behalf of one passport; every aggregate loaded
    /// inside its transactions is bound to that actor.
    pub fn new(store: St, bus: B, passport: Arc<dyn Passport>) -> Self {
        Self {
            store,
            bus,
            passport,
        }
    }

    pub fn passport(&self) -> &Arc<dyn Passport> {
        &self.passport
    }

    /// Run `work` against a fresh repository in one transaction.
    ///
    /// `Ok` commits then publishes staged events; `Err` rolls back by
    /// dropping the session, publishing nothing.
    pub fn with_transaction<A, R>(
        &self,
        work: impl FnOnce(&mut Repository<A, St::Session>) -> DomainResult<R>,
    ) -> Result<R, UnitOfWorkError>
    where
        A: DocumentBacked,
        A::Event: DomainEvent + Serialize,
    {
        let session = self.store.begin()?;
        let mut repository = Repository::new(session, Arc::clone(&self.passport));

        match work(&mut repository) {
            Ok(value) => {
                let (session, pending) = repository.into_parts();
                session.commit()?;
                tracing::debug!(
                    aggregate_type = A::AGGREGATE_TYPE,
                    staged = pending.len(),
                    "transaction committed"
                );
                self.publish(pending);
                Ok(value)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Mutate one already-loaded aggregate and save it.
    pub fn with_scoped_transaction<A, R>(
        &self,
        aggregate: &mut A,
        work: impl FnOnce(&mut A) -> DomainResult<R>,
    ) -> Result<R, UnitOfWorkError>
    where
        A: DocumentBacked,
        A::Event: DomainEvent + Serialize,
    {
        self.with_transaction(|repository| {
            let value = work(aggregate)?;
            repository.save(aggregate)?;
            Ok(value)
        })
    }

    /// Load by id, mutate, save. Returns the saved aggregate with the result.
    pub fn with_scoped_transaction_by_id<A, R>(
        &self,
        id: &A::Id,
        work: impl FnOnce(&mut A) -> DomainResult<R>,
    ) -> Result<(A, R), UnitOfWorkError>
    where
        A: DocumentBacked,
        A::Event: DomainEvent + Serialize,
    {
        self.with_transaction(|repository| {
            let mut aggregate = repository.get_by_id(id)?;
            let value = work(&mut aggregate)?;
            repository.save(&mut aggregate)?;
            Ok((aggregate, value))
        })
    }

    fn publish(&self, pending: Vec<EventEnvelope>) {
        for envelope in pending {
            let event_type = envelope.event_type().to_owned();
            if let Err(err) = self.bus.publish(envelope) {
                tracing::warn!(
                    ?err,
                    event_type,
                    "post-commit publish failed; consumers can resync from the store"
                );
            }
        }
    }
}
