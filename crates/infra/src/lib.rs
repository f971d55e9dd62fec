//! Persistence and transaction plumbing: document store, repository,
//! unit of work, and the store-backed role resolver.

pub mod converters;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod unit_of_work;

pub use converters::DocumentBacked;
pub use repository::Repository;
pub use resolver::StoreRoleResolver;
pub use store::{
    DocumentSession, DocumentStore, InMemoryDocumentStore, InMemorySession, StoreError,
};
pub use unit_of_work::{UnitOfWork, UnitOfWorkError};

#[cfg(test)]
mod integration_tests;
