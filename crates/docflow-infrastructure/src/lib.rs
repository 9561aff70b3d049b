//! Concrete persistence for the document workflow.
//!
//! Currently one backend: an in-memory table set used by tests and
//! single-instance deployments. The `DocumentStore` trait it implements lives
//! in `docflow-core`.

mod memory_store;

pub use memory_store::InMemoryStore;
