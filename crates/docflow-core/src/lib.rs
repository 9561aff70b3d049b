//! Docflow core domain layer.
//!
//! Chat-driven business-document approval: a user describes a request in
//! natural language, the dialogue machine maps it to a document template,
//! collects the template's required fields turn by turn, synthesizes a formal
//! confirmation text, and hands the finished triple (document type, field
//! map, confirmation text) to the store for approval routing.
//!
//! External collaborators are abstracted behind traits: [`oracle::Oracle`]
//! for the language service and [`store::DocumentStore`] for persistence.

pub mod error;
pub mod oracle;
pub mod session;
pub mod store;
pub mod template;

// Re-export common error type
pub use error::DocflowError;
