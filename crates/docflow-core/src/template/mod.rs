//! Template domain module.
//!
//! A template is a named document schema declaring the field keys a document
//! must collect before it can be submitted for approval, plus optional
//! authoring guidance shown to the requester.

mod model;

pub use model::{FieldSpec, Template};
