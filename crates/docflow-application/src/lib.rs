//! Application services for the document workflow.
//!
//! Wires the dialogue machine and the approval flow to injected `Oracle` and
//! `DocumentStore` implementations. [`ComposeService`] serializes turns per
//! conversation; [`ApprovalService`] drives the reviewer side.

mod approval_service;
mod compose_service;

pub use approval_service::ApprovalService;
pub use compose_service::ComposeService;
