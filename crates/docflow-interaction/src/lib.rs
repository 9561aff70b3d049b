//! Oracle integration layer.
//!
//! This crate holds everything that touches the Potens language-model API:
//! endpoint configuration, prompt construction, lenient response parsing,
//! and the [`PotensApiOracle`] implementation of the core `Oracle` trait.
//! The dialogue logic in `docflow-core` never sees HTTP or prompts.

pub mod config;
pub mod json;
pub mod prompts;

mod potens_oracle;

pub use config::OracleConfig;
pub use potens_oracle::PotensApiOracle;
