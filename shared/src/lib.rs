//! Shared types and models for the factory ledger
//!
//! Typed records for every ledger relation, the batch state machine and the
//! derived dashboard computations. Nothing in this crate performs I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
