//! Core types shared across snapcopy crates
//!
//! - **Correlation types**: RunId, RunContext
//! - **Schema constants**: Canonical field keys and event names for structured logs

pub mod correlation;
pub mod schema;

pub use correlation::{RunContext, RunId};
