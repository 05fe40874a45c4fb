//! Command orchestration layer.
//!
//! `run` composes the core steps for one replication run; `replicate` is the
//! copy state machine it calls when the decision says a copy is needed.

pub mod replicate;
pub mod run;
