//! Canonical schema constants for structured logging and events
//!
//! The logging macros spell these keys literally; tests read events back
//! through the constants.

// Field keys
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_ERR_CODE: &str = "err.code";
/// Present on `end_error` events raised inside a run
pub const FIELD_ERR_RUN_ID: &str = "err.run_id";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
