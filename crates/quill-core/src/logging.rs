//! Structured logging field names.
//!
//! This module documents the field vocabulary rather than enforcing it:
//! `tracing` field names must be literals at the call site, so emitting code
//! writes `subsystem = "db"` directly. Keep new call sites and this list in
//! sync so log aggregation tools can query by the same names across
//! subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

/// Correlation ID propagated through a request. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event. Values: "api", "db", "storage".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem, e.g. "pool", "sections", "planning".
pub const COMPONENT: &str = "component";

/// Logical operation name, e.g. "replace_outline", "toggle_task".
pub const OPERATION: &str = "op";

/// Owner user UUID the operation is scoped to.
pub const USER_ID: &str = "user_id";

/// Section UUID being operated on.
pub const SECTION_ID: &str = "section_id";

/// Phase UUID being operated on.
pub const PHASE_ID: &str = "phase_id";

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows or entities affected.
pub const COUNT: &str = "count";

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
