//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the logging macros,
//! the transaction layer and test assertions.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Artifact identifiers
pub const FIELD_RID: &str = "rid";
pub const FIELD_UUID: &str = "uuid";
pub const FIELD_ARTIFACT_TYPE: &str = "artifact_type";
pub const FIELD_REFERENCE: &str = "reference";

// Transaction state
pub const FIELD_TX_LEVEL: &str = "tx_level";
pub const FIELD_TX_OUTCOME: &str = "tx_outcome";

// Collection sizes
pub const FIELD_CARD_COUNT: &str = "card_count";
pub const FIELD_FILE_COUNT: &str = "file_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
