//! Operation boundary events
//!
//! `load`, `persist`, `with_transaction` and `open_store` each emit one
//! `start` event and then one `end` or `end_error` event carrying the same
//! `op`. The three public macros share one expansion, `__deck_op_event`,
//! so every boundary event has the same leading fields:
//!
//! | field       | value                                    |
//! |-------------|------------------------------------------|
//! | `component` | module path of the caller                |
//! | `op`        | operation name                           |
//! | `event`     | `start`, `end` or `end_error`            |
//!
//! End events add `duration_ms`; error events add `err_kind` and `err_code`.

#[doc(hidden)]
#[macro_export]
macro_rules! __deck_op_event {
    ($level:ident, $event:ident, $op:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::$event,
            $($($field)*)?
        )
    };
}

/// Emit the `start` event of an operation
///
/// ```
/// # use deckstore_core::log_op_start;
/// log_op_start!("load", reference = "tip");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__deck_op_event!(info, EVENT_START, $op $(, $($field)*)?)
    };
}

/// Emit the `end` event of an operation; `duration_ms` comes first
///
/// ```
/// # use deckstore_core::log_op_end;
/// log_op_end!("persist", duration_ms = 3, rid = 7, uuid = "ab12");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__deck_op_event!(
            info,
            EVENT_END,
            $op,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Emit the `end_error` event of an operation
///
/// The error is consumed through `Into<ExError>`.
///
/// ```
/// # use deckstore_core::log_op_error;
/// # use deckstore_core::errors::DeckError;
/// let missing = DeckError::ArtifactNotFound { reference: "trunk".to_string() };
/// log_op_error!("load", missing, duration_ms = 1, reference = "trunk");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = $err.into();
        $crate::__deck_op_event!(
            error,
            EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code()
            $(, $($field)*)?
        )
    }};
}
