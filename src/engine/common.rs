// src/engine/common.rs
//
// Common utilities shared across engine modules:
// panic containment and the single-retry policy for transient I/O.

use crate::error::{EndcryptError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run a stage, converting a panic into `InternalPanic` so one malformed
/// request can never take down the host.
pub fn run_with_panic_policy<T>(stage: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(stage, %detail, "stage panicked");
            Err(EndcryptError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

pub(crate) fn is_transient_io(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
    )
}

/// Run an I/O operation, retrying once if the first failure is transient.
pub fn retry_transient_io<T>(
    what: &'static str,
    mut op: impl FnMut() -> std::io::Result<T>,
) -> std::io::Result<T> {
    match op() {
        Err(err) if is_transient_io(&err) => {
            tracing::warn!(operation = what, error = %err, "transient I/O error, retrying once");
            op()
        }
        other => other,
    }
}
