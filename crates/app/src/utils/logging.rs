use std::time::Duration;

use roundtable_domain::RoundtableError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"applications::submit"`).
/// * `elapsed` - Duration the command execution took.
/// * `success` - Whether the command completed successfully.
///
/// The helper keeps the command wrappers concise and the log shape uniform.
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, success: bool) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, "command_execution_failure");
    }
}

/// Convert a `RoundtableError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &RoundtableError) -> &'static str {
    match error {
        RoundtableError::Database(_) => "database",
        RoundtableError::Config(_) => "config",
        RoundtableError::Network(_) => "network",
        RoundtableError::NotFound(_) => "not_found",
        RoundtableError::Validation(_) => "validation",
        RoundtableError::DuplicateApplication { .. } => "duplicate_application",
        RoundtableError::MeetingFull { .. } => "meeting_full",
        RoundtableError::InvalidTransition { .. } => "invalid_transition",
        RoundtableError::Reconciliation(_) => "reconciliation",
        RoundtableError::Internal(_) => "internal",
    }
}
