// ============================================================================
// reframe-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Result Alias and Exit Codes
//
// The CLI reuses the core error type. A fatal error (a rollback that left an
// asset without its live file) exits with a distinct status.

use reframe_core::{CoreError, CoreResult};

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Exit status for ordinary failures.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when an asset may have lost its live file.
pub const EXIT_FATAL: i32 = 2;

/// Maps an error to the process exit status.
#[must_use]
pub fn exit_code(error: &CoreError) -> i32 {
    if error.is_fatal() { EXIT_FATAL } else { EXIT_FAILURE }
}
