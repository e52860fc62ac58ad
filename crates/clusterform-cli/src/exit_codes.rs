//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - the cluster document or an identifier was rejected locally
pub const VALIDATION_ERROR: i32 = 2;

/// Remote error - the control plane rejected a request or could not be reached
pub const REMOTE_ERROR: i32 = 3;

/// State error - the local state record is missing or unreadable
pub const STATE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Timeout - the cluster did not settle within its time budget
pub const TIMEOUT: i32 = 6;

/// Interrupted by Ctrl-C (128 + SIGINT)
pub const INTERRUPTED: i32 = 130;
