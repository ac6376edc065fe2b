//! Stable exit codes for folio CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid layout/config/storage or other errors.
pub const FAILED: i32 = 1;
/// Input was rejected (e.g. malformed email); nothing was stored.
pub const REJECTED: i32 = 2;
