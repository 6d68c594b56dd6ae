//! Stable exit codes for `saga-runner` commands.

/// Every scenario ran and every expectation held.
pub const OK: i32 = 0;
/// A scenario or config could not be loaded, or the harness was misused.
pub const INVALID: i32 = 1;
/// `saga-runner verify` found an expectation that did not hold.
pub const FAILED: i32 = 2;
/// A saga raised an error no catch pattern absorbed.
pub const RAISED: i32 = 3;
