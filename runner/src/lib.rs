//! Deterministic test harness for effect-yielding sagas.
//!
//! A saga is a resumable computation that yields effect descriptors instead of
//! performing side effects. The [`Runner`](engine::Runner) drives one to
//! completion without executing anything: every yielded effect is recorded and
//! answered from caller-registered substitutions, and the observed effects plus
//! the return value (or captured error) form a cached [`RunOutput`](engine::RunOutput).
//!
//! - **[`core`]**: Pure, deterministic logic (effects, value table, control
//!   signals, raised errors and error matching).
//! - **[`engine`]**: The driver loop, registration API and output cache.
//! - **[`assertions`]**, **[`script`]**, **[`scenario`]**: Fluent checks,
//!   declarative sagas and scenario files built on the engine.

pub mod assertions;
pub mod config;
pub mod core;
pub mod effects;
pub mod engine;
pub mod errors;
pub mod exit_codes;
pub mod logging;
pub mod render;
pub mod saga;
pub mod scenario;
pub mod script;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::effect::{Effect, Yielded};
pub use crate::core::error_match::ErrorPattern;
pub use crate::core::raised::{ErrorClass, SagaError};
pub use crate::core::signal::{Substitution, finalize, finalize_with, inject_error};
pub use crate::engine::{Completion, RunOutput, Runner};
pub use crate::errors::{RunError, UsageError};
pub use crate::saga::{Saga, Step};
