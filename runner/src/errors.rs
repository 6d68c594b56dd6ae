//! Error types produced by the runner.
//!
//! [`UsageError`] reports misuse of the harness itself. [`RunError`] is what
//! [`Runner::run`](crate::engine::Runner::run) returns: either a usage error or
//! the saga's own error, carried unchanged.

use thiserror::Error;

use crate::core::effect::Effect;
use crate::core::error_match::ErrorPattern;
use crate::core::raised::SagaError;
use crate::core::signal::Substitution;
use crate::render::render;

/// Caller misuse of the runner. Always fatal.
///
/// Messages render their context with the default [`RenderConfig`](crate::config::RenderConfig)
/// because they are built where no runner configuration is in scope (e.g.
/// [`ValueTable::register`](crate::core::value_table::ValueTable::register)).
/// Only assertion failures follow `HarnessConfig::render`.
#[derive(Debug, Clone, Error)]
pub enum UsageError {
    #[error("Missing effect argument")]
    MissingEffect,

    #[error("The value to map is missing\n\nGiven effect:\n\n{}", effect_text(.effect))]
    MissingValue { effect: Effect },

    #[error(
        "Mapped values already provided for this effect\n\nGiven effect:\n\n{}\n\nExisting mapped values:\n\n{}",
        effect_text(.effect),
        values_text(.existing)
    )]
    AlreadyRegistered {
        effect: Effect,
        existing: Vec<Substitution>,
    },

    #[error("Missing error pattern argument")]
    EmptyCatchPattern,

    #[error("Error pattern already provided\n\nGiven error pattern:\n\n{}", pattern_text(.existing))]
    CatchPatternAlreadySet { existing: ErrorPattern },

    #[error("Too many yielded effects (limit: {limit})")]
    TooManyEffects { limit: usize },

    #[error(
        "Unused mapped values\n\nGiven effect:\n\n{}\n\nUnused mapped values:\n\n{}",
        effect_text(.effect),
        values_text(.remaining)
    )]
    UnusedSubstitutions {
        effect: Effect,
        remaining: Vec<Substitution>,
    },

    #[error("No error thrown by the saga\n\nGiven error pattern:\n\n{}", pattern_text(.pattern))]
    NoErrorThrown { pattern: ErrorPattern },
}

/// Failure of a run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// The saga raised an error that no catch pattern absorbed.
    #[error(transparent)]
    Saga(#[from] SagaError),
}

impl RunError {
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            RunError::Usage(err) => Some(err),
            RunError::Saga(_) => None,
        }
    }

    pub fn as_saga(&self) -> Option<&SagaError> {
        match self {
            RunError::Saga(err) => Some(err),
            RunError::Usage(_) => None,
        }
    }
}

fn effect_text(effect: &Effect) -> String {
    render(&effect.to_value())
}

fn values_text(values: &[Substitution]) -> String {
    render(&serde_json::Value::Array(
        values.iter().map(Substitution::to_value).collect(),
    ))
}

fn pattern_text(pattern: &ErrorPattern) -> String {
    render(&pattern.to_value())
}
