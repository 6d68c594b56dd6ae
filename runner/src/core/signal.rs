//! Substitution values and the control signals hidden among them.
//!
//! A substitution is what the runner feeds back to a saga in place of executing
//! an effect. Most substitutions are plain values; two reserved shapes redirect
//! how the saga is resumed instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::raised::SagaError;

/// Signals that change how the saga is resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    /// Resume through the saga's throw entry point with this error.
    InjectError(SagaError),
    /// Resume through the saga's return entry point, handing the optional value
    /// to the interrupted suspension point before completion.
    Finalize(Option<Value>),
}

/// A value registered for an effect.
///
/// Serialized as `{"value": ...}` for plain values and `{"inject_error": ...}` or
/// `{"finalize": ...}` for signals, so user data never collides with a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Substitution {
    Value(Value),
    #[serde(untagged)]
    Signal(ControlSignal),
}

impl Substitution {
    /// Dynamic form used in diagnostic messages.
    pub fn to_value(&self) -> Value {
        match self {
            Substitution::Value(value) => value.clone(),
            Substitution::Signal(signal) => serde_json::to_value(signal).unwrap_or(Value::Null),
        }
    }
}

impl From<Value> for Substitution {
    fn from(value: Value) -> Self {
        Substitution::Value(value)
    }
}

impl From<ControlSignal> for Substitution {
    fn from(signal: ControlSignal) -> Self {
        Substitution::Signal(signal)
    }
}

/// Substitution that makes the saga raise `error` at the current yield.
pub fn inject_error(error: SagaError) -> Substitution {
    Substitution::Signal(ControlSignal::InjectError(error))
}

/// Substitution that forces the saga to finish at the current yield.
pub fn finalize() -> Substitution {
    Substitution::Signal(ControlSignal::Finalize(None))
}

/// Like [`finalize`], handing `value` to the interrupted yield first.
pub fn finalize_with(value: Value) -> Substitution {
    Substitution::Signal(ControlSignal::Finalize(Some(value)))
}

/// How the driver resumes the saga on its next step.
#[derive(Debug, Clone, PartialEq)]
pub enum Resumption {
    Next(Value),
    Throw(SagaError),
    Finish(Option<Value>),
}

/// Classify the substitution popped for an effect (if any) into a resumption.
///
/// No substitution resumes the saga with `Null`.
pub fn classify(substitution: Option<Substitution>) -> Resumption {
    match substitution {
        None => Resumption::Next(Value::Null),
        Some(Substitution::Value(value)) => Resumption::Next(value),
        Some(Substitution::Signal(ControlSignal::InjectError(error))) => Resumption::Throw(error),
        Some(Substitution::Signal(ControlSignal::Finalize(value))) => Resumption::Finish(value),
    }
}
