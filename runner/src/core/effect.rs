//! Effect descriptors and the values a saga yields.
//!
//! An [`Effect`] is an inert description of a side effect. The runner never
//! interprets its payload: it only compares descriptors structurally and records
//! them in the order they were yielded.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Structurally comparable description of a requested side effect.
///
/// Two effects built separately with the same kind and payload are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Effect {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// True when the descriptor carries no kind (the "missing effect" case).
    pub fn is_blank(&self) -> bool {
        self.kind.trim().is_empty()
    }

    /// Dynamic form used for rendering and for nesting inside other effects.
    pub fn to_value(&self) -> Value {
        json!({ "type": self.kind, "payload": self.payload })
    }
}

/// A single value produced by a saga step.
///
/// Only [`Yielded::Effect`] is recorded by the driver; plain values are fed back
/// to the saga as its next input.
#[derive(Debug, Clone, PartialEq)]
pub enum Yielded {
    Effect(Effect),
    Plain(Value),
}

impl From<Effect> for Yielded {
    fn from(effect: Effect) -> Self {
        Yielded::Effect(effect)
    }
}
