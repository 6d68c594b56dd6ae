//! Ordered table of effect substitutions.
//!
//! Each entry maps one effect descriptor (compared structurally) to a queue of
//! substitutions consumed in registration order. The registered table is never
//! consumed directly: every run works on a [`ValueTable::snapshot`].

use std::collections::VecDeque;

use crate::core::effect::Effect;
use crate::core::signal::Substitution;
use crate::errors::UsageError;

/// One effect and its pending substitutions.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub effect: Effect,
    pub values: VecDeque<Substitution>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    entries: Vec<Entry>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `values` for `effect`.
    ///
    /// Fails if the effect is blank, if no value is supplied, or if the effect
    /// already has an entry.
    pub fn register<I>(&mut self, effect: Effect, values: I) -> Result<(), UsageError>
    where
        I: IntoIterator<Item = Substitution>,
    {
        if effect.is_blank() {
            return Err(UsageError::MissingEffect);
        }

        let values: VecDeque<Substitution> = values.into_iter().collect();
        if values.is_empty() {
            return Err(UsageError::MissingValue { effect });
        }

        if let Some(existing) = self.find(&effect) {
            return Err(UsageError::AlreadyRegistered {
                existing: existing.values.iter().cloned().collect(),
                effect,
            });
        }

        self.entries.push(Entry { effect, values });
        Ok(())
    }

    /// Independent copy whose queues can be consumed freely.
    pub fn snapshot(&self) -> ValueTable {
        self.clone()
    }

    /// Pop the next substitution for `effect`.
    ///
    /// Returns `None` if no entry matches or the matching queue is exhausted.
    pub fn take(&mut self, effect: &Effect) -> Option<Substitution> {
        self.entries
            .iter_mut()
            .find(|entry| entry.effect == *effect)
            .and_then(|entry| entry.values.pop_front())
    }

    /// First entry (in registration order) that still holds values.
    pub fn first_unconsumed(&self) -> Option<&Entry> {
        self.entries.iter().find(|entry| !entry.values.is_empty())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, effect: &Effect) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.effect == *effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::finalize;
    use serde_json::{Value, json};

    fn call(name: &str) -> Effect {
        Effect::new("CALL", json!({ "fn": name, "args": [] }))
    }

    #[test]
    fn take_consumes_values_in_order_then_runs_dry() {
        let mut table = ValueTable::new();
        table
            .register(call("fetch"), [json!(1).into(), json!(2).into()])
            .expect("register");

        assert_eq!(table.take(&call("fetch")), Some(json!(1).into()));
        assert_eq!(table.take(&call("fetch")), Some(json!(2).into()));
        assert_eq!(table.take(&call("fetch")), None);
        assert_eq!(table.take(&call("other")), None);
    }

    #[test]
    fn snapshot_consumption_leaves_registered_values_intact() {
        let mut table = ValueTable::new();
        table
            .register(call("fetch"), [json!("a").into()])
            .expect("register");

        let mut copy = table.snapshot();
        assert!(copy.take(&call("fetch")).is_some());
        assert!(copy.first_unconsumed().is_none());
        assert_eq!(
            table.first_unconsumed().map(|entry| entry.values.len()),
            Some(1)
        );
    }

    #[test]
    fn register_rejects_duplicate_structural_key() {
        let mut table = ValueTable::new();
        table
            .register(call("fetch"), [json!(1).into()])
            .expect("register");

        let err = table
            .register(call("fetch"), [finalize()])
            .expect_err("duplicate");
        assert!(matches!(err, UsageError::AlreadyRegistered { .. }));
        assert_eq!(table.entries().len(), 1);
    }

    #[test]
    fn register_rejects_missing_effect_and_missing_value() {
        let mut table = ValueTable::new();
        let err = table
            .register(Effect::new("", Value::Null), [json!(1).into()])
            .expect_err("blank effect");
        assert!(matches!(err, UsageError::MissingEffect));

        let err = table
            .register(call("fetch"), Vec::<Substitution>::new())
            .expect_err("no values");
        assert!(matches!(err, UsageError::MissingValue { .. }));
        assert!(table.is_empty());
    }
}
