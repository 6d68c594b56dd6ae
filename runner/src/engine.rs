//! The saga runner: substitution registration, the driver loop and its cache.
//!
//! [`Runner::run`] drives a fresh saga to completion without executing any
//! effect. Each yielded effect is recorded and answered from a private copy of
//! the value table; control signals redirect the saga through its throw or
//! finish entry points. The completed [`RunOutput`] is cached until the next
//! registration.

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::HarnessConfig;
use crate::core::effect::{Effect, Yielded};
use crate::core::error_match::{ErrorPattern, matches};
use crate::core::raised::SagaError;
use crate::core::signal::{Resumption, Substitution, classify};
use crate::core::value_table::ValueTable;
use crate::errors::{RunError, UsageError};
use crate::saga::{Saga, SagaInvocation, Step};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Completion {
    /// The saga completed with this value.
    #[serde(rename = "return")]
    Returned(Value),
    /// The saga raised this error and the catch pattern absorbed it.
    #[serde(rename = "error")]
    Raised(SagaError),
}

/// Everything observed during one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    /// Effects in the order the saga yielded them.
    pub effects: Vec<Effect>,
    #[serde(flatten)]
    pub completion: Completion,
}

impl RunOutput {
    pub fn return_value(&self) -> Option<&Value> {
        match &self.completion {
            Completion::Returned(value) => Some(value),
            Completion::Raised(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SagaError> {
        match &self.completion {
            Completion::Raised(error) => Some(error),
            Completion::Returned(_) => None,
        }
    }

    /// True if the saga yielded an effect structurally equal to `effect`.
    pub fn yielded(&self, effect: &Effect) -> bool {
        self.effects.iter().any(|candidate| candidate == effect)
    }
}

#[derive(Debug)]
struct CachedRun {
    generation: u64,
    output: Rc<RunOutput>,
}

/// Owner of a saga invocation, its substitutions and its catch pattern.
#[derive(Debug)]
pub struct Runner {
    invocation: SagaInvocation,
    table: ValueTable,
    catch_pattern: Option<ErrorPattern>,
    config: HarnessConfig,
    generation: u64,
    cache: Option<CachedRun>,
}

impl Runner {
    /// Create a runner for the saga built by `factory` with `args`.
    pub fn new<F>(factory: F, args: Vec<Value>) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Saga> + 'static,
    {
        Self::from_invocation(SagaInvocation::new(factory, args))
    }

    pub fn from_invocation(invocation: SagaInvocation) -> Self {
        Self {
            invocation,
            table: ValueTable::new(),
            catch_pattern: None,
            config: HarnessConfig::default(),
            generation: 0,
            cache: None,
        }
    }

    /// Replace the configuration. Invalidates any cached output.
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self.invalidate();
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn invocation(&self) -> &SagaInvocation {
        &self.invocation
    }

    pub fn catch_pattern(&self) -> Option<&ErrorPattern> {
        self.catch_pattern.as_ref()
    }

    /// Register substitutions for `effect`, consumed one per yield in order.
    pub fn register<I, V>(&mut self, effect: Effect, values: I) -> Result<&mut Self, UsageError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Substitution>,
    {
        self.table
            .register(effect, values.into_iter().map(Into::into))?;
        self.invalidate();
        Ok(self)
    }

    /// Register a single substitution for `effect`.
    pub fn inject(
        &mut self,
        effect: Effect,
        value: impl Into<Substitution>,
    ) -> Result<&mut Self, UsageError> {
        self.register(effect, [value.into()])
    }

    /// Declare the error the saga is expected to raise.
    ///
    /// A matching error is captured in the run output instead of being returned
    /// as [`RunError::Saga`].
    pub fn set_catch_pattern(
        &mut self,
        pattern: impl Into<ErrorPattern>,
    ) -> Result<&mut Self, UsageError> {
        let pattern = pattern.into();
        if pattern.is_blank() {
            return Err(UsageError::EmptyCatchPattern);
        }
        if let Some(existing) = &self.catch_pattern {
            return Err(UsageError::CatchPatternAlreadySet {
                existing: existing.clone(),
            });
        }
        self.catch_pattern = Some(pattern);
        self.invalidate();
        Ok(self)
    }

    /// The cached output of the current generation, if any.
    pub fn cached_output(&self) -> Option<&Rc<RunOutput>> {
        self.cache
            .as_ref()
            .filter(|cached| cached.generation == self.generation)
            .map(|cached| &cached.output)
    }

    /// Run the saga to completion.
    ///
    /// Repeated calls without an intervening registration return the same
    /// output without resuming the saga again.
    pub fn run(&mut self) -> Result<Rc<RunOutput>, RunError> {
        if let Some(output) = self.cached_output() {
            debug!(generation = self.generation, "reusing cached run output");
            return Ok(Rc::clone(output));
        }

        let output = Rc::new(self.drive()?);
        debug!(
            generation = self.generation,
            effects = output.effects.len(),
            "saga run completed"
        );
        self.cache = Some(CachedRun {
            generation: self.generation,
            output: Rc::clone(&output),
        });
        Ok(output)
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.cache = None;
    }

    fn drive(&self) -> Result<RunOutput, RunError> {
        let mut saga = self.invocation.start();
        let mut table = self.table.snapshot();
        let mut effects: Vec<Effect> = Vec::new();
        let mut resumption = Resumption::Next(Value::Null);

        let completion = loop {
            let step = match resumption {
                Resumption::Next(input) => saga.next(input),
                Resumption::Throw(error) => saga.throw(error),
                Resumption::Finish(value) => saga.finish(value),
            };

            let yielded = match step {
                Ok(Step::Yield(yielded)) => yielded,
                Ok(Step::Done(value)) => break Completion::Returned(value),
                Err(error) => break Completion::Raised(error),
            };

            let effect = match yielded {
                Yielded::Effect(effect) => effect,
                Yielded::Plain(value) => {
                    trace!("saga yielded a plain value");
                    resumption = Resumption::Next(value);
                    continue;
                }
            };

            // The ceiling is exceeded once more than `max_effects` are recorded.
            if effects.len() > self.config.max_effects {
                warn!(limit = self.config.max_effects, "saga exceeded the effect ceiling");
                return Err(UsageError::TooManyEffects {
                    limit: self.config.max_effects,
                }
                .into());
            }

            let substitution = table.take(&effect);
            trace!(kind = %effect.kind, substituted = substitution.is_some(), "saga yielded an effect");
            effects.push(effect);
            resumption = classify(substitution);
        };

        if let Some(entry) = table.first_unconsumed() {
            warn!(kind = %entry.effect.kind, "registered values were not consumed");
            return Err(UsageError::UnusedSubstitutions {
                effect: entry.effect.clone(),
                remaining: entry.values.iter().cloned().collect(),
            }
            .into());
        }

        match (completion, &self.catch_pattern) {
            (Completion::Raised(error), Some(pattern)) if matches(&error, pattern) => Ok(RunOutput {
                effects,
                completion: Completion::Raised(error),
            }),
            (Completion::Raised(error), _) => Err(RunError::Saga(error)),
            (Completion::Returned(_), Some(pattern)) => Err(UsageError::NoErrorThrown {
                pattern: pattern.clone(),
            }
            .into()),
            (Completion::Returned(value), None) => Ok(RunOutput {
                effects,
                completion: Completion::Returned(value),
            }),
        }
    }
}

impl Clone for Runner {
    /// Share the saga invocation; copy substitutions, catch pattern and config.
    ///
    /// The clone starts without a cached output.
    fn clone(&self) -> Self {
        Self {
            invocation: self.invocation.clone(),
            table: self.table.clone(),
            catch_pattern: self.catch_pattern.clone(),
            config: self.config.clone(),
            generation: 0,
            cache: None,
        }
    }
}
