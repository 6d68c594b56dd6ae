//! The resume contract every saga implements.
//!
//! A saga is a resumable producer of [`Yielded`] values. The runner is its only
//! resumer and drives it with three operations mirroring a generator: `next`,
//! `throw` and `finish` (early return). Returning `Err` from any of them means
//! the saga raised that error.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::core::effect::Yielded;
use crate::core::raised::SagaError;

/// Outcome of resuming a saga once.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The saga suspended with a value.
    Yield(Yielded),
    /// The saga completed with a return value.
    Done(Value),
}

pub trait Saga {
    /// Resume with the result of the previous yield (`Null` on the first call).
    fn next(&mut self, input: Value) -> Result<Step, SagaError>;

    /// Resume by raising `error` at the current yield.
    ///
    /// Sagas without error handling let it propagate.
    fn throw(&mut self, error: SagaError) -> Result<Step, SagaError> {
        Err(error)
    }

    /// Resume by forcing completion at the current yield.
    ///
    /// `value` is what the interrupted yield resolved to. Sagas with cleanup
    /// logic may still yield effects before reporting [`Step::Done`].
    fn finish(&mut self, value: Option<Value>) -> Result<Step, SagaError> {
        let _ = value;
        Ok(Step::Done(Value::Null))
    }
}

impl<S: Saga + ?Sized> Saga for Box<S> {
    fn next(&mut self, input: Value) -> Result<Step, SagaError> {
        (**self).next(input)
    }

    fn throw(&mut self, error: SagaError) -> Result<Step, SagaError> {
        (**self).throw(error)
    }

    fn finish(&mut self, value: Option<Value>) -> Result<Step, SagaError> {
        (**self).finish(value)
    }
}

type Factory = dyn Fn(&[Value]) -> Box<dyn Saga>;

/// A saga constructor plus the fixed arguments it is invoked with.
///
/// Cloning shares the constructor; every call to [`SagaInvocation::start`]
/// builds a fresh saga.
#[derive(Clone)]
pub struct SagaInvocation {
    factory: Rc<Factory>,
    args: Vec<Value>,
}

impl SagaInvocation {
    pub fn new<F>(factory: F, args: Vec<Value>) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Saga> + 'static,
    {
        Self {
            factory: Rc::new(factory),
            args,
        }
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn start(&self) -> Box<dyn Saga> {
        (self.factory)(&self.args)
    }
}

impl fmt::Debug for SagaInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaInvocation")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// How a [`FnSaga`] is being resumed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    Next(Value),
    Throw(SagaError),
    Finish(Option<Value>),
}

/// Saga backed by a state value and a transition closure.
///
/// Useful for small hand-written state machines in tests.
pub struct FnSaga<S, F> {
    state: S,
    transition: F,
}

impl<S, F> Saga for FnSaga<S, F>
where
    F: FnMut(&mut S, Resume) -> Result<Step, SagaError>,
{
    fn next(&mut self, input: Value) -> Result<Step, SagaError> {
        (self.transition)(&mut self.state, Resume::Next(input))
    }

    fn throw(&mut self, error: SagaError) -> Result<Step, SagaError> {
        (self.transition)(&mut self.state, Resume::Throw(error))
    }

    fn finish(&mut self, value: Option<Value>) -> Result<Step, SagaError> {
        (self.transition)(&mut self.state, Resume::Finish(value))
    }
}

/// Build a saga from an initial state and a transition closure.
pub fn from_fn<S, F>(state: S, transition: F) -> FnSaga<S, F>
where
    F: FnMut(&mut S, Resume) -> Result<Step, SagaError>,
{
    FnSaga { state, transition }
}
