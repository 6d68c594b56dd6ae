//! Fluent assertions over a runner's output.
//!
//! ```
//! use saga_runner::effects::{call, put};
//! use saga_runner::script::Script;
//! use serde_json::json;
//!
//! let script: Script = serde_json::from_value(json!({
//!     "body": [
//!         { "effect": { "type": "CALL", "payload": { "context": null, "fn": "fetch", "args": [] } }, "bind": "user" },
//!         { "effect": { "type": "PUT", "payload": { "action": { "type": "LOADED", "user": { "$ref": "user" } } } } }
//!     ]
//! }))
//! .unwrap();
//!
//! let mut runner = script.runner(vec![]);
//! runner.inject(call("fetch", vec![]), json!("ada")).unwrap();
//! runner
//!     .should()
//!     .yields(&put(json!({ "type": "LOADED", "user": "ada" })))
//!     .unwrap()
//!     .should()
//!     .not()
//!     .returns(&json!("ada"))
//!     .unwrap();
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::core::effect::Effect;
use crate::core::error_match::{ErrorPattern, matches};
use crate::effects;
use crate::engine::Runner;
use crate::errors::{RunError, UsageError};
use crate::render::Renderer;

/// An assertion that did not hold.
#[derive(Debug, Clone, Error)]
#[error("Assertion failure\n\n{expected_label}:\n\n{expected}\n\n{received_label}:\n\n{received}")]
pub struct AssertionFailure {
    pub expected_label: String,
    pub expected: String,
    pub received_label: String,
    pub received: String,
}

#[derive(Debug, Clone, Error)]
pub enum AssertError {
    /// The run itself failed (usage error or uncaught saga error).
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Failed(#[from] AssertionFailure),
}

impl From<UsageError> for AssertError {
    fn from(err: UsageError) -> Self {
        AssertError::Run(RunError::Usage(err))
    }
}

impl Runner {
    /// Start an assertion on this runner's output.
    pub fn should(&mut self) -> Should<'_> {
        Should {
            runner: self,
            negated: false,
        }
    }
}

/// Pending assertion. Consumed by the check it performs.
pub struct Should<'r> {
    runner: &'r mut Runner,
    negated: bool,
}

impl<'r> Should<'r> {
    /// Negate the assertion.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The saga yields an effect structurally equal to `effect`.
    pub fn yields(self, effect: &Effect) -> Result<&'r mut Runner, AssertError> {
        if effect.is_blank() {
            return Err(UsageError::MissingEffect.into());
        }
        let output = self.runner.run()?;
        let renderer = self.renderer();
        let received: Vec<Value> = output.effects.iter().map(Effect::to_value).collect();
        self.conclude(
            output.yielded(effect),
            "effect",
            renderer.render(&effect.to_value()),
            "Received effects",
            renderer.render(&Value::Array(received)),
        )
    }

    /// The saga returns a value equal to `value`.
    pub fn returns(self, value: &Value) -> Result<&'r mut Runner, AssertError> {
        let output = self.runner.run()?;
        let renderer = self.renderer();
        let received = output.return_value().cloned().unwrap_or(Value::Null);
        self.conclude(
            output.return_value() == Some(value),
            "return value",
            renderer.render(value),
            "Received return value",
            renderer.render(&received),
        )
    }

    /// The run captured an error matching `pattern`.
    ///
    /// The error is only captured when a matching catch pattern is declared on
    /// the runner; otherwise the run fails with [`RunError::Saga`].
    pub fn throws(self, pattern: impl Into<ErrorPattern>) -> Result<&'r mut Runner, AssertError> {
        let pattern = pattern.into();
        if pattern.is_blank() {
            return Err(UsageError::EmptyCatchPattern.into());
        }
        let output = self.runner.run()?;
        let renderer = self.renderer();
        let received = output.error().map_or(Value::Null, |error| error.to_value());
        self.conclude(
            output.error().is_some_and(|error| matches(error, &pattern)),
            "error pattern",
            renderer.render(&pattern.to_value()),
            "Received thrown error",
            renderer.render(&received),
        )
    }

    pub fn puts(self, action: impl Into<Value>) -> Result<&'r mut Runner, AssertError> {
        self.yields(&effects::put(action))
    }

    pub fn calls(self, function: &str, args: Vec<Value>) -> Result<&'r mut Runner, AssertError> {
        self.yields(&effects::call(function, args))
    }

    pub fn forks(self, function: &str, args: Vec<Value>) -> Result<&'r mut Runner, AssertError> {
        self.yields(&effects::fork(function, args))
    }

    pub fn selects(self, selector: &str, args: Vec<Value>) -> Result<&'r mut Runner, AssertError> {
        self.yields(&effects::select(selector, args))
    }

    pub fn takes(self, pattern: impl Into<Value>) -> Result<&'r mut Runner, AssertError> {
        self.yields(&effects::take(pattern))
    }

    fn renderer(&self) -> Renderer {
        Renderer::new(self.runner.config().render.clone())
    }

    fn conclude(
        self,
        held: bool,
        subject: &str,
        expected: String,
        received_label: &str,
        received: String,
    ) -> Result<&'r mut Runner, AssertError> {
        if held != self.negated {
            return Ok(self.runner);
        }
        let prefix = if self.negated { "Not expected" } else { "Expected" };
        Err(AssertionFailure {
            expected_label: format!("{} {}", prefix, subject),
            expected,
            received_label: received_label.to_string(),
            received,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raised::ErrorClass;
    use crate::core::signal::inject_error;
    use crate::effects::{call, put};
    use crate::test_support::linear_saga;
    use serde_json::json;

    fn runner() -> Runner {
        linear_saga(vec![call("fetch", vec![]), put(json!({ "type": "DONE" }))], json!(7))
    }

    #[test]
    fn positive_and_negated_yields() {
        let mut runner = runner();
        runner
            .should()
            .yields(&call("fetch", vec![]))
            .expect("yields")
            .should()
            .not()
            .puts(json!({ "type": "FAILED" }))
            .expect("not yields");
    }

    #[test]
    fn failed_assertion_reports_expected_and_received() {
        let mut runner = runner();
        let err = runner
            .should()
            .calls("missing", vec![])
            .expect_err("fails");
        let AssertError::Failed(failure) = err else {
            panic!("expected an assertion failure");
        };
        assert_eq!(failure.expected_label, "Expected effect");
        assert!(failure.received.contains("\"fetch\""));
        assert!(failure.to_string().starts_with("Assertion failure"));
    }

    #[test]
    fn negated_failure_uses_not_expected_label() {
        let mut runner = runner();
        let err = runner.should().not().returns(&json!(7)).expect_err("fails");
        assert!(matches!(
            err,
            AssertError::Failed(AssertionFailure { ref expected_label, .. })
                if expected_label == "Not expected return value"
        ));
    }

    #[test]
    fn throws_checks_captured_error() {
        let failure = ErrorClass::named("UserError").error("Failure");
        let mut runner = runner();
        runner
            .inject(call("fetch", vec![]), inject_error(failure))
            .expect("inject");

        let err = runner.should().throws("Failure").expect_err("uncaught");
        assert!(matches!(err, AssertError::Run(RunError::Saga(_))));

        runner.set_catch_pattern(ErrorClass::named("UserError")).expect("catch");
        runner
            .should()
            .throws("Fail")
            .expect("throws")
            .should()
            .not()
            .throws("Success")
            .expect("not throws");
    }

    #[test]
    fn blank_arguments_are_usage_errors() {
        let mut runner = runner();
        let err = runner
            .should()
            .yields(&Effect::new("", Value::Null))
            .expect_err("blank");
        assert!(matches!(
            err,
            AssertError::Run(RunError::Usage(UsageError::MissingEffect))
        ));
    }
}
