//! Scenario files: a scripted saga plus the substitutions and expectations
//! that exercise it.
//!
//! Scenarios are JSON, or TOML when the file extension is `.toml`:
//!
//! ```toml
//! args = [42]
//!
//! [script]
//! params = ["id"]
//! body = [
//!   { effect = { type = "CALL", payload = { fn = "fetch", args = [{ "$ref" = "id" }] } }, bind = "user" },
//!   { return = { "$ref" = "user" } },
//! ]
//!
//! [[substitutions]]
//! effect = { type = "CALL", payload = { fn = "fetch", args = [42] } }
//! values = [{ value = "ada" }]
//!
//! [expect]
//! returns = "ada"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::assertions::{AssertError, AssertionFailure};
use crate::config::HarnessConfig;
use crate::core::effect::Effect;
use crate::core::error_match::ErrorPattern;
use crate::core::signal::Substitution;
use crate::engine::Runner;
use crate::errors::{RunError, UsageError};
use crate::script::Script;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub script: Script,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub substitutions: Vec<Registration>,
    /// Error the saga is expected to raise. Defaults to `expect.throws`.
    #[serde(default)]
    pub catch: Option<ErrorPattern>,
    #[serde(default)]
    pub expect: Expectations,
}

/// Values registered for one effect, consumed in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registration {
    pub effect: Effect,
    pub values: Vec<Substitution>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Expectations {
    pub yields: Vec<Effect>,
    pub not_yields: Vec<Effect>,
    /// Expected return value. An explicit `null` is an expectation too.
    #[serde(deserialize_with = "present")]
    pub returns: Option<Value>,
    pub throws: Option<ErrorPattern>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Expectations {
    pub fn len(&self) -> usize {
        self.yields.len()
            + self.not_yields.len()
            + usize::from(self.returns.is_some())
            + usize::from(self.throws.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of checking every expectation of a scenario.
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub checked: usize,
    pub failures: Vec<AssertionFailure>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, outcome: Result<&mut Runner, AssertError>) -> Result<(), RunError> {
        self.checked += 1;
        match outcome {
            Ok(_) => Ok(()),
            Err(AssertError::Failed(failure)) => {
                self.failures.push(failure);
                Ok(())
            }
            Err(AssertError::Run(err)) => Err(err),
        }
    }
}

impl Scenario {
    /// Read a scenario file. `.toml` files are parsed as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let scenario: Scenario = if is_toml {
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
        } else {
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
        };
        scenario
            .script
            .validate()
            .with_context(|| format!("invalid script in {}", path.display()))?;
        Ok(scenario)
    }

    /// Build a runner with the scenario's substitutions and catch pattern.
    pub fn runner(&self) -> Result<Runner, UsageError> {
        let mut runner = self.script.runner(self.args.clone());
        for registration in &self.substitutions {
            runner.register(registration.effect.clone(), registration.values.iter().cloned())?;
        }
        if let Some(pattern) = self.catch.as_ref().or(self.expect.throws.as_ref()) {
            runner.set_catch_pattern(pattern.clone())?;
        }
        Ok(runner)
    }

    /// Check every expectation against a run with the default configuration.
    pub fn verify(&self) -> Result<Verdict, RunError> {
        self.verify_with(HarnessConfig::default())
    }

    pub fn verify_with(&self, config: HarnessConfig) -> Result<Verdict, RunError> {
        let mut runner = self.runner()?.with_config(config);
        let expect = &self.expect;
        let mut verdict = Verdict::default();

        // A run error must surface even when nothing is expected.
        runner.run()?;

        for effect in &expect.yields {
            verdict.record(runner.should().yields(effect))?;
        }
        for effect in &expect.not_yields {
            verdict.record(runner.should().not().yields(effect))?;
        }
        if let Some(value) = &expect.returns {
            verdict.record(runner.should().returns(value))?;
        }
        if let Some(pattern) = &expect.throws {
            verdict.record(runner.should().throws(pattern.clone()))?;
        }

        debug!(
            checked = verdict.checked,
            failed = verdict.failures.len(),
            "scenario verified"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{call, put};
    use serde_json::json;

    fn scenario(value: Value) -> Scenario {
        serde_json::from_value(value).expect("scenario")
    }

    fn fetch_script() -> Value {
        json!({
            "params": ["id"],
            "body": [
                {
                    "effect": { "type": "CALL", "payload": { "context": null, "fn": "fetch", "args": [{ "$ref": "id" }] } },
                    "bind": "user"
                },
                { "effect": { "type": "PUT", "payload": { "action": { "type": "LOADED", "user": { "$ref": "user" } } } } },
                { "return": { "$ref": "user" } }
            ]
        })
    }

    #[test]
    fn verify_passes_when_expectations_hold() {
        let scenario = scenario(json!({
            "script": fetch_script(),
            "args": [1],
            "substitutions": [
                { "effect": call("fetch", vec![json!(1)]), "values": [{ "value": "ada" }] }
            ],
            "expect": {
                "yields": [put(json!({ "type": "LOADED", "user": "ada" }))],
                "not_yields": [put(json!({ "type": "FAILED" }))],
                "returns": "ada"
            }
        }));

        let verdict = scenario.verify().expect("verify");
        assert!(verdict.passed());
        assert_eq!(verdict.checked, 3);
        assert_eq!(verdict.checked, scenario.expect.len());
    }

    #[test]
    fn verify_collects_failures() {
        let scenario = scenario(json!({
            "script": fetch_script(),
            "args": [1],
            "expect": {
                "yields": [put(json!({ "type": "LOADED", "user": "ada" }))],
                "returns": "ada"
            }
        }));

        let verdict = scenario.verify().expect("verify");
        assert_eq!(verdict.failures.len(), 2);
        assert_eq!(verdict.failures[1].expected_label, "Expected return value");
    }

    #[test]
    fn throws_expectation_doubles_as_catch_pattern() {
        let scenario = scenario(json!({
            "script": fetch_script(),
            "args": [1],
            "substitutions": [{
                "effect": call("fetch", vec![json!(1)]),
                "values": [{ "inject_error": { "error": { "class": "NotFound", "message": "no user 1" } } }]
            }],
            "expect": { "throws": { "class": "NotFound" } }
        }));

        let verdict = scenario.verify().expect("verify");
        assert!(verdict.passed());
    }

    #[test]
    fn explicit_null_return_is_checked() {
        let scenario = scenario(json!({
            "script": { "body": [{ "return": 1 }] },
            "expect": { "returns": null }
        }));
        assert_eq!(scenario.expect.returns, Some(Value::Null));
        let verdict = scenario.verify().expect("verify");
        assert_eq!(verdict.failures.len(), 1);
    }

    #[test]
    fn uncaught_error_is_a_run_error() {
        let scenario = scenario(json!({
            "script": { "body": [{ "throw": { "value": "boom" } }] }
        }));
        let err = scenario.verify().expect_err("raised");
        assert_eq!(err.as_saga().map(ToString::to_string), Some("\"boom\"".to_string()));
    }

    #[test]
    fn load_reads_toml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let toml_path = dir.path().join("fetch.toml");
        fs::write(
            &toml_path,
            r#"
args = [42]

[script]
params = ["id"]
body = [
  { effect = { type = "CALL", payload = { fn = "fetch", args = [{ "$ref" = "id" }] } }, bind = "user" },
  { return = { "$ref" = "user" } },
]

[[substitutions]]
effect = { type = "CALL", payload = { fn = "fetch", args = [42] } }
values = [{ value = "ada" }]

[expect]
returns = "ada"
"#,
        )
        .expect("write toml");

        let loaded = Scenario::load(&toml_path).expect("load toml");
        assert!(loaded.verify().expect("verify").passed());

        let json_path = dir.path().join("bad.json");
        fs::write(&json_path, "{ \"script\": {} }").expect("write json");
        let err = Scenario::load(&json_path).expect_err("invalid");
        assert!(format!("{:#}", err).contains("parse"));
    }
}
