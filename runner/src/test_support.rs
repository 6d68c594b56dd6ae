//! Test-only saga builders and fixtures.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::core::effect::Effect;
use crate::engine::Runner;
use crate::saga::{Resume, Saga, Step, from_fn};

/// Saga that yields `effects` in order, ignoring resumed values, then returns `ret`.
///
/// Injected errors propagate; finalization completes with `Null`.
pub fn linear(effects: Vec<Effect>, ret: Value) -> Box<dyn Saga> {
    Box::new(from_fn(0usize, move |pc, resume| match resume {
        Resume::Next(_) => {
            let step = match effects.get(*pc) {
                Some(effect) => Step::Yield(effect.clone().into()),
                None => Step::Done(ret.clone()),
            };
            *pc += 1;
            Ok(step)
        }
        Resume::Throw(error) => Err(error),
        Resume::Finish(_) => Ok(Step::Done(Value::Null)),
    }))
}

/// Runner over a [`linear`] saga.
pub fn linear_saga(effects: Vec<Effect>, ret: Value) -> Runner {
    Runner::new(move |_| linear(effects.clone(), ret.clone()), Vec::new())
}

/// Runner over a [`linear`] saga plus a counter of saga instantiations.
pub fn counting_saga(effects: Vec<Effect>, ret: Value) -> (Runner, Rc<Cell<usize>>) {
    let starts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&starts);
    let runner = Runner::new(
        move |_| {
            counter.set(counter.get() + 1);
            linear(effects.clone(), ret.clone())
        },
        Vec::new(),
    );
    (runner, starts)
}

/// Runner over a saga that yields `effect` forever.
pub fn endless_saga(effect: Effect) -> Runner {
    Runner::new(
        move |_| {
            let effect = effect.clone();
            Box::new(from_fn((), move |_, resume| match resume {
                Resume::Throw(error) => Err(error),
                _ => Ok(Step::Yield(effect.clone().into())),
            })) as Box<dyn Saga>
        },
        Vec::new(),
    )
}

/// Temporary directory holding scenario and config files.
pub struct ScenarioDir {
    dir: TempDir,
}

impl ScenarioDir {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `scenario` as pretty JSON to `name` and return its path.
    pub fn write_scenario(&self, name: &str, scenario: &Value) -> std::io::Result<PathBuf> {
        let mut payload = serde_json::to_string_pretty(scenario)?;
        payload.push('\n');
        self.write(name, &payload)
    }

    pub fn write(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

/// Scenario whose script fetches a user by id and puts it, with passing expectations.
pub fn fetch_user_scenario() -> Value {
    json!({
        "script": {
            "params": ["id"],
            "body": [
                {
                    "effect": { "type": "CALL", "payload": { "context": null, "fn": "fetch", "args": [{ "$ref": "id" }] } },
                    "bind": "user"
                },
                { "effect": { "type": "PUT", "payload": { "action": { "type": "LOADED", "user": { "$ref": "user" } } } } },
                { "return": { "$ref": "user" } }
            ]
        },
        "args": [1],
        "substitutions": [{
            "effect": { "type": "CALL", "payload": { "context": null, "fn": "fetch", "args": [1] } },
            "values": [{ "value": "ada" }]
        }],
        "expect": {
            "yields": [{ "type": "PUT", "payload": { "action": { "type": "LOADED", "user": "ada" } } }],
            "returns": "ada"
        }
    })
}
