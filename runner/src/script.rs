//! Declarative sagas interpreted as resumable state machines.
//!
//! A [`Script`] is a list of instructions wrapped in an optional catch block and
//! an optional finally block, mirroring a generator body of the form
//! `try { body } catch (err) { catch } finally { finally }`. Values may refer to
//! parameters and bound results with `{"$ref": "name"}`.
//!
//! ```json
//! {
//!   "params": ["id"],
//!   "body": [
//!     { "effect": { "type": "CALL", "payload": { "fn": "fetch", "args": [{ "$ref": "id" }] } }, "bind": "user" },
//!     { "return": { "$ref": "user" } }
//!   ],
//!   "finally": [{ "effect": { "type": "PUT", "payload": { "action": { "type": "END" } } } }]
//! }
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::effect::{Effect, Yielded};
use crate::core::raised::SagaError;
use crate::engine::Runner;
use crate::saga::{Saga, Step};

const REF_KEY: &str = "$ref";

/// A declarative saga body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Names bound to the invocation arguments, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    pub body: Vec<Instr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch: Option<CatchBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finally: Vec<Instr>,
}

/// Handler for errors raised in the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchBlock {
    /// Name bound to the caught error (`{name, message}` for error instances).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    pub body: Vec<Instr>,
}

/// One script instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instr {
    /// Yield an effect; bind the value the saga is resumed with.
    Effect {
        effect: Effect,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bind: Option<String>,
    },
    /// Yield a plain value; bind the value the saga is resumed with.
    Yield {
        #[serde(rename = "yield")]
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bind: Option<String>,
    },
    Return {
        #[serde(rename = "return")]
        value: Value,
    },
    Throw {
        #[serde(rename = "throw")]
        error: SagaError,
    },
    /// Run the nested instructions `times` times, or forever when absent.
    Repeat {
        repeat: Vec<Instr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        times: Option<u32>,
    },
}

impl Script {
    /// Reject scripts that could spin without yielding an effect.
    pub fn validate(&self) -> Result<()> {
        let blocks = [("body", &self.body), ("finally", &self.finally)];
        for (name, block) in blocks {
            validate_block(block, name)?;
        }
        if let Some(catch) = &self.catch {
            validate_block(&catch.body, "catch")?;
            if catch.bind.as_deref().is_some_and(|name| name.trim().is_empty()) {
                bail!("catch: bind name must be non-empty");
            }
        }
        Ok(())
    }

    /// Create a runner whose saga interprets this script with `args`.
    pub fn runner(&self, args: Vec<Value>) -> Runner {
        let script = Rc::new(self.clone());
        Runner::new(
            move |args: &[Value]| Box::new(ScriptedSaga::new(Rc::clone(&script), args)) as Box<dyn Saga>,
            args,
        )
    }
}

fn validate_block(block: &[Instr], path: &str) -> Result<()> {
    for (index, instr) in block.iter().enumerate() {
        let here = format!("{}[{}]", path, index);
        match instr {
            Instr::Effect { bind, .. } | Instr::Yield { bind, .. } => {
                if bind.as_deref().is_some_and(|name| name.trim().is_empty()) {
                    bail!("{}: bind name must be non-empty", here);
                }
            }
            Instr::Repeat { repeat, times } => {
                if times.is_none() && !yields_effect(repeat) {
                    bail!("{}: unbounded repeat must yield an effect", here);
                }
                validate_block(repeat, &here)?;
            }
            Instr::Return { .. } | Instr::Throw { .. } => {}
        }
    }
    Ok(())
}

fn yields_effect(block: &[Instr]) -> bool {
    block.iter().any(|instr| match instr {
        Instr::Effect { .. } => true,
        Instr::Repeat { repeat, times } => *times != Some(0) && yields_effect(repeat),
        _ => false,
    })
}

/// Substitute `{"$ref": name}` templates with bound values (`Null` if unbound).
pub fn resolve(template: &Value, env: &HashMap<String, Value>) -> Value {
    match template {
        Value::Object(fields) => {
            if let (1, Some(Value::String(name))) = (fields.len(), fields.get(REF_KEY)) {
                return env.get(name).cloned().unwrap_or(Value::Null);
            }
            let resolved: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.clone(), resolve(value, env)))
                .collect();
            Value::Object(resolved)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve(item, env)).collect()),
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Body,
    Catch,
    Finally,
    Complete,
}

/// Completion deferred until the finally block has run.
#[derive(Debug)]
enum Pending {
    Return(Value),
    Raise(SagaError),
}

impl Pending {
    fn into_result(self) -> Result<Step, SagaError> {
        match self {
            Pending::Return(value) => Ok(Step::Done(value)),
            Pending::Raise(error) => Err(error),
        }
    }
}

#[derive(Debug)]
struct Frame {
    instrs: Vec<Instr>,
    pc: usize,
    /// Passes left including the current one; `None` repeats forever.
    remaining: Option<u32>,
}

impl Frame {
    fn block(instrs: Vec<Instr>) -> Self {
        Self {
            instrs,
            pc: 0,
            remaining: Some(1),
        }
    }
}

/// Interpreter for a [`Script`] implementing the saga resume contract.
#[derive(Debug)]
pub struct ScriptedSaga {
    script: Rc<Script>,
    env: HashMap<String, Value>,
    frames: Vec<Frame>,
    phase: Phase,
    pending: Option<Pending>,
    /// Name bound by the instruction the saga is suspended at.
    awaiting: Option<String>,
}

impl ScriptedSaga {
    pub fn new(script: Rc<Script>, args: &[Value]) -> Self {
        let env = script
            .params
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), args.get(index).cloned().unwrap_or(Value::Null)))
            .collect();
        let frames = vec![Frame::block(script.body.clone())];
        Self {
            script,
            env,
            frames,
            phase: Phase::Body,
            pending: None,
            awaiting: None,
        }
    }

    fn advance(&mut self) -> Result<Step, SagaError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                match self.end_block() {
                    Some(result) => return result,
                    None => continue,
                }
            };

            if frame.pc >= frame.instrs.len() {
                let remaining = frame.remaining;
                match remaining {
                    None => frame.pc = 0,
                    Some(passes) if passes > 1 => {
                        frame.remaining = Some(passes - 1);
                        frame.pc = 0;
                    }
                    Some(_) => {
                        self.frames.pop();
                    }
                }
                continue;
            }

            let instr = frame.instrs[frame.pc].clone();
            frame.pc += 1;

            match instr {
                Instr::Effect { effect, bind } => {
                    self.awaiting = bind;
                    let payload = resolve(&effect.payload, &self.env);
                    return Ok(Step::Yield(Yielded::Effect(Effect::new(effect.kind, payload))));
                }
                Instr::Yield { value, bind } => {
                    self.awaiting = bind;
                    return Ok(Step::Yield(Yielded::Plain(resolve(&value, &self.env))));
                }
                Instr::Return { value } => {
                    let value = resolve(&value, &self.env);
                    if let Some(result) = self.settle(Pending::Return(value)) {
                        return result;
                    }
                }
                Instr::Throw { error } => {
                    let error = match error {
                        SagaError::Value(value) => SagaError::Value(resolve(&value, &self.env)),
                        error => error,
                    };
                    if let Some(result) = self.raise(error) {
                        return result;
                    }
                }
                Instr::Repeat { repeat, times } => {
                    if times != Some(0) && !repeat.is_empty() {
                        self.frames.push(Frame {
                            instrs: repeat,
                            pc: 0,
                            remaining: times,
                        });
                    }
                }
            }
        }
    }

    /// The current block ran out of instructions.
    fn end_block(&mut self) -> Option<Result<Step, SagaError>> {
        match self.phase {
            Phase::Body | Phase::Catch => self.settle(Pending::Return(Value::Null)),
            Phase::Finally => {
                self.phase = Phase::Complete;
                let pending = self.pending.take().unwrap_or(Pending::Return(Value::Null));
                Some(pending.into_result())
            }
            Phase::Complete => Some(Ok(Step::Done(Value::Null))),
        }
    }

    /// Complete now, or defer completion until the finally block has run.
    ///
    /// Returns `None` when the finally block was entered.
    fn settle(&mut self, pending: Pending) -> Option<Result<Step, SagaError>> {
        let in_try = matches!(self.phase, Phase::Body | Phase::Catch);
        if in_try && !self.script.finally.is_empty() {
            self.pending = Some(pending);
            self.phase = Phase::Finally;
            self.frames = vec![Frame::block(self.script.finally.clone())];
            return None;
        }
        self.phase = Phase::Complete;
        self.frames.clear();
        Some(pending.into_result())
    }

    /// Raise `error` at the current position.
    ///
    /// Returns `None` when a catch or finally block takes over.
    fn raise(&mut self, error: SagaError) -> Option<Result<Step, SagaError>> {
        if self.phase == Phase::Body {
            if let Some(catch) = &self.script.catch {
                if let Some(name) = &catch.bind {
                    self.env.insert(name.clone(), error.to_value());
                }
                self.phase = Phase::Catch;
                self.frames = vec![Frame::block(catch.body.clone())];
                return None;
            }
        }
        self.settle(Pending::Raise(error))
    }
}

impl Saga for ScriptedSaga {
    fn next(&mut self, input: Value) -> Result<Step, SagaError> {
        if self.phase == Phase::Complete {
            return Ok(Step::Done(Value::Null));
        }
        if let Some(name) = self.awaiting.take() {
            self.env.insert(name, input);
        }
        self.advance()
    }

    fn throw(&mut self, error: SagaError) -> Result<Step, SagaError> {
        if self.phase == Phase::Complete {
            return Err(error);
        }
        self.awaiting = None;
        match self.raise(error) {
            Some(result) => result,
            None => self.advance(),
        }
    }

    fn finish(&mut self, value: Option<Value>) -> Result<Step, SagaError> {
        if self.phase == Phase::Complete {
            return Ok(Step::Done(Value::Null));
        }
        if let (Some(name), Some(value)) = (self.awaiting.take(), value) {
            self.env.insert(name, value);
        }
        match self.settle(Pending::Return(Value::Null)) {
            Some(result) => result,
            None => self.advance(),
        }
    }
}
