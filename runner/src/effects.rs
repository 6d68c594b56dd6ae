//! Constructors for common saga effect descriptors.
//!
//! Functions, selectors and tasks are referenced by name or by value: the runner
//! never invokes them, it only compares descriptors.

use serde_json::{Map, Value, json};

use crate::core::effect::Effect;

pub fn take(pattern: impl Into<Value>) -> Effect {
    Effect::new("TAKE", json!({ "pattern": pattern.into() }))
}

pub fn take_maybe(pattern: impl Into<Value>) -> Effect {
    Effect::new("TAKE", json!({ "pattern": pattern.into(), "maybe": true }))
}

pub fn put(action: impl Into<Value>) -> Effect {
    Effect::new("PUT", json!({ "action": action.into() }))
}

pub fn put_resolve(action: impl Into<Value>) -> Effect {
    Effect::new("PUT", json!({ "action": action.into(), "resolve": true }))
}

pub fn call(function: &str, args: Vec<Value>) -> Effect {
    Effect::new("CALL", invocation(Value::Null, function, args))
}

/// `call` with an explicit `this` context.
pub fn apply(context: impl Into<Value>, function: &str, args: Vec<Value>) -> Effect {
    Effect::new("CALL", invocation(context.into(), function, args))
}

pub fn cps(function: &str, args: Vec<Value>) -> Effect {
    Effect::new("CPS", invocation(Value::Null, function, args))
}

pub fn fork(function: &str, args: Vec<Value>) -> Effect {
    Effect::new("FORK", invocation(Value::Null, function, args))
}

/// Detached `fork`.
pub fn spawn(function: &str, args: Vec<Value>) -> Effect {
    let mut payload = invocation(Value::Null, function, args);
    if let Value::Object(fields) = &mut payload {
        fields.insert("detached".to_string(), Value::Bool(true));
    }
    Effect::new("FORK", payload)
}

pub fn join(task: impl Into<Value>) -> Effect {
    Effect::new("JOIN", task.into())
}

pub fn cancel(task: impl Into<Value>) -> Effect {
    Effect::new("CANCEL", task.into())
}

pub fn cancelled() -> Effect {
    Effect::new("CANCELLED", json!({}))
}

pub fn select(selector: &str, args: Vec<Value>) -> Effect {
    Effect::new("SELECT", json!({ "selector": selector, "args": args }))
}

pub fn action_channel(pattern: impl Into<Value>) -> Effect {
    Effect::new("ACTION_CHANNEL", json!({ "pattern": pattern.into() }))
}

pub fn flush(channel: impl Into<Value>) -> Effect {
    Effect::new("FLUSH", channel.into())
}

pub fn get_context(prop: &str) -> Effect {
    Effect::new("GET_CONTEXT", Value::String(prop.to_string()))
}

pub fn set_context(props: impl Into<Value>) -> Effect {
    Effect::new("SET_CONTEXT", props.into())
}

/// `call` of the built-in delay helper.
pub fn delay(ms: u64) -> Effect {
    call("delay", vec![json!(ms)])
}

/// Run effects in parallel.
pub fn all(effects: &[Effect]) -> Effect {
    Effect::new(
        "ALL",
        Value::Array(effects.iter().map(Effect::to_value).collect()),
    )
}

/// Run labelled effects in a race.
pub fn race<'a, I>(effects: I) -> Effect
where
    I: IntoIterator<Item = (&'a str, Effect)>,
{
    let entries: Map<String, Value> = effects
        .into_iter()
        .map(|(label, effect)| (label.to_string(), effect.to_value()))
        .collect();
    Effect::new("RACE", Value::Object(entries))
}

fn invocation(context: Value, function: &str, args: Vec<Value>) -> Value {
    json!({ "context": context, "fn": function, "args": args })
}
