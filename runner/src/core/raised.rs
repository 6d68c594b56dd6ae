//! Errors raised by sagas themselves.
//!
//! Sagas may raise a proper error (an instance of a nominal [`ErrorClass`]) or
//! throw an arbitrary value. Both are carried verbatim by [`SagaError`]; the
//! runner never wraps or rewrites them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const ROOT_CLASS: &str = "Error";

/// Nominal error class with explicit "is-a" ancestry.
///
/// The lineage lists class names from the most derived class up to the root
/// `Error` class. Matching a class pattern compares names along this lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClassSpec", into = "Vec<String>")]
pub struct ErrorClass {
    lineage: Vec<String>,
}

impl ErrorClass {
    /// The root `Error` class.
    pub fn base() -> Self {
        Self {
            lineage: vec![ROOT_CLASS.to_string()],
        }
    }

    /// A class deriving directly from `Error`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::base().extend(name)
    }

    /// A subclass of `self`.
    pub fn extend(&self, name: impl Into<String>) -> Self {
        let mut lineage = Vec::with_capacity(self.lineage.len() + 1);
        lineage.push(name.into());
        lineage.extend(self.lineage.iter().cloned());
        Self { lineage }
    }

    pub fn name(&self) -> &str {
        self.lineage.first().map_or(ROOT_CLASS, String::as_str)
    }

    /// True if `self` is `other` or one of its subclasses.
    pub fn is_a(&self, other: &ErrorClass) -> bool {
        self.lineage.iter().any(|name| name == other.name())
    }

    /// Build an instance of this class.
    pub fn error(&self, message: impl Into<String>) -> SagaError {
        SagaError::Error {
            class: self.clone(),
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassSpec {
    Name(String),
    Lineage(Vec<String>),
}

impl TryFrom<ClassSpec> for ErrorClass {
    type Error = String;

    fn try_from(spec: ClassSpec) -> Result<Self, Self::Error> {
        let mut lineage = match spec {
            ClassSpec::Name(name) => vec![name],
            ClassSpec::Lineage(lineage) => lineage,
        };
        if lineage.iter().any(|name| name.trim().is_empty()) || lineage.is_empty() {
            return Err("error class names must be non-empty".to_string());
        }
        if lineage.last().map(String::as_str) != Some(ROOT_CLASS) {
            lineage.push(ROOT_CLASS.to_string());
        }
        Ok(Self { lineage })
    }
}

impl From<ErrorClass> for Vec<String> {
    fn from(class: ErrorClass) -> Self {
        class.lineage
    }
}

/// An error raised (thrown) by a saga.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaError {
    /// An instance of an error class.
    #[error("{}: {message}", .class.name())]
    Error { class: ErrorClass, message: String },
    /// A thrown plain object or primitive.
    #[error("{0}")]
    Value(Value),
}

impl SagaError {
    /// A plain `Error` instance.
    pub fn new(message: impl Into<String>) -> Self {
        ErrorClass::base().error(message)
    }

    /// The `name` and `message` the error exposes to pattern matching.
    ///
    /// Non-object thrown values are normalized to an empty name and their string
    /// form as message. Objects expose their own `name`/`message` string fields.
    pub fn name_and_message(&self) -> (String, Option<String>) {
        match self {
            SagaError::Error { class, message } => (class.name().to_string(), Some(message.clone())),
            SagaError::Value(Value::Object(fields)) => {
                let field = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
                (field("name").unwrap_or_default(), field("message"))
            }
            SagaError::Value(Value::Null) => (String::new(), None),
            SagaError::Value(Value::String(text)) => (String::new(), Some(text.clone())),
            SagaError::Value(other) => (String::new(), Some(other.to_string())),
        }
    }

    /// Dynamic form used when a caught error is handed back to a saga.
    pub fn to_value(&self) -> Value {
        match self {
            SagaError::Error { class, message } => serde_json::json!({
                "name": class.name(),
                "message": message,
            }),
            SagaError::Value(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subclass_is_a_superclass() {
        let user = ErrorClass::named("UserError");
        let validation = user.extend("ValidationError");
        assert!(validation.is_a(&user));
        assert!(validation.is_a(&ErrorClass::base()));
        assert!(!user.is_a(&validation));
        assert_eq!(validation.name(), "ValidationError");
    }

    #[test]
    fn class_deserializes_from_name_or_lineage() {
        let single: ErrorClass = serde_json::from_value(json!("UserError")).expect("name");
        assert_eq!(single, ErrorClass::named("UserError"));

        let lineage: ErrorClass =
            serde_json::from_value(json!(["ValidationError", "UserError"])).expect("lineage");
        assert_eq!(lineage, ErrorClass::named("UserError").extend("ValidationError"));

        assert!(serde_json::from_value::<ErrorClass>(json!([])).is_err());
    }

    #[test]
    fn display_uses_class_name() {
        let err = ErrorClass::named("UserError").error("Failure");
        assert_eq!(err.to_string(), "UserError: Failure");
        assert_eq!(SagaError::Value(json!("Failure")).to_string(), "\"Failure\"");
    }

    #[test]
    fn name_and_message_normalizes_primitives() {
        assert_eq!(
            SagaError::Value(json!("Failure")).name_and_message(),
            (String::new(), Some("Failure".to_string()))
        );
        assert_eq!(
            SagaError::Value(json!(42)).name_and_message(),
            (String::new(), Some("42".to_string()))
        );
        assert_eq!(
            SagaError::Value(json!({ "code": 1 })).name_and_message(),
            (String::new(), None)
        );
        assert_eq!(
            SagaError::Value(json!({ "name": "E", "message": "m" })).name_and_message(),
            ("E".to_string(), Some("m".to_string()))
        );
    }
}
