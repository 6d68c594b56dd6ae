//! Matching raised errors against catch patterns.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::core::raised::{ErrorClass, SagaError};

/// Declared matcher for an expected saga error.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "PatternSpec")]
pub enum ErrorPattern {
    /// The error message contains this text.
    Substring(String),
    /// The error message matches this expression.
    Regex(Regex),
    /// The error is an instance of this class or one of its subclasses.
    Class(ErrorClass),
    /// The error has the same name and message as this one.
    Exact(SagaError),
}

impl ErrorPattern {
    pub fn substring(text: impl Into<String>) -> Self {
        ErrorPattern::Substring(text.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(ErrorPattern::Regex)
    }

    /// True for patterns that cannot describe any error (an empty substring).
    pub fn is_blank(&self) -> bool {
        matches!(self, ErrorPattern::Substring(text) if text.is_empty())
    }

    /// Dynamic form used in diagnostic messages.
    pub fn to_value(&self) -> Value {
        match self {
            ErrorPattern::Substring(text) => Value::String(text.clone()),
            ErrorPattern::Regex(regex) => Value::String(format!("/{}/", regex.as_str())),
            ErrorPattern::Class(class) => Value::String(format!("\u{192} {}", class.name())),
            ErrorPattern::Exact(error) => Value::String(error.to_string()),
        }
    }
}

impl From<&str> for ErrorPattern {
    fn from(text: &str) -> Self {
        ErrorPattern::substring(text)
    }
}

impl From<Regex> for ErrorPattern {
    fn from(regex: Regex) -> Self {
        ErrorPattern::Regex(regex)
    }
}

impl From<ErrorClass> for ErrorPattern {
    fn from(class: ErrorClass) -> Self {
        ErrorPattern::Class(class)
    }
}

impl From<SagaError> for ErrorPattern {
    fn from(error: SagaError) -> Self {
        ErrorPattern::Exact(error)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum PatternSpec {
    Substring(String),
    Regex(String),
    Class(ErrorClass),
    Exact(SagaError),
}

impl TryFrom<PatternSpec> for ErrorPattern {
    type Error = regex::Error;

    fn try_from(spec: PatternSpec) -> Result<Self, Self::Error> {
        Ok(match spec {
            PatternSpec::Substring(text) => ErrorPattern::Substring(text),
            PatternSpec::Regex(pattern) => ErrorPattern::regex(&pattern)?,
            PatternSpec::Class(class) => ErrorPattern::Class(class),
            PatternSpec::Exact(error) => ErrorPattern::Exact(error),
        })
    }
}

/// Check whether `raised` satisfies `pattern`.
///
/// An error without a message never matches. Only proper error instances can
/// match a class pattern.
pub fn matches(raised: &SagaError, pattern: &ErrorPattern) -> bool {
    let (name, message) = raised.name_and_message();
    let message = match message {
        Some(message) if !message.is_empty() => message,
        _ => return false,
    };

    match pattern {
        ErrorPattern::Substring(text) => message.contains(text.as_str()),
        ErrorPattern::Regex(regex) => regex.is_match(&message),
        ErrorPattern::Exact(expected) => {
            let (expected_name, expected_message) = expected.name_and_message();
            name == expected_name && Some(message) == expected_message
        }
        ErrorPattern::Class(class) => match raised {
            SagaError::Error { class: raised_class, .. } => raised_class.is_a(class),
            SagaError::Value(_) => false,
        },
    }
}
