//! Request envelope for the top-level validation call
//!
//! The call takes a parsed document and an optional `keepEntries` flag as
//! loosely typed JSON values. Argument errors are caught here, before any
//! rule loading or validation starts.

use serde_json::Value;

use crate::entry::Document;
use crate::error::{Result, ValidationError};
use crate::validator::ValidateOptions;

/// Most arguments the call accepts: the document and `keepEntries`
pub const MAX_ARGS: usize = 2;

/// A checked validation request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateRequest {
    pub document: Document,
    pub options: ValidateOptions,
}

impl ValidateRequest {
    /// Create a request with default options
    pub fn new(document: Document) -> Self {
        Self {
            document,
            options: ValidateOptions::default(),
        }
    }

    /// Build a request from positional call arguments
    ///
    /// Accepts `[document]` or `[document, keepEntries]`. The document may be
    /// an object or a string holding its JSON text.
    pub fn from_args(args: Vec<Value>) -> Result<Self> {
        if args.is_empty() {
            return Err(ValidationError::invalid_arguments("Too few arguments"));
        }
        if args.len() > MAX_ARGS {
            return Err(ValidationError::invalid_arguments(format!(
                "Too many arguments: expected at most {}, got {}",
                MAX_ARGS,
                args.len()
            )));
        }

        let mut args = args.into_iter();
        let document = match args.next() {
            Some(value) => parse_document(value)?,
            None => return Err(ValidationError::invalid_arguments("Too few arguments")),
        };
        let keep_entries = match args.next() {
            None | Some(Value::Null) => true,
            Some(Value::Bool(keep)) => keep,
            Some(other) => {
                return Err(ValidationError::invalid_arguments(format!(
                    "keepEntries must be a boolean, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            document,
            options: ValidateOptions { keep_entries },
        })
    }

    /// Build a request from JSON text
    ///
    /// An array is taken as the argument list; anything else as the lone
    /// document argument.
    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str(text)? {
            Value::Array(args) => Self::from_args(args),
            document => Self::from_args(vec![document]),
        }
    }
}

fn parse_document(value: Value) -> Result<Document> {
    let parsed = match value {
        Value::String(text) => serde_json::from_str(&text),
        Value::Object(_) => serde_json::from_value(value),
        other => {
            return Err(ValidationError::invalid_input(format!(
                "expected a parsed document, got {}",
                kind(&other)
            )))
        }
    };

    parsed.map_err(|e| ValidationError::invalid_input(format!("malformed document: {}", e)))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
