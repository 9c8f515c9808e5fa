//! Error types for filter construction with actionable messages.
//!
//! Every failure is one of two kinds:
//! - [`ErrorKind::Client`]: the caller's input is at fault (a value that does
//!   not cast, an operator the field's type cannot support, a wrong number of
//!   values). Reported as a 400-class error.
//! - [`ErrorKind::Server`]: the integrating application is misconfigured (a
//!   declared field path that does not resolve, a field type without a
//!   registered caster). Reported as a 500-class error.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: F{category}{number}
//! - 1xxx: Client input errors
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use sift_query::{ErrorCode, FilterError};
//! use indexmap::IndexMap;
//!
//! let mut fields = IndexMap::new();
//! fields.insert("age".to_string(), vec!["`abc` is not a valid i32".to_string()]);
//!
//! let err = FilterError::validation(fields);
//! assert_eq!(err.code, ErrorCode::Validation);
//! assert_eq!(err.status_code(), 400);
//! assert!(err.is_client());
//! ```

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Field label to the messages recorded against it, in input order.
pub type FieldErrorMap = IndexMap<String, Vec<String>>;

/// Who is responsible for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caused by caller-supplied input.
    Client,
    /// Caused by incorrect setup of the integrating application.
    Server,
}

impl ErrorKind {
    /// HTTP status class for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Client => 400,
            Self::Server => 500,
        }
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Client errors (1xxx)
    /// One or more filter inputs are invalid (F1000).
    Validation = 1000,
    /// Value does not cast to the field's type (F1001).
    InvalidValue = 1001,
    /// Operator not supported by the field's type (F1002).
    UnsupportedOperator = 1002,
    /// Wrong number of values for the operator (F1003).
    InvalidArity = 1003,
    /// Rejected by a custom filter (F1004).
    RejectedValue = 1004,
    /// Unknown sort field (F1005).
    InvalidSort = 1005,

    // Configuration errors (7xxx)
    /// Filter configuration is inconsistent with the entity graph (F7000).
    Misconfigured = 7000,
    /// Declared field path does not resolve (F7001).
    UnresolvablePath = 7001,
    /// No field type descriptor for a resolved type (F7002).
    MissingFieldType = 7002,
    /// No implementation registered for an operator (F7003).
    MissingOperator = 7003,
    /// Invalid engine configuration (F7004).
    InvalidConfiguration = 7004,

    // Internal errors (9xxx)
    /// Internal error (F9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "F1001").
    pub fn code(&self) -> String {
        format!("F{}", *self as u16)
    }

    /// Who is responsible for errors with this code.
    pub fn kind(&self) -> ErrorKind {
        if (*self as u16) < 7000 {
            ErrorKind::Client
        } else {
            ErrorKind::Server
        }
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid filter input",
            Self::InvalidValue => "Invalid filter value",
            Self::UnsupportedOperator => "Unsupported operator",
            Self::InvalidArity => "Wrong number of values",
            Self::RejectedValue => "Rejected filter value",
            Self::InvalidSort => "Invalid sort field",
            Self::Misconfigured => "Filter misconfiguration",
            Self::UnresolvablePath => "Unresolvable field path",
            Self::MissingFieldType => "Missing field type",
            Self::MissingOperator => "Missing operator implementation",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The root entity the filter was built for.
    pub entity: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while building a filter.
#[derive(Error, Debug)]
pub struct FilterError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Field-level errors keyed by the original input label.
    pub errors: FieldErrorMap,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl FilterError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            errors: FieldErrorMap::new(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Attach field-level errors.
    pub fn with_errors(mut self, errors: FieldErrorMap) -> Self {
        self.errors = errors;
        self
    }

    /// Set the root entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Batched client errors.
    pub fn validation(errors: FieldErrorMap) -> Self {
        let count: usize = errors.values().map(Vec::len).sum();
        Self::new(
            ErrorCode::Validation,
            format!("Filter validation failed with {} error(s)", count),
        )
        .with_errors(errors)
        .with_suggestion("Check the listed fields for malformed values or unsupported operators")
    }

    /// Batched configuration errors.
    pub fn misconfigured(errors: FieldErrorMap) -> Self {
        let count: usize = errors.values().map(Vec::len).sum();
        Self::new(
            ErrorCode::Misconfigured,
            format!("Filter configuration is invalid ({} error(s))", count),
        )
        .with_errors(errors)
        .with_help("A declared filter does not match the entity model - this is an application bug")
    }

    /// Invalid engine configuration.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid filter configuration: {}", message),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
            .with_help("This is likely a bug in Sift - please report it")
    }

    // ============== Error Checks ==============

    /// Who is responsible for this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Check if the caller's input caused this error.
    pub fn is_client(&self) -> bool {
        self.kind() == ErrorKind::Client
    }

    /// Check if application configuration caused this error.
    pub fn is_server(&self) -> bool {
        self.kind() == ErrorKind::Server
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Messages recorded against one field label.
    pub fn field_errors(&self, label: &str) -> &[String] {
        self.errors.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    // ============== Display Functions ==============

    /// Display the full error with all field errors and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref entity) = self.context.entity {
            output.push_str(&format!("  → Entity: {}\n", entity));
        }

        for (label, messages) in &self.errors {
            for message in messages {
                output.push_str(&format!("  → {}: {}\n", label, message));
            }
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(label: &str, message: &str) -> FieldErrorMap {
        let mut map = FieldErrorMap::new();
        map.insert(label.to_string(), vec![message.to_string()]);
        map
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::InvalidValue.code(), "F1001");
        assert_eq!(ErrorCode::UnresolvablePath.code(), "F7001");
        assert_eq!(ErrorCode::Internal.code(), "F9001");
    }

    #[test]
    fn test_error_code_kind() {
        assert_eq!(ErrorCode::InvalidArity.kind(), ErrorKind::Client);
        assert_eq!(ErrorCode::InvalidSort.kind(), ErrorKind::Client);
        assert_eq!(ErrorCode::MissingFieldType.kind(), ErrorKind::Server);
        assert_eq!(ErrorCode::Internal.kind(), ErrorKind::Server);
    }

    #[test]
    fn test_validation_error() {
        let err = FilterError::validation(one("age", "bad number"));
        assert!(err.is_client());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.field_errors("age"), ["bad number".to_string()]);
        assert!(err.field_errors("name").is_empty());
        assert!(err.message.contains("1 error"));
    }

    #[test]
    fn test_misconfigured_error() {
        let err = FilterError::misconfigured(one("owner__nmae", "no attribute `nmae`"));
        assert!(err.is_server());
        assert_eq!(err.status_code(), 500);
        assert!(err.context.help.is_some());
    }

    #[test]
    fn test_internal_error() {
        let err = FilterError::internal("escaped delimiter did not compile");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().starts_with("[F9001] Internal error:"));
    }

    #[test]
    fn test_display() {
        let err = FilterError::invalid_config("empty delimiter");
        assert_eq!(err.to_string(), "[F7004] Invalid filter configuration: empty delimiter");
    }

    #[test]
    fn test_display_full() {
        let err = FilterError::validation(one("age", "bad number")).with_entity("User");
        let output = err.display_full();
        assert!(output.contains("F1000"));
        assert!(output.contains("Entity: User"));
        assert!(output.contains("age: bad number"));
        assert!(output.contains("Suggestions"));
    }
}
