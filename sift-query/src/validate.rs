//! Error accumulation and per-token validation.
//!
//! A build pass never stops at the first problem. Every step records what it
//! finds in an [`ErrorAccumulator`]; the orchestrator inspects it once every
//! token has been processed and raises a single [`FilterError`], client errors
//! first.

use tracing::warn;

use crate::error::{ErrorCode, ErrorKind, FieldErrorMap, FilterError, FilterResult};
use crate::field_type::FieldTypeDescriptor;
use crate::filter::FilterValue;
use crate::operator::Operator;

/// One recorded problem, attributed to an input label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The original input key or field identifier.
    pub label: String,
    /// What went wrong.
    pub code: ErrorCode,
    /// Human readable message.
    pub message: String,
}

impl FieldError {
    /// Who is responsible for the error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

/// Ordered collection of every error found during one build pass.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator {
    entries: Vec<FieldError>,
}

impl ErrorAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a label.
    pub fn record(&mut self, label: impl Into<String>, code: ErrorCode, message: impl Into<String>) {
        let error = FieldError {
            label: label.into(),
            code,
            message: message.into(),
        };
        if error.kind() == ErrorKind::Server {
            warn!(label = %error.label, code = %error.code, message = %error.message, "Filter misconfiguration");
        }
        self.entries.push(error);
    }

    /// A sink bound to one label.
    pub fn for_field<'a>(&'a mut self, label: &'a str) -> FieldErrors<'a> {
        FieldErrors { label, acc: self }
    }

    /// Append everything from another accumulator.
    pub fn merge(&mut self, other: ErrorAccumulator) {
        self.entries.extend(other.entries);
    }

    /// All recorded errors, in order.
    pub fn entries(&self) -> &[FieldError] {
        &self.entries
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any caller-input error was recorded.
    pub fn has_client_errors(&self) -> bool {
        self.entries.iter().any(|e| e.kind() == ErrorKind::Client)
    }

    /// Whether any configuration error was recorded.
    pub fn has_server_errors(&self) -> bool {
        self.entries.iter().any(|e| e.kind() == ErrorKind::Server)
    }

    /// Messages of one kind, grouped by label in first-seen order.
    pub fn messages(&self, kind: ErrorKind) -> FieldErrorMap {
        let mut map = FieldErrorMap::new();
        for error in self.entries.iter().filter(|e| e.kind() == kind) {
            map.entry(error.label.clone())
                .or_default()
                .push(error.message.clone());
        }
        map
    }

    /// Turn the pass outcome into a result.
    ///
    /// Client errors win over configuration errors; `value` is only returned
    /// when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> FilterResult<T> {
        if self.has_client_errors() {
            return Err(FilterError::validation(self.messages(ErrorKind::Client)));
        }
        if self.has_server_errors() {
            return Err(FilterError::misconfigured(self.messages(ErrorKind::Server)));
        }
        Ok(value)
    }
}

/// Error sink scoped to a single input label.
///
/// Handed to operator implementations and custom filters so they can report
/// problems without knowing where the value came from.
#[derive(Debug)]
pub struct FieldErrors<'a> {
    label: &'a str,
    acc: &'a mut ErrorAccumulator,
}

impl<'a> FieldErrors<'a> {
    /// The label errors are attributed to.
    pub fn label(&self) -> &str {
        self.label
    }

    /// Record an error with an explicit code.
    pub fn record(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.acc.record(self.label, code, message);
    }

    /// Record a client error for a value the filter refuses.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.record(ErrorCode::RejectedValue, message);
    }

    /// Record a wrong value count.
    pub fn arity(&mut self, op: Operator, expected: &str, got: usize) {
        self.record(
            ErrorCode::InvalidArity,
            format!("`{}` expects {} value(s), got {}", op, expected, got),
        );
    }

    /// Reborrow the sink for a shorter scope.
    pub fn reborrow(&mut self) -> FieldErrors<'_> {
        FieldErrors {
            label: self.label,
            acc: self.acc,
        }
    }
}

/// Check that an operator is valid for the field's type.
///
/// Records an [`ErrorCode::UnsupportedOperator`] client error otherwise.
pub fn check_operator(
    descriptor: &FieldTypeDescriptor,
    op: Operator,
    errors: &mut FieldErrors<'_>,
) -> bool {
    if descriptor.supports(op) {
        return true;
    }
    errors.record(
        ErrorCode::UnsupportedOperator,
        format!(
            "operator `{}` is not supported for {} fields",
            op,
            descriptor.data_type()
        ),
    );
    false
}

/// Cast every raw value, recording one client error per failure.
///
/// Returns `None` if any value failed.
pub fn cast_values(
    descriptor: &FieldTypeDescriptor,
    raw_values: &[String],
    errors: &mut FieldErrors<'_>,
) -> Option<Vec<FilterValue>> {
    let mut values = Vec::with_capacity(raw_values.len());
    let mut failed = false;
    for raw in raw_values {
        match descriptor.cast(raw) {
            Ok(value) => values.push(value),
            Err(e) => {
                errors.record(ErrorCode::InvalidValue, e.to_string());
                failed = true;
            }
        }
    }
    (!failed).then_some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_type::FieldTypeRegistry;
    use crate::types::DataType;

    #[test]
    fn test_empty_accumulator_is_ok() {
        let acc = ErrorAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.into_result(7).unwrap(), 7);
    }

    #[test]
    fn test_client_errors_win() {
        let mut acc = ErrorAccumulator::new();
        acc.record("owner__nmae", ErrorCode::UnresolvablePath, "no attribute");
        acc.record("age", ErrorCode::InvalidValue, "bad");
        let err = acc.into_result(()).unwrap_err();
        assert!(err.is_client());
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors.contains_key("age"));
    }

    #[test]
    fn test_server_errors_alone() {
        let mut acc = ErrorAccumulator::new();
        acc.record("x", ErrorCode::MissingFieldType, "no caster");
        assert!(acc.has_server_errors());
        assert!(!acc.has_client_errors());
        let err = acc.into_result(()).unwrap_err();
        assert!(err.is_server());
        assert_eq!(err.field_errors("x"), ["no caster".to_string()]);
    }

    #[test]
    fn test_messages_grouped_by_label() {
        let mut acc = ErrorAccumulator::new();
        acc.record("b", ErrorCode::InvalidValue, "one");
        acc.record("a", ErrorCode::InvalidValue, "two");
        acc.record("b", ErrorCode::InvalidArity, "three");
        let map = acc.messages(ErrorKind::Client);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map["b"], vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_field_sink() {
        let mut acc = ErrorAccumulator::new();
        {
            let mut sink = acc.for_field("age__between");
            assert_eq!(sink.label(), "age__between");
            sink.arity(Operator::Between, "exactly 2", 3);
            sink.reborrow().reject("nope");
        }
        assert_eq!(acc.entries().len(), 2);
        assert_eq!(acc.entries()[0].code, ErrorCode::InvalidArity);
        assert_eq!(acc.entries()[1].label, "age__between");
    }

    #[test]
    fn test_merge() {
        let mut a = ErrorAccumulator::new();
        let mut b = ErrorAccumulator::new();
        b.record("x", ErrorCode::InvalidValue, "bad");
        a.merge(b);
        assert_eq!(a.entries().len(), 1);
    }

    #[test]
    fn test_check_operator() {
        let registry = FieldTypeRegistry::builtin();
        let int = registry.describe(&DataType::I32).unwrap();
        let mut acc = ErrorAccumulator::new();
        assert!(check_operator(int, Operator::Gt, &mut acc.for_field("age")));
        assert!(!check_operator(int, Operator::Contains, &mut acc.for_field("age")));
        assert_eq!(acc.entries()[0].code, ErrorCode::UnsupportedOperator);
        assert!(acc.entries()[0].message.contains("contains"));
    }

    #[test]
    fn test_cast_values_reports_each_failure() {
        let registry = FieldTypeRegistry::builtin();
        let int = registry.describe(&DataType::I32).unwrap();
        let mut acc = ErrorAccumulator::new();
        let raw = vec!["1".to_string(), "x".to_string(), "y".to_string()];
        assert!(cast_values(int, &raw, &mut acc.for_field("age")).is_none());
        assert_eq!(acc.entries().len(), 2);

        let mut acc = ErrorAccumulator::new();
        let raw = vec!["1".to_string(), "2".to_string()];
        let values = cast_values(int, &raw, &mut acc.for_field("age")).unwrap();
        assert_eq!(values, vec![FilterValue::Int(1), FilterValue::Int(2)]);
        assert!(acc.is_empty());
    }
}
