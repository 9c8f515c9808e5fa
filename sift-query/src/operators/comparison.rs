//! Single-value comparisons and null checks.

use crate::error::ErrorCode;
use crate::filter::{Expr, Filter, FilterValue};
use crate::operator::Operator;
use crate::validate::FieldErrors;

use super::{OperatorImpl, comparable, is_absent};

/// `EQ`, `NEQ`, `GT`, `LT`, `GTE`, `LTE`.
///
/// Uses the first value; any further values are ignored.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    op: Operator,
}

impl Comparison {
    /// Comparison for one of the six comparison operators.
    pub fn new(op: Operator) -> Self {
        Self { op }
    }
}

impl OperatorImpl for Comparison {
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        if is_absent(values) {
            return Some(Filter::None);
        }
        let (expr, value) = if self.op.is_ordering() {
            comparable(expr, &values[0])
        } else {
            (expr.clone(), values[0].clone())
        };
        let filter = match self.op {
            Operator::Eq => Filter::Equals(expr, value),
            Operator::Neq => Filter::NotEquals(expr, value),
            Operator::Gt => Filter::Gt(expr, value),
            Operator::Lt => Filter::Lt(expr, value),
            Operator::Gte => Filter::Gte(expr, value),
            Operator::Lte => Filter::Lte(expr, value),
            other => {
                errors.record(
                    ErrorCode::MissingOperator,
                    format!("`{}` is not a comparison operator", other),
                );
                return None;
            }
        };
        Some(filter)
    }
}

/// `IS_NULL` and `IS_NOT_NULL`.
///
/// `IS_NULL` ignores its values. `IS_NOT_NULL` given the single value
/// `false` becomes an is-null test, so `deleted_at__is_not_null=false` means
/// "deleted_at is null"; any other input keeps it is-not-null.
#[derive(Debug, Clone, Copy)]
pub struct NullCheck {
    negated: bool,
}

impl NullCheck {
    /// `IS_NULL`.
    pub fn is_null() -> Self {
        Self { negated: false }
    }

    /// `IS_NOT_NULL`.
    pub fn is_not_null() -> Self {
        Self { negated: true }
    }
}

impl OperatorImpl for NullCheck {
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        _errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        let invert = self.negated && matches!(values, [flag] if flag.as_bool() == Some(false));
        let filter = if self.negated && !invert {
            Filter::IsNotNull(expr.clone())
        } else {
            Filter::IsNull(expr.clone())
        };
        Some(filter)
    }
}
