//! Multi-value operators: list membership and inclusive ranges.

use crate::filter::{Expr, Filter, FilterValue};
use crate::operator::Operator;
use crate::validate::FieldErrors;

use super::{OperatorImpl, comparable, is_absent};

/// `IN` and `NOT_IN` over any number of values.
///
/// Duplicate values are collapsed, keeping first-seen order.
#[derive(Debug, Clone, Copy)]
pub struct Membership {
    negated: bool,
}

impl Membership {
    /// `IN`.
    pub fn within() -> Self {
        Self { negated: false }
    }

    /// `NOT_IN`.
    pub fn outside() -> Self {
        Self { negated: true }
    }
}

impl OperatorImpl for Membership {
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        _errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        if is_absent(values) {
            return Some(Filter::None);
        }
        let mut set: Vec<FilterValue> = Vec::with_capacity(values.len());
        for value in values {
            if !set.contains(value) {
                set.push(value.clone());
            }
        }
        let filter = if self.negated {
            Filter::NotIn(expr.clone(), set)
        } else {
            Filter::In(expr.clone(), set)
        };
        Some(filter)
    }
}

/// `BETWEEN` and `NOT_BETWEEN`: exactly two values, inclusive bounds.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    negated: bool,
}

impl Range {
    /// `BETWEEN`.
    pub fn within() -> Self {
        Self { negated: false }
    }

    /// `NOT_BETWEEN`.
    pub fn outside() -> Self {
        Self { negated: true }
    }

    fn operator(&self) -> Operator {
        if self.negated {
            Operator::NotBetween
        } else {
            Operator::Between
        }
    }
}

impl OperatorImpl for Range {
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        if values.is_empty() {
            return Some(Filter::None);
        }
        let [low, high] = values else {
            errors.arity(self.operator(), "exactly 2", values.len());
            return None;
        };
        if low.is_null() || high.is_null() {
            return Some(Filter::None);
        }

        let (column, low) = comparable(expr, low);
        let (_, high) = comparable(expr, high);
        let between = Filter::Between(column, low, high);
        Some(if self.negated {
            Filter::not(between)
        } else {
            between
        })
    }
}
