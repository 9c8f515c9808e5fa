//! Text pattern operators.

use crate::filter::{Expr, Filter, FilterValue};
use crate::validate::FieldErrors;

use super::{OperatorImpl, is_absent};

/// Where the needle has to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Anywhere.
    Contains,
    /// At the start.
    StartsWith,
    /// At the end.
    EndsWith,
}

/// `CONTAINS`, `STARTS_WITH`, `ENDS_WITH` and their case-insensitive `I`
/// variants, which upper-case both the column and the needle.
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    kind: PatternKind,
    case_insensitive: bool,
}

impl Pattern {
    /// Create a pattern operator.
    pub fn new(kind: PatternKind, case_insensitive: bool) -> Self {
        Self {
            kind,
            case_insensitive,
        }
    }
}

impl OperatorImpl for Pattern {
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        if is_absent(values) {
            return Some(Filter::None);
        }
        let Some(needle) = values[0].as_text() else {
            errors.reject("pattern matching requires a text value");
            return None;
        };

        let expr = if self.case_insensitive {
            expr.clone().upper()
        } else {
            expr.clone()
        };
        let needle = needle.into_owned();

        Some(match self.kind {
            PatternKind::Contains => Filter::Contains(expr, needle),
            PatternKind::StartsWith => Filter::StartsWith(expr, needle),
            PatternKind::EndsWith => Filter::EndsWith(expr, needle),
        })
    }
}
