//! Operator implementations and the registry mapping operators to them.
//!
//! An [`OperatorImpl`] turns a resolved column expression and the cast values
//! of one filter token into a [`Filter`]. Shared rules:
//!
//! - An empty value list, or one containing [`FilterValue::Null`], degrades to
//!   [`Filter::None`] (always true) for every operator except the null checks.
//! - Malformed value counts are reported to the [`FieldErrors`] sink and yield
//!   `None`; they never panic.
//!
//! ```rust
//! use sift_query::filter::{Expr, Filter, FilterValue};
//! use sift_query::operator::Operator;
//! use sift_query::operators::OperatorRegistry;
//! use sift_query::types::DataType;
//! use sift_query::validate::ErrorAccumulator;
//!
//! let registry = OperatorRegistry::builtin();
//! let age = Expr::new("t0", "age", DataType::I32);
//! let mut errors = ErrorAccumulator::new();
//!
//! let between = registry.resolve(Operator::Between).unwrap();
//! let filter = between.apply(
//!     &age,
//!     &[FilterValue::Int(18), FilterValue::Int(30)],
//!     &mut errors.for_field("age__between"),
//! );
//! assert_eq!(
//!     filter,
//!     Some(Filter::Between(age, FilterValue::Int(18), FilterValue::Int(30)))
//! );
//! ```

mod comparison;
mod membership;
mod pattern;

pub use comparison::{Comparison, NullCheck};
pub use membership::{Membership, Range};
pub use pattern::{Pattern, PatternKind};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::filter::{Expr, Filter, FilterValue};
use crate::operator::Operator;
use crate::validate::FieldErrors;

/// Strategy building the predicate for one operator.
pub trait OperatorImpl: Send + Sync {
    /// Build the predicate for `expr` against `values`.
    ///
    /// Returns `None` when the values are unusable; the reason has been
    /// recorded in `errors`.
    fn apply(
        &self,
        expr: &Expr,
        values: &[FilterValue],
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter>;
}

/// Whether a value list must degrade to a tautology.
pub(crate) fn is_absent(values: &[FilterValue]) -> bool {
    values.is_empty() || values.iter().any(FilterValue::is_null)
}

/// Put an expression and value into the form ordering comparisons need.
pub(crate) fn comparable(expr: &Expr, value: &FilterValue) -> (Expr, FilterValue) {
    match expr.temporal_group() {
        Some(group) if group.needs_normalization() => (expr.comparable(), value.clone().into_utc()),
        _ => (expr.clone(), value.clone()),
    }
}

/// Immutable lookup from operator to implementation.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    impls: HashMap<Operator, Arc<dyn OperatorImpl>>,
}

impl OperatorRegistry {
    /// A registry with an implementation for every operator.
    pub fn builtin() -> Self {
        Self::builder().build()
    }

    /// Start from the built-in implementations.
    pub fn builder() -> OperatorRegistryBuilder {
        let mut impls: HashMap<Operator, Arc<dyn OperatorImpl>> = HashMap::new();
        for op in [
            Operator::Eq,
            Operator::Neq,
            Operator::Gt,
            Operator::Lt,
            Operator::Gte,
            Operator::Lte,
        ] {
            impls.insert(op, Arc::new(Comparison::new(op)));
        }
        impls.insert(Operator::IsNull, Arc::new(NullCheck::is_null()));
        impls.insert(Operator::IsNotNull, Arc::new(NullCheck::is_not_null()));
        impls.insert(Operator::In, Arc::new(Membership::within()));
        impls.insert(Operator::NotIn, Arc::new(Membership::outside()));
        impls.insert(Operator::Between, Arc::new(Range::within()));
        impls.insert(Operator::NotBetween, Arc::new(Range::outside()));
        for (op, kind, case_insensitive) in [
            (Operator::Contains, PatternKind::Contains, false),
            (Operator::IContains, PatternKind::Contains, true),
            (Operator::StartsWith, PatternKind::StartsWith, false),
            (Operator::IStartsWith, PatternKind::StartsWith, true),
            (Operator::EndsWith, PatternKind::EndsWith, false),
            (Operator::IEndsWith, PatternKind::EndsWith, true),
        ] {
            impls.insert(op, Arc::new(Pattern::new(kind, case_insensitive)));
        }
        OperatorRegistryBuilder { impls }
    }

    /// Start from nothing.
    pub fn empty_builder() -> OperatorRegistryBuilder {
        OperatorRegistryBuilder {
            impls: HashMap::new(),
        }
    }

    /// Look up the implementation of an operator.
    pub fn resolve(&self, op: Operator) -> Option<&dyn OperatorImpl> {
        self.impls.get(&op).map(|imp| imp.as_ref())
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<_> = self.impls.keys().collect();
        ops.sort();
        f.debug_struct("OperatorRegistry").field("operators", &ops).finish()
    }
}

/// Setup-time builder for [`OperatorRegistry`].
pub struct OperatorRegistryBuilder {
    impls: HashMap<Operator, Arc<dyn OperatorImpl>>,
}

impl OperatorRegistryBuilder {
    /// Register an implementation, replacing any existing one.
    pub fn register(mut self, op: Operator, imp: impl OperatorImpl + 'static) -> Self {
        self.impls.insert(op, Arc::new(imp));
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> OperatorRegistry {
        OperatorRegistry { impls: self.impls }
    }
}
