//! Per-entity filter declarations.
//!
//! A [`FilterContext`] lists, for one root entity, which field paths may be
//! filtered with which operators, and which paths are handled by a
//! [`CustomFilter`] instead of the generic machinery. Contexts are built once
//! during setup and shared read-only afterwards.
//!
//! ```rust
//! use sift_query::context::{CustomScope, FilterContext};
//! use sift_query::filter::{Filter, FilterValue};
//! use sift_query::operator::{Operator, OperatorSet};
//! use sift_query::types::DataType;
//!
//! let ctx = FilterContext::new("Order")
//!     .declare("status", [Operator::Eq, Operator::In])
//!     .declare("total", OperatorSet::COMPARABLE)
//!     .declare_custom("placed_in_year", DataType::I32, |values: &[FilterValue], scope: &mut CustomScope<'_>| {
//!         let _ = (values, scope);
//!         None
//!     });
//!
//! assert!(ctx.is_allowed("status", Operator::In));
//! assert!(!ctx.is_allowed("status", Operator::Gt));
//! assert!(ctx.custom("placed_in_year").is_some());
//! ```

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorCode;
use crate::filter::{Expr, Filter, FilterValue};
use crate::operator::{Operator, OperatorSet};
use crate::resolver::{JoinSet, PathResolver};
use crate::types::DataType;
use crate::validate::FieldErrors;

/// Application-supplied predicate logic for one field.
///
/// Receives the token's values already cast to the declared data type. An
/// empty result (`None` or [`Filter::None`]) contributes nothing to the
/// conjunction.
pub trait CustomFilter: Send + Sync {
    /// Build the predicate.
    fn apply(&self, values: &[FilterValue], scope: &mut CustomScope<'_>) -> Option<Filter>;
}

impl<F> CustomFilter for F
where
    F: Fn(&[FilterValue], &mut CustomScope<'_>) -> Option<Filter> + Send + Sync,
{
    fn apply(&self, values: &[FilterValue], scope: &mut CustomScope<'_>) -> Option<Filter> {
        self(values, scope)
    }
}

/// What a custom filter may touch while building its predicate.
pub struct CustomScope<'s> {
    resolver: &'s PathResolver<'s>,
    root: &'s str,
    joins: &'s mut JoinSet,
    errors: FieldErrors<'s>,
    operator: Operator,
}

impl<'s> CustomScope<'s> {
    pub(crate) fn new(
        resolver: &'s PathResolver<'s>,
        root: &'s str,
        joins: &'s mut JoinSet,
        errors: FieldErrors<'s>,
        operator: Operator,
    ) -> Self {
        Self {
            resolver,
            root,
            joins,
            errors,
            operator,
        }
    }

    /// Resolve a field path from the root entity, joining as needed.
    ///
    /// A path that does not resolve is recorded as a configuration error.
    pub fn resolve(&mut self, path: &str) -> Option<Expr> {
        match self.resolver.resolve(self.root, path, self.joins) {
            Ok(expr) => Some(expr),
            Err(e) => {
                self.errors.record(ErrorCode::UnresolvablePath, e.to_string());
                None
            }
        }
    }

    /// Operator parsed from the input. Custom filters are free to ignore it.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Input label errors are attributed to.
    pub fn label(&self) -> &str {
        self.errors.label()
    }

    /// Record a client error for a value the filter refuses.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.errors.reject(message);
    }

    /// The raw error sink.
    pub fn errors(&mut self) -> &mut FieldErrors<'s> {
        &mut self.errors
    }
}

/// A custom filter together with the type its values are cast to.
#[derive(Clone)]
pub struct CustomFilterSpec {
    /// Type the raw values are cast to before the filter runs.
    pub data_type: DataType,
    /// The filter.
    pub filter: Arc<dyn CustomFilter>,
}

impl fmt::Debug for CustomFilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFilterSpec")
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

/// Filter declarations for one root entity.
#[derive(Debug, Clone)]
pub struct FilterContext {
    root: SmolStr,
    fields: IndexMap<String, OperatorSet>,
    custom: IndexMap<String, CustomFilterSpec>,
}

impl FilterContext {
    /// Create an empty context for the entity named `root`.
    pub fn new(root: impl Into<SmolStr>) -> Self {
        Self {
            root: root.into(),
            fields: IndexMap::new(),
            custom: IndexMap::new(),
        }
    }

    /// Root entity name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Allow filtering `path` with `operators`, replacing an earlier
    /// declaration of the same path.
    pub fn declare(mut self, path: impl Into<String>, operators: impl Into<OperatorSet>) -> Self {
        self.fields.insert(path.into(), operators.into());
        self
    }

    /// Handle `path` with a closure. Values are cast to `data_type` first.
    pub fn declare_custom<F>(self, path: impl Into<String>, data_type: DataType, filter: F) -> Self
    where
        F: Fn(&[FilterValue], &mut CustomScope<'_>) -> Option<Filter> + Send + Sync + 'static,
    {
        self.declare_custom_filter(path, data_type, filter)
    }

    /// Handle `path` with a [`CustomFilter`] implementation.
    pub fn declare_custom_filter(
        mut self,
        path: impl Into<String>,
        data_type: DataType,
        filter: impl CustomFilter + 'static,
    ) -> Self {
        self.custom.insert(
            path.into(),
            CustomFilterSpec {
                data_type,
                filter: Arc::new(filter),
            },
        );
        self
    }

    /// Whether `path` was declared with `operator`.
    ///
    /// Custom paths are not covered; check [`FilterContext::custom`] first.
    pub fn is_allowed(&self, path: &str, operator: Operator) -> bool {
        self.fields
            .get(path)
            .is_some_and(|operators| operators.contains(operator))
    }

    /// Whether `path` was declared for generic filtering with any operator.
    ///
    /// Only declared paths may be used for sorting.
    pub fn is_declared(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    /// The custom filter declared for `path`.
    pub fn custom(&self, path: &str) -> Option<&CustomFilterSpec> {
        self.custom.get(path)
    }

    /// Generic declarations, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, OperatorSet)> {
        self.fields.iter().map(|(path, ops)| (path.as_str(), *ops))
    }

    /// Custom declarations, in declaration order.
    pub fn custom_fields(&self) -> impl Iterator<Item = (&str, &CustomFilterSpec)> {
        self.custom.iter().map(|(path, spec)| (path.as_str(), spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl CustomFilter for Never {
        fn apply(&self, _: &[FilterValue], _: &mut CustomScope<'_>) -> Option<Filter> {
            None
        }
    }

    #[test]
    fn test_declare_and_is_allowed() {
        let ctx = FilterContext::new("User")
            .declare("name", [Operator::Eq, Operator::IContains])
            .declare("age", OperatorSet::of(&[Operator::Eq, Operator::Gt, Operator::Lt]));
        assert_eq!(ctx.root(), "User");
        assert!(ctx.is_allowed("name", Operator::IContains));
        assert!(!ctx.is_allowed("name", Operator::Gt));
        assert!(ctx.is_allowed("age", Operator::Lt));
        assert!(!ctx.is_allowed("email", Operator::Eq));
        assert!(ctx.is_declared("age"));
        assert!(!ctx.is_declared("email"));
    }

    #[test]
    fn test_last_declaration_wins() {
        let ctx = FilterContext::new("User")
            .declare("name", Operator::Eq)
            .declare("name", Operator::StartsWith);
        assert!(!ctx.is_allowed("name", Operator::Eq));
        assert!(ctx.is_allowed("name", Operator::StartsWith));
        assert_eq!(ctx.fields().count(), 1);
    }

    #[test]
    fn test_custom_declarations() {
        let ctx = FilterContext::new("User")
            .declare("name", Operator::Eq)
            .declare_custom_filter("name", DataType::String, Never)
            .declare_custom("age_band", DataType::I32, |_: &[FilterValue], _: &mut CustomScope<'_>| None);
        assert_eq!(ctx.custom("name").unwrap().data_type, DataType::String);
        assert_eq!(ctx.custom_fields().map(|(p, _)| p).collect::<Vec<_>>(), vec!["name", "age_band"]);
        assert!(ctx.custom("email").is_none());
        assert!(format!("{:?}", ctx.custom("age_band").unwrap()).contains("I32"));
    }
}
