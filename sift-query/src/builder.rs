//! The predicate builder: tokens in, one conjoined [`Filter`] out.
//!
//! For every token the builder either runs the field's custom filter or goes
//! through the generic path: declaration check, path resolution, field type
//! lookup, operator validation, value casting and finally the operator
//! implementation. Tokens for undeclared field/operator pairs are ignored.
//! Errors never stop the pass; they are collected and raised once at the end,
//! client errors before configuration errors.
//!
//! ```rust
//! use std::sync::Arc;
//! use sift_query::builder::PredicateBuilder;
//! use sift_query::context::FilterContext;
//! use sift_query::metadata::{Entity, Schema};
//! use sift_query::operator::Operator;
//! use sift_query::token::FilterToken;
//! use sift_query::types::DataType;
//!
//! let schema = Schema::new().with_entity(
//!     Entity::new("User", "users")
//!         .scalar("id", DataType::I64)
//!         .scalar("age", DataType::I32),
//! );
//! let builder = PredicateBuilder::new(Arc::new(schema)).unwrap();
//! let ctx = FilterContext::new("User").declare("age", [Operator::Gt]);
//!
//! let built = builder
//!     .build(&ctx, &[FilterToken::new("age", Operator::Gt, vec!["18".into()])])
//!     .unwrap();
//! let (sql, _) = built.filter.to_sql(0);
//! assert_eq!(sql, "t0.age > $1");
//!
//! let err = builder
//!     .build(&ctx, &[FilterToken::new("age", Operator::Gt, vec!["abc".into()])])
//!     .unwrap_err();
//! assert_eq!(err.status_code(), 400);
//! ```

use regex_lite::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::FilterConfig;
use crate::context::{CustomFilterSpec, CustomScope, FilterContext};
use crate::error::{ErrorCode, FilterError, FilterResult};
use crate::field_type::{FieldTypeDescriptor, FieldTypeRegistry, cast_bool};
use crate::filter::{Filter, FilterValue};
use crate::metadata::Metamodel;
use crate::operator::Operator;
use crate::operators::OperatorRegistry;
use crate::parser::FilterParser;
use crate::resolver::{Join, JoinSet, PathResolver};
use crate::token::FilterToken;
use crate::types::{DataType, OrderBy, OrderByField};
use crate::validate::{ErrorAccumulator, FieldErrors, cast_values, check_operator};

/// The outcome of a successful build pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltFilter {
    /// Conjunction of every token's predicate; [`Filter::None`] when empty.
    pub filter: Filter,
    /// Joins the predicate and ordering refer to.
    pub joins: Vec<Join>,
    /// Resolved ordering, columns qualified by table alias.
    pub order_by: OrderBy,
}

impl BuiltFilter {
    /// `WHERE` clause body and its parameters, numbered after `param_offset`.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        self.filter.to_sql(param_offset)
    }

    /// All joins as SQL, space separated.
    pub fn join_sql(&self) -> String {
        self.joins
            .iter()
            .map(Join::to_sql)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Assemble a `SELECT` over `table` with the joins, predicate and ordering.
    pub fn select_sql(&self, table: &str, columns: &str) -> (String, Vec<FilterValue>) {
        let (predicate, params) = self.to_sql(0);
        let mut sql = format!("SELECT {} FROM {} AS {}", columns, table, crate::resolver::ROOT_ALIAS);
        if !self.joins.is_empty() {
            sql.push(' ');
            sql.push_str(&self.join_sql());
        }
        if !self.filter.is_none() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.to_sql());
        }
        (sql, params)
    }
}

/// Builds predicates from filter tokens.
///
/// Cheap to clone; registries and the metamodel are shared.
#[derive(Clone)]
pub struct PredicateBuilder {
    field_types: Arc<FieldTypeRegistry>,
    operators: Arc<OperatorRegistry>,
    metamodel: Arc<dyn Metamodel>,
    config: FilterConfig,
    splitter: Regex,
}

impl fmt::Debug for PredicateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateBuilder")
            .field("field_types", &self.field_types)
            .field("operators", &self.operators)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PredicateBuilder {
    /// A builder with the built-in registries and default configuration.
    pub fn new(metamodel: Arc<dyn Metamodel>) -> FilterResult<Self> {
        Self::builder(metamodel).build()
    }

    /// Start configuring a builder.
    pub fn builder(metamodel: Arc<dyn Metamodel>) -> PredicateBuilderConfig {
        PredicateBuilderConfig {
            field_types: None,
            operators: None,
            metamodel,
            config: FilterConfig::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// A parser using this builder's configuration.
    pub fn parser(&self) -> FilterParser<'_> {
        FilterParser::new(&self.config)
    }

    /// Field type registry in use.
    pub fn field_types(&self) -> &FieldTypeRegistry {
        &self.field_types
    }

    /// Operator registry in use.
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::with_splitter(self.metamodel.as_ref(), &self.config.delimiter, self.splitter.clone())
    }

    /// Build the conjoined predicate for `tokens` against `ctx`'s root entity.
    pub fn build(&self, ctx: &FilterContext, tokens: &[FilterToken]) -> FilterResult<BuiltFilter> {
        self.build_with_sort(ctx, tokens, &OrderBy::none())
    }

    /// Like [`build`](Self::build), also resolving a sort specification
    /// whose columns hold field paths. Only paths declared in `ctx` are
    /// sortable.
    pub fn build_with_sort(
        &self,
        ctx: &FilterContext,
        tokens: &[FilterToken],
        sort: &OrderBy,
    ) -> FilterResult<BuiltFilter> {
        let resolver = self.resolver();
        let mut joins = JoinSet::new();
        let mut errors = ErrorAccumulator::new();
        let mut predicates = Vec::with_capacity(tokens.len());

        for token in tokens {
            let mut sink = errors.for_field(&token.label);
            if let Some(predicate) = self.build_token(ctx, &resolver, token, &mut joins, &mut sink) {
                predicates.push(predicate);
            }
        }

        let order_by = self.resolve_sort(ctx, &resolver, sort, &mut joins, &mut errors);
        let filter = Filter::and(predicates);
        debug!(
            entity = ctx.root(),
            tokens = tokens.len(),
            joins = joins.len(),
            errors = errors.entries().len(),
            "Built filter"
        );

        errors
            .into_result(BuiltFilter {
                filter,
                joins: joins.joins().to_vec(),
                order_by,
            })
            .map_err(|e| e.with_entity(ctx.root()))
    }

    fn build_token(
        &self,
        ctx: &FilterContext,
        resolver: &PathResolver<'_>,
        token: &FilterToken,
        joins: &mut JoinSet,
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        if let Some(custom) = ctx.custom(&token.field_path) {
            debug!(label = %token.label, "Applying custom filter");
            return self.apply_custom(ctx, resolver, token, custom, joins, errors);
        }

        if !ctx.is_allowed(&token.field_path, token.operator) {
            debug!(label = %token.label, operator = %token.operator, "Ignoring undeclared filter");
            return None;
        }

        let expr = match resolver.resolve(ctx.root(), &token.field_path, joins) {
            Ok(expr) => expr,
            Err(e) => {
                errors.record(ErrorCode::UnresolvablePath, e.to_string());
                return None;
            }
        };
        let descriptor = self.describe(&expr.data_type, errors)?;
        if !check_operator(descriptor, token.operator, errors) {
            return None;
        }

        let values = if token.operator.is_null_check() {
            null_check_flag(token.operator, &token.raw_values)
        } else {
            cast_values(descriptor, &token.raw_values, errors)?
        };
        crate::sift_debug!(label = %token.label, values = ?values, "Cast filter values");

        let Some(implementation) = self.operators.resolve(token.operator) else {
            errors.record(
                ErrorCode::MissingOperator,
                format!("no implementation registered for operator `{}`", token.operator),
            );
            return None;
        };
        debug!(label = %token.label, column = %expr, operator = %token.operator, "Applying filter");
        implementation.apply(&expr, &values, errors)
    }

    fn apply_custom(
        &self,
        ctx: &FilterContext,
        resolver: &PathResolver<'_>,
        token: &FilterToken,
        custom: &CustomFilterSpec,
        joins: &mut JoinSet,
        errors: &mut FieldErrors<'_>,
    ) -> Option<Filter> {
        let descriptor = self.describe(&custom.data_type, errors)?;
        let values = cast_values(descriptor, &token.raw_values, errors)?;
        let mut scope = CustomScope::new(resolver, ctx.root(), joins, errors.reborrow(), token.operator);
        custom
            .filter
            .apply(&values, &mut scope)
            .filter(|predicate| !predicate.is_none())
    }

    fn describe(
        &self,
        data_type: &DataType,
        errors: &mut FieldErrors<'_>,
    ) -> Option<&FieldTypeDescriptor> {
        let descriptor = self.field_types.describe(data_type);
        if descriptor.is_none() {
            errors.record(
                ErrorCode::MissingFieldType,
                format!("no field type registered for {}", data_type),
            );
        }
        descriptor
    }

    fn resolve_sort(
        &self,
        ctx: &FilterContext,
        resolver: &PathResolver<'_>,
        sort: &OrderBy,
        joins: &mut JoinSet,
        errors: &mut ErrorAccumulator,
    ) -> OrderBy {
        let mut resolved = OrderBy::none();
        for field in sort.fields() {
            if !ctx.is_declared(&field.column) {
                errors.record(
                    self.config.sort_param.as_str(),
                    ErrorCode::InvalidSort,
                    format!("cannot sort by `{}`: not a filterable field", field.column),
                );
                continue;
            }
            match resolver.resolve(ctx.root(), &field.column, joins) {
                Ok(expr) => {
                    resolved = resolved.then(OrderByField::new(expr.to_string(), field.order));
                }
                Err(e) => errors.record(
                    self.config.sort_param.as_str(),
                    ErrorCode::InvalidSort,
                    format!("cannot sort by `{}`: {}", field.column, e),
                ),
            }
        }
        resolved
    }

    /// Resolve every declared path of `ctx` once, reporting those that do not
    /// resolve or have no registered field type.
    ///
    /// Meant for application startup; a context that verifies cleanly can
    /// only fail at request time on caller input.
    pub fn verify(&self, ctx: &FilterContext) -> FilterResult<()> {
        let resolver = self.resolver();
        let mut joins = JoinSet::new();
        let mut errors = ErrorAccumulator::new();

        for (path, _) in ctx.fields() {
            let mut sink = errors.for_field(path);
            match resolver.resolve(ctx.root(), path, &mut joins) {
                Ok(expr) => {
                    self.describe(&expr.data_type, &mut sink);
                }
                Err(e) => sink.record(ErrorCode::UnresolvablePath, e.to_string()),
            }
        }
        for (path, spec) in ctx.custom_fields() {
            self.describe(&spec.data_type, &mut errors.for_field(path));
        }

        errors.into_result(()).map_err(|e| e.with_entity(ctx.root()))
    }
}

/// The inverting `false` flag of `IS_NOT_NULL`, if given. Anything else is
/// dropped without error.
fn null_check_flag(operator: Operator, raw_values: &[String]) -> Vec<FilterValue> {
    match raw_values {
        [raw] if operator == Operator::IsNotNull => cast_bool(raw.trim())
            .ok()
            .filter(|flag| *flag == FilterValue::Bool(false))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Setup-time configuration of a [`PredicateBuilder`].
pub struct PredicateBuilderConfig {
    field_types: Option<Arc<FieldTypeRegistry>>,
    operators: Option<Arc<OperatorRegistry>>,
    metamodel: Arc<dyn Metamodel>,
    config: FilterConfig,
}

impl PredicateBuilderConfig {
    /// Use a custom field type registry.
    pub fn field_types(mut self, registry: impl Into<Arc<FieldTypeRegistry>>) -> Self {
        self.field_types = Some(registry.into());
        self
    }

    /// Use a custom operator registry.
    pub fn operators(mut self, registry: impl Into<Arc<OperatorRegistry>>) -> Self {
        self.operators = Some(registry.into());
        self
    }

    /// Use a non-default configuration.
    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and create the builder.
    pub fn build(self) -> FilterResult<PredicateBuilder> {
        self.config.validate()?;
        let splitter = Regex::new(&regex_lite::escape(&self.config.delimiter)).map_err(|e| {
            FilterError::internal(format!("escaped delimiter `{}` did not compile", self.config.delimiter)).with_source(e)
        })?;
        Ok(PredicateBuilder {
            field_types: self
                .field_types
                .unwrap_or_else(|| Arc::new(FieldTypeRegistry::builtin())),
            operators: self
                .operators
                .unwrap_or_else(|| Arc::new(OperatorRegistry::builtin())),
            metamodel: self.metamodel,
            config: self.config,
            splitter,
        })
    }
}
