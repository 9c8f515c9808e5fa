//! # sift-query
//!
//! Filter resolution and predicate construction for Sift.
//!
//! This crate turns untyped filter input, such as URL query parameters or
//! structured request bodies, into a typed predicate over a relational entity
//! graph:
//! - Parsing of `field__operator=value` keys and structured filter requests
//! - An 18-operator catalog with per-type operator support
//! - Casting of raw strings into the field's native type
//! - Multi-hop path resolution across relations with deduplicated joins
//! - Application-supplied custom filters
//! - Batched error reporting that separates caller mistakes from
//!   configuration mistakes
//!
//! ## End to end
//!
//! ```rust
//! use std::sync::Arc;
//! use sift_query::prelude::*;
//!
//! let schema = Schema::new().with_entity(
//!     Entity::new("User", "users")
//!         .scalar("id", DataType::I64)
//!         .scalar("name", DataType::String)
//!         .scalar("age", DataType::I32),
//! );
//! let builder = PredicateBuilder::new(Arc::new(schema)).unwrap();
//!
//! let ctx = FilterContext::new("User")
//!     .declare("name", [Operator::Eq, Operator::IContains])
//!     .declare("age", [Operator::Eq, Operator::Gt, Operator::Lt]);
//!
//! let tokens = builder.parser().parse_query_params([
//!     ("name__icontains", "acme"),
//!     ("age__gt", "18"),
//!     ("page", "3"),
//! ]);
//! let built = builder.build(&ctx, &tokens).unwrap();
//!
//! let (sql, params) = built.to_sql(0);
//! assert_eq!(sql, "(UPPER(t0.name) LIKE UPPER($1) ESCAPE '\\' AND t0.age > $2)");
//! assert_eq!(params, vec![FilterValue::from("%acme%"), FilterValue::Int(18)]);
//! ```
//!
//! ## Errors
//!
//! ```rust
//! use std::sync::Arc;
//! use sift_query::prelude::*;
//!
//! let schema = Schema::new().with_entity(
//!     Entity::new("User", "users").scalar("id", DataType::I64).scalar("age", DataType::I32),
//! );
//! let builder = PredicateBuilder::new(Arc::new(schema)).unwrap();
//! let ctx = FilterContext::new("User").declare("age", Operator::Eq);
//!
//! let tokens = builder.parser().parse_query_params([("age", "abc")]);
//! let err = builder.build(&ctx, &tokens).unwrap_err();
//!
//! assert_eq!(err.code, ErrorCode::Validation);
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(err.field_errors("age").len(), 1);
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod field_type;
pub mod filter;
pub mod logging;
pub mod metadata;
pub mod operator;
pub mod operators;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod types;
pub mod validate;

pub use builder::{BuiltFilter, PredicateBuilder, PredicateBuilderConfig};
pub use config::{ConfigError, FilterConfig};
pub use context::{CustomFilter, CustomFilterSpec, CustomScope, FilterContext};
pub use error::{ErrorCode, ErrorContext, ErrorKind, FieldErrorMap, FilterError, FilterResult};
pub use field_type::{CastError, FieldTypeDescriptor, FieldTypeRegistry, FieldTypeRegistryBuilder};
pub use filter::{Expr, Filter, FilterValue, Transform};
pub use metadata::{Attribute, Entity, JoinTableSpec, Metamodel, RelationSpec, RelationType, Schema};
pub use operator::{Operator, OperatorSet};
pub use operators::{OperatorImpl, OperatorRegistry, OperatorRegistryBuilder};
pub use parser::{FilterParser, FilterRequest};
pub use resolver::{Join, JoinKind, JoinSet, PathResolver, ResolveError};
pub use token::{FilterToken, Origin};
pub use types::{DataType, OrderBy, OrderByField, SortOrder, TemporalGroup};
pub use validate::{ErrorAccumulator, FieldError, FieldErrors};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::{BuiltFilter, PredicateBuilder};
    pub use crate::config::FilterConfig;
    pub use crate::context::{CustomFilter, CustomScope, FilterContext};
    pub use crate::error::{ErrorCode, FilterError, FilterResult};
    pub use crate::field_type::{FieldTypeDescriptor, FieldTypeRegistry};
    pub use crate::filter::{Expr, Filter, FilterValue};
    pub use crate::metadata::{Entity, JoinTableSpec, Metamodel, RelationSpec, Schema};
    pub use crate::operator::{Operator, OperatorSet};
    pub use crate::operators::{OperatorImpl, OperatorRegistry};
    pub use crate::parser::{FilterParser, FilterRequest};
    pub use crate::token::{FilterToken, Origin};
    pub use crate::types::{DataType, OrderBy, OrderByField, SortOrder};
    pub use crate::validate::FieldErrors;
}
