//! # Sift
//!
//! Turn untyped filter input into typed, joined SQL predicates.
//!
//! Sift provides:
//! - `field__operator=value` query parameters and structured filter requests
//! - Per-endpoint declarations of which paths accept which operators
//! - Typed casting with batched, per-field error reporting
//! - Multi-hop relation paths rendered as deduplicated joins
//! - Axum extractors behind the `axum` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use sift::prelude::*;
//!
//! let schema = Schema::new()
//!     .with_entity(
//!         Entity::new("Order", "orders")
//!             .scalar("id", DataType::I64)
//!             .scalar("total", DataType::Decimal)
//!             .relation(RelationSpec::many_to_one("customer", "Customer").fields(["customer_id"])),
//!     )
//!     .with_entity(
//!         Entity::new("Customer", "customers")
//!             .scalar("id", DataType::I64)
//!             .scalar("email", DataType::String),
//!     );
//! let builder = PredicateBuilder::new(Arc::new(schema)).unwrap();
//!
//! let ctx = FilterContext::new("Order")
//!     .declare("customer__email", [Operator::Eq, Operator::EndsWith]);
//!
//! let tokens = builder
//!     .parser()
//!     .parse_query_params([("customer__email__ends_with", "@acme.io")]);
//! let built = builder.build(&ctx, &tokens).unwrap();
//!
//! let (sql, _) = built.select_sql("orders", "t0.*");
//! assert_eq!(
//!     sql,
//!     "SELECT t0.* FROM orders AS t0 LEFT JOIN customers AS t1 ON t0.customer_id = t1.id \
//!      WHERE t1.email LIKE $1 ESCAPE '\\'"
//! );
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Filter resolution and predicate construction.
pub mod query {
    pub use sift_query::*;
}

/// Axum extractors and error responses.
#[cfg(feature = "axum")]
#[cfg_attr(docsrs, doc(cfg(feature = "axum")))]
pub mod axum {
    pub use sift_axum::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sift_query::prelude::*;

    #[cfg(feature = "axum")]
    pub use sift_axum::{ErrorBody, FilterBody, FilterQuery, FilterRejection, SiftState};
}

// Re-export key types at the crate root
pub use sift_query::{BuiltFilter, FilterError, FilterResult, PredicateBuilder};
