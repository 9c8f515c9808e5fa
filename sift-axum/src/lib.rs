//! Axum integration for Sift filters.
//!
//! This crate connects the Sift filter pipeline to the
//! [Axum](https://github.com/tokio-rs/axum) web framework.
//!
//! # Features
//!
//! - **State**: [`SiftState`] holds the shared predicate builder and the
//!   filter contexts of every endpoint
//! - **Extractors**: [`FilterQuery`] reads `field__operator=value` query
//!   parameters and the sort parameter, [`FilterBody`] reads a JSON list of
//!   structured filter requests
//! - **Error responses**: [`FilterRejection`] renders
//!   `{ timestamp, message, path, errors }` with a 400 status for caller
//!   mistakes and 500 for misconfiguration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::{Json, Router, extract::State, routing::get};
//! use sift_axum::prelude::*;
//!
//! async fn list_users(
//!     State(sift): State<SiftState>,
//!     query: FilterQuery,
//! ) -> Result<Json<String>, FilterRejection> {
//!     let built = sift.build_query("User", &query)?;
//!     let (sql, _params) = built.select_sql("users", "t0.*");
//!     Ok(Json(sql))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let builder = PredicateBuilder::new(Arc::new(schema())).unwrap();
//!     let sift = SiftState::new(builder)
//!         .with_context(FilterContext::new("User").declare("name", OperatorSet::TEXT));
//!
//!     let app = Router::new().route("/users", get(list_users)).with_state(sift);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{
        FromRef, FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use sift_query::{
    BuiltFilter, ErrorCode, FieldErrorMap, FilterContext, FilterError, FilterRequest, FilterToken,
    OrderBy, PredicateBuilder,
};

/// Errors produced while extracting or building filters.
#[derive(Error, Debug)]
pub enum FilterRejection {
    /// The query string could not be decoded.
    #[error("invalid query string: {source}")]
    InvalidQuery {
        /// Request path.
        path: String,
        /// Underlying rejection.
        #[source]
        source: QueryRejection,
    },

    /// The request body is not a list of filter requests.
    #[error("invalid filter body: {source}")]
    InvalidBody {
        /// Request path.
        path: String,
        /// Underlying rejection.
        #[source]
        source: JsonRejection,
    },

    /// The filter pipeline failed.
    #[error("{error}")]
    Filter {
        /// Request path.
        path: String,
        /// Underlying error.
        #[source]
        error: FilterError,
    },
}

impl FilterRejection {
    /// Request path the rejection belongs to.
    pub fn path(&self) -> &str {
        match self {
            Self::InvalidQuery { path, .. } | Self::InvalidBody { path, .. } | Self::Filter { path, .. } => path,
        }
    }

    /// HTTP status of the rejection.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidQuery { source, .. } => source.status(),
            Self::InvalidBody { source, .. } => source.status(),
            Self::Filter { error, .. } => {
                StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// The response body.
    pub fn body(&self) -> ErrorBody {
        let (message, errors) = match self {
            Self::Filter { error, .. } => (error.message.clone(), error.errors.clone()),
            other => (other.to_string(), FieldErrorMap::new()),
        };
        ErrorBody {
            timestamp: Utc::now(),
            message,
            path: self.path().to_string(),
            errors,
        }
    }
}

impl IntoResponse for FilterRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(path = %self.path(), error = %self, "Filter misconfiguration");
        } else {
            debug!(path = %self.path(), error = %self, "Rejected filter input");
        }
        (status, Json(self.body())).into_response()
    }
}

/// JSON shape of a filter error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// When the error was produced.
    pub timestamp: DateTime<Utc>,
    /// Summary message.
    pub message: String,
    /// Request path.
    pub path: String,
    /// Messages per input label.
    pub errors: FieldErrorMap,
}

/// Shared filter state: the predicate builder and one context per root
/// entity.
///
/// Cheap to clone. Add it to the router state directly or expose it through
/// [`FromRef`].
#[derive(Debug, Clone)]
pub struct SiftState {
    builder: PredicateBuilder,
    contexts: Arc<HashMap<SmolStr, Arc<FilterContext>>>,
}

impl SiftState {
    /// Create state around a predicate builder.
    pub fn new(builder: PredicateBuilder) -> Self {
        info!(config = ?builder.config(), "SiftState created");
        Self {
            builder,
            contexts: Arc::new(HashMap::new()),
        }
    }

    /// Register the context of a root entity, replacing an earlier one.
    pub fn with_context(mut self, ctx: FilterContext) -> Self {
        let root = SmolStr::new(ctx.root());
        Arc::make_mut(&mut self.contexts).insert(root, Arc::new(ctx));
        self
    }

    /// The predicate builder.
    pub fn builder(&self) -> &PredicateBuilder {
        &self.builder
    }

    /// The context registered for `root`.
    pub fn context(&self, root: &str) -> Option<&FilterContext> {
        self.contexts.get(root).map(Arc::as_ref)
    }

    /// Build the filter for a query-string request against `root`.
    pub fn build_query(&self, root: &str, query: &FilterQuery) -> Result<BuiltFilter, FilterRejection> {
        self.build(root, &query.tokens, &query.sort, &query.path)
    }

    /// Build the filter for a structured request against `root`.
    pub fn build_body(&self, root: &str, body: &FilterBody) -> Result<BuiltFilter, FilterRejection> {
        self.build(root, &body.tokens, &OrderBy::none(), &body.path)
    }

    fn build(
        &self,
        root: &str,
        tokens: &[FilterToken],
        sort: &OrderBy,
        path: &str,
    ) -> Result<BuiltFilter, FilterRejection> {
        let reject = |error: FilterError| FilterRejection::Filter {
            path: path.to_string(),
            error,
        };
        let ctx = self.context(root).ok_or_else(|| {
            reject(FilterError::new(
                ErrorCode::Misconfigured,
                format!("No filter context registered for `{}`", root),
            ))
        })?;
        self.builder.build_with_sort(ctx, tokens, sort).map_err(reject)
    }
}

/// Filters and sort specification read from the query string.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    /// Filter tokens, one per distinct parameter key.
    pub tokens: Vec<FilterToken>,
    /// Sort specification holding field paths.
    pub sort: OrderBy,
    /// Request path.
    pub path: String,
}

impl<S> FromRequestParts<S> for FilterQuery
where
    SiftState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = FilterRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|source| {
            FilterRejection::InvalidQuery {
                path: path.clone(),
                source,
            }
        })?;

        let sift = SiftState::from_ref(state);
        let parser = sift.builder().parser();
        let pairs = || pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let tokens = parser.parse_query_params(pairs());
        let sort = parser.sort_from_query_params(pairs());
        debug!(path = %path, tokens = tokens.len(), "Extracted query filters");

        Ok(Self { tokens, sort, path })
    }
}

/// Filters read from a JSON body of [`FilterRequest`] entries.
#[derive(Debug, Clone)]
pub struct FilterBody {
    /// Filter tokens, in body order.
    pub tokens: Vec<FilterToken>,
    /// Request path.
    pub path: String,
}

impl<S> FromRequest<S> for FilterBody
where
    SiftState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = FilterRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = req.uri().path().to_string();
        let Json(entries) = Json::<Vec<FilterRequest>>::from_request(req, state)
            .await
            .map_err(|source| FilterRejection::InvalidBody {
                path: path.clone(),
                source,
            })?;

        let sift = SiftState::from_ref(state);
        let tokens = sift.builder().parser().parse_request(entries);
        debug!(path = %path, tokens = tokens.len(), "Extracted body filters");

        Ok(Self { tokens, path })
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{ErrorBody, FilterBody, FilterQuery, FilterRejection, SiftState};
    pub use sift_query::prelude::*;
}
