//! Field path resolution across entity relations.
//!
//! A path such as `owner__manager__name` is split on the configured delimiter
//! and walked from the root entity. Every relation hop adds a `LEFT JOIN` to
//! the pass's [`JoinSet`]; the terminal segment yields a typed [`Expr`].
//!
//! ```rust
//! use sift_query::metadata::{Entity, RelationSpec, Schema};
//! use sift_query::resolver::{JoinSet, PathResolver};
//! use sift_query::types::DataType;
//!
//! let schema = Schema::new()
//!     .with_entity(
//!         Entity::new("Order", "orders")
//!             .scalar("id", DataType::I64)
//!             .relation(RelationSpec::many_to_one("owner", "User").fields(["owner_id"])),
//!     )
//!     .with_entity(
//!         Entity::new("User", "users")
//!             .scalar("id", DataType::I64)
//!             .scalar("name", DataType::String),
//!     );
//!
//! let resolver = PathResolver::new(&schema, "__").unwrap();
//! let mut joins = JoinSet::new();
//!
//! let expr = resolver.resolve("Order", "owner__name", &mut joins).unwrap();
//! assert_eq!(expr.to_string(), "t1.name");
//! assert_eq!(joins.to_sql(), "LEFT JOIN users AS t1 ON t0.owner_id = t1.id");
//! ```

use std::collections::HashMap;

use regex_lite::Regex;
use smol_str::{SmolStr, format_smolstr};
use thiserror::Error;
use tracing::trace;

use crate::filter::Expr;
use crate::metadata::{Attribute, Entity, Metamodel, RelationSpec, RelationType};

/// Alias of the root entity's table.
pub const ROOT_ALIAS: &str = "t0";

/// Why a field path could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The path is empty or contains an empty segment.
    #[error("field path `{path}` contains an empty segment")]
    EmptySegment {
        /// The offending path.
        path: String,
    },

    /// An entity named by the root or a relation target is unknown.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// The entity has no such attribute.
    #[error("entity `{entity}` has no attribute `{attribute}`")]
    UnknownAttribute {
        /// Entity searched.
        entity: String,
        /// Attribute requested.
        attribute: String,
    },

    /// Segments follow a scalar attribute.
    #[error("`{attribute}` on `{entity}` is not a relation; cannot resolve `{rest}` beyond it")]
    TrailingSegments {
        /// Entity holding the scalar.
        entity: String,
        /// The scalar attribute.
        attribute: String,
        /// Unconsumed remainder of the path.
        rest: String,
    },

    /// A relation target has no scalar identifier to filter by.
    #[error("entity `{0}` has no identifier attribute")]
    MissingIdentifier(String),
}

/// Kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinKind {
    /// LEFT OUTER JOIN.
    #[default]
    Left,
    /// INNER JOIN.
    Inner,
}

impl JoinKind {
    /// SQL keyword for this join kind.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Left => "LEFT JOIN",
            Self::Inner => "INNER JOIN",
        }
    }
}

/// One generated join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Alias of the joined table.
    pub alias: SmolStr,
    /// Alias of the table joined from.
    pub parent_alias: SmolStr,
    /// Relation this join traverses.
    pub relation: SmolStr,
    /// Joined table.
    pub table: SmolStr,
    /// Join kind.
    pub kind: JoinKind,
    /// `(parent column, joined column)` equality pairs.
    pub on: Vec<(SmolStr, SmolStr)>,
}

impl Join {
    /// Generate the SQL for this join.
    pub fn to_sql(&self) -> String {
        let conditions: Vec<String> = self
            .on
            .iter()
            .map(|(l, r)| format!("{}.{} = {}.{}", self.parent_alias, l, self.alias, r))
            .collect();
        format!(
            "{} {} AS {} ON {}",
            self.kind.as_sql(),
            self.table,
            self.alias,
            conditions.join(" AND ")
        )
    }
}

/// Joins generated during one build pass.
///
/// A relation traversed twice from the same table alias reuses the first
/// join. Create a fresh set per pass.
#[derive(Debug, Clone, Default)]
pub struct JoinSet {
    joins: Vec<Join>,
    index: HashMap<(SmolStr, SmolStr), SmolStr>,
    kind: JoinKind,
}

impl JoinSet {
    /// Create an empty set producing `LEFT JOIN`s.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set producing joins of `kind`.
    pub fn with_kind(kind: JoinKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Generated joins, in creation order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Number of joins.
    pub fn len(&self) -> usize {
        self.joins.len()
    }

    /// Whether no join was generated.
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Generate the SQL for all joins.
    pub fn to_sql(&self) -> String {
        self.joins
            .iter()
            .map(Join::to_sql)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn next_alias(&self) -> SmolStr {
        format_smolstr!("t{}", self.joins.len() + 1)
    }

    fn push(&mut self, parent_alias: SmolStr, relation: SmolStr, table: SmolStr, on: Vec<(SmolStr, SmolStr)>) -> SmolStr {
        let alias = self.next_alias();
        trace!(%alias, %parent_alias, %relation, %table, "Adding join");
        self.joins.push(Join {
            alias: alias.clone(),
            parent_alias,
            relation,
            table,
            kind: self.kind,
            on,
        });
        alias
    }

    /// Join `relation` from `parent_alias`, returning the alias of the
    /// target's table.
    fn join(&mut self, parent_alias: &SmolStr, owner: &Entity, relation: &RelationSpec, target: &Entity) -> SmolStr {
        let key = (parent_alias.clone(), relation.name.clone());
        if let Some(alias) = self.index.get(&key) {
            return alias.clone();
        }

        let alias = match (relation.relation_type, &relation.join_table) {
            (RelationType::ManyToMany, Some(through)) => {
                let owner_column = relation
                    .fields
                    .first()
                    .cloned()
                    .unwrap_or_else(|| owner.id_column());
                let target_column = relation
                    .references
                    .first()
                    .cloned()
                    .unwrap_or_else(|| target.id_column());
                let link = self.push(
                    parent_alias.clone(),
                    format_smolstr!("{}#through", relation.name),
                    through.table_name.clone(),
                    vec![(owner_column, through.source_column.clone())],
                );
                self.push(
                    link,
                    relation.name.clone(),
                    target.table.clone(),
                    vec![(through.target_column.clone(), target_column)],
                )
            }
            _ => self.push(
                parent_alias.clone(),
                relation.name.clone(),
                target.table.clone(),
                relation.join_columns(owner, target),
            ),
        };
        self.index.insert(key, alias.clone());
        alias
    }
}

/// Walks field paths against a [`Metamodel`].
pub struct PathResolver<'a> {
    metamodel: &'a dyn Metamodel,
    delimiter: &'a str,
    splitter: Regex,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver splitting paths on `delimiter`.
    ///
    /// The delimiter is matched literally, regex metacharacters included.
    pub fn new(metamodel: &'a dyn Metamodel, delimiter: &'a str) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            metamodel,
            delimiter,
            splitter: Regex::new(&regex_lite::escape(delimiter))?,
        })
    }

    pub(crate) fn with_splitter(metamodel: &'a dyn Metamodel, delimiter: &'a str, splitter: Regex) -> Self {
        Self {
            metamodel,
            delimiter,
            splitter,
        }
    }

    /// Split a path into its segments.
    pub fn segments<'p>(&self, path: &'p str) -> Vec<&'p str> {
        self.splitter.split(path).collect()
    }

    /// Resolve `path` from the `root` entity.
    ///
    /// A terminal relation resolves to the related entity's identifier.
    pub fn resolve(&self, root: &str, path: &str, joins: &mut JoinSet) -> Result<Expr, ResolveError> {
        let segments = self.segments(path);
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResolveError::EmptySegment { path: path.to_string() });
        }

        let mut entity = self
            .metamodel
            .entity(root)
            .ok_or_else(|| ResolveError::UnknownEntity(root.to_string()))?;
        let mut alias = SmolStr::new_static(ROOT_ALIAS);
        let last = segments.len() - 1;

        for (i, segment) in segments.iter().enumerate() {
            let attribute = entity
                .attribute(segment)
                .ok_or_else(|| ResolveError::UnknownAttribute {
                    entity: entity.name.to_string(),
                    attribute: segment.to_string(),
                })?;

            match attribute {
                Attribute::Scalar(scalar) => {
                    if i != last {
                        return Err(ResolveError::TrailingSegments {
                            entity: entity.name.to_string(),
                            attribute: segment.to_string(),
                            rest: segments[i + 1..].join(self.delimiter),
                        });
                    }
                    return Ok(Expr::new(alias, scalar.column.clone(), scalar.data_type.clone()));
                }
                Attribute::Relation(relation) => {
                    let target = self
                        .metamodel
                        .entity(&relation.target)
                        .ok_or_else(|| ResolveError::UnknownEntity(relation.target.to_string()))?;
                    alias = joins.join(&alias, entity, relation, target);
                    entity = target;
                }
            }
        }

        let id = entity
            .identifier()
            .ok_or_else(|| ResolveError::MissingIdentifier(entity.name.to_string()))?;
        Ok(Expr::new(alias, id.column.clone(), id.data_type.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{JoinTableSpec, Schema};
    use crate::types::DataType;

    fn schema() -> Schema {
        Schema::new()
            .with_entity(
                Entity::new("Order", "orders")
                    .scalar("id", DataType::I64)
                    .scalar_column("placedAt", "placed_at", DataType::Instant)
                    .relation(RelationSpec::many_to_one("owner", "User").fields(["owner_id"]))
                    .relation(RelationSpec::many_to_many(
                        "tags",
                        "Tag",
                        JoinTableSpec::new("order_tags", "order_id", "tag_id"),
                    ))
                    .relation(RelationSpec::many_to_one("ghost", "Missing")),
            )
            .with_entity(
                Entity::new("User", "users")
                    .scalar("id", DataType::I64)
                    .scalar("name", DataType::String)
                    .relation(RelationSpec::many_to_one("manager", "User").fields(["manager_id"])),
            )
            .with_entity(
                Entity::new("Tag", "tags")
                    .id("code")
                    .scalar("code", DataType::String),
            )
    }

    fn resolve(path: &str) -> (Result<Expr, ResolveError>, JoinSet) {
        let schema = schema();
        let resolver = PathResolver::new(&schema, "__").unwrap();
        let mut joins = JoinSet::new();
        let result = resolver.resolve("Order", path, &mut joins);
        (result, joins)
    }

    #[test]
    fn test_scalar_on_root() {
        let (expr, joins) = resolve("placedAt");
        let expr = expr.unwrap();
        assert_eq!(expr.to_string(), "t0.placed_at");
        assert_eq!(expr.data_type, DataType::Instant);
        assert!(joins.is_empty());
    }

    #[test]
    fn test_two_hops() {
        let (expr, joins) = resolve("owner__manager__name");
        assert_eq!(expr.unwrap().to_string(), "t2.name");
        assert_eq!(
            joins.to_sql(),
            "LEFT JOIN users AS t1 ON t0.owner_id = t1.id LEFT JOIN users AS t2 ON t1.manager_id = t2.id"
        );
    }

    #[test]
    fn test_terminal_relation_uses_identifier() {
        let (expr, joins) = resolve("owner");
        let expr = expr.unwrap();
        assert_eq!(expr.to_string(), "t1.id");
        assert_eq!(expr.data_type, DataType::I64);
        assert_eq!(joins.len(), 1);
    }

    #[test]
    fn test_many_to_many_goes_through_join_table() {
        let (expr, joins) = resolve("tags");
        assert_eq!(expr.unwrap().to_string(), "t2.code");
        assert_eq!(
            joins.to_sql(),
            "LEFT JOIN order_tags AS t1 ON t0.id = t1.order_id LEFT JOIN tags AS t2 ON t1.tag_id = t2.code"
        );
    }

    #[test]
    fn test_join_table_only_used_for_many_to_many() {
        let mut owner = RelationSpec::many_to_one("owner", "User").fields(["owner_id"]);
        owner.join_table = Some(JoinTableSpec::new("order_owners", "order_id", "user_id"));
        let schema = Schema::new()
            .with_entity(Entity::new("Order", "orders").scalar("id", DataType::I64).relation(owner))
            .with_entity(Entity::new("User", "users").scalar("id", DataType::I64));
        let resolver = PathResolver::new(&schema, "__").unwrap();
        let mut joins = JoinSet::new();
        resolver.resolve("Order", "owner__id", &mut joins).unwrap();
        assert_eq!(joins.to_sql(), "LEFT JOIN users AS t1 ON t0.owner_id = t1.id");
    }

    #[test]
    fn test_joins_are_reused_within_a_pass() {
        let schema = schema();
        let resolver = PathResolver::new(&schema, "__").unwrap();
        let mut joins = JoinSet::new();
        let name = resolver.resolve("Order", "owner__name", &mut joins).unwrap();
        let id = resolver.resolve("Order", "owner__id", &mut joins).unwrap();
        let manager = resolver.resolve("Order", "owner__manager__name", &mut joins).unwrap();
        assert_eq!(name.source, "t1");
        assert_eq!(id.source, "t1");
        assert_eq!(manager.source, "t2");
        assert_eq!(joins.len(), 2);
    }

    #[test]
    fn test_unknown_attribute() {
        let (expr, _) = resolve("owner__nmae");
        assert_eq!(
            expr.unwrap_err(),
            ResolveError::UnknownAttribute {
                entity: "User".into(),
                attribute: "nmae".into()
            }
        );
    }

    #[test]
    fn test_trailing_segments_after_scalar() {
        let (expr, _) = resolve("placedAt__year");
        let err = expr.unwrap_err();
        assert!(matches!(err, ResolveError::TrailingSegments { ref rest, .. } if rest == "year"));
    }

    #[test]
    fn test_unknown_target_and_root() {
        let (expr, _) = resolve("ghost__id");
        assert_eq!(expr.unwrap_err(), ResolveError::UnknownEntity("Missing".into()));

        let schema = schema();
        let resolver = PathResolver::new(&schema, "__").unwrap();
        let err = resolver.resolve("Nope", "id", &mut JoinSet::new()).unwrap_err();
        assert_eq!(err, ResolveError::UnknownEntity("Nope".into()));
    }

    #[test]
    fn test_empty_segments() {
        for path in ["", "owner__", "__name", "owner____name"] {
            let (expr, _) = resolve(path);
            assert!(matches!(expr, Err(ResolveError::EmptySegment { .. })), "{path}");
        }
    }

    #[test]
    fn test_regex_metacharacter_delimiter() {
        let schema = schema();
        let resolver = PathResolver::new(&schema, ".").unwrap();
        assert_eq!(resolver.segments("owner.name"), vec!["owner", "name"]);
        let expr = resolver.resolve("Order", "owner.name", &mut JoinSet::new()).unwrap();
        assert_eq!(expr.to_string(), "t1.name");
    }

    #[test]
    fn test_inner_join_kind() {
        let schema = schema();
        let resolver = PathResolver::new(&schema, "__").unwrap();
        let mut joins = JoinSet::with_kind(JoinKind::Inner);
        resolver.resolve("Order", "owner__name", &mut joins).unwrap();
        assert_eq!(joins.to_sql(), "INNER JOIN users AS t1 ON t0.owner_id = t1.id");
    }
}
