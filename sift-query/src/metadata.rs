//! Entity metadata consulted during path resolution.
//!
//! The resolver only needs to know, for an entity, which attributes exist and
//! whether each is a scalar column or a relation to another entity. That
//! question is answered through the [`Metamodel`] trait; [`Schema`] is the
//! in-memory implementation applications build at startup.
//!
//! ```rust
//! use sift_query::metadata::{Entity, Metamodel, RelationSpec, Schema};
//! use sift_query::types::DataType;
//!
//! let schema = Schema::new()
//!     .with_entity(
//!         Entity::new("User", "users")
//!             .scalar("id", DataType::I64)
//!             .scalar("name", DataType::String)
//!             .relation(RelationSpec::many_to_one("manager", "User").fields(["manager_id"])),
//!     );
//!
//! let user = schema.entity("User").unwrap();
//! assert!(user.attribute("manager").unwrap().is_relation());
//! assert_eq!(user.identifier().unwrap().column, "id");
//! ```

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::types::DataType;

/// Source of entity metadata.
pub trait Metamodel: Send + Sync {
    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<&Entity>;
}

/// Type of relation between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// One-to-one relation (e.g., User has one Profile).
    OneToOne,
    /// One-to-many relation (e.g., User has many Orders).
    OneToMany,
    /// Many-to-one relation (e.g., Order belongs to User).
    ManyToOne,
    /// Many-to-many relation through a join table (e.g., Order has many Tags).
    ManyToMany,
}

/// A relation attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Attribute name.
    pub name: SmolStr,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related entity.
    pub target: SmolStr,
    /// Columns on the owning side.
    pub fields: Vec<SmolStr>,
    /// Matching columns on the related side.
    pub references: Vec<SmolStr>,
    /// Join table for many-to-many relations.
    pub join_table: Option<JoinTableSpec>,
}

impl RelationSpec {
    fn new(name: impl Into<SmolStr>, relation_type: RelationType, target: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            relation_type,
            target: target.into(),
            fields: Vec::new(),
            references: Vec::new(),
            join_table: None,
        }
    }

    /// Create a one-to-one relation.
    pub fn one_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToOne, target)
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::OneToMany, target)
    }

    /// Create a many-to-one relation.
    pub fn many_to_one(name: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(name, RelationType::ManyToOne, target)
    }

    /// Create a many-to-many relation through a join table.
    pub fn many_to_many(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        join_table: JoinTableSpec,
    ) -> Self {
        let mut spec = Self::new(name, RelationType::ManyToMany, target);
        spec.join_table = Some(join_table);
        spec
    }

    /// Set the owning-side columns.
    pub fn fields(mut self, fields: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the related-side columns.
    pub fn references(mut self, refs: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        self.references = refs.into_iter().map(Into::into).collect();
        self
    }

    /// Column pairs joining the two sides.
    ///
    /// Unset sides fall back to the identifier columns of the respective
    /// entity.
    pub fn join_columns(&self, owner: &Entity, target: &Entity) -> Vec<(SmolStr, SmolStr)> {
        let owner_id = owner.id_column();
        let target_id = target.id_column();
        match (self.fields.is_empty(), self.references.is_empty()) {
            (true, true) => vec![(owner_id, target_id)],
            (false, true) => self
                .fields
                .iter()
                .map(|f| (f.clone(), target_id.clone()))
                .collect(),
            (true, false) => self
                .references
                .iter()
                .map(|r| (owner_id.clone(), r.clone()))
                .collect(),
            (false, false) => self
                .fields
                .iter()
                .cloned()
                .zip(self.references.iter().cloned())
                .collect(),
        }
    }
}

/// Join table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table_name: SmolStr,
    /// Column referencing the owning entity.
    pub source_column: SmolStr,
    /// Column referencing the target entity.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table_name: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// A scalar attribute backed by a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarAttribute {
    /// Column name.
    pub column: SmolStr,
    /// Native type of the column.
    pub data_type: DataType,
}

/// An entity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// A plain column.
    Scalar(ScalarAttribute),
    /// A relation to another entity.
    Relation(RelationSpec),
}

impl Attribute {
    /// Whether this attribute is a relation.
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }
}

/// An entity: a table and its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity name.
    pub name: SmolStr,
    /// Backing table.
    pub table: SmolStr,
    id: SmolStr,
    attributes: IndexMap<SmolStr, Attribute>,
}

impl Entity {
    /// Create an entity whose identifier attribute is `id`.
    pub fn new(name: impl Into<SmolStr>, table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            id: SmolStr::new_static("id"),
            attributes: IndexMap::new(),
        }
    }

    /// Set the identifier attribute.
    pub fn id(mut self, attribute: impl Into<SmolStr>) -> Self {
        self.id = attribute.into();
        self
    }

    /// Add a scalar attribute stored in a column of the same name.
    pub fn scalar(self, name: impl Into<SmolStr>, data_type: DataType) -> Self {
        let name = name.into();
        self.scalar_column(name.clone(), name, data_type)
    }

    /// Add a scalar attribute stored in a differently named column.
    pub fn scalar_column(
        mut self,
        name: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
        data_type: DataType,
    ) -> Self {
        self.attributes.insert(
            name.into(),
            Attribute::Scalar(ScalarAttribute {
                column: column.into(),
                data_type,
            }),
        );
        self
    }

    /// Add a relation attribute.
    pub fn relation(mut self, spec: RelationSpec) -> Self {
        self.attributes
            .insert(spec.name.clone(), Attribute::Relation(spec));
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Attribute names, in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(SmolStr::as_str)
    }

    /// The identifier attribute, if it is a declared scalar.
    pub fn identifier(&self) -> Option<&ScalarAttribute> {
        match self.attributes.get(&self.id) {
            Some(Attribute::Scalar(attr)) => Some(attr),
            _ => None,
        }
    }

    pub(crate) fn id_column(&self) -> SmolStr {
        self.identifier()
            .map(|attr| attr.column.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// In-memory [`Metamodel`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: IndexMap<SmolStr, Entity>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, replacing one with the same name.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the schema has no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Metamodel for Schema {
    fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Entity {
        Entity::new("User", "users")
            .scalar("id", DataType::I64)
            .scalar_column("fullName", "full_name", DataType::String)
    }

    #[test]
    fn test_relation_type() {
        let tags = RelationSpec::many_to_many("tags", "Tag", JoinTableSpec::new("user_tags", "user_id", "tag_id"));
        assert_eq!(tags.relation_type, RelationType::ManyToMany);
        assert_eq!(RelationSpec::one_to_many("orders", "Order").relation_type, RelationType::OneToMany);
        assert_eq!(RelationSpec::many_to_one("manager", "User").relation_type, RelationType::ManyToOne);
    }

    #[test]
    fn test_entity_attributes() {
        let user = user();
        assert_eq!(user.attribute_names().collect::<Vec<_>>(), vec!["id", "fullName"]);
        match user.attribute("fullName") {
            Some(Attribute::Scalar(attr)) => assert_eq!(attr.column, "full_name"),
            other => panic!("unexpected attribute: {:?}", other),
        }
        assert!(user.attribute("missing").is_none());
    }

    #[test]
    fn test_identifier() {
        assert_eq!(user().identifier().unwrap().data_type, DataType::I64);

        let keyed = Entity::new("Tag", "tags")
            .id("code")
            .scalar("code", DataType::String);
        assert_eq!(keyed.identifier().unwrap().column, "code");

        let missing = Entity::new("Bare", "bare");
        assert!(missing.identifier().is_none());
    }

    #[test]
    fn test_join_columns_defaults() {
        let order = Entity::new("Order", "orders").scalar("id", DataType::I64);
        let owner = RelationSpec::many_to_one("owner", "User").fields(["owner_id"]);
        assert_eq!(
            owner.join_columns(&order, &user()),
            vec![(SmolStr::new("owner_id"), SmolStr::new("id"))]
        );

        let orders = RelationSpec::one_to_many("orders", "Order").references(["owner_id"]);
        assert_eq!(
            orders.join_columns(&user(), &order),
            vec![(SmolStr::new("id"), SmolStr::new("owner_id"))]
        );

        let profile = RelationSpec::one_to_one("profile", "Profile");
        let profile_entity = Entity::new("Profile", "profiles").scalar("id", DataType::I64);
        assert_eq!(
            profile.join_columns(&user(), &profile_entity),
            vec![(SmolStr::new("id"), SmolStr::new("id"))]
        );
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new().with_entity(user());
        assert_eq!(schema.len(), 1);
        assert!(schema.entity("User").is_some());
        assert!(schema.entity("user").is_none());
    }
}
