//! Relations: base tables reflected from the schema and binary joins over
//! them, with name resolution, SQL rendering, and CRUD.

#![forbid(unsafe_code)]

mod base;
mod column;
mod crud;
mod joined;
mod registry;

use std::sync::Arc;

pub use base::BaseRelation;
pub use column::{ColumnInfo, ColumnRef, IntoColumnRef};
pub use joined::JoinedRelation;
pub use registry::RelationRegistry;

use crate::db::Database;
use crate::entity::EntityNode;
use crate::query::Value;
use crate::types::{Result, TabulaError};

/// Operations shared by base and joined relations.
pub trait Relational {
    /// Column metadata in positional order: left subtree first, then right.
    fn columns(&self) -> Vec<ColumnInfo>;

    /// Fully-qualified references in the same order as [`Relational::columns`],
    /// with qualifiers rewritten to the aliases in force at this level.
    fn column_refs(&self) -> Vec<ColumnRef>;

    /// SQL text usable after `FROM`.
    fn relation_expression(&self) -> Result<String>;

    /// Maps a possibly-unqualified reference onto the unique column it names.
    ///
    /// `alias` is the alias the caller knows this relation by; `depth` is the
    /// nesting level of the call and is bounded by
    /// [`MAX_JOIN_DEPTH`](crate::types::MAX_JOIN_DEPTH).
    fn resolve_column(&self, column: &ColumnRef, alias: Option<&str>, depth: usize)
        -> Result<ColumnRef>;

    /// Names of every base table in the relation, left to right.
    fn table_names(&self, depth: usize) -> Result<Vec<String>>;

    /// A fresh empty entity. Only base relations can produce one.
    fn blank_entity(&self) -> Result<EntityNode>;
}

/// Hooks the read path needs on every relation shape.
pub(crate) trait Materialize {
    fn database(&self) -> &Database;

    /// Empty entity tree mirroring the relation's shape.
    fn skeleton(&self) -> EntityNode;
}

/// How the rows of two relations are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `INNER JOIN`.
    #[default]
    Inner,
    /// `FULL OUTER JOIN`.
    Outer,
    /// `LEFT JOIN`.
    Left,
    /// `RIGHT JOIN`.
    Right,
}

impl JoinKind {
    /// SQL keyword sequence for the join.
    pub fn sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Outer => "FULL OUTER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// Join condition and options: keys, kind, and per-side aliases.
///
/// ```
/// use tabula::{JoinKind, JoinOn};
///
/// let on = JoinOn::new("u.id", "project_members.user_id")
///     .kind(JoinKind::Left)
///     .left_alias("u");
/// assert_eq!(on.join_kind(), JoinKind::Left);
/// ```
#[derive(Clone, Debug)]
pub struct JoinOn {
    left_key: String,
    right_key: String,
    kind: JoinKind,
    left_alias: Option<String>,
    right_alias: Option<String>,
}

impl JoinOn {
    /// Inner join on `left_key = right_key`.
    pub fn new(left_key: impl Into<String>, right_key: impl Into<String>) -> Self {
        Self {
            left_key: left_key.into(),
            right_key: right_key.into(),
            kind: JoinKind::Inner,
            left_alias: None,
            right_alias: None,
        }
    }

    /// Sets the join kind.
    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Aliases the left side. Only valid when the left side is a base relation.
    pub fn left_alias(mut self, alias: impl Into<String>) -> Self {
        self.left_alias = Some(alias.into());
        self
    }

    /// Aliases the right side. Only valid when the right side is a base relation.
    pub fn right_alias(mut self, alias: impl Into<String>) -> Self {
        self.right_alias = Some(alias.into());
        self
    }

    /// Aliases both sides.
    pub fn aliases(self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.left_alias(left).right_alias(right)
    }

    /// Configured join kind.
    pub fn join_kind(&self) -> JoinKind {
        self.kind
    }
}

/// Either kind of relation, cheap to clone.
#[derive(Clone, Debug)]
pub enum Relation {
    /// A single table.
    Base(Arc<BaseRelation>),
    /// Two relations joined on a key pair.
    Joined(Arc<JoinedRelation>),
}

impl From<Arc<BaseRelation>> for Relation {
    fn from(base: Arc<BaseRelation>) -> Self {
        Relation::Base(base)
    }
}

impl From<&Arc<BaseRelation>> for Relation {
    fn from(base: &Arc<BaseRelation>) -> Self {
        Relation::Base(Arc::clone(base))
    }
}

impl From<Arc<JoinedRelation>> for Relation {
    fn from(joined: Arc<JoinedRelation>) -> Self {
        Relation::Joined(joined)
    }
}

impl From<&Relation> for Relation {
    fn from(relation: &Relation) -> Self {
        relation.clone()
    }
}

impl Relation {
    /// Joins `self` (left) with `right` under the given condition.
    pub fn join(&self, right: impl Into<Relation>, on: JoinOn) -> Result<Relation> {
        JoinedRelation::new(self.clone(), right.into(), on).map(Relation::Joined)
    }

    /// [`Relation::join`] with [`JoinKind::Inner`].
    pub fn inner_join(&self, right: impl Into<Relation>, on: JoinOn) -> Result<Relation> {
        self.join(right, on.kind(JoinKind::Inner))
    }

    /// [`Relation::join`] with [`JoinKind::Left`].
    pub fn left_join(&self, right: impl Into<Relation>, on: JoinOn) -> Result<Relation> {
        self.join(right, on.kind(JoinKind::Left))
    }

    /// [`Relation::join`] with [`JoinKind::Right`].
    pub fn right_join(&self, right: impl Into<Relation>, on: JoinOn) -> Result<Relation> {
        self.join(right, on.kind(JoinKind::Right))
    }

    /// [`Relation::join`] with [`JoinKind::Outer`].
    pub fn outer_join(&self, right: impl Into<Relation>, on: JoinOn) -> Result<Relation> {
        self.join(right, on.kind(JoinKind::Outer))
    }

    /// The base relation, if this is one.
    pub fn as_base(&self) -> Option<&Arc<BaseRelation>> {
        match self {
            Relation::Base(base) => Some(base),
            Relation::Joined(_) => None,
        }
    }

    /// The joined relation, if this is one.
    pub fn as_joined(&self) -> Option<&Arc<JoinedRelation>> {
        match self {
            Relation::Joined(joined) => Some(joined),
            Relation::Base(_) => None,
        }
    }

    pub(crate) fn registry_id(&self) -> u64 {
        match self {
            Relation::Base(base) => base.registry_id(),
            Relation::Joined(joined) => joined.registry_id(),
        }
    }

    fn base_only(&self, operation: &'static str) -> Result<&Arc<BaseRelation>> {
        self.as_base().ok_or(TabulaError::NotSupported(operation))
    }

    /// Reads the row with the given id. Base relations only.
    pub fn read(&self, id: i64) -> Result<Option<EntityNode>> {
        self.base_only("read by id on a joined relation")?.read(id)
    }

    /// Inserts the entity. Base relations only.
    pub fn create(&self, entity: &mut EntityNode) -> Result<Option<i64>> {
        self.base_only("create on a joined relation")?.create(entity)
    }

    /// Updates the entity's row. Base relations only.
    pub fn update(&self, entity: &mut EntityNode) -> Result<Option<usize>> {
        self.base_only("update on a joined relation")?.update(entity)
    }

    /// Deletes the row with the given id. Base relations only.
    pub fn delete(&self, id: i64) -> Result<usize> {
        self.base_only("delete on a joined relation")?.delete(id)
    }

    /// Every row whose `column` equals `value`.
    pub fn read_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<Vec<EntityNode>> {
        crud::read_by_column(self, column.into_column_ref()?, value.into())
    }

    /// The single row whose `column` equals `value`.
    pub fn read_one_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<EntityNode> {
        crud::exactly_one(self.read_by_column(column, value)?)
    }

    /// The row whose `column` equals `value`, if any.
    pub fn read_one_or_none_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<Option<EntityNode>> {
        crud::at_most_one(self.read_by_column(column, value)?)
    }
}

impl Relational for Relation {
    fn columns(&self) -> Vec<ColumnInfo> {
        match self {
            Relation::Base(base) => base.columns(),
            Relation::Joined(joined) => joined.columns(),
        }
    }

    fn column_refs(&self) -> Vec<ColumnRef> {
        match self {
            Relation::Base(base) => base.column_refs(),
            Relation::Joined(joined) => joined.column_refs(),
        }
    }

    fn relation_expression(&self) -> Result<String> {
        match self {
            Relation::Base(base) => base.relation_expression(),
            Relation::Joined(joined) => joined.relation_expression(),
        }
    }

    fn resolve_column(
        &self,
        column: &ColumnRef,
        alias: Option<&str>,
        depth: usize,
    ) -> Result<ColumnRef> {
        match self {
            Relation::Base(base) => base.resolve_column(column, alias, depth),
            Relation::Joined(joined) => joined.resolve_column(column, alias, depth),
        }
    }

    fn table_names(&self, depth: usize) -> Result<Vec<String>> {
        match self {
            Relation::Base(base) => base.table_names(depth),
            Relation::Joined(joined) => joined.table_names(depth),
        }
    }

    fn blank_entity(&self) -> Result<EntityNode> {
        match self {
            Relation::Base(base) => base.blank_entity(),
            Relation::Joined(joined) => joined.blank_entity(),
        }
    }
}

impl Materialize for Relation {
    fn database(&self) -> &Database {
        match self {
            Relation::Base(base) => Materialize::database(base.as_ref()),
            Relation::Joined(joined) => Materialize::database(joined.as_ref()),
        }
    }

    fn skeleton(&self) -> EntityNode {
        match self {
            Relation::Base(base) => base.skeleton(),
            Relation::Joined(joined) => joined.skeleton(),
        }
    }
}
