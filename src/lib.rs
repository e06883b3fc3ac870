//! Tabula: relation and entity mapping over a single-file SQLite database.
//!
//! Tables are registered once in a [`relation::RelationRegistry`], composed
//! into join trees through [`relation::Relation::join`], and read back as
//! [`entity::EntityNode`] trees addressable by table name, join alias, or
//! unqualified column name when it is unambiguous.

#![warn(missing_docs)]

pub mod config;
pub mod db;
pub mod entity;
pub mod query;
pub mod relation;
pub mod telemetry;
pub mod types;

pub use entity::{
    ColumnMap, EntityDict, EntityNode, JoinedEntity, LeafEntity, Member, SaveGuard,
};
pub use query::Value;
pub use relation::{
    BaseRelation, ColumnInfo, ColumnRef, IntoColumnRef, JoinKind, JoinOn, JoinedRelation,
    Relation, RelationRegistry, Relational,
};
pub use types::{Result, TabulaError, MAX_JOIN_DEPTH};
