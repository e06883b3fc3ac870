//! Entity trees: the runtime values read from, and written to, relations.
//!
//! A [`EntityNode`] mirrors the shape of the relation that produced it. Column
//! access on a joined node probes both children and succeeds only when
//! exactly one of them owns the column.

#![forbid(unsafe_code)]

mod guard;
mod joined;
mod leaf;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use smallvec::SmallVec;
use tracing::trace;

pub use guard::SaveGuard;
pub use joined::JoinedEntity;
pub use leaf::LeafEntity;

use crate::db::validate_identifiers;
use crate::query::Value;
use crate::relation::{ColumnRef, IntoColumnRef};
use crate::types::{absent_if_not_found, Result, TabulaError, MAX_JOIN_DEPTH};

/// Column name to value, for one physical row.
pub type ColumnMap = BTreeMap<String, Value>;

/// Plain-data view of an entity produced by [`EntityNode::to_dict`].
///
/// Serializes as the nested object that [`EntityDict::to_json`] returns.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityDict {
    /// A leaf: column name to value.
    Columns(ColumnMap),
    /// A join: table name or alias to that table's columns. Nested joins are
    /// flattened into one level.
    Tables(BTreeMap<String, ColumnMap>),
}

impl EntityDict {
    /// Renders the dict as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        fn columns_json(columns: &ColumnMap) -> serde_json::Value {
            serde_json::Value::Object(
                columns
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            )
        }
        match self {
            EntityDict::Columns(columns) => columns_json(columns),
            EntityDict::Tables(tables) => serde_json::Value::Object(
                tables
                    .iter()
                    .map(|(table, columns)| (table.clone(), columns_json(columns)))
                    .collect(),
            ),
        }
    }
}

/// Result of [`EntityNode::member`].
#[derive(Clone, Copy, Debug)]
pub enum Member<'a> {
    /// The name resolved to a column.
    Value(&'a Value),
    /// The name resolved to a table or alias.
    Entity(&'a EntityNode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Where a column lives: the sides taken from the root, stored leaf first,
/// and the slot within the leaf.
#[derive(Debug)]
struct Route {
    path: SmallVec<[Side; 8]>,
    slot: usize,
}

/// An entity: one row of a base table, or a joined pair of entities.
#[derive(Clone, Debug)]
pub enum EntityNode {
    /// Values of a single row.
    Leaf(LeafEntity),
    /// Two child entities produced by a join.
    Joined(JoinedEntity),
}

impl EntityNode {
    /// Value of `column`, which may be `"name"` or `"table_or_alias.name"`.
    pub fn get(&self, column: impl IntoColumnRef) -> Result<&Value> {
        self.get_with_alias(column, None)
    }

    /// [`EntityNode::get`], with `alias` accepted as a qualifier for a leaf.
    pub fn get_with_alias(
        &self,
        column: impl IntoColumnRef,
        alias: Option<&str>,
    ) -> Result<&Value> {
        let column = column.into_column_ref()?;
        let route = self.route(&column, alias)?;
        self.follow(&route)
            .ok_or_else(|| TabulaError::column_not_found(&column))
    }

    /// Assigns `value` to `column`. Fails without changing anything when the
    /// column is missing or ambiguous.
    pub fn set(&mut self, column: impl IntoColumnRef, value: impl Into<Value>) -> Result<()> {
        self.set_with_alias(column, value, None)
    }

    /// [`EntityNode::set`], with `alias` accepted as a qualifier for a leaf.
    pub fn set_with_alias(
        &mut self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
        alias: Option<&str>,
    ) -> Result<()> {
        let column = column.into_column_ref()?;
        let route = self.route(&column, alias)?;
        let slot = self
            .follow_mut(&route)
            .ok_or_else(|| TabulaError::column_not_found(&column))?;
        *slot = value.into();
        Ok(())
    }

    /// Attribute-style lookup: a column if `name` resolves to one, otherwise
    /// the child entity for the table or alias `name`.
    pub fn member(&self, name: &str) -> Result<Member<'_>> {
        match self.get(name) {
            Ok(value) => return Ok(Member::Value(value)),
            Err(TabulaError::ColumnNotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        match self.child(name)? {
            Some(entity) => Ok(Member::Entity(entity)),
            None => Err(TabulaError::NoSuchMember(name.to_string())),
        }
    }

    /// The leaf whose table name or alias is `name`.
    pub fn child(&self, name: &str) -> Result<Option<&EntityNode>> {
        validate_identifiers([name])?;
        self.child_at(name, None, 0)
    }

    /// The `id` column of a leaf, when set to an integer.
    pub fn id(&self) -> Option<i64> {
        match self {
            EntityNode::Leaf(leaf) => leaf.id(),
            EntityNode::Joined(_) => None,
        }
    }

    /// The leaf, if this is one.
    pub fn as_leaf(&self) -> Option<&LeafEntity> {
        match self {
            EntityNode::Leaf(leaf) => Some(leaf),
            EntityNode::Joined(_) => None,
        }
    }

    /// The joined pair, if this is one.
    pub fn as_joined(&self) -> Option<&JoinedEntity> {
        match self {
            EntityNode::Joined(joined) => Some(joined),
            EntityNode::Leaf(_) => None,
        }
    }

    /// Plain-data copy of the entity.
    ///
    /// Fails with `AmbiguousTable` when two leaves of a join would share a
    /// key, i.e. the same table appears twice without telling aliases.
    pub fn to_dict(&self) -> Result<EntityDict> {
        self.to_dict_renamed(&HashMap::new())
    }

    /// [`EntityNode::to_dict`] with leaf columns renamed through `renames`;
    /// columns without an entry keep their declared name.
    pub fn to_dict_renamed(&self, renames: &HashMap<String, String>) -> Result<EntityDict> {
        match self {
            EntityNode::Leaf(leaf) => Ok(EntityDict::Columns(leaf.to_columns(renames))),
            EntityNode::Joined(joined) => {
                let mut tables = BTreeMap::new();
                joined.collect_tables(renames, &mut tables)?;
                Ok(EntityDict::Tables(tables))
            }
        }
    }

    /// [`EntityNode::to_dict`] rendered as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.to_dict()?.to_json())
    }

    /// Assigns one select-list row to the leaves, left to right.
    pub(crate) fn fill_row(&mut self, row: Vec<Value>) -> Result<()> {
        let expected = row.len();
        let mut row = row.into_iter();
        for leaf in self.leaves_mut() {
            for slot in leaf.slots_mut() {
                *slot = row.next().ok_or_else(|| short_row(expected))?;
            }
        }
        match row.next() {
            Some(_) => Err(short_row(expected)),
            None => Ok(()),
        }
    }

    fn leaves_mut(&mut self) -> Vec<&mut LeafEntity> {
        let mut leaves = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                EntityNode::Leaf(leaf) => leaves.push(leaf),
                EntityNode::Joined(joined) => {
                    pending.push(&mut *joined.right);
                    pending.push(&mut *joined.left);
                }
            }
        }
        leaves
    }

    /// Overwrites every column from `values`, which must name all of them.
    pub fn put<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        match self {
            EntityNode::Leaf(leaf) => leaf.put(values),
            EntityNode::Joined(_) => Err(TabulaError::NotSupported("put on a joined entity")),
        }
    }

    /// Overwrites the columns present in `values` and leaves the rest alone.
    pub fn patch<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        match self {
            EntityNode::Leaf(leaf) => {
                leaf.patch(values);
                Ok(())
            }
            EntityNode::Joined(_) => Err(TabulaError::NotSupported("patch on a joined entity")),
        }
    }

    fn route(&self, column: &ColumnRef, alias: Option<&str>) -> Result<Route> {
        column.validate()?;
        if let Some(alias) = alias {
            validate_identifiers([alias])?;
        }
        self.locate(column, alias, 0)
    }

    fn locate(&self, column: &ColumnRef, alias: Option<&str>, depth: usize) -> Result<Route> {
        let joined = match self {
            EntityNode::Leaf(leaf) => {
                let slot = leaf.slot_for(column, alias)?;
                trace!(table = leaf.table_name(), column = %column, depth, "entity.locate.leaf");
                return Ok(Route {
                    path: SmallVec::new(),
                    slot,
                });
            }
            EntityNode::Joined(joined) => joined,
        };
        if let Some(alias) = alias {
            return Err(TabulaError::InvalidAlias(format!(
                "cannot alias joined entity as '{alias}'"
            )));
        }
        if depth >= MAX_JOIN_DEPTH {
            return Err(TabulaError::depth_exceeded());
        }
        let left = absent_if_not_found(joined.left.locate(
            column,
            joined.left_alias.as_deref(),
            depth + 1,
        ))?;
        let right = absent_if_not_found(joined.right.locate(
            column,
            joined.right_alias.as_deref(),
            depth + 1,
        ))?;
        trace!(
            column = %column,
            depth,
            left = left.is_some(),
            right = right.is_some(),
            "entity.locate.joined"
        );
        match (left, right) {
            (Some(_), Some(_)) => Err(TabulaError::ambiguous_column(column)),
            (Some(mut route), None) => {
                route.path.push(Side::Left);
                Ok(route)
            }
            (None, Some(mut route)) => {
                route.path.push(Side::Right);
                Ok(route)
            }
            (None, None) => Err(TabulaError::column_not_found(column)),
        }
    }

    fn follow(&self, route: &Route) -> Option<&Value> {
        let mut node = self;
        for side in route.path.iter().rev() {
            let EntityNode::Joined(joined) = node else {
                return None;
            };
            node = match side {
                Side::Left => &*joined.left,
                Side::Right => &*joined.right,
            };
        }
        match node {
            EntityNode::Leaf(leaf) => leaf.slot(route.slot),
            EntityNode::Joined(_) => None,
        }
    }

    fn follow_mut(&mut self, route: &Route) -> Option<&mut Value> {
        let mut node = self;
        for side in route.path.iter().rev() {
            let EntityNode::Joined(joined) = node else {
                return None;
            };
            node = match side {
                Side::Left => &mut *joined.left,
                Side::Right => &mut *joined.right,
            };
        }
        match node {
            EntityNode::Leaf(leaf) => leaf.slot_mut(route.slot),
            EntityNode::Joined(_) => None,
        }
    }

    fn child_at(
        &self,
        name: &str,
        alias: Option<&str>,
        depth: usize,
    ) -> Result<Option<&EntityNode>> {
        let joined = match self {
            EntityNode::Leaf(leaf) => {
                let named = name.eq_ignore_ascii_case(leaf.table_name())
                    || alias.is_some_and(|a| name.eq_ignore_ascii_case(a));
                return Ok(named.then_some(self));
            }
            EntityNode::Joined(joined) => joined,
        };
        if depth >= MAX_JOIN_DEPTH {
            return Err(TabulaError::depth_exceeded());
        }
        let left = joined
            .left
            .child_at(name, joined.left_alias.as_deref(), depth + 1)?;
        let right = joined
            .right
            .child_at(name, joined.right_alias.as_deref(), depth + 1)?;
        match (left, right) {
            (Some(_), Some(_)) => Err(TabulaError::AmbiguousTable {
                name: name.to_string(),
            }),
            (found, None) | (None, found) => Ok(found),
        }
    }
}

fn short_row(found: usize) -> TabulaError {
    TabulaError::InvalidArgument(format!(
        "row of {found} values does not match the entity's columns"
    ))
}
