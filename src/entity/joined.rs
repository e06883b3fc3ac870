use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use super::{ColumnMap, EntityNode};
use crate::relation::JoinedRelation;
use crate::types::{Result, TabulaError};

/// Two child entities read through a [`JoinedRelation`].
///
/// Aliases are copied from the relation so that lookups can match them
/// without reaching back into it.
#[derive(Clone, Debug)]
pub struct JoinedEntity {
    relation: Weak<JoinedRelation>,
    pub(super) left_alias: Option<String>,
    pub(super) right_alias: Option<String>,
    pub(super) left: Box<EntityNode>,
    pub(super) right: Box<EntityNode>,
}

impl JoinedEntity {
    pub(crate) fn new(
        relation: Weak<JoinedRelation>,
        left_alias: Option<String>,
        right_alias: Option<String>,
        left: EntityNode,
        right: EntityNode,
    ) -> Self {
        Self {
            relation,
            left_alias,
            right_alias,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The relation that built this entity, while it is still alive.
    pub fn relation(&self) -> Option<Arc<JoinedRelation>> {
        self.relation.upgrade()
    }

    /// Left child.
    pub fn left(&self) -> &EntityNode {
        &self.left
    }

    /// Right child.
    pub fn right(&self) -> &EntityNode {
        &self.right
    }

    /// Alias of the left child.
    pub fn left_alias(&self) -> Option<&str> {
        self.left_alias.as_deref()
    }

    /// Alias of the right child.
    pub fn right_alias(&self) -> Option<&str> {
        self.right_alias.as_deref()
    }

    pub(super) fn collect_tables(
        &self,
        renames: &HashMap<String, String>,
        tables: &mut BTreeMap<String, ColumnMap>,
    ) -> Result<()> {
        for (child, alias) in [
            (&*self.left, self.left_alias.as_deref()),
            (&*self.right, self.right_alias.as_deref()),
        ] {
            match child {
                EntityNode::Leaf(leaf) => {
                    let key = alias.unwrap_or(leaf.table_name());
                    if tables.contains_key(key) {
                        return Err(TabulaError::AmbiguousTable {
                            name: key.to_string(),
                        });
                    }
                    tables.insert(key.to_string(), leaf.to_columns(renames));
                }
                EntityNode::Joined(joined) => joined.collect_tables(renames, tables)?,
            }
        }
        Ok(())
    }
}
