use std::sync::{Arc, Weak};

use tracing::trace;

use super::{ColumnInfo, ColumnRef, IntoColumnRef, Materialize, Relational};
use crate::db::{validate_identifiers, Database};
use crate::entity::{EntityNode, LeafEntity, SaveGuard};
use crate::query::sql::quote_ident;
use crate::query::Value;
use crate::types::{Result, TabulaError};

/// A relation backed by exactly one table.
///
/// Columns are reflected once, when the relation is built. The table must
/// have an `id` column that is its primary key.
#[derive(Debug)]
pub struct BaseRelation {
    me: Weak<BaseRelation>,
    db: Arc<Database>,
    registry_id: u64,
    table_name: String,
    entity_type: String,
    columns: Vec<ColumnInfo>,
}

impl BaseRelation {
    pub(crate) fn reflect(
        db: Arc<Database>,
        registry_id: u64,
        table_name: &str,
        entity_type: &str,
    ) -> Result<Arc<Self>> {
        validate_identifiers([table_name])?;
        let columns = db.columns_of(table_name)?;
        Self::from_columns(db, registry_id, table_name, entity_type, columns)
    }

    pub(crate) fn from_columns(
        db: Arc<Database>,
        registry_id: u64,
        table_name: &str,
        entity_type: &str,
        columns: Vec<ColumnInfo>,
    ) -> Result<Arc<Self>> {
        if columns.is_empty() {
            return Err(TabulaError::UnknownTable(table_name.to_string()));
        }
        let has_id_key = columns
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case("id") && c.is_primary_key);
        if !has_id_key {
            return Err(TabulaError::MissingPrimaryKey {
                table: table_name.to_string(),
            });
        }
        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            db,
            registry_id,
            table_name: table_name.to_string(),
            entity_type: entity_type.to_string(),
            columns,
        }))
    }

    /// Table this relation reads and writes.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Name given to entities of this relation.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Reflected column metadata in declaration order.
    pub fn column_info(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Shared storage handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub(crate) fn registry_id(&self) -> u64 {
        self.registry_id
    }

    pub(crate) fn handle(&self) -> &Weak<BaseRelation> {
        &self.me
    }

    pub(crate) fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Empty leaf entity for this table, every column `Null`.
    pub fn blank(&self) -> EntityNode {
        EntityNode::Leaf(LeafEntity::blank(
            self.me.clone(),
            &self.table_name,
            &self.entity_type,
            &self.columns,
        ))
    }

    /// Wraps `entity` in a guard that saves it when the guard goes out of
    /// scope: `create` if it has no id yet, `update` otherwise.
    pub fn edit(&self, entity: EntityNode) -> SaveGuard<'_> {
        SaveGuard::new(self, entity)
    }

    /// [`BaseRelation::edit`] on a blank entity.
    pub fn edit_blank(&self) -> SaveGuard<'_> {
        self.edit(self.blank())
    }

    /// Every row whose `column` equals `value`.
    pub fn read_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<Vec<EntityNode>> {
        super::crud::read_by_column(self, column.into_column_ref()?, value.into())
    }

    /// The single row whose `column` equals `value`.
    pub fn read_one_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<EntityNode> {
        super::crud::exactly_one(self.read_by_column(column, value)?)
    }

    /// The row whose `column` equals `value`, if any.
    pub fn read_one_or_none_by_column(
        &self,
        column: impl IntoColumnRef,
        value: impl Into<Value>,
    ) -> Result<Option<EntityNode>> {
        super::crud::at_most_one(self.read_by_column(column, value)?)
    }
}

impl Relational for BaseRelation {
    fn columns(&self) -> Vec<ColumnInfo> {
        self.columns.clone()
    }

    fn column_refs(&self) -> Vec<ColumnRef> {
        self.columns
            .iter()
            .map(|c| ColumnRef::qualified(self.table_name.clone(), c.name.clone()))
            .collect()
    }

    fn relation_expression(&self) -> Result<String> {
        validate_identifiers([&self.table_name])?;
        Ok(quote_ident(&self.table_name))
    }

    fn resolve_column(
        &self,
        column: &ColumnRef,
        alias: Option<&str>,
        depth: usize,
    ) -> Result<ColumnRef> {
        if depth == 0 {
            column.validate()?;
            if let Some(alias) = alias {
                validate_identifiers([alias])?;
            }
        }
        if let Some(qualifier) = column.qualifier() {
            let owned = qualifier.eq_ignore_ascii_case(&self.table_name)
                || alias.is_some_and(|a| qualifier.eq_ignore_ascii_case(a));
            if !owned {
                trace!(table = %self.table_name, column = %column, depth, "relation.resolve.other_table");
                return Err(TabulaError::column_not_found(column));
            }
        }
        let info = self
            .column(column.name())
            .ok_or_else(|| TabulaError::column_not_found(column))?;
        let resolved = ColumnRef::qualified(alias.unwrap_or(&self.table_name), info.name.clone());
        trace!(table = %self.table_name, column = %column, resolved = %resolved, depth, "relation.resolve");
        Ok(resolved)
    }

    fn table_names(&self, _depth: usize) -> Result<Vec<String>> {
        Ok(vec![self.table_name.clone()])
    }

    fn blank_entity(&self) -> Result<EntityNode> {
        Ok(self.blank())
    }
}

impl Materialize for BaseRelation {
    fn database(&self) -> &Database {
        &self.db
    }

    fn skeleton(&self) -> EntityNode {
        self.blank()
    }
}
