//! Row-level reads and writes.
//!
//! Writes go through base relations only. Constraint and other storage
//! failures on writes are logged and reported as `Ok(None)`; everything else
//! (bad identifiers, wrong entity) is an error.

use rusqlite::params_from_iter;
use tracing::{debug, error, info};

use super::{BaseRelation, ColumnRef, Materialize, Relational};
use crate::db::{validate_identifiers, value_from_sql};
use crate::entity::{EntityNode, LeafEntity};
use crate::query::sql::{
    delete_statement, insert_statement, select_statement, update_statement, InsertSlot,
};
use crate::query::Value;
use crate::types::{Result, TabulaError};

const CREATED_ON: &str = "created_on";
const UPDATED_ON: &str = "updated_on";

pub(crate) fn read_by_column<R>(
    relation: &R,
    column: ColumnRef,
    value: Value,
) -> Result<Vec<EntityNode>>
where
    R: Relational + Materialize + ?Sized,
{
    let filter = relation.resolve_column(&column, None, 0)?;
    select_where(relation, &filter, &value)
}

fn select_where<R>(relation: &R, filter: &ColumnRef, value: &Value) -> Result<Vec<EntityNode>>
where
    R: Relational + Materialize + ?Sized,
{
    let refs = relation.column_refs();
    let infos = relation.columns();
    let sql = select_statement(&refs, &relation.relation_expression()?, filter);
    debug!(sql = %sql, "relation.select");
    relation.database().with_transaction(|tx| {
        let mut stmt = tx.prepare(&sql)?;
        let mut rows = stmt.query([value])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(infos.len());
            for (idx, info) in infos.iter().enumerate() {
                values.push(value_from_sql(row.get_ref(idx)?, &info.declared_type));
            }
            // Select-list order is leaf order, so no name routing is needed.
            let mut entity = relation.skeleton();
            entity.fill_row(values)?;
            entities.push(entity);
        }
        Ok(entities)
    })
}

pub(crate) fn exactly_one(mut rows: Vec<EntityNode>) -> Result<EntityNode> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        found => Err(TabulaError::UnexpectedResultCount {
            expected: "exactly one",
            found,
        }),
    }
}

pub(crate) fn at_most_one(mut rows: Vec<EntityNode>) -> Result<Option<EntityNode>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        found => Err(TabulaError::UnexpectedResultCount {
            expected: "at most one",
            found,
        }),
    }
}

impl BaseRelation {
    /// Inserts `entity` and stores the new row id back into it.
    ///
    /// `created_on` and `updated_on` are stamped when the table has them.
    /// Empty columns with a declared default get that default. Returns
    /// `Ok(None)` when SQLite rejects the row.
    pub fn create(&self, entity: &mut EntityNode) -> Result<Option<i64>> {
        let leaf = self.owned_leaf(entity, "create")?;
        let now = Value::now();
        leaf.stamp(CREATED_ON, now.clone());
        leaf.stamp(UPDATED_ON, now);

        let mut slots = Vec::with_capacity(self.column_info().len());
        let mut params = Vec::with_capacity(self.column_info().len());
        for info in self.column_info() {
            let value = leaf.value(&info.name).cloned().unwrap_or_default();
            if !value.is_null() {
                slots.push(InsertSlot::Bind(&info.name));
                params.push(value);
            } else if let Some(expr) = info.default_value.as_deref() {
                slots.push(InsertSlot::Default {
                    column: &info.name,
                    expr,
                });
            }
        }
        validate_identifiers(
            std::iter::once(self.table_name()).chain(slots.iter().map(|slot| match slot {
                InsertSlot::Bind(column) | InsertSlot::Default { column, .. } => *column,
            })),
        )?;

        let sql = insert_statement(self.table_name(), &slots);
        debug!(table = self.table_name(), sql = %sql, "relation.create");
        let outcome = self.database().with_transaction(|tx| {
            tx.execute(&sql, params_from_iter(params.iter()))?;
            Ok(tx.last_insert_rowid())
        });
        let id = self.absorb_write_failure("create", outcome)?;
        if let Some(id) = id {
            leaf.stamp("id", Value::Int(id));
        }
        Ok(id)
    }

    /// Reads the row with primary key `id`.
    pub fn read(&self, id: i64) -> Result<Option<EntityNode>> {
        if id <= 0 {
            return Err(TabulaError::InvalidArgument(format!(
                "id must be a positive integer, got {id}"
            )));
        }
        let filter = ColumnRef::qualified(self.table_name(), "id");
        at_most_one(select_where(self, &filter, &Value::Int(id))?)
    }

    /// Writes every column except `id` back to the entity's row.
    ///
    /// Stamps `updated_on` when the table has it. Returns the number of rows
    /// changed, or `Ok(None)` when SQLite rejects the write.
    pub fn update(&self, entity: &mut EntityNode) -> Result<Option<usize>> {
        let leaf = self.owned_leaf(entity, "update")?;
        let id = leaf.id().ok_or_else(|| {
            TabulaError::InvalidArgument("cannot update an entity without an id".into())
        })?;
        leaf.stamp(UPDATED_ON, Value::now());

        let columns: Vec<&str> = self
            .column_info()
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !name.eq_ignore_ascii_case("id"))
            .collect();
        if columns.is_empty() {
            return Ok(Some(0));
        }
        validate_identifiers(std::iter::once(self.table_name()).chain(columns.iter().copied()))?;

        let mut params: Vec<Value> = columns
            .iter()
            .map(|c| leaf.value(c).cloned().unwrap_or_default())
            .collect();
        params.push(Value::Int(id));
        let sql = update_statement(self.table_name(), &columns);
        debug!(table = self.table_name(), id, sql = %sql, "relation.update");
        let outcome = self
            .database()
            .with_transaction(|tx| Ok(tx.execute(&sql, params_from_iter(params.iter()))?));
        self.absorb_write_failure("update", outcome)
    }

    /// Deletes the row with primary key `id`; returns the number of rows removed.
    pub fn delete(&self, id: i64) -> Result<usize> {
        validate_identifiers([self.table_name()])?;
        let sql = delete_statement(self.table_name());
        debug!(table = self.table_name(), id, "relation.delete");
        self.database().with_transaction(|tx| Ok(tx.execute(&sql, [id])?))
    }

    fn owned_leaf<'e>(
        &self,
        entity: &'e mut EntityNode,
        operation: &str,
    ) -> Result<&'e mut LeafEntity> {
        if let EntityNode::Leaf(leaf) = &*entity {
            if !leaf.belongs_to(self.handle()) {
                return Err(TabulaError::InvalidArgument(format!(
                    "cannot {operation} entity of type '{}' with relation for '{}'",
                    leaf.entity_type(),
                    self.table_name()
                )));
            }
        }
        match entity {
            EntityNode::Leaf(leaf) => Ok(leaf),
            EntityNode::Joined(_) => Err(TabulaError::NotSupported("writing a joined entity")),
        }
    }

    fn absorb_write_failure<T>(
        &self,
        operation: &'static str,
        outcome: Result<T>,
    ) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(TabulaError::ConstraintViolation(err)) => {
                info!(
                    table = self.table_name(),
                    operation,
                    error = %err,
                    "relation.write.constraint_violation"
                );
                Ok(None)
            }
            Err(TabulaError::StorageExecution(err)) => {
                error!(
                    table = self.table_name(),
                    operation,
                    error = %err,
                    "relation.write.storage_error"
                );
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}
