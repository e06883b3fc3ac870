use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::ColumnMap;
use crate::query::Value;
use crate::relation::{BaseRelation, ColumnInfo, ColumnRef};
use crate::types::{Result, TabulaError};

/// Values of one row of a base table, in declared column order.
#[derive(Clone, Debug)]
pub struct LeafEntity {
    relation: Weak<BaseRelation>,
    table_name: String,
    entity_type: String,
    values: Vec<(String, Value)>,
}

impl LeafEntity {
    pub(crate) fn blank(
        relation: Weak<BaseRelation>,
        table_name: &str,
        entity_type: &str,
        columns: &[ColumnInfo],
    ) -> Self {
        Self {
            relation,
            table_name: table_name.to_string(),
            entity_type: entity_type.to_string(),
            values: columns
                .iter()
                .map(|c| (c.name.clone(), Value::Null))
                .collect(),
        }
    }

    /// Table the row belongs to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Entity type of the owning relation.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The relation that built this entity, while it is still alive.
    pub fn relation(&self) -> Option<Arc<BaseRelation>> {
        self.relation.upgrade()
    }

    /// Columns and their values in declared order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Value of the column called `name`, compared case-insensitively.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|idx| &self.values[idx].1)
    }

    /// The `id` column as an integer.
    pub fn id(&self) -> Option<i64> {
        self.value("id").and_then(Value::as_i64)
    }

    pub(crate) fn belongs_to(&self, relation: &Weak<BaseRelation>) -> bool {
        Weak::ptr_eq(&self.relation, relation)
    }

    /// Sets `column` if the table has it; no-op otherwise.
    pub(crate) fn stamp(&mut self, column: &str, value: Value) {
        if let Some(idx) = self.position(column) {
            self.values[idx].1 = value;
        }
    }

    pub(super) fn slot(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx).map(|(_, value)| value)
    }

    pub(super) fn slot_mut(&mut self, idx: usize) -> Option<&mut Value> {
        self.values.get_mut(idx).map(|(_, value)| value)
    }

    pub(super) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.values.iter_mut().map(|(_, value)| value)
    }

    /// Slot of `column`, whose qualifier (if any) must be this table's name
    /// or `alias`.
    pub(super) fn slot_for(&self, column: &ColumnRef, alias: Option<&str>) -> Result<usize> {
        if let Some(qualifier) = column.qualifier() {
            let owned = qualifier.eq_ignore_ascii_case(&self.table_name)
                || alias.is_some_and(|a| qualifier.eq_ignore_ascii_case(a));
            if !owned {
                return Err(TabulaError::column_not_found(column));
            }
        }
        self.position(column.name())
            .ok_or_else(|| TabulaError::column_not_found(column))
    }

    pub(super) fn to_columns(&self, renames: &HashMap<String, String>) -> ColumnMap {
        self.values
            .iter()
            .map(|(name, value)| {
                let key = renames.get(name).unwrap_or(name);
                (key.clone(), value.clone())
            })
            .collect()
    }

    pub(super) fn put<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let incoming = collect_incoming(values);
        let mut next = Vec::with_capacity(self.values.len());
        for (name, _) in &self.values {
            let value = lookup(&incoming, name).ok_or_else(|| TabulaError::MissingColumn {
                column: name.clone(),
            })?;
            next.push(value.clone());
        }
        for ((_, slot), value) in self.values.iter_mut().zip(next) {
            *slot = value;
        }
        Ok(())
    }

    pub(super) fn patch<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let incoming = collect_incoming(values);
        for (name, slot) in &mut self.values {
            if let Some(value) = lookup(&incoming, name) {
                *slot = value.clone();
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|(column, _)| column.eq_ignore_ascii_case(name))
    }
}

fn collect_incoming<I, K, V>(values: I) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.into()))
        .collect()
}

// Last write wins when a key repeats in different cases.
fn lookup<'a>(incoming: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    incoming
        .iter()
        .rev()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}
