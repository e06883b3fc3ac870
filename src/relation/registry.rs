use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{BaseRelation, Relation};
use crate::db::{validate_identifiers, Database};
use crate::types::{Result, TabulaError};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Owns the base relations of one database.
///
/// Relations from different registries cannot be joined, even when they
/// point at the same file.
#[derive(Debug)]
pub struct RelationRegistry {
    id: u64,
    db: Arc<Database>,
    tables: RwLock<HashMap<String, Arc<BaseRelation>>>,
}

impl RelationRegistry {
    /// Creates an empty registry over `db`.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            db,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Storage handle shared by every relation in the registry.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Reflects `table` and registers it, producing entities named
    /// `entity_type`. Registering a table twice replaces the earlier relation.
    pub fn manage_table(
        &self,
        table: &str,
        entity_type: impl Into<String>,
    ) -> Result<Arc<BaseRelation>> {
        validate_identifiers([table])?;
        let entity_type = entity_type.into();
        let relation = BaseRelation::reflect(Arc::clone(&self.db), self.id, table, &entity_type)?;
        debug!(
            table,
            entity_type = entity_type.as_str(),
            columns = relation.column_info().len(),
            "registry.manage_table"
        );
        self.tables
            .write()
            .insert(table.to_ascii_lowercase(), Arc::clone(&relation));
        Ok(relation)
    }

    /// The registered relation for `table`.
    pub fn with_table(&self, table: &str) -> Result<Arc<BaseRelation>> {
        self.tables
            .read()
            .get(&table.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| TabulaError::UnknownTable(table.to_string()))
    }

    /// [`RelationRegistry::with_table`] as a [`Relation`], ready to join.
    pub fn relation(&self, table: &str) -> Result<Relation> {
        self.with_table(table).map(Relation::Base)
    }

    /// Names of the registered tables, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .values()
            .map(|r| r.table_name().to_string())
            .collect();
        names.sort();
        names
    }
}
