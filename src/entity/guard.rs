use std::ops::{Deref, DerefMut};

use tracing::error;

use super::EntityNode;
use crate::relation::BaseRelation;
use crate::types::Result;

/// Scoped create-or-update.
///
/// Obtained from [`BaseRelation::edit`]. The wrapped entity is saved exactly
/// once: by [`SaveGuard::save`], or when the guard is dropped without it
/// (including on `?` early returns and panics). Entities without an id are
/// created; the rest are updated.
#[must_use = "the entity is saved when the guard is dropped"]
#[derive(Debug)]
pub struct SaveGuard<'r> {
    relation: &'r BaseRelation,
    entity: Option<EntityNode>,
}

impl<'r> SaveGuard<'r> {
    pub(crate) fn new(relation: &'r BaseRelation, entity: EntityNode) -> Self {
        Self {
            relation,
            entity: Some(entity),
        }
    }

    /// Saves now and hands the entity back, or `None` when the write was
    /// rejected by the database.
    pub fn save(mut self) -> Result<Option<EntityNode>> {
        self.persist()
    }

    fn persist(&mut self) -> Result<Option<EntityNode>> {
        let Some(mut entity) = self.entity.take() else {
            return Ok(None);
        };
        let saved = match entity.id() {
            None => self.relation.create(&mut entity)?.is_some(),
            Some(_) => self.relation.update(&mut entity)?.is_some(),
        };
        Ok(saved.then_some(entity))
    }
}

impl Deref for SaveGuard<'_> {
    type Target = EntityNode;

    fn deref(&self) -> &EntityNode {
        self.entity
            .as_ref()
            .expect("entity is present until the guard is consumed")
    }
}

impl DerefMut for SaveGuard<'_> {
    fn deref_mut(&mut self) -> &mut EntityNode {
        self.entity
            .as_mut()
            .expect("entity is present until the guard is consumed")
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.entity.is_none() {
            return;
        }
        if let Err(err) = self.persist() {
            error!(
                table = self.relation.table_name(),
                error = %err,
                "entity.save_guard.failed"
            );
        }
    }
}
