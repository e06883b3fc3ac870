use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use super::{ColumnInfo, ColumnRef, JoinKind, JoinOn, Materialize, Relation, Relational};
use crate::db::{validate_identifiers, Database};
use crate::entity::{EntityNode, JoinedEntity};
use crate::query::sql::quote_ident;
use crate::types::{absent_if_not_found, Result, TabulaError, MAX_JOIN_DEPTH};

/// Two relations combined on `left_key = right_key`.
///
/// Either side may itself be joined, which is how deeper trees are built.
/// Aliases can only name base children; the keys are resolved against their
/// own side when the join is built, so a bad key fails early.
#[derive(Debug)]
pub struct JoinedRelation {
    me: Weak<JoinedRelation>,
    db: Arc<Database>,
    registry_id: u64,
    left: Relation,
    right: Relation,
    left_key: ColumnRef,
    right_key: ColumnRef,
    kind: JoinKind,
    left_alias: Option<String>,
    right_alias: Option<String>,
}

fn reject_joined_alias(side: &Relation, alias: Option<&str>) -> Result<()> {
    match (side, alias) {
        (Relation::Joined(_), Some(alias)) => Err(TabulaError::InvalidAlias(format!(
            "cannot alias joined relation as '{alias}'"
        ))),
        _ => Ok(()),
    }
}

impl JoinedRelation {
    pub(crate) fn new(left: Relation, right: Relation, on: JoinOn) -> Result<Arc<Self>> {
        let JoinOn {
            left_key,
            right_key,
            kind,
            left_alias,
            right_alias,
        } = on;
        reject_joined_alias(&left, left_alias.as_deref())?;
        reject_joined_alias(&right, right_alias.as_deref())?;
        validate_identifiers(left_alias.iter().chain(right_alias.iter()))?;
        if left.registry_id() != right.registry_id() {
            return Err(TabulaError::CrossRegistry);
        }

        let left_key =
            left.resolve_column(&ColumnRef::parse(&left_key)?, left_alias.as_deref(), 0)?;
        let right_key =
            right.resolve_column(&ColumnRef::parse(&right_key)?, right_alias.as_deref(), 0)?;
        debug!(
            left = %left_key,
            right = %right_key,
            kind = kind.sql(),
            "relation.join.create"
        );

        let db = Arc::clone(match &left {
            Relation::Base(base) => base.database(),
            Relation::Joined(joined) => &joined.db,
        });
        let registry_id = left.registry_id();
        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            db,
            registry_id,
            left,
            right,
            left_key,
            right_key,
            kind,
            left_alias,
            right_alias,
        }))
    }

    /// Left child.
    pub fn left(&self) -> &Relation {
        &self.left
    }

    /// Right child.
    pub fn right(&self) -> &Relation {
        &self.right
    }

    /// Resolved left join key.
    pub fn left_key(&self) -> &ColumnRef {
        &self.left_key
    }

    /// Resolved right join key.
    pub fn right_key(&self) -> &ColumnRef {
        &self.right_key
    }

    /// Join kind.
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Alias of the left child.
    pub fn left_alias(&self) -> Option<&str> {
        self.left_alias.as_deref()
    }

    /// Alias of the right child.
    pub fn right_alias(&self) -> Option<&str> {
        self.right_alias.as_deref()
    }

    pub(crate) fn registry_id(&self) -> u64 {
        self.registry_id
    }

    fn aliased_refs(side: &Relation, alias: Option<&str>) -> Vec<ColumnRef> {
        let refs = side.column_refs();
        match alias {
            Some(alias) => refs.iter().map(|c| c.with_qualifier(alias)).collect(),
            None => refs,
        }
    }
}

impl Relational for JoinedRelation {
    fn columns(&self) -> Vec<ColumnInfo> {
        let mut columns = self.left.columns();
        columns.extend(self.right.columns());
        columns
    }

    fn column_refs(&self) -> Vec<ColumnRef> {
        let mut refs = Self::aliased_refs(&self.left, self.left_alias.as_deref());
        refs.extend(Self::aliased_refs(&self.right, self.right_alias.as_deref()));
        refs
    }

    fn relation_expression(&self) -> Result<String> {
        let mut left = self.left.relation_expression()?;
        if let Some(alias) = &self.left_alias {
            validate_identifiers([alias])?;
            left = format!("{left} AS {}", quote_ident(alias));
        }
        let mut right = self.right.relation_expression()?;
        if matches!(self.right, Relation::Joined(_)) {
            right = format!("({right})");
        }
        if let Some(alias) = &self.right_alias {
            validate_identifiers([alias])?;
            right = format!("{right} AS {}", quote_ident(alias));
        }
        Ok(format!(
            "{left} {} {right} ON {} = {}",
            self.kind.sql(),
            self.left_key.sql(),
            self.right_key.sql()
        ))
    }

    fn resolve_column(
        &self,
        column: &ColumnRef,
        alias: Option<&str>,
        depth: usize,
    ) -> Result<ColumnRef> {
        if let Some(alias) = alias {
            return Err(TabulaError::InvalidAlias(format!(
                "cannot alias joined relation as '{alias}'"
            )));
        }
        if depth >= MAX_JOIN_DEPTH {
            return Err(TabulaError::depth_exceeded());
        }
        if depth == 0 {
            column.validate()?;
        }
        let left = absent_if_not_found(self.left.resolve_column(
            column,
            self.left_alias.as_deref(),
            depth + 1,
        ))?;
        let right = absent_if_not_found(self.right.resolve_column(
            column,
            self.right_alias.as_deref(),
            depth + 1,
        ))?;
        trace!(
            column = %column,
            depth,
            left = left.is_some(),
            right = right.is_some(),
            "relation.resolve.joined"
        );
        match (left, right) {
            (Some(_), Some(_)) => Err(TabulaError::ambiguous_column(column)),
            (Some(found), None) | (None, Some(found)) => Ok(found),
            (None, None) => Err(TabulaError::column_not_found(column)),
        }
    }

    fn table_names(&self, depth: usize) -> Result<Vec<String>> {
        if depth >= MAX_JOIN_DEPTH {
            return Err(TabulaError::depth_exceeded());
        }
        let mut names = self.left.table_names(depth + 1)?;
        names.extend(self.right.table_names(depth + 1)?);
        Ok(names)
    }

    fn blank_entity(&self) -> Result<EntityNode> {
        Err(TabulaError::NotSupported("blank entity of a joined relation"))
    }
}

impl Materialize for JoinedRelation {
    fn database(&self) -> &Database {
        &self.db
    }

    fn skeleton(&self) -> EntityNode {
        EntityNode::Joined(JoinedEntity::new(
            self.me.clone(),
            self.left_alias.clone(),
            self.right_alias.clone(),
            self.left.skeleton(),
            self.right.skeleton(),
        ))
    }
}
