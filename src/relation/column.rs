use std::fmt;

use crate::db::validate_identifiers;
use crate::query::sql::quote_ident;
use crate::types::{Result, TabulaError};

/// Column metadata reflected from the schema once per table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Owning table.
    pub table_name: String,
    /// Column name as declared.
    pub name: String,
    /// Declared type text, verbatim from `CREATE TABLE` (may be empty).
    pub declared_type: String,
    /// `false` when the column is `NOT NULL`.
    pub nullable: bool,
    /// Default expression text, if the column declares one.
    pub default_value: Option<String>,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

/// A column name with an optional table-or-alias qualifier.
///
/// There is deliberately no `PartialEq`: comparing a qualified reference
/// with an unqualified one has no sensible boolean answer, so
/// [`ColumnRef::try_eq`] reports it as an error instead.
#[derive(Clone, Debug, Hash)]
pub struct ColumnRef {
    qualifier: Option<String>,
    name: String,
}

impl ColumnRef {
    /// Unqualified reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Reference qualified by a table name or alias.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Parses `name` or `qualifier.name`. More than one `.` is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => Ok(Self::new(name)),
            (Some(qualifier), Some(name), None) => Ok(Self::qualified(qualifier, name)),
            _ => Err(TabulaError::InvalidArgument(format!(
                "column reference '{text}' is not valid"
            ))),
        }
    }

    /// Table name or alias, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact comparison of qualifier and name.
    ///
    /// Fails when exactly one side is qualified: "no table given" and "a
    /// different table given" are not the same thing.
    pub fn try_eq(&self, other: &ColumnRef) -> Result<bool> {
        if self.qualifier.is_some() != other.qualifier.is_some() {
            return Err(TabulaError::InvalidArgument(format!(
                "cannot compare qualified and unqualified column references '{self}' and '{other}'"
            )));
        }
        Ok(self.qualifier == other.qualifier && self.name == other.name)
    }

    /// Quoted SQL form, `[qualifier].[name]` or `[name]`.
    pub fn sql(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", quote_ident(q), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }

    pub(crate) fn with_qualifier(&self, qualifier: &str) -> Self {
        Self::qualified(qualifier, self.name.clone())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.qualifier {
            Some(q) => validate_identifiers([self.name.as_str(), q.as_str()]),
            None => validate_identifiers([self.name.as_str()]),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Anything accepted where a column is named: `"name"`, `"table.name"`, or a
/// ready-made [`ColumnRef`].
pub trait IntoColumnRef {
    /// Performs the conversion.
    fn into_column_ref(self) -> Result<ColumnRef>;
}

impl IntoColumnRef for &str {
    fn into_column_ref(self) -> Result<ColumnRef> {
        ColumnRef::parse(self)
    }
}

impl IntoColumnRef for String {
    fn into_column_ref(self) -> Result<ColumnRef> {
        ColumnRef::parse(&self)
    }
}

impl IntoColumnRef for &String {
    fn into_column_ref(self) -> Result<ColumnRef> {
        ColumnRef::parse(self)
    }
}

impl IntoColumnRef for ColumnRef {
    fn into_column_ref(self) -> Result<ColumnRef> {
        Ok(self)
    }
}

impl IntoColumnRef for &ColumnRef {
    fn into_column_ref(self) -> Result<ColumnRef> {
        Ok(self.clone())
    }
}
