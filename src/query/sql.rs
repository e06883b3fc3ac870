use crate::relation::ColumnRef;

/// Wraps an identifier in SQLite's bracket quoting.
pub fn quote_ident(ident: &str) -> String {
    format!("[{ident}]")
}

/// One column of an `INSERT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertSlot<'a> {
    /// Value bound through a `?` placeholder.
    Bind(&'a str),
    /// Column left empty on the entity; the table's declared default
    /// expression is written in place of a placeholder.
    Default {
        /// Column name.
        column: &'a str,
        /// Default expression exactly as reported by `PRAGMA table_info`.
        expr: &'a str,
    },
}

impl InsertSlot<'_> {
    fn column(&self) -> &str {
        match self {
            InsertSlot::Bind(column) => column,
            InsertSlot::Default { column, .. } => column,
        }
    }
}

/// `INSERT INTO [table] ([a],[b]) VALUES (?,<default>)`.
pub fn insert_statement(table: &str, slots: &[InsertSlot<'_>]) -> String {
    if slots.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let columns: Vec<String> = slots.iter().map(|s| quote_ident(s.column())).collect();
    let values: Vec<&str> = slots
        .iter()
        .map(|s| match s {
            InsertSlot::Bind(_) => "?",
            InsertSlot::Default { expr, .. } => expr,
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(","),
        values.join(",")
    )
}

/// `SELECT [q].[n] AS [q.n], ... FROM <relation> WHERE <filter> = ?`.
///
/// Each output column is labelled with its display form so rows can be
/// inspected by name as well as by position.
pub fn select_statement(columns: &[ColumnRef], relation_expr: &str, filter: &ColumnRef) -> String {
    let projections: Vec<String> = columns
        .iter()
        .map(|c| format!("{} AS {}", c.sql(), quote_ident(&c.to_string())))
        .collect();
    format!(
        "SELECT {} FROM {} WHERE {} = ?",
        projections.join(","),
        relation_expr,
        filter.sql()
    )
}

/// `UPDATE [table] SET [a]=?,[b]=? WHERE [id] = ?`.
pub fn update_statement(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .map(|c| format!("{}=?", quote_ident(c)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE [id] = ?",
        quote_ident(table),
        assignments.join(",")
    )
}

/// `DELETE FROM [table] WHERE [id] = ?`.
pub fn delete_statement(table: &str) -> String {
    format!("DELETE FROM {} WHERE [id] = ?", quote_ident(table))
}
