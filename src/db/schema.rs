use rusqlite::Connection;

use crate::relation::ColumnInfo;
use crate::types::Result;

const TABLE_INFO: &str =
    r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1)"#;

/// Reads the `table_info` pragma for `table`, bound as a parameter so
/// keyword-named tables reflect like any other.
///
/// A table that does not exist reports no rows, which callers treat as an
/// unknown table.
pub(super) fn table_info(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(TABLE_INFO)?;
    let rows = stmt.query_map([table], |row| {
        let not_null: i64 = row.get("notnull")?;
        let pk: i64 = row.get("pk")?;
        Ok(ColumnInfo {
            table_name: table.to_string(),
            name: row.get("name")?,
            declared_type: row.get("type")?,
            nullable: not_null == 0,
            default_value: row.get("dflt_value")?,
            is_primary_key: pk > 0,
        })
    })?;

    let mut columns = Vec::new();
    for column in rows {
        columns.push(column?);
    }
    Ok(columns)
}
