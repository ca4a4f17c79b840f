//! `ContactPerson` table definition.

use rusqlite::Connection;

/// Table name shared by DDL and queries.
pub const CONTACT_TABLE: &str = "ContactPerson";

/// Idempotent DDL; safe to run against a database that already has the table.
pub const CREATE_CONTACT_TABLE_SQL: &str = include_str!("sql/contact_person.sql");

/// Returns whether a table with `name` exists in the connected database.
pub fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [name],
        |row| row.get(0),
    )
}

/// Returns column names of `table` in declaration order.
pub fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}
