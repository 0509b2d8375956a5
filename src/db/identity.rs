//! Generated-identity retrieval.
//!
//! Inserts resolve their generated key by appending a backend-specific
//! "last generated identity" statement to the insert batch and extracting a
//! scalar from that statement's result set. The two backends differ in
//! every detail here:
//!
//! - SQLite's `last_insert_rowid()` is connection-scoped; the table name is
//!   ignored and the scalar is read from a known column alias.
//! - PostgreSQL identity values come from the table's sequence. The
//!   statement locates the identity column through the catalog and reads
//!   `currval` of its sequence, so it is table-scoped and the scalar is the
//!   first column of the first row. A failure here usually means missing
//!   catalog or sequence privileges.
//!
//! Explicitly supplied identity values need their own handling on the
//! networked backend: an insert into a `GENERATED ALWAYS` identity column
//! is rewritten with `OVERRIDING SYSTEM VALUE`.

use crate::db::row::ResultSet;

/// Column alias used by the embedded backend's identity statement.
pub(crate) const SQLITE_IDENTITY_COLUMN: &str = "last_insert_rowid";

/// Statement retrieving the last generated identity on the embedded backend.
pub(crate) fn sqlite_identity_statement() -> String {
    format!(
        "SELECT last_insert_rowid() AS {}",
        SQLITE_IDENTITY_COLUMN
    )
}

/// Statement retrieving the last generated identity for `table` on the
/// networked backend.
pub(crate) fn postgres_identity_statement(table: &str) -> String {
    let table = quote_literal(table);
    format!(
        "SELECT currval(pg_get_serial_sequence({table}, a.attname)) AS last_id \
         FROM pg_attribute a \
         WHERE a.attrelid = {table}::regclass \
           AND a.attnum > 0 \
           AND NOT a.attisdropped \
           AND pg_get_serial_sequence({table}, a.attname) IS NOT NULL \
         LIMIT 1"
    )
}

/// Rewrite an insert statement so the networked backend accepts an
/// explicitly supplied identity value.
pub(crate) fn wrap_identity_insert(insert_sql: &str) -> String {
    match insert_sql.find(" VALUES ") {
        Some(pos) => {
            let (head, tail) = insert_sql.split_at(pos);
            format!("{head} OVERRIDING SYSTEM VALUE{tail}")
        }
        None => insert_sql.to_string(),
    }
}

/// Extract the identity scalar from the embedded backend's result set:
/// first row, known column name.
pub(crate) fn extract_sqlite_identity(result: &ResultSet) -> Option<i64> {
    result
        .rows
        .first()
        .and_then(|row| row.get(SQLITE_IDENTITY_COLUMN))
        .and_then(|value| value.as_i64())
}

/// Extract the identity scalar from the networked backend's result set:
/// first row, first column.
pub(crate) fn extract_postgres_identity(result: &ResultSet) -> Option<i64> {
    result
        .rows
        .first()
        .and_then(|row| row.values().next())
        .and_then(|value| value.as_i64())
}

/// Identities produced by one multi-row insert are consecutive (the insert
/// holds the table's serializer slot, so no other insert can interleave).
/// Given the last value and the row count, reconstruct the full run.
pub(crate) fn backfill_identities(last: i64, count: usize) -> Vec<i64> {
    let count = count as i64;
    (last - count + 1..=last).collect()
}

/// Quote a string as a SQL literal, doubling embedded single quotes.
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
