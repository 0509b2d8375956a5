//! Statement batch execution.
//!
//! A batch is an ordered, non-empty sequence of SQL strings executed as one
//! logical unit on the backend's single connection. The two backends have
//! different guarantees:
//!
//! - SQLite runs statements sequentially and fails fast on the first error.
//!   No transaction is opened, so earlier statements stay applied. This
//!   mirrors the engine's statement-at-a-time model and is a deliberate
//!   limitation, not an atomicity guarantee.
//! - PostgreSQL wraps the batch in a transaction. On a statement error the
//!   remaining statements are not attempted, the transaction is rolled
//!   back, and the statement's own error is surfaced (a rollback failure
//!   is logged, not raised).
//!
//! Results come back as one [`ResultSet`] per statement, ordered to match
//! the input.

use crate::db::row::{ResultSet, RowToJson};
use crate::error::{SqlError, SqlResult};
use tracing::{debug, warn};

pub(crate) use postgres::run_batch as run_postgres_batch;
pub(crate) use sqlite::run_batch as run_sqlite_batch;

mod sqlite {
    use super::*;
    use futures_util::TryStreamExt;
    use sqlx::{Either, Executor, SqlitePool};

    pub async fn run_batch(pool: &SqlitePool, statements: &[String]) -> SqlResult<Vec<ResultSet>> {
        let mut conn = pool.acquire().await.map_err(SqlError::from)?;
        let mut results = Vec::with_capacity(statements.len());
        for sql in statements {
            debug!(sql = %sql, "executing statement (sqlite)");
            let mut result = ResultSet::default();
            let mut stream = (&mut *conn).fetch_many(sql.as_str());
            while let Some(item) = stream.try_next().await.map_err(SqlError::from)? {
                match item {
                    Either::Left(done) => result.rows_affected += done.rows_affected(),
                    Either::Right(row) => result.rows.push(row.to_json_row()),
                }
            }
            drop(stream);
            results.push(result);
        }
        Ok(results)
    }
}

mod postgres {
    use super::*;
    use futures_util::TryStreamExt;
    use sqlx::{Either, Executor, PgPool, Postgres, Transaction};

    pub async fn run_batch(pool: &PgPool, statements: &[String]) -> SqlResult<Vec<ResultSet>> {
        let mut tx = pool.begin().await.map_err(SqlError::from)?;
        let mut results = Vec::with_capacity(statements.len());
        for sql in statements {
            debug!(sql = %sql, "executing statement (postgres)");
            match run_one(&mut tx, sql).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(error = %err, "statement failed, rolling back batch");
                    // Remaining statements are not attempted. The rollback is
                    // awaited, but callers see the statement error; a rollback
                    // failure of its own is only logged.
                    if let Err(rollback_err) = tx.rollback().await {
                        debug!(error = %rollback_err, "rollback reported an error");
                    }
                    return Err(err);
                }
            }
        }
        tx.commit().await.map_err(SqlError::from)?;
        Ok(results)
    }

    async fn run_one(tx: &mut Transaction<'static, Postgres>, sql: &str) -> SqlResult<ResultSet> {
        let mut result = ResultSet::default();
        let mut stream = (&mut **tx).fetch_many(sql);
        while let Some(item) = stream.try_next().await.map_err(SqlError::from)? {
            match item {
                Either::Left(done) => result.rows_affected += done.rows_affected(),
                Either::Right(row) => result.rows.push(row.to_json_row()),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriverKind, DriverOptions};
    use crate::db::connection::open_sqlite;
    use serde_json::Value as JsonValue;

    async fn memory_pool() -> sqlx::SqlitePool {
        let options = DriverOptions::new(DriverKind::Sqlite, "sqlite::memory:").unwrap();
        open_sqlite(&options).unwrap()
    }

    #[tokio::test]
    async fn test_batch_results_are_ordered() {
        let pool = memory_pool().await;
        let statements = vec![
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)".to_string(),
            "INSERT INTO t (v) VALUES ('a')".to_string(),
            "SELECT v FROM t".to_string(),
        ];
        let results = run_sqlite_batch(&pool, &statements).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].rows_affected, 1);
        assert_eq!(results[2].rows[0]["v"], JsonValue::from("a"));
    }

    #[tokio::test]
    async fn test_sqlite_fails_fast_without_rollback() {
        let pool = memory_pool().await;
        let setup = vec!["CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)".to_string()];
        run_sqlite_batch(&pool, &setup).await.unwrap();

        let statements = vec![
            "INSERT INTO t (v) VALUES ('kept')".to_string(),
            "INSERT INTO missing_table (v) VALUES ('x')".to_string(),
            "INSERT INTO t (v) VALUES ('never')".to_string(),
        ];
        let err = run_sqlite_batch(&pool, &statements).await.unwrap_err();
        assert!(matches!(err, SqlError::Statement { .. }));

        // The statement before the failure stays applied; the one after it
        // was never attempted.
        let check = vec!["SELECT v FROM t ORDER BY id".to_string()];
        let results = run_sqlite_batch(&pool, &check).await.unwrap();
        assert_eq!(results[0].rows.len(), 1);
        assert_eq!(results[0].rows[0]["v"], JsonValue::from("kept"));
    }

    #[tokio::test]
    async fn test_statement_error_carries_backend_message() {
        let pool = memory_pool().await;
        let statements = vec!["SELECT * FROM no_such_table".to_string()];
        let err = run_sqlite_batch(&pool, &statements).await.unwrap_err();
        assert!(err.to_string().contains("no_such_table"));
    }
}
