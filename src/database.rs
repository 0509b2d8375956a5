//! The backend-agnostic database handle.
//!
//! A [`Database`] is constructed from a driver name and backend options,
//! dispatches every operation to one of a closed set of backend variants,
//! and owns the per-table insert serialization used for identity
//! resolution. Handles are cheap to clone; clones share the underlying
//! connection and serializer state.

use crate::config::{DriverKind, DriverOptions};
use crate::db::procedure::Procedure;
use crate::db::row::ResultSet;
use crate::db::{connection, executor, identity};
use crate::error::{SqlError, SqlResult};
use crate::query::builder::Dialect;
use crate::query::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};
use crate::sync::KeyedLock;
use sqlx::{PgPool, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum Backend {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

/// Uniform access to one backend database.
#[derive(Debug, Clone)]
pub struct Database {
    backend: Backend,
    insert_locks: Arc<KeyedLock>,
}

impl Database {
    /// Create a handle for the named driver.
    ///
    /// `driver` must be `"sqlite"` or `"postgres"`; anything else fails with
    /// [`SqlError::UnknownDriver`]. Options are validated here, but the
    /// connection itself is only established on first use.
    pub fn new(driver: &str, options: &str) -> SqlResult<Self> {
        let kind = DriverKind::from_name(driver)?;
        let options = DriverOptions::new(kind, options)?;
        let backend = match kind {
            DriverKind::Sqlite => Backend::Sqlite(connection::open_sqlite(&options)?),
            DriverKind::Postgres => Backend::Postgres(connection::open_postgres(&options)?),
        };
        info!(driver = %kind, "database handle created");
        Ok(Self {
            backend,
            insert_locks: Arc::new(KeyedLock::new()),
        })
    }

    /// The active driver.
    pub fn driver(&self) -> DriverKind {
        match &self.backend {
            Backend::Sqlite(_) => DriverKind::Sqlite,
            Backend::Postgres(_) => DriverKind::Postgres,
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        match &self.backend {
            Backend::Sqlite(_) => Dialect::Sqlite,
            Backend::Postgres(_) => Dialect::Postgres,
        }
    }

    /// Run a single SQL statement and return its result set.
    pub async fn execute(&self, sql: &str) -> SqlResult<ResultSet> {
        if sql.trim().is_empty() {
            return Err(SqlError::invalid_input("empty SQL statement"));
        }
        let statements = [sql.to_string()];
        let mut results = self.run_batch(&statements).await?;
        // Exactly one statement went in, so exactly one result comes back.
        Ok(results.pop().unwrap_or_default())
    }

    /// Run an ordered batch of SQL statements as one unit.
    ///
    /// On the networked backend the batch is transactional: a failing
    /// statement aborts and rolls back the whole batch. The embedded
    /// backend applies statements one at a time and fails fast, leaving
    /// earlier statements applied.
    pub async fn execute_batch(&self, statements: &[String]) -> SqlResult<Vec<ResultSet>> {
        if statements.is_empty() {
            return Err(SqlError::invalid_input("empty statement batch"));
        }
        self.run_batch(statements).await
    }

    async fn run_batch(&self, statements: &[String]) -> SqlResult<Vec<ResultSet>> {
        match &self.backend {
            Backend::Sqlite(pool) => executor::run_sqlite_batch(pool, statements).await,
            Backend::Postgres(pool) => executor::run_postgres_batch(pool, statements).await,
        }
    }

    /// Retrieve the most recently generated identity value.
    ///
    /// The embedded backend's lookup is connection-scoped and ignores
    /// `table`; the networked backend's lookup is table-scoped, so `table`
    /// is required there.
    pub async fn get_last_inserted_id(&self, table: Option<&str>) -> SqlResult<i64> {
        match &self.backend {
            Backend::Sqlite(_) => {
                let result = self.execute(&identity::sqlite_identity_statement()).await?;
                identity::extract_sqlite_identity(&result).ok_or_else(|| {
                    SqlError::identity_resolution(table.unwrap_or("(current connection)"))
                })
            }
            Backend::Postgres(_) => {
                let table = table.ok_or_else(|| SqlError::configuration("table"))?;
                let result = self
                    .execute(&identity::postgres_identity_statement(table))
                    .await?;
                identity::extract_postgres_identity(&result)
                    .ok_or_else(|| SqlError::identity_resolution(table))
            }
        }
    }

    /// Start a stored-procedure invocation.
    ///
    /// Only the networked backend supports stored procedures; on other
    /// drivers this fails instead of silently doing nothing.
    pub fn procedure(&self) -> SqlResult<Procedure> {
        match &self.backend {
            Backend::Postgres(pool) => Ok(Procedure::new(pool.clone())),
            Backend::Sqlite(_) => Err(SqlError::Unsupported {
                driver: "sqlite",
                capability: "stored procedures",
            }),
        }
    }

    /// Start building a select statement.
    pub fn select(&self) -> SelectQuery {
        SelectQuery::new(self.clone())
    }

    /// Start building an insert statement.
    pub fn insert(&self) -> InsertQuery {
        InsertQuery::new(self.clone())
    }

    /// Start building an update statement.
    pub fn update(&self) -> UpdateQuery {
        UpdateQuery::new(self.clone())
    }

    /// Start building a delete statement.
    pub fn delete(&self) -> DeleteQuery {
        DeleteQuery::new(self.clone())
    }

    /// Tear down the cached connection. Pending operations fail afterwards.
    pub async fn close(&self) {
        match &self.backend {
            Backend::Sqlite(pool) => pool.close().await,
            Backend::Postgres(pool) => pool.close().await,
        }
        info!(driver = %self.driver(), "database handle closed");
    }

    /// Rewrite an insert statement for an explicitly supplied identity
    /// value, where the backend needs it.
    pub(crate) fn prepare_identity_insert(&self, sql: String) -> String {
        match &self.backend {
            Backend::Postgres(_) => identity::wrap_identity_insert(&sql),
            Backend::Sqlite(_) => sql,
        }
    }

    /// Run an insert batch under the table's serializer slot, optionally
    /// appending and extracting the backend's identity lookup.
    ///
    /// At most one insert per table name is in flight at any instant, so
    /// the appended lookup cannot observe another insert's identity.
    /// Inserts into different tables proceed concurrently.
    pub(crate) async fn run_insert_batch(
        &self,
        table: &str,
        mut statements: Vec<String>,
        resolve_identity: bool,
    ) -> SqlResult<Option<i64>> {
        let _slot = self.insert_locks.acquire(table).await;
        debug!(table = %table, "insert slot acquired");

        if resolve_identity {
            statements.push(match &self.backend {
                Backend::Sqlite(_) => identity::sqlite_identity_statement(),
                Backend::Postgres(_) => identity::postgres_identity_statement(table),
            });
        }
        let results = self.run_batch(&statements).await?;
        if !resolve_identity {
            return Ok(None);
        }
        let resolved = match &self.backend {
            Backend::Sqlite(_) => results.last().and_then(identity::extract_sqlite_identity),
            Backend::Postgres(_) => results.last().and_then(identity::extract_postgres_identity),
        };
        match resolved {
            Some(id) => Ok(Some(id)),
            None => Err(SqlError::identity_resolution(table)),
        }
    }
}
