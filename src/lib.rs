//! Uniform CRUD data access over heterogeneous SQL backends.
//!
//! This crate lets callers issue CRUD-style operations against an embedded
//! engine (SQLite) and a networked engine (PostgreSQL) through one
//! interface, hiding how each backend retrieves generated identities,
//! transacts multi-statement batches, and binds stored-procedure
//! parameters.
//!
//! # Example
//!
//! ```no_run
//! use sqlbridge::{Database, Table};
//! use serde_json::json;
//!
//! # async fn demo() -> sqlbridge::SqlResult<()> {
//! let db = Database::new("sqlite", "sqlite::memory:")?;
//! db.execute("CREATE TABLE example_table (id INTEGER PRIMARY KEY ASC, column1 TEXT)")
//!     .await?;
//!
//! let table = Table::new(db.clone(), "example_table", "id")?;
//! let model = table
//!     .insert(json!({"column1": "test"}).as_object().unwrap().clone())
//!     .await?;
//! assert!(model["id"].is_i64());
//!
//! let row = table.select(model["id"].clone()).await?;
//! assert!(row.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! Concurrent inserts into the same table are serialized per table name so
//! identity resolution can never observe a neighboring insert's key;
//! inserts into different tables proceed concurrently.

pub mod config;
pub mod database;
pub mod db;
pub mod error;
pub mod query;
pub mod sync;
pub mod table;

pub use config::{DriverKind, DriverOptions};
pub use database::Database;
pub use db::procedure::{ParamDirection, Procedure, ProcedureResult};
pub use db::row::{JsonRow, ResultSet};
pub use error::{SqlError, SqlResult};
pub use query::{DeleteQuery, InsertQuery, SelectQuery, UpdateQuery};
pub use table::Table;
