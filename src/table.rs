//! Per-table CRUD facade.
//!
//! A [`Table`] binds a table name and its identity column to a shared
//! [`Database`] handle and exposes domain-level operations: inserts come
//! back with their generated identity populated, single-row lookups return
//! an `Option` instead of raising on absence, and update/delete report the
//! affected-row count so a caller can distinguish "applied" from "no such
//! row".
//!
//! The returned shapes map directly onto a REST exposure: list
//! ([`Table::select_many`]), get-one ([`Table::select`]), get-field
//! ([`Table::get_field`]), create ([`Table::insert`]) and update-if-exists
//! ([`Table::update`], zero affected rows meaning "not found").

use crate::database::Database;
use crate::db::identity::backfill_identities;
use crate::db::row::JsonRow;
use crate::error::{SqlError, SqlResult};
use crate::query::{DeleteQuery, SelectQuery, UpdateQuery};
use serde_json::Value as JsonValue;
use tracing::debug;

/// CRUD operations scoped to one table and its identity column.
#[derive(Debug, Clone)]
pub struct Table {
    table: String,
    identity: String,
    database: Database,
}

impl Table {
    /// Bind a table. Fails fast when the table or identity-column name is
    /// missing; the binding itself never touches the backend.
    pub fn new(database: Database, table: &str, identity: &str) -> SqlResult<Self> {
        if table.trim().is_empty() {
            return Err(SqlError::configuration("table"));
        }
        if identity.trim().is_empty() {
            return Err(SqlError::configuration("identity"));
        }
        Ok(Self {
            table: table.to_string(),
            identity: identity.to_string(),
            database,
        })
    }

    /// The bound table name.
    pub fn name(&self) -> &str {
        &self.table
    }

    /// The bound identity column.
    pub fn identity_column(&self) -> &str {
        &self.identity
    }

    /// The shared database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn has_identity(&self, model: &JsonRow) -> bool {
        model
            .get(&self.identity)
            .map(|value| !value.is_null())
            .unwrap_or(false)
    }

    /// Insert one row and return it with the identity field populated.
    ///
    /// When the model supplies its own identity value the statement is
    /// prepared for an explicit-identity insert and the supplied value is
    /// kept; otherwise the generated identity is resolved under the
    /// table's serializer slot and written into the returned model.
    pub async fn insert(&self, model: JsonRow) -> SqlResult<JsonRow> {
        let identity_insert = self.has_identity(&model);
        let sql = self
            .database
            .insert()
            .into_table(&self.table)
            .set_fields(&model)
            .to_sql()?;
        let sql = if identity_insert {
            self.database.prepare_identity_insert(sql)
        } else {
            sql
        };

        let resolved = self
            .database
            .run_insert_batch(&self.table, vec![sql], !identity_insert)
            .await?;

        let mut model = model;
        if let Some(id) = resolved {
            debug!(table = %self.table, id = id, "identity resolved");
            model.insert(self.identity.clone(), JsonValue::from(id));
        }
        Ok(model)
    }

    /// Insert several rows with a single multi-row statement and return
    /// them with identities populated.
    ///
    /// All rows must agree on whether they carry an explicit identity;
    /// mixing both in one batch would make the generated run ambiguous.
    pub async fn insert_many(&self, models: Vec<JsonRow>) -> SqlResult<Vec<JsonRow>> {
        if models.is_empty() {
            return Err(SqlError::invalid_input("no rows to insert"));
        }
        let with_identity = models.iter().filter(|m| self.has_identity(m)).count();
        let identity_insert = if with_identity == 0 {
            false
        } else if with_identity == models.len() {
            true
        } else {
            return Err(SqlError::invalid_input(
                "bulk insert cannot mix explicit and generated identities",
            ));
        };

        let sql = self
            .database
            .insert()
            .into_table(&self.table)
            .set_rows(&models)
            .to_sql()?;
        let sql = if identity_insert {
            self.database.prepare_identity_insert(sql)
        } else {
            sql
        };

        let resolved = self
            .database
            .run_insert_batch(&self.table, vec![sql], !identity_insert)
            .await?;

        let mut models = models;
        if let Some(last) = resolved {
            let ids = backfill_identities(last, models.len());
            for (model, id) in models.iter_mut().zip(ids) {
                model.insert(self.identity.clone(), JsonValue::from(id));
            }
        }
        Ok(models)
    }

    /// Look up a single row by identity. Absence is a `None`, never an
    /// error, so callers can branch on presence directly.
    pub async fn select(&self, id: impl Into<JsonValue>) -> SqlResult<Option<JsonRow>> {
        let result = self
            .select_many()
            .where_eq(&self.identity, id)
            .limit(1)
            .execute()
            .await?;
        Ok(result.into_first_row())
    }

    /// Unexecuted select builder scoped to this table, for callers to add
    /// predicates before executing.
    pub fn select_many(&self) -> SelectQuery {
        self.database.select().from(&self.table)
    }

    /// Look up one field of one row by identity.
    pub async fn get_field(
        &self,
        id: impl Into<JsonValue>,
        column: &str,
    ) -> SqlResult<Option<JsonValue>> {
        let result = self
            .database
            .select()
            .column(column)
            .from(&self.table)
            .where_eq(&self.identity, id)
            .limit(1)
            .execute()
            .await?;
        Ok(result
            .into_first_row()
            .and_then(|mut row| row.remove(column)))
    }

    /// Update a single row by identity and return the affected-row count.
    ///
    /// The identity field is stripped from the payload: identity columns
    /// are immutable after insert, even when the caller passes one along.
    pub async fn update(&self, id: impl Into<JsonValue>, fields: JsonRow) -> SqlResult<u64> {
        let mut fields = fields;
        fields.remove(&self.identity);
        if fields.is_empty() {
            return Err(SqlError::invalid_input("no fields to update"));
        }
        let result = self
            .database
            .update()
            .table(&self.table)
            .set_fields(&fields)
            .where_eq(&self.identity, id)
            .execute()
            .await?;
        Ok(result.rows_affected)
    }

    /// Unexecuted update builder pre-scoped to this table and field set.
    pub fn update_many(&self, fields: &JsonRow) -> UpdateQuery {
        self.database.update().table(&self.table).set_fields(fields)
    }

    /// Delete a single row by identity and return the affected-row count.
    pub async fn delete(&self, id: impl Into<JsonValue>) -> SqlResult<u64> {
        let result = self
            .delete_many()
            .where_eq(&self.identity, id)
            .execute()
            .await?;
        Ok(result.rows_affected)
    }

    /// Unexecuted delete builder scoped to this table.
    pub fn delete_many(&self) -> DeleteQuery {
        self.database.delete().from(&self.table)
    }

    // Completion-callback adapters. Each wraps the corresponding async
    // operation and hands the same result to the callback before returning
    // it, so both surfaces observe identical semantics.

    /// [`Table::insert`] with a completion callback.
    pub async fn insert_with<F>(&self, model: JsonRow, on_complete: F) -> SqlResult<JsonRow>
    where
        F: FnOnce(&SqlResult<JsonRow>),
    {
        let result = self.insert(model).await;
        on_complete(&result);
        result
    }

    /// [`Table::update`] with a completion callback.
    pub async fn update_with<F>(
        &self,
        id: impl Into<JsonValue>,
        fields: JsonRow,
        on_complete: F,
    ) -> SqlResult<u64>
    where
        F: FnOnce(&SqlResult<u64>),
    {
        let result = self.update(id, fields).await;
        on_complete(&result);
        result
    }

    /// [`Table::delete`] with a completion callback.
    pub async fn delete_with<F>(
        &self,
        id: impl Into<JsonValue>,
        on_complete: F,
    ) -> SqlResult<u64>
    where
        F: FnOnce(&SqlResult<u64>),
    {
        let result = self.delete(id).await;
        on_complete(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> Database {
        Database::new("sqlite", "sqlite::memory:").unwrap()
    }

    #[test]
    fn test_missing_table_name_is_rejected() {
        let err = Table::new(database(), "", "id").unwrap_err();
        assert!(matches!(err, SqlError::Configuration { ref field } if field == "table"));
    }

    #[test]
    fn test_missing_identity_column_is_rejected() {
        let err = Table::new(database(), "example_table", " ").unwrap_err();
        assert!(matches!(err, SqlError::Configuration { ref field } if field == "identity"));
    }

    #[test]
    fn test_binding_is_immutable_metadata() {
        let table = Table::new(database(), "example_table", "id").unwrap();
        assert_eq!(table.name(), "example_table");
        assert_eq!(table.identity_column(), "id");
    }

    #[tokio::test]
    async fn test_mixed_bulk_identities_rejected() {
        let table = Table::new(database(), "example_table", "id").unwrap();
        let models = vec![
            serde_json::json!({"id": 1, "column1": "a"})
                .as_object()
                .unwrap()
                .clone(),
            serde_json::json!({"column1": "b"}).as_object().unwrap().clone(),
        ];
        let err = table.insert_many(models).await.unwrap_err();
        assert!(matches!(err, SqlError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_empty_bulk_insert_rejected() {
        let table = Table::new(database(), "example_table", "id").unwrap();
        let err = table.insert_many(Vec::new()).await.unwrap_err();
        assert!(matches!(err, SqlError::InvalidInput { .. }));
    }
}
