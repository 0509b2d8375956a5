//! Integration tests for the per-table CRUD facade on the embedded backend.

use serde_json::{Value as JsonValue, json};
use sqlbridge::{Database, JsonRow, Table};

fn row(value: serde_json::Value) -> JsonRow {
    value.as_object().unwrap().clone()
}

async fn example_table() -> Table {
    let db = Database::new("sqlite", "sqlite::memory:").unwrap();
    db.execute("CREATE TABLE example_table (id INTEGER PRIMARY KEY ASC, column1 TEXT)")
        .await
        .unwrap();
    Table::new(db, "example_table", "id").unwrap()
}

#[tokio::test]
async fn test_insert_sets_generated_identity() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "test"}))).await.unwrap();
    assert!(model["id"].is_i64(), "identity must be populated: {model:?}");
}

#[tokio::test]
async fn test_insert_keeps_provided_identity() {
    let table = example_table().await;
    let model = table
        .insert(row(json!({"id": 1, "column1": "test"})))
        .await
        .unwrap();
    assert_eq!(model["id"], JsonValue::from(1));
}

#[tokio::test]
async fn test_insert_select_round_trip() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "test"}))).await.unwrap();

    let stored = table.select(model["id"].clone()).await.unwrap().unwrap();
    assert_eq!(stored, model);
}

#[tokio::test]
async fn test_round_trip_with_explicit_identity() {
    let table = example_table().await;
    let model = table
        .insert(row(json!({"id": 7, "column1": "explicit"})))
        .await
        .unwrap();

    let stored = table.select(7).await.unwrap().unwrap();
    assert_eq!(stored, model);
}

#[tokio::test]
async fn test_single_quote_round_trip() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "te'st"}))).await.unwrap();

    let stored = table.select(model["id"].clone()).await.unwrap().unwrap();
    assert_eq!(stored["column1"], JsonValue::from("te'st"));
}

#[tokio::test]
async fn test_bulk_insert_uses_one_statement_and_backfills_ids() {
    let table = example_table().await;
    let inserted = table
        .insert_many(vec![
            row(json!({"column1": "test"})),
            row(json!({"column1": "test again"})),
            row(json!({"column1": "test again and again"})),
        ])
        .await
        .unwrap();

    let ids: Vec<i64> = inserted.iter().map(|m| m["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let all = table.select_many().execute().await.unwrap();
    assert_eq!(all.row_count(), 3);
}

#[tokio::test]
async fn test_select_missing_row_is_none_not_error() {
    let table = example_table().await;
    let missing = table.select(123).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_get_field() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "field"}))).await.unwrap();

    let value = table
        .get_field(model["id"].clone(), "column1")
        .await
        .unwrap();
    assert_eq!(value, Some(JsonValue::from("field")));

    let absent = table.get_field(999, "column1").await.unwrap();
    assert_eq!(absent, None);
}

#[tokio::test]
async fn test_update_single_row() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "test"}))).await.unwrap();

    let affected = table
        .update(model["id"].clone(), row(json!({"column1": "updated"})))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let stored = table.select(model["id"].clone()).await.unwrap().unwrap();
    assert_eq!(stored["column1"], JsonValue::from("updated"));
}

#[tokio::test]
async fn test_update_strips_identity_from_payload() {
    let table = example_table().await;
    let model = table
        .insert(row(json!({"id": 1, "column1": "test"})))
        .await
        .unwrap();

    // The payload carries a different identity value; the stored identity
    // must be unchanged while the data column updates.
    let affected = table
        .update(model["id"].clone(), row(json!({"id": 999, "column1": "updated"})))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    assert!(table.select(999).await.unwrap().is_none());
    let stored = table.select(1).await.unwrap().unwrap();
    assert_eq!(stored["column1"], JsonValue::from("updated"));
}

#[tokio::test]
async fn test_update_missing_row_reports_zero_affected() {
    let table = example_table().await;
    let affected = table
        .update(123, row(json!({"column1": "updated"})))
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn test_update_many_with_predicate() {
    let table = example_table().await;
    table
        .insert_many(vec![
            row(json!({"column1": "a"})),
            row(json!({"column1": "b"})),
        ])
        .await
        .unwrap();

    let result = table
        .update_many(&row(json!({"column1": "same"})))
        .where_eq("id", 1)
        .execute()
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let stored = table.select(2).await.unwrap().unwrap();
    assert_eq!(stored["column1"], JsonValue::from("b"));
}

#[tokio::test]
async fn test_delete_single_row() {
    let table = example_table().await;
    let model = table.insert(row(json!({"column1": "test"}))).await.unwrap();

    let affected = table.delete(model["id"].clone()).await.unwrap();
    assert_eq!(affected, 1);
    assert!(table.select(model["id"].clone()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_many_with_predicate() {
    let table = example_table().await;
    table
        .insert_many(vec![
            row(json!({"column1": "a"})),
            row(json!({"column1": "b"})),
        ])
        .await
        .unwrap();

    table
        .delete_many()
        .and_where(sqlbridge::query::Expr::col(sqlbridge::query::Alias::new("id")).gt(0))
        .execute()
        .await
        .unwrap();

    let remaining = table.select_many().execute().await.unwrap();
    assert_eq!(remaining.row_count(), 0);
}

#[tokio::test]
async fn test_completion_callbacks_observe_results() {
    let table = example_table().await;

    let mut inserted_id = None;
    let model = table
        .insert_with(row(json!({"column1": "cb"})), |result| {
            inserted_id = result.as_ref().ok().map(|m| m["id"].clone());
        })
        .await
        .unwrap();
    assert_eq!(inserted_id, Some(model["id"].clone()));

    let mut update_outcome = None;
    table
        .update_with(model["id"].clone(), row(json!({"column1": "cb2"})), |r| {
            update_outcome = r.as_ref().ok().copied();
        })
        .await
        .unwrap();
    assert_eq!(update_outcome, Some(1));

    let mut delete_outcome = None;
    table
        .delete_with(model["id"].clone(), |r| {
            delete_outcome = r.as_ref().ok().copied();
        })
        .await
        .unwrap();
    assert_eq!(delete_outcome, Some(1));
}
