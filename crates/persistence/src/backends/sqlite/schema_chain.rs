//! SchemaStorage implementation for SQLite.
//!
//! Publishing runs on the blocking pool inside a `BEGIN IMMEDIATE`
//! transaction, so concurrent publishers for the same record type serialize
//! on the database write lock and each sees the head left by the previous
//! one.

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::SchemaStorage;
use crate::error::{SchemaError, StorageResult, TransactionError};
use crate::schema::{ChainLink, SchemaValidator, SchemaVersionChain};
use crate::types::{RecordSchema, stored_now};

use super::SqliteBackend;
use super::backend::checkout;
use super::query_builder::format_timestamp;
use super::storage::{get_json, get_optional_uuid, get_timestamp, get_uuid, internal_error};

const SCHEMA_COLUMNS: &str = "SELECT uuid, record_type_id, version, schema, previous_version, \
     next_version, created, modified FROM record_schemas";

fn map_schema(row: &Row<'_>) -> rusqlite::Result<RecordSchema> {
    Ok(RecordSchema::from_storage(
        get_uuid(row, 0)?,
        get_uuid(row, 1)?,
        row.get(2)?,
        get_json(row, 3)?,
        get_optional_uuid(row, 4)?,
        get_optional_uuid(row, 5)?,
        get_timestamp(row, 6)?,
        get_timestamp(row, 7)?,
    ))
}

fn read_head(conn: &Connection, record_type: Uuid) -> StorageResult<Option<RecordSchema>> {
    conn.query_row(
        &format!(
            "{} WHERE record_type_id = ?1 AND next_version IS NULL",
            SCHEMA_COLUMNS
        ),
        [record_type.to_string()],
        map_schema,
    )
    .optional()
    .map_err(|e| internal_error(format!("Failed to read current schema: {}", e)))
}

/// Appends a version to the chain. Either every write lands or none does.
fn publish_in_transaction(
    pool: &Pool<SqliteConnectionManager>,
    record_type: Uuid,
    schema: Value,
) -> StorageResult<RecordSchema> {
    let mut conn = checkout(pool)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

    let type_exists: bool = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM record_types WHERE uuid = ?1)",
            [record_type.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| internal_error(format!("Failed to check record type: {}", e)))?;
    if !type_exists {
        return Err(SchemaError::RecordTypeNotFound { id: record_type }.into());
    }

    let head = read_head(&tx, record_type)?;
    let link = ChainLink::after(head.as_ref());
    let id = Uuid::new_v4();
    let now = stored_now();
    let stamp = format_timestamp(&now);

    // The head index allows one open version per type, so the old head is
    // closed before the new one is inserted.
    if let Some(head) = &head {
        tx.execute(
            "UPDATE record_schemas SET next_version = ?1, modified = ?2 WHERE uuid = ?3",
            params![id.to_string(), stamp, head.uuid().to_string()],
        )
        .map_err(|e| internal_error(format!("Failed to link previous schema: {}", e)))?;
    }

    let document = serde_json::to_string(&schema)?;
    tx.execute(
        "INSERT INTO record_schemas
             (uuid, record_type_id, version, schema, previous_version, next_version, created, modified)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
        params![
            id.to_string(),
            record_type.to_string(),
            link.version,
            document,
            link.previous_version.map(|p| p.to_string()),
            stamp,
        ],
    )
    .map_err(|e| internal_error(format!("Failed to insert schema: {}", e)))?;

    tx.commit().map_err(|e| TransactionError::RolledBack {
        reason: format!("schema publish for record type {}: {}", record_type, e),
    })?;

    info!(
        record_type = %record_type,
        schema = %id,
        version = link.version,
        "Published schema version"
    );
    Ok(RecordSchema::from_storage(
        id,
        record_type,
        link.version,
        schema,
        link.previous_version,
        None,
        now,
        now,
    ))
}

#[async_trait]
impl SchemaStorage for SqliteBackend {
    async fn publish_schema(&self, record_type: Uuid, schema: Value) -> StorageResult<RecordSchema> {
        SchemaValidator::check(&schema)?;

        let pool = self.pool().clone();
        tokio::task::spawn_blocking(move || publish_in_transaction(&pool, record_type, schema))
            .await
            .map_err(|e| internal_error(format!("Schema publish task failed: {}", e)))?
    }

    async fn get_schema(&self, id: Uuid) -> StorageResult<Option<RecordSchema>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("{} WHERE uuid = ?1", SCHEMA_COLUMNS),
            [id.to_string()],
            map_schema,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read schema: {}", e)))
    }

    async fn current_schema(&self, record_type: Uuid) -> StorageResult<Option<RecordSchema>> {
        let conn = self.get_connection()?;
        read_head(&conn, record_type)
    }

    async fn schema_chain(&self, record_type: Uuid) -> StorageResult<SchemaVersionChain> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&format!("{} WHERE record_type_id = ?1", SCHEMA_COLUMNS))
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let versions = stmt
            .query_map([record_type.to_string()], map_schema)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| internal_error(format!("Failed to read schema chain: {}", e)))?;

        debug!(record_type = %record_type, versions = versions.len(), "Loaded schema chain");
        Ok(SchemaVersionChain::from_versions(record_type, versions)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordStorage;
    use crate::error::StorageError;
    use crate::types::RecordType;
    use serde_json::json;

    async fn backend_with_type() -> (SqliteBackend, Uuid) {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        let record_type = backend
            .create_record_type(RecordType::new("Incident", "Incidents"))
            .await
            .unwrap();
        (backend, record_type.uuid)
    }

    #[tokio::test]
    async fn test_first_publish_starts_chain() {
        let (backend, record_type) = backend_with_type().await;
        let schema = backend
            .publish_schema(record_type, json!({"type": "object"}))
            .await
            .unwrap();

        assert_eq!(schema.version(), 1);
        assert_eq!(schema.previous_version(), None);
        assert!(schema.is_current());
        assert_eq!(backend.current_schema(record_type).await.unwrap(), Some(schema));
    }

    #[tokio::test]
    async fn test_second_publish_links_versions() {
        let (backend, record_type) = backend_with_type().await;
        let first = backend
            .publish_schema(record_type, json!({"type": "object"}))
            .await
            .unwrap();
        let second = backend
            .publish_schema(record_type, json!({"type": "object", "required": ["a"]}))
            .await
            .unwrap();

        assert_eq!(second.version(), 2);
        assert_eq!(second.previous_version(), Some(first.uuid()));

        let first = backend.get_schema(first.uuid()).await.unwrap().unwrap();
        assert_eq!(first.next_version(), Some(second.uuid()));
        assert!(!first.is_current());

        let chain = backend.schema_chain(record_type).await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.current().map(RecordSchema::uuid), Some(second.uuid()));
        chain.verify().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_schema_leaves_chain_untouched() {
        let (backend, record_type) = backend_with_type().await;
        let err = backend
            .publish_schema(record_type, json!({"type": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Schema(SchemaError::InvalidSchema { .. })));
        assert!(backend.schema_chain(record_type).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_for_missing_record_type() {
        let (backend, _) = backend_with_type().await;
        let missing = Uuid::new_v4();
        let err = backend
            .publish_schema(missing, json!({"type": "object"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Schema(SchemaError::RecordTypeNotFound { id }) if id == missing
        ));
    }
}
