//! SQLite schema definitions.

use rusqlite::Connection;
use tracing::info;

use crate::error::{BackendError, StorageError, StorageResult};

use super::backend::BACKEND_NAME;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS record_types (
    uuid TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    plural_label TEXT NOT NULL,
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_record_types_label ON record_types(label);

CREATE TABLE IF NOT EXISTS record_schemas (
    uuid TEXT PRIMARY KEY,
    record_type_id TEXT NOT NULL REFERENCES record_types(uuid),
    version INTEGER NOT NULL,
    schema TEXT NOT NULL,
    previous_version TEXT UNIQUE
        REFERENCES record_schemas(uuid) DEFERRABLE INITIALLY DEFERRED,
    next_version TEXT UNIQUE
        REFERENCES record_schemas(uuid) DEFERRABLE INITIALLY DEFERRED,
    created TEXT NOT NULL,
    modified TEXT NOT NULL,
    UNIQUE (record_type_id, version)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_record_schemas_head
    ON record_schemas(record_type_id) WHERE next_version IS NULL;

CREATE TABLE IF NOT EXISTS records (
    uuid TEXT PRIMARY KEY,
    record_type_id TEXT NOT NULL REFERENCES record_types(uuid),
    schema_id TEXT NOT NULL REFERENCES record_schemas(uuid),
    data TEXT NOT NULL,
    geom TEXT,
    geom_min_x REAL,
    geom_min_y REAL,
    geom_max_x REAL,
    geom_max_y REAL,
    occurred_from TEXT NOT NULL,
    occurred_to TEXT,
    archived INTEGER NOT NULL DEFAULT 0,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_record_type ON records(record_type_id);
CREATE INDEX IF NOT EXISTS idx_records_occurred_from ON records(occurred_from);
CREATE INDEX IF NOT EXISTS idx_records_bbox
    ON records(geom_min_x, geom_max_x, geom_min_y, geom_max_y);

CREATE TABLE IF NOT EXISTS boundaries (
    uuid TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('PENDING', 'PROCESSING', 'WARNING', 'ERROR', 'COMPLETE')),
    errors TEXT,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_boundaries_status ON boundaries(status);

CREATE TABLE IF NOT EXISTS boundary_polygons (
    uuid TEXT PRIMARY KEY,
    boundary_id TEXT NOT NULL REFERENCES boundaries(uuid) ON DELETE CASCADE,
    data TEXT NOT NULL,
    geom TEXT NOT NULL,
    geom_min_x REAL NOT NULL,
    geom_min_y REAL NOT NULL,
    geom_max_x REAL NOT NULL,
    geom_max_y REAL NOT NULL,
    created TEXT NOT NULL,
    modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_boundary_polygons_boundary ON boundary_polygons(boundary_id);
";

fn migration_error(step: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::MigrationError {
        message: format!("{}: {}", step, e),
    })
}

/// Initialize the database schema.
pub fn initialize_schema(conn: &mut Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;
    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .map_err(|e| migration_error("Failed to begin schema transaction", e))?;
    if current_version == 0 {
        tx.execute_batch(SCHEMA_V1)
            .map_err(|e| migration_error("Failed to create schema v1", e))?;
    }
    set_schema_version(&tx, SCHEMA_VERSION)?;
    tx.commit()
        .map_err(|e| migration_error("Failed to commit schema", e))?;

    info!(
        backend = BACKEND_NAME,
        from = current_version,
        to = SCHEMA_VERSION,
        "Initialized database schema"
    );
    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_schema_creation() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let tables = table_names(&conn);
        for table in [
            "boundaries",
            "boundary_polygons",
            "record_schemas",
            "record_types",
            "records",
            "schema_version",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[test]
    fn test_schema_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        initialize_schema(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_second_head_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        conn.execute_batch(
            "INSERT INTO record_types VALUES ('rt', 'A', 'As', NULL, 1, 'now', 'now');
             INSERT INTO record_schemas (uuid, record_type_id, version, schema, created, modified)
                 VALUES ('s1', 'rt', 1, '{}', 'now', 'now');",
        )
        .unwrap();

        let second = conn.execute(
            "INSERT INTO record_schemas (uuid, record_type_id, version, schema, created, modified)
                 VALUES ('s2', 'rt', 2, '{}', 'now', 'now')",
            [],
        );
        assert!(second.is_err());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        let result = conn.execute(
            "INSERT INTO boundaries VALUES ('b', 'B', 'BOGUS', NULL, 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
