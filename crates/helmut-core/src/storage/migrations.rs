//! Database schema migrations for helmut.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);
    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: task list.
///
/// `sort_order` holds the task's rank among active tasks. `completed_at` is
/// NULL exactly when `is_completed` is 0.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            title             TEXT NOT NULL,
            estimated_minutes INTEGER NOT NULL CHECK (estimated_minutes > 0),
            is_completed      INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL,
            completed_at      TEXT,
            sort_order        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_active
            ON tasks(is_completed, sort_order, created_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_completed_at ON tasks(completed_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    debug!("applied schema v1");
    Ok(())
}

/// Migration v2: templates and their child tasks.
///
/// Children cascade with their template.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS templates (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon        TEXT NOT NULL DEFAULT '⚡',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS template_tasks (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            template_id       INTEGER NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
            title             TEXT NOT NULL,
            estimated_minutes INTEGER NOT NULL CHECK (estimated_minutes > 0),
            sort_order        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_template_tasks_template_id
            ON template_tasks(template_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    debug!("applied schema v2");
    Ok(())
}
