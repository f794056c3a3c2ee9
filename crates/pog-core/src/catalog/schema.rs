//! SQLite schema for the planogram catalog.
//!
//! Migrations are an ordered list of numbered steps. Each pending step runs
//! in its own transaction together with the version bump and its history row.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::errors::{PogError, PogResult};

/// Newest schema this build knows how to read and write.
pub const SCHEMA_VERSION: i32 = 1;

/// Baseline DDL: 6 tables + 3 indexes.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS catalog_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS planograms (
        id TEXT PRIMARY KEY,
        ordinal INTEGER NOT NULL,
        name TEXT NOT NULL,
        subtitle TEXT NOT NULL DEFAULT '',
        pog_number TEXT NOT NULL DEFAULT '',
        live_date TEXT NOT NULL DEFAULT '',
        sides INTEGER NOT NULL,
        shelves INTEGER NOT NULL,
        total_products INTEGER NOT NULL DEFAULT 0,
        pdf_url TEXT NOT NULL DEFAULT ''
    );",
    "CREATE TABLE IF NOT EXISTS stores (
        store_id TEXT PRIMARY KEY,
        ordinal INTEGER NOT NULL,
        planogram_id TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS products (
        planogram_id TEXT NOT NULL REFERENCES planograms(id) ON DELETE CASCADE,
        ordinal INTEGER NOT NULL,
        upc TEXT NOT NULL,
        name TEXT NOT NULL,
        segment INTEGER NOT NULL,
        shelf INTEGER NOT NULL,
        position INTEGER NOT NULL,
        facings INTEGER NOT NULL DEFAULT 1,
        is_new BOOLEAN NOT NULL DEFAULT FALSE,
        is_move BOOLEAN NOT NULL DEFAULT FALSE,
        is_change BOOLEAN NOT NULL DEFAULT FALSE,
        srp TEXT,
        image_url TEXT,
        PRIMARY KEY (planogram_id, ordinal)
    );",
    "CREATE TABLE IF NOT EXISTS upc_redirects (
        planogram_id TEXT NOT NULL REFERENCES planograms(id) ON DELETE CASCADE,
        ordinal INTEGER NOT NULL,
        old_upc TEXT NOT NULL,
        new_upc TEXT NOT NULL,
        PRIMARY KEY (planogram_id, old_upc)
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        version INTEGER PRIMARY KEY,
        description TEXT NOT NULL,
        applied_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE INDEX IF NOT EXISTS idx_products_upc ON products(upc);",
    "CREATE INDEX IF NOT EXISTS idx_products_side_shelf \
     ON products(planogram_id, segment, shelf, position);",
    "CREATE INDEX IF NOT EXISTS idx_stores_planogram ON stores(planogram_id);",
];

struct Migration {
    version: i32,
    description: &'static str,
    apply: fn(&Connection) -> PogResult<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "baseline catalog tables",
    apply: create_baseline,
}];

fn create_baseline(conn: &Connection) -> PogResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}

/// Bring the catalog up to [`SCHEMA_VERSION`]. A catalog written by a newer
/// build is refused rather than read with a stale layout.
pub fn migrate_schema(conn: &Connection) -> PogResult<()> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(PogError::Dataset(format!(
            "catalog schema v{current} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;
        (step.apply)(&tx)?;
        tx.execute(
            "INSERT INTO catalog_meta(key, value) VALUES ('schema_version', ?1) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![step.version.to_string()],
        )?;
        tx.execute(
            "INSERT INTO migration_history(version, description) VALUES (?1, ?2);",
            params![step.version, step.description],
        )?;
        tx.commit()?;
        info!(version = step.version, description = step.description, "catalog schema migrated");
    }
    Ok(())
}

/// Stored schema version; 0 for a database that was never initialised.
pub fn schema_version(conn: &Connection) -> PogResult<i32> {
    let has_meta: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'catalog_meta');",
        [],
        |row| row.get(0),
    )?;
    if !has_meta {
        return Ok(0);
    }
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM catalog_meta WHERE key = 'schema_version';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored.and_then(|v| v.parse().ok()).unwrap_or(0))
}
