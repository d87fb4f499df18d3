//! Schema creation and additive migration for `events.db`.
//!
//! Every step is idempotent and failures are logged rather than returned: the
//! database is a derived cache of the case and can always be rebuilt, so a
//! missing optional column only degrades the features that use it.

use rusqlite::Connection;
use tracing::{debug, error, info};

/// Storage tuning. Durability is traded for ingest throughput.
const PRAGMAS: &str = "
PRAGMA synchronous = OFF;
PRAGMA temp_store = MEMORY;
PRAGMA cache_size = 50000;
PRAGMA auto_vacuum = 0;
PRAGMA read_uncommitted = true;
";

const TABLES: [(&str, &str); 4] = [
    (
        "db_info",
        "CREATE TABLE IF NOT EXISTS db_info (
            key TEXT PRIMARY KEY,
            value INTEGER
        )",
    ),
    // Base layout; optional columns are added by MIGRATIONS.
    (
        "events",
        "CREATE TABLE IF NOT EXISTS events (
            event_id INTEGER PRIMARY KEY,
            file_id INTEGER,
            artifact_id INTEGER,
            time INTEGER,
            sub_type INTEGER,
            base_type INTEGER,
            full_description TEXT,
            med_description TEXT,
            short_description TEXT,
            known_state INTEGER
        )",
    ),
    (
        "hash_sets",
        "CREATE TABLE IF NOT EXISTS hash_sets (
            hash_set_id INTEGER PRIMARY KEY,
            hash_set_name VARCHAR(255) UNIQUE NOT NULL
        )",
    ),
    (
        "hash_set_hits",
        "CREATE TABLE IF NOT EXISTS hash_set_hits (
            hash_set_id INTEGER REFERENCES hash_sets(hash_set_id) NOT NULL,
            event_id INTEGER REFERENCES events(event_id) NOT NULL,
            PRIMARY KEY (hash_set_id, event_id)
        )",
    ),
];

/// One additive schema step. `version` is the `user_version` reached once
/// the step has been applied.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub column: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        column: "datasource_id",
        sql: "ALTER TABLE events ADD COLUMN datasource_id INTEGER NOT NULL DEFAULT 0",
    },
    Migration {
        version: 2,
        column: "tagged",
        sql: "ALTER TABLE events ADD COLUMN tagged INTEGER NOT NULL DEFAULT 0",
    },
    Migration {
        version: 3,
        column: "hash_hit",
        sql: "ALTER TABLE events ADD COLUMN hash_hit INTEGER NOT NULL DEFAULT 0",
    },
];

/// Schema version with every migration applied.
pub const LATEST_VERSION: i64 = 3;

const INDICES: &[&[&str]] = &[
    &["file_id"],
    &["artifact_id"],
    &["sub_type", "time"],
    &["base_type", "time"],
    &["known_state"],
];

/// Apply connection pragmas. A failure here means the file is unusable.
pub fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(PRAGMAS)
}

/// Create tables, run pending migrations and create indices.
pub fn ensure_schema(conn: &Connection) {
    for (table, sql) in TABLES {
        if let Err(e) = conn.execute_batch(sql) {
            error!(table, error = %e, "problem creating table");
        }
    }
    migrate(conn);
    for columns in INDICES {
        create_index(conn, "events", columns);
    }
}

/// Drop every table and reset the schema version.
pub fn drop_all(conn: &Connection) {
    for table in ["events", "hash_set_hits", "hash_sets", "db_info"] {
        if let Err(e) = conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}")) {
            error!(table, error = %e, "could not drop table");
        }
    }
    if let Err(e) = conn.pragma_update(None, "user_version", 0) {
        error!(error = %e, "could not reset schema version");
    }
}

pub fn schema_version(conn: &Connection) -> i64 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or_else(|e| {
            error!(error = %e, "could not read schema version");
            0
        })
}

fn migrate(conn: &Connection) {
    let current = schema_version(conn);
    let mut reached = current;
    for step in MIGRATIONS.iter().filter(|m| m.version > current) {
        let applied = match conn.execute_batch(step.sql) {
            Ok(()) => {
                info!(column = step.column, version = step.version, "upgraded events table");
                true
            }
            Err(e) if is_duplicate_column(&e) => {
                debug!(column = step.column, "column already present");
                true
            }
            Err(e) => {
                error!(column = step.column, error = %e, "problem upgrading events table");
                false
            }
        };
        // Only advance past contiguous successes so a failed step is retried
        // on the next open.
        if applied && reached == step.version - 1 {
            reached = step.version;
        }
    }
    if reached != current {
        if let Err(e) = conn.pragma_update(None, "user_version", reached) {
            error!(error = %e, version = reached, "could not record schema version");
        }
    }
}

fn is_duplicate_column(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("duplicate column name")
    )
}

fn create_index(conn: &Connection, table: &str, columns: &[&str]) {
    let name = format!("{table}_{}_idx", columns.join("_"));
    let sql = format!(
        "CREATE INDEX IF NOT EXISTS {name} ON {table}({})",
        columns.join(", ")
    );
    if let Err(e) = conn.execute_batch(&sql) {
        error!(index = %name, error = %e, "problem creating index");
    }
}
