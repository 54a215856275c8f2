//! Workspace schema upgrades.
//!
//! The SQL files under `migrations/` are compiled in and applied in version
//! order. A migration and the `schema_version` row that records it commit
//! together, so a failed upgrade leaves the database at the last good
//! version.

use rusqlite::{Connection, DatabaseName};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const WORKSPACE_SCHEMA: &[Migration] = &[
    Migration {
        version: 1,
        name: "baseline collections",
        sql: include_str!("migrations/001_baseline.sql"),
    },
    Migration {
        version: 2,
        name: "link key indexes",
        sql: include_str!("migrations/002_link_indexes.sql"),
    },
];

/// Bring a workspace database up to the newest schema. Returns how many
/// migrations were applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    apply(conn, WORKSPACE_SCHEMA)
}

fn apply(conn: &Connection, migrations: &[Migration]) -> Result<usize, String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Cannot track workspace schema: {e}"))?;

    let applied = applied_version(conn)?;
    let supported = migrations.iter().map(|m| m.version).max().unwrap_or(0);
    if applied > supported {
        return Err(format!(
            "Workspace database is at schema v{applied} but this uba-links build only \
             understands up to v{supported}; upgrade uba-links before linking records"
        ));
    }

    let pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        return Ok(0);
    }
    if applied > 0 {
        snapshot_before_upgrade(conn, applied)?;
    }

    for migration in &pending {
        let fail = |e: rusqlite::Error| {
            format!(
                "Schema v{} ({}) failed: {e}",
                migration.version, migration.name
            )
        };
        let tx = conn.unchecked_transaction().map_err(fail)?;
        tx.execute_batch(migration.sql).map_err(fail)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )
        .map_err(fail)?;
        tx.commit().map_err(fail)?;
        log::info!(
            "Workspace schema upgraded to v{} ({})",
            migration.version,
            migration.name
        );
    }

    Ok(pending.len())
}

fn applied_version(conn: &Connection) -> Result<u32, String> {
    conn.query_row("SELECT IFNULL(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(|e| format!("Cannot read workspace schema version: {e}"))
}

/// Copy a file-backed database to `<file>.v<version>.bak` before it is
/// upgraded. In-memory databases have no file and are skipped.
fn snapshot_before_upgrade(conn: &Connection, version: u32) -> Result<(), String> {
    let file: String = conn
        .query_row("SELECT file FROM pragma_database_list WHERE name = 'main'", [], |row| {
            row.get(0)
        })
        .map_err(|e| format!("Cannot locate workspace database file: {e}"))?;
    if file.is_empty() {
        return Ok(());
    }

    let target = format!("{file}.v{version}.bak");
    conn.backup(DatabaseName::Main, &target, None)
        .map_err(|e| format!("Cannot snapshot workspace before upgrade: {e}"))?;
    log::info!("Saved schema v{} snapshot to {}", version, target);
    Ok(())
}
