//! SQLite-backed workspace store for clients, projects, invoices and tasks.
//!
//! Each workspace gets its own database at `~/.uba/<workspace>.db` unless the
//! config points somewhere else. The browser build kept these collections in
//! local storage; the database replaces that layer and is the only durable copy.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::StoreError;

pub mod records;
pub mod types;
pub use types::*;

pub struct WorkspaceDb {
    conn: Connection,
}

impl WorkspaceDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an immediate transaction: commit when it returns `Ok`,
    /// roll back when it returns `Err`. A failed rollback is logged and the
    /// closure's own error is returned.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::from)?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("Rollback of workspace transaction failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        log::debug!("Opened workspace database at {}", path.display());
        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.uba/<workspace-slug>.db`.
    pub fn db_path(workspace: &str) -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(Self::db_path_in(&home.join(".uba"), workspace))
    }

    fn db_path_in(dir: &Path, workspace: &str) -> PathBuf {
        let slug = crate::util::slugify(workspace);
        let stem = if slug.is_empty() { "default".to_string() } else { slug };
        dir.join(format!("{stem}.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    #[test]
    fn test_db_path_uses_workspace_slug() {
        let dir = Path::new("/tmp/uba");
        assert_eq!(
            WorkspaceDb::db_path_in(dir, "Acme Studio"),
            dir.join("acme-studio.db")
        );
        assert_eq!(WorkspaceDb::db_path_in(dir, "  "), dir.join("default.db"));
    }

    #[test]
    fn test_open_at_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("ws.db");
        let db = WorkspaceDb::open_at(path.clone()).expect("open");
        assert!(path.exists());
        assert_eq!(client_count(&db), 0);
    }

    fn client_count(db: &WorkspaceDb) -> i64 {
        db.conn_ref()
            .query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))
            .expect("count")
    }

    const INSERT_CLIENT: &str =
        "INSERT INTO clients (id, created_at, updated_at) VALUES ('c1', 'x', 'x')";

    #[test]
    fn test_with_transaction_rolls_back_on_err() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = WorkspaceDb::open_at(dir.path().join("tx.db")).expect("open");
        let result: Result<(), ImportError> = db.with_transaction(|tx| {
            tx.conn_ref()
                .execute(INSERT_CLIENT, [])
                .map_err(StoreError::from)?;
            Err(ImportError::Shape("abort".to_string()))
        });
        assert!(matches!(result, Err(ImportError::Shape(_))));
        assert_eq!(client_count(&db), 0);
    }

    #[test]
    fn test_with_transaction_commits_on_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = WorkspaceDb::open_at(dir.path().join("tx.db")).expect("open");
        let inserted = db
            .with_transaction(|tx| {
                tx.conn_ref()
                    .execute(INSERT_CLIENT, [])
                    .map_err(StoreError::from)
            })
            .expect("commit");
        assert_eq!(inserted, 1);
        assert_eq!(client_count(&db), 1);
    }

    #[test]
    fn test_nested_transaction_surfaces_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = WorkspaceDb::open_at(dir.path().join("tx.db")).expect("open");
        let result: Result<Result<(), StoreError>, StoreError> =
            db.with_transaction(|tx| Ok(tx.with_transaction(|_| Ok(()))));
        assert!(matches!(result, Ok(Err(StoreError::Db(DbError::Sqlite(_))))));
    }
}
