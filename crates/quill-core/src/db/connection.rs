//! Database handle: local file, in-memory, or embedded replica

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Remote libSQL database mirrored into a local file
#[derive(Clone)]
pub struct ReplicaConfig {
    /// e.g. `libsql://notes.turso.io`
    pub url: String,
    pub auth_token: String,
}

impl std::fmt::Debug for ReplicaConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReplicaConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
        }
    }
}

/// An open, migrated note database
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replicated: bool,
}

impl Database {
    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path).build().await?;
        let database = Self::init(db, false).await?;
        tracing::info!(%path, "Opened local note database");
        Ok(database)
    }

    /// Open a throwaway database that lives as long as the handle
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::init(db, false).await
    }

    /// Open `local_path` as a replica of the remote database in `replica`.
    ///
    /// The replica is synced once before migrating, so a schema that already
    /// exists remotely is reused.
    pub async fn open_replica(local_path: impl AsRef<Path>, replica: ReplicaConfig) -> Result<Self> {
        let path = local_path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_remote_replica(&path, replica.url, replica.auth_token)
            .build()
            .await?;
        let database = Self::init(db, true).await?;
        tracing::info!(%path, "Opened replicated note database");
        Ok(database)
    }

    async fn init(db: LibSqlDatabase, replicated: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            replicated,
        };
        database.sync().await?;
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // Replicas reject journal and sync pragmas; failures there are ignored
        for pragma in ["PRAGMA journal_mode = WAL", "PRAGMA synchronous = NORMAL"] {
            if let Err(error) = self.conn.execute(pragma, ()).await {
                tracing::debug!(%pragma, %error, "Pragma not applied");
            }
        }
        self.conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        Ok(())
    }

    /// Pull remote changes; a no-op for local databases
    pub async fn sync(&self) -> Result<()> {
        if self.replicated {
            self.db.sync().await?;
            tracing::debug!("Synced note database with remote");
        }
        Ok(())
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn table_exists(db: &Database, name: &str) -> bool {
        let mut rows = db
            .connection()
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [name],
            )
            .await
            .unwrap();
        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_database_is_migrated() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(table_exists(&db, "notes").await);
        db.sync().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_database_is_created_and_reopened() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("notes.db");

        let db = Database::open(&path).await.unwrap();
        assert!(table_exists(&db, "notes").await);
        assert!(path.exists());
        drop(db);

        let reopened = Database::open(&path).await.unwrap();
        assert!(table_exists(&reopened, "notes").await);
    }

    #[test]
    fn replica_config_redacts_token() {
        let config = ReplicaConfig::new("libsql://notes.turso.io", "sensitive-token");
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("libsql://notes.turso.io"));
        assert!(!debug_output.contains("sensitive-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
