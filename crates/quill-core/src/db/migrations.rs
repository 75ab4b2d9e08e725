//! Database migrations

use crate::error::Result;
use crate::util::search_text;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    tracing::debug!(version = CURRENT_VERSION, "Schema is current");

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: notes table and owner indexes
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            title TEXT NOT NULL CHECK (length(title) > 0),
            content TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            is_archived INTEGER NOT NULL DEFAULT 0,
            is_pinned INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_notes_owner ON notes(owner)",
        "CREATE INDEX IF NOT EXISTS idx_notes_owner_listing
            ON notes(owner, is_pinned DESC, updated_at DESC)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    apply(conn, &statements).await?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: case-folded `search_text`, backfilled for existing notes
async fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    if let Err(e) = add_search_text(conn).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e);
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version 2");
    Ok(())
}

async fn add_search_text(conn: &Connection) -> Result<()> {
    conn.execute(
        "ALTER TABLE notes ADD COLUMN search_text TEXT NOT NULL DEFAULT ''",
        (),
    )
    .await?;

    let mut rows = conn.query("SELECT id, title, content FROM notes", ()).await?;
    let mut folded = Vec::new();
    while let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let content: String = row.get(2)?;
        folded.push((id, search_text(&title, &content)));
    }
    drop(rows);

    for (id, text) in folded {
        conn.execute("UPDATE notes SET search_text = ? WHERE id = ?", [text, id])
            .await?;
    }

    conn.execute("INSERT INTO schema_version (version) VALUES (2)", ())
        .await?;
    Ok(())
}

/// Run `statements` in one transaction, rolling back on the first failure
async fn apply(conn: &Connection, statements: &[&str]) -> Result<()> {
    // libsql has no execute_batch with transaction semantics, so statements run one by one
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn index_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1)",
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
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_v2_backfills_search_text() {
        let conn = setup().await;
        migrate_v1(&conn).await.unwrap();
        conn.execute(
            "INSERT INTO notes (id, owner, title, content, created_at, updated_at)
             VALUES ('n1', 'alice', 'Été à Paris', 'Croissants', 0, 0)",
            (),
        )
        .await
        .unwrap();

        run(&conn).await.unwrap();
        assert_eq!(get_version(&conn).await.unwrap(), 2);

        let mut rows = conn
            .query("SELECT search_text FROM notes WHERE id = 'n1'", ())
            .await
            .unwrap();
        let text: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(text, "été à paris\u{1f}croissants");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_owner_indexes_created() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        assert!(index_exists(&conn, "idx_notes_owner").await);
        assert!(index_exists(&conn, "idx_notes_owner_listing").await);
    }
}
