//! libSQL storage layer (local file) for the persisted workspace.
//!
//! The [`Storage`] struct keeps one JSON snapshot per key in the `app_state`
//! table. The snapshot is written wholesale after every mutation and read
//! wholesale at start; this crate does not interpret its contents.
//!
//! **Access rules:**
//! - the CLI opens read-write via [`Storage::open`]
//! - inspection commands may open read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use draftwright_shared::{DraftwrightError, Result};
use libsql::{Connection, Database, params};

/// A stored snapshot row.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub key: String,
    pub json: String,
    pub updated_at: DateTime<Utc>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DraftwrightError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DraftwrightError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Whether writes are rejected.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DraftwrightError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DraftwrightError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshot operations
    // -----------------------------------------------------------------------

    /// Read the snapshot stored under `key`, if any.
    pub async fn load_snapshot(&self, key: &str) -> Result<Option<StoredSnapshot>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key, json, updated_at FROM app_state WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_snapshot(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DraftwrightError::Storage(e.to_string())),
        }
    }

    /// Write the snapshot under `key`, replacing any previous one.
    pub async fn save_snapshot(&self, key: &str, json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO app_state (key, json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    json = excluded.json,
                    updated_at = excluded.updated_at",
                params![key, json, now.as_str()],
            )
            .await
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?;
        tracing::debug!(key, bytes = json.len(), "saved snapshot");
        Ok(())
    }
}

/// Convert a libSQL row to a [`StoredSnapshot`].
fn row_to_snapshot(row: &libsql::Row) -> Result<StoredSnapshot> {
    Ok(StoredSnapshot {
        key: row
            .get::<String>(0)
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?,
        json: row
            .get::<String>(1)
            .map_err(|e| DraftwrightError::Storage(e.to_string()))?,
        updated_at: {
            let s: String = row
                .get(2)
                .map_err(|e| DraftwrightError::Storage(e.to_string()))?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DraftwrightError::Storage(format!("invalid date: {e}")))?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("dw_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("dw_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn absent_key_is_none() {
        let storage = test_storage().await;
        let loaded = storage.load_snapshot("app-storage").await.expect("load");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn snapshot_upsert_replaces() {
        let storage = test_storage().await;

        storage
            .save_snapshot("app-storage", r#"{"schema_version":1}"#)
            .await
            .expect("save");
        storage
            .save_snapshot("app-storage", r#"{"schema_version":1,"n":2}"#)
            .await
            .expect("save again");

        let loaded = storage.load_snapshot("app-storage").await.unwrap().unwrap();
        assert_eq!(loaded.key, "app-storage");
        assert!(loaded.json.contains("\"n\":2"));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("dw_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.save_snapshot("app-storage", "{}").await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.is_readonly());
        assert!(ro.load_snapshot("app-storage").await.unwrap().is_some());

        let result = ro.save_snapshot("app-storage", "{\"x\":1}").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("dw_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
