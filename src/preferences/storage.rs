use crate::{Error, Result};
use chrono::Utc;
use libsql::{Builder, Database};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};

/// Key/value preference store on libSQL, with an in-memory fallback when the
/// database cannot be opened or written.
pub struct PreferenceStorage {
    db: Option<Database>,
    fallback: Arc<Mutex<HashMap<String, String>>>,
}

impl PreferenceStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let mut storage = Self {
            db: None,
            fallback: Arc::new(Mutex::new(HashMap::new())),
        };

        match storage.init_database(db_path).await {
            Ok(()) => {
                info!("Preference database initialized: {}", db_path);
            }
            Err(e) => {
                warn!(
                    "Preference database initialization failed, using in-memory fallback: {}",
                    e
                );
            }
        }

        Ok(storage)
    }

    pub fn is_persistent(&self) -> bool {
        self.db.is_some()
    }

    async fn init_database(&mut self, db_path: &str) -> Result<()> {
        let db = Builder::new_local(db_path).build().await?;

        let conn = db.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
            (),
        )
        .await?;

        self.db = Some(db);
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(ref db) = self.db {
            match self.get_from_db(db, key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Failed to read preference from database, using fallback: {}", e);
                }
            }
        }

        let fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        Ok(fallback.get(key).cloned())
    }

    async fn get_from_db(&self, db: &Database, key: &str) -> Result<Option<String>> {
        let conn = db.connect()?;
        let mut rows = conn
            .query("SELECT value FROM preferences WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(ref db) = self.db {
            match self.set_in_db(db, key, value).await {
                Ok(()) => {
                    debug!("Preference {} saved to database", key);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Failed to save preference to database, using fallback: {}", e);
                }
            }
        }

        let mut fallback = self
            .fallback
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        fallback.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_in_db(&self, db: &Database, key: &str, value: &str) -> Result<()> {
        let conn = db.connect()?;
        conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, Utc::now().to_rfc3339()),
        )
        .await?;
        Ok(())
    }
}
