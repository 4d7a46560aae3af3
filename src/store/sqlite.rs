use super::DocumentStore;
use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// SQLite database holding each document as one JSON text row.
#[derive(Clone)]
pub struct SqliteDocuments {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocuments {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        if database_url != ":memory:" {
            if let Some(parent) = Path::new(database_url)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> Result<(), StoreError> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS documents (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        ";
        self.lock().execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    pub fn get_document(&self, name: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let body = conn
            .query_row(
                "SELECT body FROM documents WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    pub fn put_document(&self, name: &str, body: &str) -> Result<(), StoreError> {
        debug!("Database: Saving document '{}'", name);
        self.lock().execute(
            "INSERT INTO documents (name, body, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET body = ?2, updated_at = CURRENT_TIMESTAMP",
            (name, body),
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One named document inside a [`SqliteDocuments`] database.
pub struct SqliteStore<T> {
    db: SqliteDocuments,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SqliteStore<T> {
    pub fn new(db: SqliteDocuments, name: &str) -> Self {
        Self {
            db,
            name: name.to_string(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> DocumentStore<T> for SqliteStore<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    async fn load(&self) -> Result<T, StoreError> {
        let db = self.db.clone();
        let name = self.name.clone();
        let body = tokio::task::spawn_blocking(move || db.get_document(&name)).await??;
        match body {
            Some(body) => Ok(serde_json::from_str(&body)?),
            None => Ok(T::default()),
        }
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string(value)?;
        let db = self.db.clone();
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || db.put_document(&name, &body)).await??;
        Ok(())
    }
}
