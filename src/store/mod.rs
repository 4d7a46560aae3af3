//! Flat key/value documents backing the red list, the active roster and the
//! submission records.
//!
//! Every document is loaded and saved as a whole. Writers go through
//! [`Document::update`], which holds a per-document async lock across the
//! load-modify-save cycle so concurrent handlers cannot lose each other's writes.

use crate::config::{Config, StoreBackend};
use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub mod json;
pub mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::{SqliteDocuments, SqliteStore};

/// Red-listed user IDs, in insertion order
pub type Denylist = Vec<String>;
/// User IDs subject to submission reminders
pub type Roster = Vec<String>;
/// User ID -> unix timestamp of the last submission
pub type SubmissionRecords = BTreeMap<String, i64>;

pub const DENYLIST_DOCUMENT: &str = "redlist";
pub const ROSTER_DOCUMENT: &str = "roster";
pub const SUBMISSIONS_DOCUMENT: &str = "submissions";

/// Load/save contract of a single persisted document.
///
/// A document that does not exist yet loads as `T::default()`. A document that
/// exists but cannot be read or parsed is an error.
#[async_trait]
pub trait DocumentStore<T>: Send + Sync {
    async fn load(&self) -> Result<T, StoreError>;
    async fn save(&self, value: &T) -> Result<(), StoreError>;
}

pub struct Document<T> {
    name: &'static str,
    store: Arc<dyn DocumentStore<T>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl<T> Document<T>
where
    T: Default + Send + Sync + 'static,
{
    pub fn new(name: &'static str, store: Arc<dyn DocumentStore<T>>) -> Self {
        Self {
            name,
            store,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub async fn read(&self) -> Result<T, StoreError> {
        self.store.load().await
    }

    /// Read the document, degrading an unavailable store to an empty value.
    pub async fn read_or_default(&self) -> T {
        match self.store.load().await {
            Ok(value) => value,
            Err(e) => {
                warn!("Document '{}' unavailable, treating as empty: {}", self.name, e);
                T::default()
            }
        }
    }

    /// Apply `mutate` to the current value and save it if `mutate` reports a change.
    ///
    /// Returns whether the document was changed. A load failure aborts the update
    /// so a corrupt document is never overwritten.
    pub async fn update<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut T) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut value = self.store.load().await?;
        if !mutate(&mut value) {
            return Ok(false);
        }
        self.store.save(&value).await?;
        Ok(true)
    }
}

/// In-process store for tests.
#[cfg(test)]
pub(crate) struct MemoryStore<T> {
    value: std::sync::Mutex<T>,
}

#[cfg(test)]
impl<T: Default> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
impl<T> MemoryStore<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: std::sync::Mutex::new(value),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<T> DocumentStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync,
{
    async fn load(&self) -> Result<T, StoreError> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        *self.value.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = value.clone();
        Ok(())
    }
}

/// The three documents the bot works with.
pub struct Documents {
    pub denylist: Arc<Document<Denylist>>,
    pub roster: Arc<Document<Roster>>,
    pub submissions: Arc<Document<SubmissionRecords>>,
}

impl Documents {
    /// Open the documents on the backend selected by the configuration.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        match config.store_backend {
            StoreBackend::Json => {
                info!("Store: using JSON documents in '{}'", config.data_dir);
                Ok(Self {
                    denylist: json_document(config, DENYLIST_DOCUMENT),
                    roster: json_document(config, ROSTER_DOCUMENT),
                    submissions: json_document(config, SUBMISSIONS_DOCUMENT),
                })
            }
            StoreBackend::Sqlite => {
                info!("Store: using SQLite database '{}'", config.database_url);
                let db = SqliteDocuments::open(&config.database_url)?;
                db.execute_init()?;
                Ok(Self {
                    denylist: sqlite_document(&db, DENYLIST_DOCUMENT),
                    roster: sqlite_document(&db, ROSTER_DOCUMENT),
                    submissions: sqlite_document(&db, SUBMISSIONS_DOCUMENT),
                })
            }
        }
    }
}

fn json_document<T>(config: &Config, name: &'static str) -> Arc<Document<T>>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    let path = config.document_path(&format!("{}.json", name));
    Arc::new(Document::new(name, Arc::new(JsonFileStore::<T>::new(path))))
}

fn sqlite_document<T>(db: &SqliteDocuments, name: &'static str) -> Arc<Document<T>>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    Arc::new(Document::new(name, Arc::new(SqliteStore::<T>::new(db.clone(), name))))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore<Denylist> for BrokenStore {
        async fn load(&self) -> Result<Denylist, StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        }

        async fn save(&self, _value: &Denylist) -> Result<(), StoreError> {
            panic!("a broken document must never be saved");
        }
    }

    #[tokio::test]
    async fn test_update_reports_change() {
        let doc: Document<Denylist> = Document::new("redlist", Arc::new(MemoryStore::<Denylist>::default()));

        let changed = doc
            .update(|list| {
                list.push("a".to_string());
                true
            })
            .await
            .unwrap();
        assert!(changed);

        let changed = doc.update(|_| false).await.unwrap();
        assert!(!changed);
        assert_eq!(doc.read().await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let doc: Arc<Document<SubmissionRecords>> =
            Arc::new(Document::new(
            "submissions",
            Arc::new(MemoryStore::<SubmissionRecords>::default()),
        ));

        let mut handles = Vec::new();
        for i in 0..20 {
            let doc = doc.clone();
            handles.push(tokio::spawn(async move {
                doc.update(move |records| {
                    records.insert(i.to_string(), i);
                    true
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(doc.read().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_broken_store_degrades_and_refuses_writes() {
        let doc: Document<Denylist> = Document::new("redlist", Arc::new(BrokenStore));

        assert!(doc.read_or_default().await.is_empty());
        let result = doc
            .update(|list| {
                list.push("a".to_string());
                true
            })
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_open_json_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::for_tests();
        config.data_dir = dir.path().to_string_lossy().to_string();

        let docs = Documents::open(&config).unwrap();
        assert_eq!(docs.denylist.name(), DENYLIST_DOCUMENT);
        assert_eq!(docs.roster.name(), ROSTER_DOCUMENT);
        assert_eq!(docs.submissions.name(), SUBMISSIONS_DOCUMENT);
    }
}
