//! Append-only storage backend shared by the event logger (C1) and the
//! audit logger (C2).
//!
//! Grounded directly in `enterprise::audit::storage::{AuditStorage,
//! MemoryStorage, FileStorage}`: same trait shape (store/retrieve/count),
//! same JSONL-per-line file format, same writer-mutex-plus-reopen-for-read
//! split (§5). Generalised over the record type so both loggers share one
//! implementation instead of duplicating it per log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::PathBuf;
use thiserror::Error;

/// A record a log can be queried by time.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage contract both loggers depend on.
#[async_trait]
pub trait AppendOnlyStorage<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + Timestamped,
{
    async fn append(&self, record: &T) -> Result<()>;
    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<T>>;
    async fn all(&self) -> Result<Vec<T>>;
    async fn count(&self) -> Result<usize>;
}

/// In-memory backend, for tests and ephemeral deployments.
pub struct MemoryStorage<T> {
    records: Mutex<Vec<T>>,
}

impl<T> MemoryStorage<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> AppendOnlyStorage<T> for MemoryStorage<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + Timestamped,
{
    async fn append(&self, record: &T) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<T>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.timestamp() >= start && r.timestamp() < end)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<T>> {
        Ok(self.records.lock().clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.lock().len())
    }
}

/// Newline-delimited-JSON file backend. A writer mutex serialises appends;
/// reads reopen the file so they never block a concurrent append beyond
/// the duration of a single write.
pub struct FileStorage<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T> FileStorage<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    fn read_all(&self) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl<T> AppendOnlyStorage<T> for FileStorage<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + Timestamped,
{
    async fn append(&self, record: &T) -> Result<()> {
        let _guard = self.write_lock.lock();
        let json = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }

    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<T>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.timestamp() >= start && r.timestamp() < end)
            .collect())
    }

    async fn all(&self) -> Result<Vec<T>> {
        self.read_all()
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Dummy {
        timestamp: DateTime<Utc>,
        value: u32,
    }

    impl Timestamped for Dummy {
        fn timestamp(&self) -> DateTime<Utc> {
            self.timestamp
        }
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::<Dummy>::new();
        let now = Utc::now();
        storage
            .append(&Dummy { timestamp: now, value: 1 })
            .await
            .unwrap();
        assert_eq!(storage.count().await.unwrap(), 1);
        let all = storage.all().await.unwrap();
        assert_eq!(all[0].value, 1);
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let path = std::env::temp_dir().join(format!("docsentinel-test-{}.jsonl", uuid::Uuid::new_v4()));
        let storage = FileStorage::<Dummy>::new(&path);
        let now = Utc::now();
        storage
            .append(&Dummy { timestamp: now, value: 42 })
            .await
            .unwrap();
        let all = storage.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, 42);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_query_range_filters_by_time() {
        let storage = MemoryStorage::<Dummy>::new();
        let now = Utc::now();
        storage.append(&Dummy { timestamp: now - chrono::Duration::hours(2), value: 1 }).await.unwrap();
        storage.append(&Dummy { timestamp: now, value: 2 }).await.unwrap();

        let results = storage
            .query_range(now - chrono::Duration::minutes(1), now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, 2);
    }
}
