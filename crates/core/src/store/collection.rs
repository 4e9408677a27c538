//! File-backed record collection
//!
//! Stores one record type as a JSON array on disk, with the whole set cached
//! in memory. Every write persists while the write lock is still held so the
//! file always reflects the last committed state.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// A record stored in a [`JsonCollection`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human readable kind, used in not-found errors and logs.
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Bump the modification timestamp before an update is committed.
    fn touch(&mut self, now: DateTime<Utc>);
}

pub struct JsonCollection<T: Record> {
    path: PathBuf,
    cache: RwLock<HashMap<Uuid, T>>,
}

impl<T: Record> JsonCollection<T> {
    /// Open a collection, loading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                let records: Vec<T> = serde_json::from_str(&content)?;
                records.into_iter().map(|r| (r.id(), r)).collect()
            }
        } else {
            HashMap::new()
        };
        debug!("Loaded {} {} record(s) from {:?}", cache.len(), T::KIND, path);

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    async fn persist(&self, cache: &HashMap<Uuid, T>) -> Result<()> {
        let mut records: Vec<&T> = cache.values().collect();
        records.sort_by_key(|r| (r.created_at(), r.id()));
        let content = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Insert a record after `check` has inspected the current contents.
    ///
    /// The check and the insert happen under the same write lock.
    pub async fn insert_checked<F>(&self, record: T, check: F) -> Result<T>
    where
        F: FnOnce(&T, &HashMap<Uuid, T>) -> Result<()>,
    {
        let mut cache = self.cache.write().await;
        if cache.contains_key(&record.id()) {
            return Err(Error::Duplicate(format!(
                "{} with ID {} already exists",
                T::KIND,
                record.id()
            )));
        }
        check(&record, &cache)?;
        cache.insert(record.id(), record.clone());
        self.persist(&cache).await?;
        Ok(record)
    }

    pub async fn insert(&self, record: T) -> Result<T> {
        self.insert_checked(record, |_, _| Ok(())).await
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        self.cache.read().await.get(&id).cloned()
    }

    pub async fn require(&self, id: Uuid) -> Result<T> {
        self.get(id).await.ok_or_else(|| Error::not_found(T::KIND, id))
    }

    pub async fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.cache.read().await.values().find(|r| predicate(r)).cloned()
    }

    /// Matching records, newest first.
    pub async fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let cache = self.cache.read().await;
        let mut records: Vec<T> = cache.values().filter(|r| predicate(r)).cloned().collect();
        records.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        records
    }

    pub async fn list(&self) -> Vec<T> {
        self.filter(|_| true).await
    }

    pub async fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        self.cache.read().await.values().filter(|r| predicate(r)).count()
    }

    /// Apply `change` to a copy of the record and commit it if it succeeds.
    ///
    /// `change` also sees the full collection, for uniqueness checks that
    /// must exclude the record itself.
    pub async fn update<F>(&self, id: Uuid, change: F) -> Result<T>
    where
        F: FnOnce(&mut T, &HashMap<Uuid, T>) -> Result<()>,
    {
        let mut cache = self.cache.write().await;
        let mut record = cache
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(T::KIND, id))?;
        change(&mut record, &cache)?;
        record.touch(Utc::now());
        cache.insert(id, record.clone());
        self.persist(&cache).await?;
        Ok(record)
    }

    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let mut cache = self.cache.write().await;
        let removed = cache.remove(&id).is_some();
        if removed {
            self.persist(&cache).await?;
        }
        Ok(removed)
    }

    /// Remove every record matching `predicate`, returning how many went.
    pub async fn remove_where<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&T) -> bool,
    {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, r| !predicate(r));
        let removed = before - cache.len();
        if removed > 0 {
            self.persist(&cache).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        text: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl Note {
        fn new(text: &str) -> Self {
            let now = Utc::now();
            Self {
                id: Uuid::new_v4(),
                text: text.to_string(),
                created_at: now,
                updated_at: now,
            }
        }
    }

    impl Record for Note {
        const KIND: &'static str = "Note";

        fn id(&self) -> Uuid {
            self.id
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }

        fn touch(&mut self, now: DateTime<Utc>) {
            self.updated_at = now;
        }
    }

    async fn create_test_collection() -> (JsonCollection<Note>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let collection = JsonCollection::open(temp_dir.path().join("notes.json"))
            .await
            .unwrap();
        (collection, temp_dir)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let (notes, _temp) = create_test_collection().await;
        let note = notes.insert(Note::new("hello")).await.unwrap();

        assert_eq!(notes.get(note.id).await.unwrap().text, "hello");
        assert!(notes.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn insert_checked_rejects_without_writing() {
        let (notes, _temp) = create_test_collection().await;
        notes.insert(Note::new("taken")).await.unwrap();

        let result = notes
            .insert_checked(Note::new("taken"), |new, existing| {
                if existing.values().any(|n| n.text == new.text) {
                    return Err(Error::Duplicate("text in use".to_string()));
                }
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Duplicate(_))));
        assert_eq!(notes.count(|_| true).await, 1);
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let (notes, _temp) = create_test_collection().await;
        let result = notes.update(Uuid::new_v4(), |_, _| Ok(())).await;

        match result {
            Err(Error::NotFound { kind, .. }) => assert_eq!(kind, "Note"),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let (notes, _temp) = create_test_collection().await;
        let note = notes.insert(Note::new("original")).await.unwrap();

        let result = notes
            .update(note.id, |n, _| {
                n.text = "changed".to_string();
                Err(Error::invalid("nope"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(notes.get(note.id).await.unwrap().text, "original");
    }

    #[tokio::test]
    async fn remove_where_counts() {
        let (notes, _temp) = create_test_collection().await;
        notes.insert(Note::new("a")).await.unwrap();
        notes.insert(Note::new("b")).await.unwrap();
        notes.insert(Note::new("a")).await.unwrap();

        let removed = notes.remove_where(|n| n.text == "a").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(notes.list().await.len(), 1);
    }

    #[tokio::test]
    async fn persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("notes.json");

        let id = {
            let notes = JsonCollection::<Note>::open(&path).await.unwrap();
            notes.insert(Note::new("survives")).await.unwrap().id
        };

        let notes = JsonCollection::<Note>::open(&path).await.unwrap();
        assert_eq!(notes.get(id).await.unwrap().text, "survives");
    }
}
