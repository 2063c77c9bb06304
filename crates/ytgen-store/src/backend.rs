//! In-process document collection.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};

/// A keyed collection of records.
///
/// All mutations take the write lock, so a `mutate` closure observes and
/// commits a record atomically; this is the serialization point for the
/// guarded status transitions built on top.
#[derive(Debug, Clone)]
pub struct Collection<T: Clone> {
    records: Arc<RwLock<HashMap<String, T>>>,
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Collection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record under `id`, replacing any existing record.
    pub async fn insert(&self, id: impl Into<String>, record: T) {
        self.records.write().await.insert(id.into(), record);
    }

    /// Get a record by id.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.records.read().await.get(id).cloned()
    }

    /// Mutate a record under the write lock.
    ///
    /// The closure runs against a working copy; it is committed only when
    /// the closure succeeds, so a failed guard leaves the record untouched.
    pub async fn mutate<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut T) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        let mut draft = record.clone();
        let result = f(&mut draft)?;
        *record = draft;
        Ok(result)
    }

    /// Remove a record by id, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<T> {
        self.records.write().await.remove(id)
    }

    /// All records matching a predicate (indexed lookup equivalent).
    pub async fn find(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Remove all records matching a predicate, returning how many.
    pub async fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !predicate(r));
        before - records.len()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let coll: Collection<u32> = Collection::new();
        coll.insert("a", 1).await;
        assert_eq!(coll.get("a").await, Some(1));
        assert_eq!(coll.remove("a").await, Some(1));
        assert_eq!(coll.get("a").await, None);
    }

    #[tokio::test]
    async fn test_mutate_missing_is_not_found() {
        let coll: Collection<u32> = Collection::new();
        let err = coll.mutate("missing", |v| Ok(*v)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mutate_failure_commits_nothing() {
        let coll: Collection<u32> = Collection::new();
        coll.insert("a", 1).await;

        let result: StoreResult<()> = coll
            .mutate("a", |v| {
                *v = 99;
                Err(StoreError::invalid_transition("guard failed"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(coll.get("a").await, Some(1));
    }

    #[tokio::test]
    async fn test_find_and_remove_where() {
        let coll: Collection<u32> = Collection::new();
        coll.insert("a", 1).await;
        coll.insert("b", 2).await;
        coll.insert("c", 3).await;

        let mut odd = coll.find(|v| v % 2 == 1).await;
        odd.sort();
        assert_eq!(odd, vec![1, 3]);

        assert_eq!(coll.remove_where(|v| *v > 1).await, 2);
        assert_eq!(coll.len().await, 1);
    }
}
