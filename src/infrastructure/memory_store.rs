// In-process document store used for local runs (DATABASE_URL=memory) and tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{
    compare_json, Collection, Document, DocumentStore, Filter, FindOptions, SortOrder,
    StoreTransaction, CREATED_AT_FIELD,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    data: Document,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<Collection, BTreeMap<String, StoredDocument>>,
    next_seq: u64,
}

impl MemoryState {
    fn select(&self, collection: Collection, filter: &Filter) -> Vec<&StoredDocument> {
        let mut docs: Vec<&StoredDocument> = self
            .collections
            .get(&collection)
            .map(|c| c.values().filter(|d| filter.matches(&d.data)).collect())
            .unwrap_or_default();
        docs.sort_by_key(|d| d.seq);
        docs
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: RwLock<MemoryState>,
    failing_deletes: RwLock<HashSet<Collection>>,
}

impl MemoryInner {
    async fn ensure_deletable(&self, collection: Collection) -> AppResult<()> {
        if self.failing_deletes.read().await.contains(&collection) {
            return Err(AppError::Database(format!(
                "Deletes in {} are failing",
                collection
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delete touching `collection` fail, directly or at commit.
    /// Lets tests exercise the rollback path of multi-document writes.
    pub async fn fail_deletes_in(&self, collection: Collection) {
        self.inner.failing_deletes.write().await.insert(collection);
    }

    pub async fn clear_failures(&self) {
        self.inner.failing_deletes.write().await.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let state = self.inner.state.read().await;
        let mut docs = state.select(collection, filter);

        if let Some((field, order)) = &options.sort {
            // Stable sort: equal keys stay in insertion order
            if field != CREATED_AT_FIELD {
                docs.sort_by(|a, b| compare_json(a.data.get(field), b.data.get(field)));
            }
            if *order == SortOrder::Desc {
                docs.reverse();
            }
        }

        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(docs
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .map(|d| d.data.clone())
            .collect())
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> AppResult<Option<Document>> {
        let state = self.inner.state.read().await;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|c| c.get(id))
            .map(|d| d.data.clone()))
    }

    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> AppResult<()> {
        let mut state = self.inner.state.write().await;
        let seq = state.next_seq;
        let docs = state.collections.entry(collection).or_default();
        if docs.contains_key(id) {
            return Err(AppError::Conflict(format!(
                "Document {} already exists in {}",
                id, collection
            )));
        }
        docs.insert(id.to_string(), StoredDocument { seq, data: doc });
        state.next_seq += 1;
        Ok(())
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        doc: Document,
    ) -> AppResult<bool> {
        let mut state = self.inner.state.write().await;
        match state.collections.get_mut(&collection).and_then(|c| c.get_mut(id)) {
            Some(stored) => {
                stored.data = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &Filter,
        doc: Document,
    ) -> AppResult<bool> {
        let mut state = self.inner.state.write().await;
        match state.collections.get_mut(&collection).and_then(|c| c.get_mut(id)) {
            Some(stored) if expected.matches(&stored.data) => {
                stored.data = doc;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> AppResult<bool> {
        self.inner.ensure_deletable(collection).await?;
        let mut state = self.inner.state.write().await;
        Ok(state
            .collections
            .get_mut(&collection)
            .map(|c| c.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        self.inner.ensure_deletable(collection).await?;
        let mut state = self.inner.state.write().await;
        let Some(docs) = state.collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, d| !filter.matches(&d.data));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let state = self.inner.state.read().await;
        Ok(state.select(collection, filter).len() as u64)
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            staged: Vec::new(),
        }))
    }
}

/// Deletes are resolved to ids when staged and applied under a single
/// write lock on commit, after every staged collection has been checked.
pub struct MemoryTransaction {
    inner: Arc<MemoryInner>,
    staged: Vec<(Collection, String)>,
}

impl MemoryTransaction {
    fn is_staged(&self, collection: Collection, id: &str) -> bool {
        self.staged.iter().any(|(c, staged)| *c == collection && staged == id)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn delete_by_id(&mut self, collection: Collection, id: &str) -> AppResult<bool> {
        let exists = {
            let state = self.inner.state.read().await;
            state
                .collections
                .get(&collection)
                .map(|c| c.contains_key(id))
                .unwrap_or(false)
        };
        if !exists || self.is_staged(collection, id) {
            return Ok(false);
        }
        self.staged.push((collection, id.to_string()));
        Ok(true)
    }

    async fn delete_many(&mut self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let ids: Vec<String> = {
            let state = self.inner.state.read().await;
            state
                .collections
                .get(&collection)
                .map(|c| {
                    c.iter()
                        .filter(|(_, d)| filter.matches(&d.data))
                        .map(|(id, _)| id.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut staged = 0;
        for id in ids {
            if !self.is_staged(collection, &id) {
                self.staged.push((collection, id));
                staged += 1;
            }
        }
        Ok(staged)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        {
            let failing = self.inner.failing_deletes.read().await;
            if let Some((collection, _)) = self.staged.iter().find(|(c, _)| failing.contains(c)) {
                return Err(AppError::Transaction(format!(
                    "Deletes in {} are failing; transaction rolled back",
                    collection
                )));
            }
        }

        let mut state = self.inner.state.write().await;
        for (collection, id) in &self.staged {
            if let Some(docs) = state.collections.get_mut(collection) {
                docs.remove(id);
            }
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> AppResult<()> {
        tracing::debug!("Discarding {} staged deletes", self.staged.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, name, org) in [("1", "Kim", "a"), ("2", "Lee", "a"), ("3", "Park", "b")] {
            store
                .insert(
                    Collection::Members,
                    id,
                    json!({"id": id, "name": name, "organizationId": org}),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_find_sort_and_page() {
        let store = seeded().await;

        let all = store
            .find(Collection::Members, &Filter::new(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["id"], "1");

        let options = FindOptions::sorted("name", SortOrder::Desc).paged(1, 1);
        let page = store
            .find(Collection::Members, &Filter::new(), &options)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], "Lee");

        let newest_first = store
            .find(
                Collection::Members,
                &Filter::new(),
                &FindOptions::sorted(CREATED_AT_FIELD, SortOrder::Desc),
            )
            .await
            .unwrap();
        assert_eq!(newest_first[0]["id"], "3");
    }

    #[tokio::test]
    async fn test_count_update_delete() {
        let store = seeded().await;
        let in_a = Filter::new().eq("organizationId", "a");
        assert_eq!(store.count(Collection::Members, &in_a).await.unwrap(), 2);

        let updated = store
            .update_by_id(Collection::Members, "3", json!({"id": "3", "name": "Park", "organizationId": "a"}))
            .await
            .unwrap();
        assert!(updated);
        assert!(!store
            .update_by_id(Collection::Members, "9", json!({"id": "9"}))
            .await
            .unwrap());
        assert_eq!(store.count(Collection::Members, &in_a).await.unwrap(), 3);

        assert_eq!(store.delete_many(Collection::Members, &in_a).await.unwrap(), 3);
        assert!(!store.delete_by_id(Collection::Members, "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = seeded().await;
        let result = store
            .insert(Collection::Members, "1", json!({"id": "1"}))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_transaction_commit_and_abort() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.delete_many(Collection::Members, &Filter::new().eq("organizationId", "a"))
                .await
                .unwrap(),
            2
        );
        // Staged but not yet visible
        assert_eq!(store.count(Collection::Members, &Filter::new()).await.unwrap(), 3);
        tx.abort().await.unwrap();
        assert_eq!(store.count(Collection::Members, &Filter::new()).await.unwrap(), 3);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.delete_by_id(Collection::Members, "3").await.unwrap());
        assert!(!tx.delete_by_id(Collection::Members, "3").await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.count(Collection::Members, &Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = seeded().await;
        store
            .insert(Collection::Organizations, "a", json!({"id": "a"}))
            .await
            .unwrap();
        store.fail_deletes_in(Collection::Organizations).await;

        let mut tx = store.begin().await.unwrap();
        tx.delete_many(Collection::Members, &Filter::new().eq("organizationId", "a"))
            .await
            .unwrap();
        tx.delete_by_id(Collection::Organizations, "a").await.unwrap();
        assert!(matches!(tx.commit().await, Err(AppError::Transaction(_))));

        assert_eq!(store.count(Collection::Members, &Filter::new()).await.unwrap(), 3);
        assert!(store.find_by_id(Collection::Organizations, "a").await.unwrap().is_some());
    }
}
