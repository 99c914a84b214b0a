//! In-memory storage backend

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::ready;
use parking_lot::RwLock;

use super::{Storage, StoredStream};
use crate::error::StorageResult;
use crate::identity::TenantId;
use crate::record::{EntityName, PendingRecord, Predicate, Record, RecordId};

type Collection = BTreeMap<RecordId, Record>;

/// Thread-safe in-memory storage.
///
/// Ids are assigned from a single counter shared by all entities, so they are
/// unique across the whole store. Queries take a snapshot of the tenant's
/// records under the read lock and evaluate the predicate lazily as the
/// returned stream is polled.
#[derive(Clone)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<HashMap<EntityName, Collection>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("collections", &self.collections.read().len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Insert a fully formed record, keeping its id.
    ///
    /// Intended for fixtures and imports; the id counter is advanced past
    /// `record.id` so later inserts never collide.
    pub fn seed(&self, entity: EntityName, record: Record) {
        self.next_id
            .fetch_max(record.id.get().saturating_add(1), Ordering::Relaxed);
        self.collections
            .write()
            .entry(entity)
            .or_default()
            .insert(record.id, record);
    }

    /// Total number of records of `entity` across all tenants
    #[must_use]
    pub fn len(&self, entity: EntityName) -> usize {
        self.collections.read().get(&entity).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.read().values().all(BTreeMap::is_empty)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn query_by_tenant(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        predicate: Predicate,
    ) -> StorageResult<StoredStream> {
        let snapshot: Vec<Record> = self
            .collections
            .read()
            .get(&entity)
            .map(|records| {
                records
                    .values()
                    .filter(|r| r.tenant_id == *tenant)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let stream = futures::stream::iter(snapshot)
            .filter(move |record| ready(predicate.matches(record)))
            .map(Ok);

        Ok(stream.boxed())
    }

    async fn insert(&self, entity: EntityName, record: PendingRecord) -> StorageResult<Record> {
        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = record.into_record(id);

        self.collections
            .write()
            .entry(entity)
            .or_default()
            .insert(id, record.clone());

        Ok(record)
    }

    async fn remove(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        id: RecordId,
    ) -> StorageResult<bool> {
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(&entity) else {
            return Ok(false);
        };

        if records.get(&id).is_some_and(|r| r.tenant_id == *tenant) {
            records.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::{Map, json};

    use super::*;
    use crate::identity::UserId;

    const NOTE: EntityName = EntityName::new("note");

    fn tenant(raw: &str) -> TenantId {
        TenantId::parse(raw).unwrap()
    }

    fn pending(tenant_id: &str, title: &str) -> PendingRecord {
        let mut body = Map::new();
        body.insert("title".into(), json!(title));
        PendingRecord {
            tenant_id: tenant(tenant_id),
            created_by: UserId::parse("u1").unwrap(),
            body,
        }
    }

    async fn collect(storage: &InMemoryStorage, t: &str, predicate: Predicate) -> Vec<Record> {
        storage
            .query_by_tenant(NOTE, &tenant(t), predicate)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let storage = InMemoryStorage::new();
        let a = storage.insert(NOTE, pending("acme", "a")).await.unwrap();
        let b = storage.insert(NOTE, pending("acme", "b")).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(storage.len(NOTE), 2);
    }

    #[tokio::test]
    async fn test_query_is_partitioned_by_tenant() {
        let storage = InMemoryStorage::new();
        storage.insert(NOTE, pending("acme", "a")).await.unwrap();
        storage.insert(NOTE, pending("other", "b")).await.unwrap();

        let acme = collect(&storage, "acme", Predicate::All).await;
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].tenant_id, "acme");

        let none = collect(&storage, "nobody", Predicate::All).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_query_applies_predicate() {
        let storage = InMemoryStorage::new();
        storage.insert(NOTE, pending("acme", "a")).await.unwrap();
        let b = storage.insert(NOTE, pending("acme", "b")).await.unwrap();

        let by_id = collect(&storage, "acme", Predicate::Id(b.id)).await;
        assert_eq!(by_id, vec![b]);

        let by_field = collect(&storage, "acme", Predicate::field_eq("title", "a")).await;
        assert_eq!(by_field.len(), 1);
    }

    #[tokio::test]
    async fn test_query_unknown_entity_is_empty() {
        let storage = InMemoryStorage::new();
        assert!(collect(&storage, "acme", Predicate::All).await.is_empty());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_remove_requires_matching_tenant() {
        let storage = InMemoryStorage::new();
        let record = storage.insert(NOTE, pending("acme", "a")).await.unwrap();

        let foreign = storage
            .remove(NOTE, &tenant("other"), record.id)
            .await
            .unwrap();
        assert!(!foreign);
        assert_eq!(storage.len(NOTE), 1);

        let own = storage.remove(NOTE, &tenant("acme"), record.id).await.unwrap();
        assert!(own);
        assert_eq!(storage.len(NOTE), 0);
    }

    #[tokio::test]
    async fn test_seed_advances_id_counter() {
        let storage = InMemoryStorage::new();
        storage.seed(NOTE, pending("acme", "seeded").into_record(RecordId::new(10)));

        let next = storage.insert(NOTE, pending("acme", "next")).await.unwrap();
        assert_eq!(next.id, RecordId::new(11));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = InMemoryStorage::new();
        let clone = storage.clone();
        storage.insert(NOTE, pending("acme", "a")).await.unwrap();
        assert_eq!(clone.len(NOTE), 1);
    }
}
