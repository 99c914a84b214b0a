//! Tenant scoping shared by all entity variants

use std::sync::{Arc, OnceLock};

use futures::future::ready;
use futures::{StreamExt, TryStreamExt};

use super::RecordStream;
use crate::context::{ContextBinding, RequestContext};
use crate::error::{ContextBuildError, Error, Result};
use crate::record::{EntityName, NewRecord, PendingRecord, Predicate, Record, RecordId};
use crate::storage::Storage;

/// Per-handle slot holding the back-reference to the owning context.
///
/// Each handle owns its own slot, so there is no binding state shared
/// between handles of the same entity. The slot can be set once.
#[derive(Debug, Default)]
pub struct BindingSlot {
    binding: OnceLock<ContextBinding>,
}

impl BindingSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            binding: OnceLock::new(),
        }
    }

    pub fn bind(
        &self,
        entity: EntityName,
        binding: ContextBinding,
    ) -> std::result::Result<(), ContextBuildError> {
        self.binding
            .set(binding)
            .map_err(|_| ContextBuildError::HandleReused { entity })
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The owning context, or `UnboundContext` if unset or already released
    pub fn context(&self, entity: EntityName) -> Result<RequestContext> {
        self.binding
            .get()
            .and_then(ContextBinding::upgrade)
            .ok_or_else(|| {
                tracing::error!(
                    entity = %entity,
                    bound = self.is_bound(),
                    "handle invoked without a live request context"
                );
                Error::UnboundContext { entity }
            })
    }
}

/// Storage access for one entity, scoped to the tenant of the bound context.
#[derive(Debug)]
pub struct ScopedCollection {
    entity: EntityName,
    storage: Arc<dyn Storage>,
    slot: BindingSlot,
}

impl ScopedCollection {
    #[must_use]
    pub fn new(entity: EntityName, storage: Arc<dyn Storage>) -> Self {
        Self {
            entity,
            storage,
            slot: BindingSlot::new(),
        }
    }

    #[must_use]
    pub const fn entity(&self) -> EntityName {
        self.entity
    }

    pub fn bind(&self, binding: ContextBinding) -> std::result::Result<(), ContextBuildError> {
        self.slot.bind(self.entity, binding)
    }

    /// Owning context, for cross-entity lookups
    pub fn context(&self) -> Result<RequestContext> {
        self.slot.context(self.entity)
    }

    pub async fn find_where(&self, predicate: Predicate) -> Result<RecordStream> {
        let ctx = self.context()?;
        let tenant = ctx.tenant_id().clone();
        let entity = self.entity;

        let stored = self
            .storage
            .query_by_tenant(entity, &tenant, predicate)
            .await?;

        let scoped = stored.filter_map(move |item| {
            ready(match item {
                Ok(record) if record.tenant_id == tenant => Some(Ok(record)),
                Ok(record) => {
                    tracing::error!(
                        entity = %entity,
                        record.id = %record.id,
                        "storage returned a record outside the bound tenant; dropped"
                    );
                    None
                }
                Err(e) => Some(Err(Error::from(e))),
            })
        });

        Ok(scoped.boxed())
    }

    pub async fn find_by_id(&self, id: RecordId) -> Result<Record> {
        let mut matches = self.find_where(Predicate::Id(id)).await?;
        matches.next().await.unwrap_or_else(|| {
            Err(Error::NotFound {
                entity: self.entity,
                id,
            })
        })
    }

    pub async fn count(&self) -> Result<u64> {
        self.find_where(Predicate::All)
            .await?
            .try_fold(0_u64, |n, _| ready(Ok(n + 1)))
            .await
    }

    /// Stamp `input` with the bound tenant and user, then persist it
    pub async fn insert(&self, input: NewRecord) -> Result<Record> {
        let ctx = self.context()?;

        if input.tenant_id.is_some() || input.created_by.is_some() {
            tracing::debug!(
                entity = %self.entity,
                context = %ctx.id(),
                "discarding caller-supplied tenant/creator fields"
            );
        }

        let pending =
            PendingRecord::stamp(input, ctx.tenant_id().clone(), ctx.user_id().clone());
        let record = self.storage.insert(self.entity, pending).await?;

        tracing::debug!(
            entity = %self.entity,
            context = %ctx.id(),
            record.id = %record.id,
            "record saved"
        );
        Ok(record)
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let ctx = self.context()?;
        let removed = self.storage.remove(self.entity, ctx.tenant_id(), id).await?;

        if removed {
            Ok(())
        } else {
            Err(Error::NotFound {
                entity: self.entity,
                id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;
    use crate::builder::ContextBuilder;
    use crate::handle::{DataHandle, ProjectHandle};
    use crate::identity::{Identity, TenantId, UserId};
    use crate::storage::InMemoryStorage;

    const NOTE: EntityName = EntityName::new("note");

    #[test]
    fn test_unbound_slot_fails() {
        let slot = BindingSlot::new();
        assert!(!slot.is_bound());
        let err = slot.context(NOTE).unwrap_err();
        assert!(err.is_unbound());
    }

    #[tokio::test]
    async fn test_unbound_collection_never_queries() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.seed(
            NOTE,
            Record {
                id: RecordId::new(1),
                tenant_id: TenantId::parse("acme").unwrap(),
                created_by: UserId::parse("1").unwrap(),
                body: serde_json::Map::new(),
            },
        );
        let collection = ScopedCollection::new(NOTE, storage.clone());

        let err = collection.find_where(Predicate::All).await.err().unwrap();
        assert!(err.is_unbound());
        assert!(collection.find_by_id(RecordId::new(1)).await.unwrap_err().is_unbound());
        assert!(collection.count().await.unwrap_err().is_unbound());
        assert!(
            collection
                .insert(NewRecord::default().with_field("name", "x"))
                .await
                .unwrap_err()
                .is_unbound()
        );
        assert!(collection.delete(RecordId::new(1)).await.unwrap_err().is_unbound());
        assert_eq!(storage.len(NOTE), 1);
    }

    #[tokio::test]
    async fn test_handle_unusable_after_context_released() {
        let storage = Arc::new(InMemoryStorage::new());
        let builder = ContextBuilder::with_default_entities(storage);
        let ctx = builder.build(Identity::for_tenant("42", "acme")).unwrap();
        let leaked = ctx.lookup("project").unwrap();
        drop(ctx);

        let err = leaked.find().await.err().unwrap();
        assert!(err.is_unbound());
    }

    #[tokio::test]
    async fn test_second_bind_rejected() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let shared: Arc<dyn DataHandle> = Arc::new(ProjectHandle::new(storage.clone()));
        let singleton = shared.clone();

        let builder = ContextBuilder::new(storage)
            .register(crate::handle::PROJECT, move |_: Arc<dyn Storage>| {
                singleton.clone()
            })
            .unwrap();

        let first = builder.build(Identity::for_tenant("1", "a")).unwrap();
        let second = builder.build(Identity::for_tenant("2", "b"));
        assert!(matches!(
            second,
            Err(ContextBuildError::HandleReused { .. })
        ));

        // The first context keeps its binding and tenant
        let saved = first
            .lookup("project")
            .unwrap()
            .save(NewRecord::default().with_field("name", "x"))
            .await
            .unwrap();
        assert_eq!(saved.tenant_id, "a");
    }

    #[tokio::test]
    async fn test_foreign_records_from_storage_are_dropped() {
        use async_trait::async_trait;

        use crate::error::StorageResult;
        use crate::storage::StoredStream;

        // Ignores the tenant argument entirely
        #[derive(Debug)]
        struct LeakyStorage(InMemoryStorage);

        #[async_trait]
        impl Storage for LeakyStorage {
            async fn query_by_tenant(
                &self,
                entity: EntityName,
                _tenant: &TenantId,
                predicate: Predicate,
            ) -> StorageResult<StoredStream> {
                let a = self
                    .0
                    .query_by_tenant(entity, &TenantId::parse("a").unwrap(), predicate.clone())
                    .await?;
                let b = self
                    .0
                    .query_by_tenant(entity, &TenantId::parse("b").unwrap(), predicate)
                    .await?;
                Ok(a.chain(b).boxed())
            }

            async fn insert(
                &self,
                entity: EntityName,
                record: PendingRecord,
            ) -> StorageResult<Record> {
                self.0.insert(entity, record).await
            }

            async fn remove(
                &self,
                entity: EntityName,
                tenant: &TenantId,
                id: RecordId,
            ) -> StorageResult<bool> {
                self.0.remove(entity, tenant, id).await
            }
        }

        let storage = Arc::new(LeakyStorage(InMemoryStorage::new()));
        let builder = ContextBuilder::with_default_entities(storage);

        for (user, tenant) in [("1", "a"), ("2", "b")] {
            let ctx = builder.build(Identity::for_tenant(user, tenant)).unwrap();
            ctx.lookup("project")
                .unwrap()
                .save(NewRecord::default().with_field("name", json!(tenant)))
                .await
                .unwrap();
        }

        let ctx = builder.build(Identity::for_tenant("1", "a")).unwrap();
        let records: Vec<Record> = ctx
            .lookup("project")
            .unwrap()
            .find()
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tenant_id, "a");
    }
}
