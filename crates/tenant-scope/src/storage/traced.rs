//! Traced storage wrapper for observability

use async_trait::async_trait;
use tracing::Instrument;

use super::{Storage, StoredStream};
use crate::error::StorageResult;
use crate::identity::TenantId;
use crate::record::{EntityName, PendingRecord, Predicate, Record, RecordId};

/// Wrapper that adds tracing to any `Storage`
///
/// Spans carry the entity and tenant but never record bodies.
#[derive(Debug, Clone)]
pub struct TracedStorage<S> {
    inner: S,
}

impl<S> TracedStorage<S> {
    pub const fn new(storage: S) -> Self {
        Self { inner: storage }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Storage> Storage for TracedStorage<S> {
    async fn query_by_tenant(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        predicate: Predicate,
    ) -> StorageResult<StoredStream> {
        let span = tracing::debug_span!(
            "storage.query",
            storage.entity = %entity,
            storage.tenant = %tenant,
            storage.predicate = ?predicate,
        );

        let result = self
            .inner
            .query_by_tenant(entity, tenant, predicate)
            .instrument(span)
            .await;

        if let Err(ref e) = result {
            tracing::warn!(
                storage.operation = "query",
                storage.entity = %entity,
                error = %e,
            );
        }

        result
    }

    async fn insert(&self, entity: EntityName, record: PendingRecord) -> StorageResult<Record> {
        let span = tracing::debug_span!(
            "storage.insert",
            storage.entity = %entity,
            storage.tenant = %record.tenant_id,
        );

        let result = self.inner.insert(entity, record).instrument(span).await;

        match &result {
            Ok(record) => {
                tracing::debug!(
                    storage.operation = "insert",
                    storage.entity = %entity,
                    storage.id = %record.id,
                );
            }
            Err(e) => {
                tracing::warn!(
                    storage.operation = "insert",
                    storage.entity = %entity,
                    error = %e,
                );
            }
        }

        result
    }

    async fn remove(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        id: RecordId,
    ) -> StorageResult<bool> {
        let span = tracing::debug_span!(
            "storage.remove",
            storage.entity = %entity,
            storage.tenant = %tenant,
            storage.id = %id,
        );

        let result = self.inner.remove(entity, tenant, id).instrument(span).await;

        match &result {
            Ok(removed) => {
                tracing::debug!(
                    storage.operation = "remove",
                    storage.entity = %entity,
                    storage.removed = removed,
                );
            }
            Err(e) => {
                tracing::warn!(
                    storage.operation = "remove",
                    storage.entity = %entity,
                    error = %e,
                );
            }
        }

        result
    }

    async fn health_check(&self) -> StorageResult<()> {
        let result = self.inner.health_check().await;
        if let Err(ref e) = result {
            tracing::warn!(storage.operation = "health_check", error = %e);
        }
        result
    }
}
