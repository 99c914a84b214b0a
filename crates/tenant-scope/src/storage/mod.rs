//! Storage collaborator consumed by data-access handles
//!
//! The scoping layer never talks to a database directly. Handles call a
//! [`Storage`] implementation with the tenant taken from their bound context.
//!
//! # Available Backends
//!
//! - [`InMemoryStorage`] - Thread-safe, process-local collections
//!
//! Wrap any backend with [`TracedStorage`] to add tracing spans and logging.

mod memory;
mod traced;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use memory::InMemoryStorage;
pub use traced::TracedStorage;

use crate::error::StorageResult;
use crate::identity::TenantId;
use crate::record::{EntityName, PendingRecord, Predicate, Record, RecordId};

/// Lazily produced, single-pass sequence of stored records
pub type StoredStream = BoxStream<'static, StorageResult<Record>>;

/// Async storage backend partitioned by tenant.
///
/// Every read and delete names the tenant explicitly; there is no operation
/// that spans tenants.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Records of `entity` owned by `tenant` that satisfy `predicate`
    async fn query_by_tenant(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        predicate: Predicate,
    ) -> StorageResult<StoredStream>;

    /// Persist a stamped record, assigning its id
    async fn insert(&self, entity: EntityName, record: PendingRecord) -> StorageResult<Record>;

    /// Remove a record owned by `tenant`. Returns `false` when nothing matched.
    async fn remove(
        &self,
        entity: EntityName,
        tenant: &TenantId,
        id: RecordId,
    ) -> StorageResult<bool>;

    /// Health check for the storage backend
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
