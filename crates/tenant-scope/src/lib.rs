//! Request-scoped, tenant-bound data access
//!
//! A [`ContextBuilder`] turns an authenticated [`Identity`] into a
//! [`RequestContext`] holding one fresh [`DataHandle`] per registered entity.
//! Each handle is bound to that context alone and reads its tenant from it, so
//! request code never passes a tenant id and cannot reach another tenant's
//! records.
//!
//! ```no_run
//! # async fn demo() -> tenant_scope::Result<()> {
//! use std::sync::Arc;
//!
//! use futures::TryStreamExt;
//! use tenant_scope::{ContextBuilder, Identity, InMemoryStorage, NewRecord, PROJECT};
//!
//! let builder = ContextBuilder::with_default_entities(Arc::new(InMemoryStorage::new()));
//! let ctx = builder.build(Identity::for_tenant("42", "acme"))?;
//!
//! let projects = ctx.handle(PROJECT)?;
//! projects
//!     .save(NewRecord::default().with_field("name", "Apollo"))
//!     .await?;
//! let visible: Vec<_> = projects.find().await?.try_collect().await?;
//! assert_eq!(visible.len(), 1);
//! # Ok(())
//! # }
//! ```

mod builder;
mod context;
mod error;
pub mod handle;
mod identity;
mod record;
pub mod storage;

pub use builder::ContextBuilder;
pub use context::{ContextBinding, ContextId, RequestContext};
pub use error::{ContextBuildError, Error, Result, StorageError, StorageResult};
pub use handle::{
    BindingSlot, DataHandle, HandleFactory, PROJECT, ProjectHandle, RecordStream,
    ScopedCollection, TASK, TaskHandle,
};
pub use identity::{Identity, MAX_TENANT_ID_LEN, TenantId, UserId};
pub use record::{
    EntityName, NewRecord, PendingRecord, Predicate, RESERVED_FIELDS, Record, RecordId,
};
pub use storage::{InMemoryStorage, Storage, StoredStream, TracedStorage};
