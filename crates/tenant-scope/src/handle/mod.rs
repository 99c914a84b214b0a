//! Tenant-bound data-access handles
//!
//! A handle exposes the capability set of one entity variant. It obtains the
//! tenant scope from the request context it was bound to at build time; no
//! operation accepts a tenant argument.
//!
//! # Entity Variants
//!
//! - [`ProjectHandle`] - `project` records
//! - [`TaskHandle`] - `task` records, each referencing a project of the same tenant
//!
//! New variants implement [`DataHandle`], usually by delegating to a
//! [`ScopedCollection`], and register a [`HandleFactory`] with the
//! [`crate::ContextBuilder`].

mod project;
mod scoped;
mod task;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};

pub use project::{PROJECT, ProjectHandle};
pub use scoped::{BindingSlot, ScopedCollection};
pub use task::{TASK, TaskHandle};

use crate::context::ContextBinding;
use crate::error::{ContextBuildError, Error, Result};
use crate::record::{EntityName, NewRecord, Predicate, Record, RecordId};
use crate::storage::Storage;

/// Lazily produced, single-pass sequence of records visible to the bound tenant
pub type RecordStream = BoxStream<'static, Result<Record>>;

/// Capability set shared by every entity variant.
///
/// All operations fail with [`Error::UnboundContext`] until the handle has
/// been bound to a live context.
#[async_trait]
pub trait DataHandle: Send + Sync + std::fmt::Debug {
    fn entity(&self) -> EntityName;

    /// Attach the owning context. A handle accepts exactly one binding.
    fn bind(&self, binding: ContextBinding) -> std::result::Result<(), ContextBuildError>;

    /// Every record of the bound tenant
    async fn find(&self) -> Result<RecordStream> {
        self.find_where(Predicate::All).await
    }

    /// Records of the bound tenant matching `predicate`
    async fn find_where(&self, predicate: Predicate) -> Result<RecordStream>;

    /// The record with `id`, or `NotFound` if it is absent or owned by another tenant
    async fn find_by_id(&self, id: RecordId) -> Result<Record>;

    /// Persist a new record stamped with the bound tenant and user
    async fn save(&self, record: NewRecord) -> Result<Record>;

    /// Number of records visible to the bound tenant
    async fn count(&self) -> Result<u64>;

    /// Delete a record of the bound tenant, `NotFound` otherwise
    async fn delete(&self, id: RecordId) -> Result<()>;
}

/// Produces a fresh, unbound handle for every request.
pub trait HandleFactory: Send + Sync {
    fn create(&self, storage: Arc<dyn Storage>) -> Arc<dyn DataHandle>;
}

impl<F> HandleFactory for F
where
    F: Fn(Arc<dyn Storage>) -> Arc<dyn DataHandle> + Send + Sync,
{
    fn create(&self, storage: Arc<dyn Storage>) -> Arc<dyn DataHandle> {
        self(storage)
    }
}

fn required_str<'a>(
    entity: EntityName,
    body: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(Error::invalid(
            entity,
            format!("{field} must not be blank"),
        )),
        Some(_) => Err(Error::invalid(entity, format!("{field} must be a string"))),
        None => Err(Error::invalid(entity, format!("{field} is required"))),
    }
}

fn optional_str(entity: EntityName, body: &Map<String, Value>, field: &str) -> Result<()> {
    match body.get(field) {
        None | Some(Value::Null | Value::String(_)) => Ok(()),
        Some(_) => Err(Error::invalid(entity, format!("{field} must be a string"))),
    }
}
