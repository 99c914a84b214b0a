use std::sync::Arc;

use async_trait::async_trait;

use super::{DataHandle, RecordStream, ScopedCollection, optional_str, required_str};
use crate::context::ContextBinding;
use crate::error::{ContextBuildError, Result};
use crate::record::{EntityName, NewRecord, Predicate, Record, RecordId};
use crate::storage::Storage;

pub const PROJECT: EntityName = EntityName::new("project");

/// Handle for `project` records.
///
/// Body: `name` (required, non-blank string), `description` (optional string).
#[derive(Debug)]
pub struct ProjectHandle {
    collection: ScopedCollection,
}

impl ProjectHandle {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            collection: ScopedCollection::new(PROJECT, storage),
        }
    }

    /// [`crate::HandleFactory`] for the builder
    #[must_use]
    pub fn create(storage: Arc<dyn Storage>) -> Arc<dyn DataHandle> {
        Arc::new(Self::new(storage))
    }
}

#[async_trait]
impl DataHandle for ProjectHandle {
    fn entity(&self) -> EntityName {
        PROJECT
    }

    fn bind(&self, binding: ContextBinding) -> std::result::Result<(), ContextBuildError> {
        self.collection.bind(binding)
    }

    async fn find_where(&self, predicate: Predicate) -> Result<RecordStream> {
        self.collection.find_where(predicate).await
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Record> {
        self.collection.find_by_id(id).await
    }

    async fn save(&self, record: NewRecord) -> Result<Record> {
        required_str(PROJECT, &record.body, "name")?;
        optional_str(PROJECT, &record.body, "description")?;
        self.collection.insert(record).await
    }

    async fn count(&self) -> Result<u64> {
        self.collection.count().await
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        self.collection.delete(id).await
    }
}
