use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{DataHandle, PROJECT, RecordStream, ScopedCollection, optional_str, required_str};
use crate::context::ContextBinding;
use crate::error::{ContextBuildError, Error, Result};
use crate::record::{EntityName, NewRecord, Predicate, Record, RecordId};
use crate::storage::Storage;

pub const TASK: EntityName = EntityName::new("task");

/// Handle for `task` records.
///
/// Body: `title` (required string), `project_id` (required id of a project
/// visible to the same tenant), `notes` (optional string), `done` (optional
/// bool). The project is resolved through the owning context's `project`
/// handle, so a foreign project id fails exactly like a missing one.
#[derive(Debug)]
pub struct TaskHandle {
    collection: ScopedCollection,
}

impl TaskHandle {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            collection: ScopedCollection::new(TASK, storage),
        }
    }

    /// [`crate::HandleFactory`] for the builder
    #[must_use]
    pub fn create(storage: Arc<dyn Storage>) -> Arc<dyn DataHandle> {
        Arc::new(Self::new(storage))
    }

    fn project_id(record: &NewRecord) -> Result<RecordId> {
        match record.body.get("project_id") {
            Some(Value::Number(n)) => n
                .as_u64()
                .filter(|id| *id > 0)
                .map(RecordId::new)
                .ok_or_else(|| Error::invalid(TASK, "project_id must be a positive integer")),
            Some(_) => Err(Error::invalid(TASK, "project_id must be an integer")),
            None => Err(Error::invalid(TASK, "project_id is required")),
        }
    }

    fn validate(record: &NewRecord) -> Result<RecordId> {
        required_str(TASK, &record.body, "title")?;
        optional_str(TASK, &record.body, "notes")?;
        match record.body.get("done") {
            None | Some(Value::Bool(_)) => {}
            Some(_) => return Err(Error::invalid(TASK, "done must be a boolean")),
        }
        Self::project_id(record)
    }
}

#[async_trait]
impl DataHandle for TaskHandle {
    fn entity(&self) -> EntityName {
        TASK
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
        let project_id = Self::validate(&record)?;

        let projects = self.collection.context()?.handle(PROJECT)?;
        projects.find_by_id(project_id).await?;

        self.collection.insert(record).await
    }

    async fn count(&self) -> Result<u64> {
        self.collection.count().await
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        self.collection.delete(id).await
    }
}
