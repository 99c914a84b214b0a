//! Builds one [`RequestContext`] per request
//!
//! The builder is long-lived and shared across requests. It holds the storage
//! collaborator and the registered handle factories; every call to
//! [`ContextBuilder::build`] asks each factory for a fresh handle and binds it
//! to the new context before the context is returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::{ContextBinding, ContextInner, RequestContext};
use crate::error::{ContextBuildError, Error, Result};
use crate::handle::{DataHandle, HandleFactory, PROJECT, ProjectHandle, TASK, TaskHandle};
use crate::identity::Identity;
use crate::record::EntityName;
use crate::storage::Storage;

/// Factory registry plus storage, shared across requests.
#[derive(Clone)]
pub struct ContextBuilder {
    storage: Arc<dyn Storage>,
    factories: Vec<(EntityName, Arc<dyn HandleFactory>)>,
}

impl ContextBuilder {
    /// Builder with no registered entities
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            factories: Vec::new(),
        }
    }

    /// Builder with the `project` and `task` entities registered
    #[must_use]
    pub fn with_default_entities(storage: Arc<dyn Storage>) -> Self {
        let mut builder = Self::new(storage);
        builder.push(PROJECT, ProjectHandle::create);
        builder.push(TASK, TaskHandle::create);
        builder
    }

    /// Register a factory for `entity`.
    ///
    /// The factory must return a new, unbound handle on every call whose
    /// [`DataHandle::entity`] is `entity`. Returning a shared instance makes the
    /// second build fail with [`ContextBuildError::HandleReused`]; a handle for
    /// another entity fails every build with [`ContextBuildError::EntityMismatch`].
    pub fn register<F>(mut self, entity: EntityName, factory: F) -> Result<Self>
    where
        F: HandleFactory + 'static,
    {
        if self.factories.iter().any(|(name, _)| *name == entity) {
            return Err(Error::DuplicateEntity(entity));
        }
        self.push(entity, factory);
        Ok(self)
    }

    fn push<F>(&mut self, entity: EntityName, factory: F)
    where
        F: HandleFactory + 'static,
    {
        let factory: Arc<dyn HandleFactory> = Arc::new(factory);
        self.factories.push((entity, factory));
    }

    /// Registered entity names, in registration order
    #[must_use]
    pub fn entities(&self) -> Vec<EntityName> {
        self.factories.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Build a context for `identity`.
    ///
    /// Fails without producing a context when the identity has no usable
    /// tenant or user, or when a factory returns an already bound handle or a
    /// handle for a different entity than it was registered under.
    pub fn build(
        &self,
        identity: Identity,
    ) -> std::result::Result<RequestContext, ContextBuildError> {
        let (user_id, tenant_id) = identity.validate().inspect_err(|e| {
            tracing::warn!(error = %e, user = identity.user_id(), "rejected identity");
        })?;

        let mut handles: HashMap<&'static str, Arc<dyn DataHandle>> =
            HashMap::with_capacity(self.factories.len());
        for (name, factory) in &self.factories {
            let handle = factory.create(Arc::clone(&self.storage));
            if handle.entity() != *name {
                let e = ContextBuildError::EntityMismatch {
                    registered: *name,
                    actual: handle.entity(),
                };
                tracing::error!(error = %e, "handle factory registered under the wrong entity");
                return Err(e);
            }
            handles.insert(name.as_str(), handle);
        }

        let mut bind_error = None;
        let inner = Arc::new_cyclic(|weak| {
            for handle in handles.values() {
                if let Err(e) = handle.bind(ContextBinding::new(weak.clone()))
                    && bind_error.is_none()
                {
                    bind_error = Some(e);
                }
            }
            ContextInner::new(identity, user_id, tenant_id, handles)
        });

        if let Some(e) = bind_error {
            tracing::error!(error = %e, "handle factory returned a bound handle");
            return Err(e);
        }

        let ctx = RequestContext::from_inner(inner);
        tracing::debug!(
            context = %ctx.id(),
            tenant = %ctx.tenant_id(),
            user = %ctx.user_id(),
            entities = self.factories.len(),
            "request context built"
        );
        Ok(ctx)
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("storage", &self.storage)
            .field("entities", &self.entities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::handle::{RecordStream, ScopedCollection};
    use crate::record::{NewRecord, Predicate, Record, RecordId};
    use crate::storage::InMemoryStorage;

    fn builder() -> ContextBuilder {
        ContextBuilder::with_default_entities(Arc::new(InMemoryStorage::new()))
    }

    #[test]
    fn test_build_binds_every_handle() {
        let ctx = builder().build(Identity::for_tenant("42", "acme")).unwrap();
        assert_eq!(ctx.tenant_id(), &"acme");
        assert_eq!(ctx.user_id(), &"42");
        assert_eq!(ctx.entity_names(), vec!["project", "task"]);
    }

    #[test]
    fn test_missing_tenant_fails() {
        let err = builder().build(Identity::new("42", None)).unwrap_err();
        assert_eq!(err, ContextBuildError::MissingTenant);
    }

    #[test]
    fn test_empty_tenant_fails() {
        let err = builder().build(Identity::for_tenant("42", "")).unwrap_err();
        assert_eq!(err, ContextBuildError::MissingTenant);
    }

    #[test]
    fn test_malformed_tenant_fails() {
        let err = builder().build(Identity::for_tenant("42", "*")).unwrap_err();
        assert!(matches!(err, ContextBuildError::MalformedTenant { .. }));
    }

    #[test]
    fn test_missing_user_fails() {
        let err = builder().build(Identity::for_tenant("", "acme")).unwrap_err();
        assert_eq!(err, ContextBuildError::MissingUser);
    }

    #[test]
    fn test_handles_are_fresh_per_build() {
        let b = builder();
        let first = b.build(Identity::for_tenant("1", "a")).unwrap();
        let second = b.build(Identity::for_tenant("1", "a")).unwrap();

        let p1 = first.handle(PROJECT).unwrap();
        let p2 = second.handle(PROJECT).unwrap();
        assert!(!Arc::ptr_eq(&p1, &p2));
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let err = builder()
            .register(PROJECT, ProjectHandle::create)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(name) if name == PROJECT));
    }

    const NOTE: EntityName = EntityName::new("note");

    #[derive(Debug)]
    struct NoteHandle {
        collection: ScopedCollection,
    }

    impl NoteHandle {
        fn create(storage: Arc<dyn Storage>) -> Arc<dyn DataHandle> {
            Arc::new(Self {
                collection: ScopedCollection::new(NOTE, storage),
            })
        }
    }

    #[async_trait]
    impl DataHandle for NoteHandle {
        fn entity(&self) -> EntityName {
            NOTE
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
            self.collection.insert(record).await
        }

        async fn count(&self) -> Result<u64> {
            self.collection.count().await
        }

        async fn delete(&self, id: RecordId) -> Result<()> {
            self.collection.delete(id).await
        }
    }

    #[test]
    fn test_register_custom_entity() {
        let b = ContextBuilder::new(Arc::new(InMemoryStorage::new()))
            .register(NOTE, NoteHandle::create)
            .unwrap();
        assert_eq!(b.entities(), vec![NOTE]);

        let ctx = b.build(Identity::for_tenant("1", "a")).unwrap();
        assert_eq!(ctx.lookup("note").unwrap().entity(), NOTE);
        assert!(ctx.lookup("project").is_err());
    }

    #[tokio::test]
    async fn test_custom_entity_keeps_its_own_collection() {
        let b = builder().register(NOTE, NoteHandle::create).unwrap();
        let ctx = b.build(Identity::for_tenant("1", "a")).unwrap();

        ctx.lookup("note")
            .unwrap()
            .save(NewRecord::default().with_field("name", "a note"))
            .await
            .unwrap();

        assert_eq!(ctx.handle(PROJECT).unwrap().count().await.unwrap(), 0);
        assert_eq!(ctx.handle(NOTE).unwrap().count().await.unwrap(), 1);
    }

    #[test]
    fn test_handle_for_other_entity_rejected() {
        let b = builder().register(NOTE, ProjectHandle::create).unwrap();

        let err = b.build(Identity::for_tenant("1", "a")).unwrap_err();
        assert_eq!(
            err,
            ContextBuildError::EntityMismatch {
                registered: NOTE,
                actual: PROJECT,
            }
        );
    }

    #[test]
    fn test_failed_build_leaves_no_live_context() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let shared: Arc<dyn DataHandle> = Arc::new(TaskHandle::new(Arc::clone(&storage)));
        let singleton = Arc::clone(&shared);

        let b = ContextBuilder::new(storage)
            .register(TASK, move |_: Arc<dyn Storage>| Arc::clone(&singleton))
            .unwrap();

        let first = b.build(Identity::for_tenant("1", "a")).unwrap();
        assert!(b.build(Identity::for_tenant("2", "b")).is_err());

        drop(first);
        // The singleton's only binding pointed at the first context
        let err = futures::executor::block_on(shared.count()).unwrap_err();
        assert!(err.is_unbound());
    }

    #[test]
    fn test_debug_lists_entities() {
        let debug = format!("{:?}", builder());
        assert!(debug.contains("ContextBuilder"));
        assert!(debug.contains("project"));
    }
}
