//! Per-request context holding the acting identity and its bound handles

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::handle::DataHandle;
use crate::identity::{Identity, TenantId, UserId};
use crate::record::EntityName;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a built context, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

pub(crate) struct ContextInner {
    id: ContextId,
    identity: Identity,
    user_id: UserId,
    tenant_id: TenantId,
    handles: HashMap<&'static str, Arc<dyn DataHandle>>,
}

impl ContextInner {
    pub(crate) fn new(
        identity: Identity,
        user_id: UserId,
        tenant_id: TenantId,
        handles: HashMap<&'static str, Arc<dyn DataHandle>>,
    ) -> Self {
        Self {
            id: ContextId::next(),
            identity,
            user_id,
            tenant_id,
            handles,
        }
    }
}

/// Request-scoped bundle of identity and tenant-bound handles.
///
/// Built by [`crate::ContextBuilder`] once per request. The handle map is
/// fixed at build time. Cloning shares the same context and is meant for
/// passing it around within one request, not across requests.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    pub(crate) const fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    /// Handle registered under `entity`
    pub fn lookup(&self, entity: &str) -> Result<Arc<dyn DataHandle>> {
        self.inner
            .handles
            .get(entity)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity(entity.to_owned()))
    }

    /// Typed-name variant of [`lookup`](Self::lookup)
    pub fn handle(&self, entity: EntityName) -> Result<Arc<dyn DataHandle>> {
        self.lookup(entity.as_str())
    }

    #[must_use]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.inner.tenant_id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Registered entity names, sorted
    #[must_use]
    pub fn entity_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.handles.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Whether two values refer to the same built context
    #[must_use]
    pub fn same_context(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.inner.id)
            .field("tenant_id", &self.inner.tenant_id)
            .field("user_id", &self.inner.user_id)
            .field("entities", &self.entity_names())
            .finish()
    }
}

/// Non-owning reference from a handle back to the context that owns it.
///
/// Resolves only while the context is alive; it never extends the context's
/// lifetime.
#[derive(Clone)]
pub struct ContextBinding {
    context: Weak<ContextInner>,
}

impl ContextBinding {
    pub(crate) const fn new(context: Weak<ContextInner>) -> Self {
        Self { context }
    }

    /// The owning context, if it is fully built and still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<RequestContext> {
        self.context.upgrade().map(RequestContext::from_inner)
    }
}

impl fmt::Debug for ContextBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBinding")
            .field("alive", &(self.context.strong_count() > 0))
            .finish()
    }
}
