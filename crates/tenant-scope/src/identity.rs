//! Acting identity for one request

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ContextBuildError;

/// Longest tenant id accepted by [`TenantId::parse`]
pub const MAX_TENANT_ID_LEN: usize = 64;

/// Identity produced by an identity resolver.
///
/// The tenant may be absent here; [`crate::ContextBuilder::build`] rejects
/// such identities instead of falling back to an unscoped context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: String,
    tenant_id: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>, tenant_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id,
        }
    }

    /// Identity with both fields present
    #[must_use]
    pub fn for_tenant(user_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self::new(user_id, Some(tenant_id.into()))
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Validate both fields into their typed forms.
    pub(crate) fn validate(&self) -> Result<(UserId, TenantId), ContextBuildError> {
        let user = UserId::parse(&self.user_id)?;
        let tenant = self
            .tenant_id
            .as_deref()
            .ok_or(ContextBuildError::MissingTenant)
            .and_then(TenantId::parse)?;
        Ok((user, tenant))
    }
}

/// Validated tenant identifier: 1..=64 characters from `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self, ContextBuildError> {
        if raw.is_empty() {
            return Err(ContextBuildError::MissingTenant);
        }
        if raw.len() > MAX_TENANT_ID_LEN {
            return Err(ContextBuildError::MalformedTenant {
                reason: "longer than 64 characters",
            });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ContextBuildError::MalformedTenant {
                reason: "only ASCII letters, digits, '_' and '-' are allowed",
            });
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for TenantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TenantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Validated, non-blank user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, ContextBuildError> {
        if raw.trim().is_empty() {
            return Err(ContextBuildError::MissingUser);
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for UserId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
