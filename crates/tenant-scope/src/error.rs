//! Error hierarchy for tenant-scoped data access.
//!
//! Exposes `is_xxx()` predicates so callers can classify failures without
//! matching on every variant.

use thiserror::Error;

use crate::record::{EntityName, RecordId};

/// Reasons a request context could not be built.
///
/// Every variant is fatal for the request: no context is returned and no
/// handle survives the failed build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextBuildError {
    #[error("identity carries no tenant")]
    MissingTenant,

    #[error("malformed tenant id: {reason}")]
    MalformedTenant { reason: &'static str },

    #[error("identity carries no user")]
    MissingUser,

    /// A factory handed out a handle that is already bound to another context.
    #[error("handle for '{entity}' is already bound to another context")]
    HandleReused { entity: EntityName },

    /// A factory registered under one entity name produced a handle for another.
    #[error("handle registered as '{registered}' serves '{actual}'")]
    EntityMismatch {
        registered: EntityName,
        actual: EntityName,
    },
}

/// Failures reported by a storage collaborator.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Other(String),
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Root error type for handle and context operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("context build failed: {0}")]
    ContextBuild(#[from] ContextBuildError),

    /// Absent and foreign records share this variant and its message.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityName, id: RecordId },

    #[error("{entity} handle invoked outside a bound request context")]
    UnboundContext { entity: EntityName },

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("entity '{0}' is already registered")]
    DuplicateEntity(EntityName),

    #[error("invalid {entity} record: {reason}")]
    InvalidRecord { entity: EntityName, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub(crate) fn invalid(entity: EntityName, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            entity,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        matches!(self, Self::UnboundContext { .. })
    }

    #[must_use]
    pub const fn is_context_build(&self) -> bool {
        matches!(self, Self::ContextBuild(_))
    }

    #[must_use]
    pub const fn is_invalid_record(&self) -> bool {
        matches!(self, Self::InvalidRecord { .. })
    }

    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Defects in wiring rather than in the request itself.
    #[must_use]
    pub const fn is_programming_defect(&self) -> bool {
        matches!(
            self,
            Self::UnboundContext { .. } | Self::UnknownEntity(_) | Self::DuplicateEntity(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::PROJECT;

    #[test]
    fn test_not_found_predicate() {
        let err = Error::NotFound {
            entity: PROJECT,
            id: RecordId::new(7),
        };
        assert!(err.is_not_found());
        assert!(!err.is_unbound());
        assert_eq!(err.to_string(), "project 7 not found");
    }

    #[test]
    fn test_unbound_is_programming_defect() {
        let err = Error::UnboundContext { entity: PROJECT };
        assert!(err.is_unbound());
        assert!(err.is_programming_defect());
        assert!(err.to_string().contains("outside a bound request context"));
    }

    #[test]
    fn test_context_build_conversion() {
        let err: Error = ContextBuildError::MissingTenant.into();
        assert!(err.is_context_build());
        assert!(err.to_string().contains("no tenant"));
    }

    #[test]
    fn test_malformed_tenant_display() {
        let err = ContextBuildError::MalformedTenant {
            reason: "contains whitespace",
        };
        assert_eq!(err.to_string(), "malformed tenant id: contains whitespace");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: Error = StorageError::Unavailable("disk full".into()).into();
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "storage unavailable: disk full");
    }

    #[test]
    fn test_invalid_record_helper() {
        let err = Error::invalid(PROJECT, "name is required");
        assert!(err.is_invalid_record());
        assert!(!err.is_programming_defect());
        assert_eq!(err.to_string(), "invalid project record: name is required");
    }
}
