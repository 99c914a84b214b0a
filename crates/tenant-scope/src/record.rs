//! Record types exchanged between handles and storage

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::{TenantId, UserId};

/// Field names owned by the scoping layer; never taken from a record body.
pub const RESERVED_FIELDS: &[&str] = &["id", "tenant_id", "created_by"];

/// Name under which an entity variant is registered in a request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityName(&'static str);

impl EntityName {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Storage-assigned record identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted record. Serializes as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub created_by: UserId,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Record {
    /// Body field lookup
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

/// Caller-supplied payload for a new record.
///
/// `tenant_id` and `created_by` are accepted in any JSON shape so that a
/// payload carrying them still parses; `save` discards both and stamps the
/// values of the bound context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Value>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl NewRecord {
    #[must_use]
    pub fn from_body(body: Map<String, Value>) -> Self {
        Self {
            tenant_id: None,
            created_by: None,
            body,
        }
    }

    /// Builder-style body field setter
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }
}

/// Record ready for insertion: scope already stamped, id not yet assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub tenant_id: TenantId,
    pub created_by: UserId,
    pub body: Map<String, Value>,
}

impl PendingRecord {
    /// Stamp `input` with the given scope, dropping reserved body fields.
    #[must_use]
    pub fn stamp(input: NewRecord, tenant_id: TenantId, created_by: UserId) -> Self {
        let mut body = input.body;
        body.retain(|key, _| !RESERVED_FIELDS.contains(&key.as_str()));
        Self {
            tenant_id,
            created_by,
            body,
        }
    }

    #[must_use]
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            tenant_id: self.tenant_id,
            created_by: self.created_by,
            body: self.body,
        }
    }
}

/// Record filter evaluated inside a tenant partition.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    #[default]
    All,
    Id(RecordId),
    FieldEq { name: String, value: Value },
}

impl Predicate {
    #[must_use]
    pub fn field_eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEq {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Id(id) => record.id == *id,
            Self::FieldEq { name, value } => record.field(name) == Some(value),
        }
    }
}
