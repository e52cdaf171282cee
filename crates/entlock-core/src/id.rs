//! Identifier newtypes for lockable entities and their holders.
//!
//! All identifiers are distinct newtype wrappers so that an [`EntityId`]
//! cannot be accidentally used where a [`UserId`] is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Maximum length of an entity type tag, in bytes.
pub const MAX_ENTITY_TYPE_LEN: usize = 64;

/// Type tag of a lockable entity (e.g. `"Report"`).
///
/// Tags are non-empty ASCII made of alphanumerics, `_`, `-` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    /// Validates and wraps a type tag.
    pub fn new(tag: impl Into<String>) -> Result<Self, CoreError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(CoreError::InvalidEntityType {
                tag,
                reason: "must not be empty".to_string(),
            });
        }
        if tag.len() > MAX_ENTITY_TYPE_LEN {
            return Err(CoreError::InvalidEntityType {
                tag,
                reason: format!("longer than {} bytes", MAX_ENTITY_TYPE_LEN),
            });
        }
        if let Some(bad) = tag
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(CoreError::InvalidEntityType {
                reason: format!("invalid character {:?}", bad),
                tag,
            });
        }
        Ok(EntityType(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntityType::new(value)
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.0
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::new(s)
    }
}

/// Numeric identifier of a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

/// Identity of a user that can hold locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Allocates a fresh random user ID.
    pub fn new_v4() -> Self {
        UserId(Uuid::new_v4())
    }
}

/// Composite key of the lock table: one lock slot per `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockKey {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
}

impl LockKey {
    pub fn new(entity_type: EntityType, entity_id: EntityId) -> Self {
        LockKey {
            entity_type,
            entity_id,
        }
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_accepts_plain_tags() {
        for tag in ["Report", "credibility_assessment", "pirt-table", "v1.Model"] {
            assert_eq!(EntityType::new(tag).unwrap().as_str(), tag);
        }
    }

    #[test]
    fn entity_type_rejects_bad_tags() {
        assert!(EntityType::new("").is_err());
        assert!(EntityType::new("has space").is_err());
        assert!(EntityType::new("slash/path").is_err());
        assert!(EntityType::new("x".repeat(MAX_ENTITY_TYPE_LEN + 1)).is_err());
        assert!(EntityType::new("x".repeat(MAX_ENTITY_TYPE_LEN)).is_ok());
    }

    #[test]
    fn entity_type_deserialization_validates() {
        let ok: EntityType = serde_json::from_str("\"Report\"").unwrap();
        assert_eq!(ok.as_str(), "Report");
        assert!(serde_json::from_str::<EntityType>("\"\"").is_err());
    }

    #[test]
    fn lock_key_display() {
        let key = LockKey::new(EntityType::new("Report").unwrap(), EntityId(42));
        assert_eq!(key.to_string(), "Report#42");
    }
}
