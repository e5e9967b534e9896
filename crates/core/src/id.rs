//! Strongly-typed identifiers.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a user as issued by the identity service.
///
/// Opaque to the client: services hand out numeric ids or string ids
/// (e.g. document keys), and both are accepted on the wire. The id is kept
/// and written back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

struct UserIdVisitor;

impl<'de> Visitor<'de> for UserIdVisitor {
    type Value = UserId;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a user id (string or integer)")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<UserId, E> {
        Ok(UserId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<UserId, E> {
        Ok(UserId(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<UserId, E> {
        if v.trim().is_empty() {
            return Err(E::custom(DomainError::invalid_id("UserId: empty")));
        }
        Ok(UserId::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<UserId, E> {
        if v.trim().is_empty() {
            return Err(E::custom(DomainError::invalid_id("UserId: empty")));
        }
        Ok(UserId(v))
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UserIdVisitor)
    }
}
