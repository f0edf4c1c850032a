//! Core type definitions with validation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Format of a session id: the local calendar day it represents.
pub const DAY_ID_FORMAT: &str = "%Y-%m-%d";

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A session id that is not a `YYYY-MM-DD` calendar day.
    #[error("invalid session day: {value}")]
    InvalidDay { value: String },
}

/// A validated contraction entry identifier.
///
/// Entry ids are opaque non-empty strings, unique within their session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty { field: "entry ID" });
        }
        Ok(Self(id))
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated session identifier.
///
/// Session ids name one local calendar day as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new ID after checking it names a calendar day.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::Empty { field: "session ID" });
        }
        // Round-trip through the formatter so "2025-1-5" is rejected.
        match NaiveDate::parse_from_str(&id, DAY_ID_FORMAT) {
            Ok(date) if date.format(DAY_ID_FORMAT).to_string() == id => Ok(Self(id)),
            _ => Err(ValidationError::InvalidDay { value: id }),
        }
    }

    /// Builds the id for a calendar day.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DAY_ID_FORMAT).to_string())
    }

    /// The calendar day this session represents.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DAY_ID_FORMAT).ok()
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shared conversions for the string id newtypes.
macro_rules! impl_string_id {
    ($name:ident) => {
        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_string_id!(EntryId);
impl_string_id!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_rejects_empty() {
        assert!(EntryId::new("").is_err());
        assert!(EntryId::new("entry-1").is_ok());
    }

    #[test]
    fn generated_entry_ids_are_distinct() {
        let ids: std::collections::HashSet<_> = (0..256).map(|_| EntryId::generate()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn session_id_requires_calendar_day() {
        assert!(SessionId::new("2025-01-05").is_ok());
        assert_eq!(
            SessionId::new("2025-1-5"),
            Err(ValidationError::InvalidDay {
                value: "2025-1-5".to_string()
            })
        );
        assert!(SessionId::new("2025-02-30").is_err());
        assert!(SessionId::new("today").is_err());
        assert!(SessionId::new("").is_err());
    }

    #[test]
    fn session_id_from_date_matches_format() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let id = SessionId::from_date(date);
        assert_eq!(id.as_str(), "2024-12-31");
        assert_eq!(id.date(), Some(date));
    }

    #[test]
    fn session_id_serde_rejects_malformed() {
        let ok: SessionId = serde_json::from_str("\"2025-03-01\"").unwrap();
        assert_eq!(ok.as_str(), "2025-03-01");
        let bad: Result<SessionId, _> = serde_json::from_str("\"March 1\"");
        assert!(bad.is_err());
    }

    #[test]
    fn session_ids_order_chronologically() {
        let a = SessionId::new("2025-01-09").unwrap();
        let b = SessionId::new("2025-01-10").unwrap();
        assert!(a < b);
    }
}
