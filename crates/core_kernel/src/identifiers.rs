//! Strongly-typed identifiers for ledger entities
//!
//! Two families of identifiers live here:
//! - generated identifiers (`EntryId`, `AuditEventId`) wrapping UUIDs
//! - business keys (`EmployeeId`, `ClientId`) chosen by back-office staff,
//!   which are stable external strings and compared exactly

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered identifier (v7)
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

/// Error returned when a business key is blank
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} must not be empty")]
pub struct EmptyKeyError {
    pub kind: &'static str,
}

macro_rules! define_key {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a key from a non-blank string, trimming surrounding whitespace
            pub fn parse(value: impl AsRef<str>) -> Result<Self, EmptyKeyError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(EmptyKeyError { kind: $kind });
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = EmptyKeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Generated identifiers
define_id!(EntryId, "TS");
define_id!(AuditEventId, "AUD");

// Business keys
define_key!(EmployeeId, "Employee ID");
define_key!(ClientId, "Client ID");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_display_and_parse() {
        let id = EntryId::new();
        let display = id.to_string();
        assert!(display.starts_with("TS-"));

        let parsed: EntryId = display.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_business_key_trims_and_rejects_blank() {
        let key = ClientId::parse("  C1 ").unwrap();
        assert_eq!(key.as_str(), "C1");

        let err = EmployeeId::parse("   ").unwrap_err();
        assert_eq!(err.to_string(), "Employee ID must not be empty");
    }

    #[test]
    fn test_business_key_serializes_transparently() {
        let key = EmployeeId::parse("E1").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"E1\"");
    }
}
