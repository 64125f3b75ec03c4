//! Typed IDs for type-safe entity references.
//!
//! A `DealId` cannot be passed where an `OfferId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(CustomerId, "Unique identifier for a customer.");
typed_id!(DealId, "Unique identifier for a deal.");
typed_id!(OfferId, "Unique identifier for an offer.");
typed_id!(ProjectId, "Unique identifier for a project.");
typed_id!(BudgetItemId, "Unique identifier for a budget line item.");
typed_id!(HistoryId, "Unique identifier for a deal stage history row.");
typed_id!(ActivityId, "Unique identifier for an activity log entry.");

/// Source of primary keys for non-sequence identifiers.
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    /// Returns a fresh UUID.
    fn next_uuid(&self) -> Uuid;
}

/// Time-ordered UUID v7 keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_uuid(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Deterministic keys counting up from 1, for tests and fixtures.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: std::sync::atomic::AtomicU64,
}

impl IdGenerator for SequentialIdGenerator {
    fn next_uuid(&self) -> Uuid {
        let n = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_trip_through_string() {
        let id = DealId::from_uuid(Uuid::now_v7());
        assert_eq!(DealId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_invalid_id_string() {
        assert!(OfferId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_sequential_generator_counts_up() {
        let ids = SequentialIdGenerator::default();
        assert_eq!(ids.next_uuid(), Uuid::from_u128(1));
        assert_eq!(ids.next_uuid(), Uuid::from_u128(2));
    }

    #[test]
    fn test_v7_generator_is_time_ordered() {
        let ids = UuidV7Generator;
        let first = ids.next_uuid();
        let second = ids.next_uuid();
        assert_ne!(first, second);
        assert_eq!(first.get_version_num(), 7);
    }

    #[test]
    fn test_uuid_conversions() {
        let raw = Uuid::nil();
        let id: ProjectId = raw.into();
        assert_eq!(Uuid::from(id), raw);
        assert_eq!(id.into_inner(), raw);
    }
}
