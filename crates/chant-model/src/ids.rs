//! Identifier newtypes.
//!
//! Ids are opaque `u64`s assigned by the surrounding system. They are
//! `Ord` on purpose: the tally tie-break is "lowest idea id", which
//! keeps winner selection deterministic and independent of insertion
//! or iteration order.

use serde::{Deserialize, Serialize};

/// Unique participant (or delegate) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ParticipantId(pub u64);

/// Unique idea identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct IdeaId(pub u64);

/// Unique cell identifier, scoped to a deliberation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct CellId(pub u64);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            /// Create from a raw value.
            #[inline]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Get the raw value.
            #[inline]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_impls!(ParticipantId);
id_impls!(IdeaId);
id_impls!(CellId);
