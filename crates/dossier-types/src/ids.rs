//! Typed identifiers for sections, blocks, and side-panel items.
//!
//! Local IDs wrap UUIDv7 (time-ordered, unique without coordination). The
//! backend is free to hand back its own identifiers (database integers, older
//! random UUIDs), so [`SectionId::from_wire`] and friends accept any string:
//! UUID text is kept as-is, anything else is folded into a deterministic
//! UUIDv5 so the same wire ID always maps to the same local ID.
//!
//! [`ExternalItemId`] and [`StorageKey`] are opaque backend strings and are
//! never generated locally.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A section identifier (UUIDv7, or UUIDv5 for foreign wire IDs).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(uuid::Uuid);

/// A block identifier, unique within a document.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

/// A side-panel item identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SideItemId(uuid::Uuid);

/// Fixed namespace for folding foreign wire IDs into UUIDv5.
const DOSSIER_WIRE_NS: uuid::Uuid = uuid::uuid!("5d0c1a52-93e4-4b7f-8a06-2f71c4be9d13");

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters, for display only.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Map an identifier received from the backend to a local ID.
            ///
            /// UUID text round-trips unchanged. Any other string (a database
            /// integer, say) is hashed into the dossier UUIDv5 namespace, so the
            /// mapping is stable across loads.
            pub fn from_wire(s: &str) -> Self {
                match uuid::Uuid::parse_str(s) {
                    Ok(u) => Self(u),
                    Err(_) => Self(uuid::Uuid::new_v5(&DOSSIER_WIRE_NS, s.as_bytes())),
                }
            }

            /// Wire form: hyphenated UUID text.
            pub fn to_wire(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(SectionId, "SectionId");
impl_typed_id!(BlockId, "BlockId");
impl_typed_id!(SideItemId, "SideItemId");

// ── Backend-owned strings ───────────────────────────────────────────────────

macro_rules! impl_opaque_string {
    ($T:ident) => {
        impl $T {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

/// The backend item a report belongs to. Persistence is keyed by this.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalItemId(String);

/// Durable backend reference to an uploaded image.
///
/// Independent of any display URL: the key survives reloads, URLs don't.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl_opaque_string!(ExternalItemId);
impl_opaque_string!(StorageKey);

// ============================================================================
// Tests
// ============================================================================
