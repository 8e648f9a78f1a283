//! Wire representation exchanged with the persistence endpoint.
//!
//! ```text
//! WireDocument
//! ├── title, versionLabel, code, createdDate, externalItemId
//! └── sections[]
//!     ├── id?, position
//!     ├── sideItems[] {id, label, value, position}
//!     └── items[]     {id, kind, position, data}
//! ```
//!
//! The transport and storage layers do not preserve array order, so every
//! element carries an explicit `position`. `data` stays untyped JSON here: its
//! shape depends on `kind`, and an unknown kind must be reported by whoever
//! hydrates the item, not silently dropped during deserialization.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ExternalItemId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version_label: String,
    #[serde(default)]
    pub code: String,
    /// ISO date. Backends may return a full timestamp; only the date part is read.
    pub created_date: String,
    pub external_item_id: ExternalItemId,
    #[serde(default)]
    pub sections: Vec<WireSection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub position: i64,
    #[serde(default)]
    pub side_items: Vec<WireSideItem>,
    #[serde(default)]
    pub items: Vec<WireItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSideItem {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
    pub position: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireItem {
    pub id: String,
    pub kind: String,
    pub position: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

// ── Per-kind payloads ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTextData {
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
}

/// Image payload on the wire: dimensions and the durable key only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImageData {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub storage_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSignatureData {
    #[serde(default)]
    pub signer_name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTableData {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

// ============================================================================
// Validation
// ============================================================================

/// Structural problems in a wire document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Two siblings share a position.
    #[error("duplicate positions in {context}")]
    DuplicatePositions { context: String },
}

fn check_unique(positions: impl Iterator<Item = i64>, context: impl FnOnce() -> String) -> Result<(), WireError> {
    let mut seen = HashSet::new();
    for p in positions {
        if !seen.insert(p) {
            return Err(WireError::DuplicatePositions { context: context() });
        }
    }
    Ok(())
}

impl WireDocument {
    /// Reject duplicate positions among sections, and among each section's
    /// side items and items. The persistence endpoint applies the same check.
    pub fn validate(&self) -> Result<(), WireError> {
        check_unique(self.sections.iter().map(|s| s.position), || "sections".to_string())?;
        for section in &self.sections {
            check_unique(section.side_items.iter().map(|s| s.position), || {
                format!("side items of section {}", section.position)
            })?;
            check_unique(section.items.iter().map(|i| i.position), || {
                format!("items of section {}", section.position)
            })?;
        }
        Ok(())
    }

    /// Every storage key referenced by image items.
    pub fn storage_keys(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter_map(|item| item.data.get("storageKey")?.as_str().map(str::to_string))
            .filter(|k| !k.is_empty())
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
