//! Block types: the four content kinds a section is built from.
//!
//! A [`Block`] is an immutable [`BlockId`], a dense `position` owned by the
//! enclosing section, and a [`BlockContent`] payload. Consumers pattern-match on
//! the content; there is no free-form field access.
//!
//! ## Image state
//!
//! [`ImageData`] separates *reference* from *display*:
//!
//! - `storage_key`: durable backend reference, the only thing persisted
//! - `display_url`: transient view URL (local preview or proxied), editor-local
//! - `local_file`: the selected file, alive only until its upload succeeds

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, StorageKey};

/// What a block *is*.
///
/// Older backends spell kinds in Spanish; those spellings parse as aliases but
/// are never emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockKind {
    /// Subtitle + free-text body.
    #[default]
    #[strum(serialize = "text", serialize = "texto")]
    Text,
    /// Uploaded still image.
    #[strum(serialize = "image", serialize = "imagen")]
    Image,
    /// Signature slot (signer name + title).
    #[strum(serialize = "signature", serialize = "firma")]
    Signature,
    /// Header row + string rows.
    #[strum(serialize = "table", serialize = "tabla")]
    Table,
}

impl BlockKind {
    /// Parse from string (case-insensitive, accepts legacy aliases).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Signature => "signature",
            BlockKind::Table => "table",
        }
    }

    /// Kinds whose contiguous runs are laid out together.
    pub fn is_batched(&self) -> bool {
        matches!(self, BlockKind::Image | BlockKind::Signature)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextData {
    pub subtitle: String,
    pub body: String,
}

/// Default edge length for a freshly added image.
pub const DEFAULT_IMAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub storage_key: Option<StorageKey>,
    pub display_url: Option<String>,
    pub local_file: Option<Arc<LocalImage>>,
}

impl Default for ImageData {
    fn default() -> Self {
        Self {
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            storage_key: None,
            display_url: None,
            local_file: None,
        }
    }
}

impl ImageData {
    /// Check whether the image has a durable backend reference.
    pub fn is_uploaded(&self) -> bool {
        self.storage_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Drop editor-local state, keeping only what is persisted.
    pub fn without_display(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            storage_key: self.storage_key.clone(),
            display_url: None,
            local_file: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureData {
    pub signer_name: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Default for TableData {
    /// Three placeholder columns, two empty rows.
    fn default() -> Self {
        let headers: Vec<String> = (1..=3).map(|n| format!("Col {n}")).collect();
        let rows = vec![vec![String::new(); headers.len()]; 2];
        Self { headers, rows }
    }
}

impl TableData {
    /// Number of columns.
    pub fn arity(&self) -> usize {
        self.headers.len()
    }

    /// Check that every row has exactly one cell per header.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.headers.len())
    }
}

/// A selected file awaiting upload.
///
/// Held behind an `Arc` on the block so cloning a document never copies bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl LocalImage {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for LocalImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalImage")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Block payload, discriminated by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockContent {
    Text(TextData),
    Image(ImageData),
    Signature(SignatureData),
    Table(TableData),
}

impl BlockContent {
    /// Default payload for a newly added block of `kind`.
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => BlockContent::Text(TextData::default()),
            BlockKind::Image => BlockContent::Image(ImageData::default()),
            BlockKind::Signature => BlockContent::Signature(SignatureData::default()),
            BlockKind::Table => BlockContent::Table(TableData::default()),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Text(_) => BlockKind::Text,
            BlockContent::Image(_) => BlockKind::Image,
            BlockContent::Signature(_) => BlockKind::Signature,
            BlockContent::Table(_) => BlockKind::Table,
        }
    }
}

// ============================================================================
// Block
// ============================================================================

/// One content unit within a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    /// Zero-based index within the owning section. Maintained by the section.
    pub position: u32,
    pub content: BlockContent,
}

impl Block {
    /// Create an empty block of `kind` with a fresh ID.
    pub fn new(kind: BlockKind) -> Self {
        Self::with_content(BlockId::new(), BlockContent::empty(kind))
    }

    /// Create a block with an existing ID (hydration).
    pub fn with_content(id: BlockId, content: BlockContent) -> Self {
        Self {
            id,
            position: 0,
            content,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn as_image(&self) -> Option<&ImageData> {
        match &self.content {
            BlockContent::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageData> {
        match &mut self.content {
            BlockContent::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Storage key held by this block, if it is an uploaded image.
    pub fn storage_key(&self) -> Option<&StorageKey> {
        self.as_image()
            .and_then(|img| img.storage_key.as_ref())
            .filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================
