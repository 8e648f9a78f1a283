//! Document model for dossier reports.
//!
//! A report is a [`Document`] of ordered [`Section`]s, each holding ordered
//! blocks and a side panel. The model owns the ordering invariants; rendering
//! reads it through [`group_blocks`] and [`RenderTree`].
//!
//! # Invariants
//!
//! - Sections, blocks, and side items have dense zero-based positions that
//!   match their order. No operation leaves a gap or a duplicate.
//! - Block IDs are unique within a document and never change.
//! - Text limits are clamped, not rejected; see [`limits`].
//!
//! # Example
//!
//! ```
//! use dossier_doc::{BlockField, BlockKind, Document, ExternalItemId};
//!
//! let mut doc = Document::new(ExternalItemId::new("report-7"));
//! let section = doc.sections()[0].id();
//! let table = doc.add_block(section, BlockKind::Table).unwrap();
//! let text = doc.sections()[0].blocks()[0].id();
//! let update = doc.update_block_field(text, BlockField::Body, "Findings").unwrap();
//! assert!(update.truncated.is_none());
//! assert_eq!(doc.block(table).unwrap().position, 2);
//! ```

pub mod document;
pub mod error;
pub mod grouping;
pub mod limits;
pub mod render;
pub mod section;
pub mod table;

pub use document::{Document, DocumentHeader, FieldUpdate, Removal};
pub use error::DocError;
pub use grouping::{Group, group_blocks};
pub use limits::{BlockField, Truncation};
pub use render::{RenderElement, RenderImage, RenderPage, RenderTree, Renderer};
pub use section::{Direction, Section, SideField, SideItem};
pub use table::TableEdit;

// Re-export block types for convenience
pub use dossier_types::{
    Block, BlockContent, BlockId, BlockKind, ExternalItemId, ImageData, SectionId, SideItemId,
    SignatureData, StorageKey, TableData, TextData,
};

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
