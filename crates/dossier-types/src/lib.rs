//! Shared block, identifier, and wire types for dossier reports.
//!
//! A leaf crate with no internal dossier dependencies. The document model
//! (`dossier-doc`) and the persistence client (`dossier-client`) build on it.
//!
//! # Entity Overview
//!
//! ```text
//! Document (ExternalItemId) ← the unit of persistence
//!     └── Section (SectionId), ordered by position
//!         ├── SideItem (SideItemId), label/value pairs
//!         └── Block (BlockId), ordered by position
//!             └── BlockContent: Text | Image | Signature | Table
//!                 └── Image → StorageKey (durable) + display URL (transient)
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Block`]         | One content unit (id + position + payload)   |
//! | [`BlockKind`]     | text / image / signature / table             |
//! | [`BlockContent`]  | Tagged payload union                         |
//! | [`StorageKey`]    | Durable image reference                      |
//! | [`WireDocument`]  | Persisted/transported shape                  |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod ids;
pub mod wire;

pub use block::{
    Block, BlockContent, BlockKind, DEFAULT_IMAGE_SIZE, ImageData, LocalImage, SignatureData,
    TableData, TextData,
};
pub use ids::{BlockId, ExternalItemId, SectionId, SideItemId, StorageKey};
pub use wire::{
    WireDocument, WireError, WireImageData, WireItem, WireSection, WireSideItem,
    WireSignatureData, WireTableData, WireTextData,
};
