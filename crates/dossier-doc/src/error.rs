//! Error types for document operations.

use thiserror::Error;

use crate::{BlockField, BlockId, BlockKind, SectionId, SideItemId};

/// Errors that can occur when editing a document.
///
/// Over-long field values are *not* errors: they are clamped and reported
/// through [`FieldUpdate`](crate::FieldUpdate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    /// Section not found in document.
    #[error("section not found: {0:?}")]
    SectionNotFound(SectionId),

    /// Block not found in document (or not in the named section).
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Side-panel item not found in section.
    #[error("side item not found: {0:?}")]
    SideItemNotFound(SideItemId),

    /// The field does not exist on this kind of block.
    #[error("field {field} does not apply to {kind} block {block:?}")]
    FieldMismatch {
        block: BlockId,
        kind: BlockKind,
        field: BlockField,
    },

    /// Operation requires a different block kind.
    #[error("operation requires a {expected} block, {block:?} is {got}")]
    WrongKind {
        block: BlockId,
        expected: BlockKind,
        got: BlockKind,
    },

    /// Table row or column index out of range.
    #[error("table index {index} out of bounds (len {len})")]
    TableIndexOutOfBounds { index: usize, len: usize },

    /// Removing the column would leave the table without headers.
    #[error("cannot remove the last table column")]
    LastColumn,

    /// A document always keeps at least one section.
    #[error("cannot remove the last section")]
    LastSection,
}
