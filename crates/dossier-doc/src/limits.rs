//! Editable text fields and their length limits.
//!
//! Limits are a UX policy: an over-long value is truncated and the caller is
//! told once, so it can show a notice. Lengths count Unicode scalar values,
//! never bytes, so truncation can't split a character.

use std::fmt;

use dossier_types::BlockKind;

/// Maximum length of a signature's signer name.
pub const SIGNER_NAME_MAX: usize = 42;
/// Maximum length of a signature's title (role).
pub const SIGNATURE_TITLE_MAX: usize = 40;
/// Maximum length of a text block's subtitle.
pub const SUBTITLE_MAX: usize = 100;

/// A text field on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockField {
    /// Text block subtitle.
    Subtitle,
    /// Text block body (unbounded).
    Body,
    /// Signature signer name.
    SignerName,
    /// Signature title, i.e. the signer's role.
    Title,
}

impl BlockField {
    /// Which block kind owns this field.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockField::Subtitle | BlockField::Body => BlockKind::Text,
            BlockField::SignerName | BlockField::Title => BlockKind::Signature,
        }
    }

    /// Character limit, if any.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            BlockField::Subtitle => Some(SUBTITLE_MAX),
            BlockField::Body => None,
            BlockField::SignerName => Some(SIGNER_NAME_MAX),
            BlockField::Title => Some(SIGNATURE_TITLE_MAX),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockField::Subtitle => "subtitle",
            BlockField::Body => "body",
            BlockField::SignerName => "signerName",
            BlockField::Title => "title",
        }
    }
}

impl fmt::Display for BlockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value was cut to fit its field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncation {
    pub field: BlockField,
    pub max: usize,
}

/// Clamp `value` to the field's limit.
pub fn clamp(field: BlockField, value: &str) -> (String, Option<Truncation>) {
    match field.max_len() {
        Some(max) if value.chars().count() > max => {
            let cut: String = value.chars().take(max).collect();
            (cut, Some(Truncation { field, max }))
        }
        _ => (value.to_string(), None),
    }
}
