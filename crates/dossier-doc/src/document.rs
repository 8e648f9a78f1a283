//! The document aggregate.
//!
//! A [`Document`] is owned by exactly one editing session and mutated in place.
//! Every operation keeps section and block positions dense, and removals hand
//! back the storage keys they orphaned so the caller can delete the assets.

use chrono::{Local, NaiveDate};
use dossier_types::{
    Block, BlockContent, BlockId, BlockKind, ExternalItemId, ImageData, SectionId, SideItemId,
    StorageKey,
};
use tracing::debug;

use crate::limits::{self, BlockField, Truncation};
use crate::section::{Direction, Section, SideField};
use crate::table::{self, TableEdit};
use crate::{DocError, Result};

/// Title block printed at the top of every page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentHeader {
    pub title: String,
    pub version_label: String,
    pub code: String,
    pub created_date: NaiveDate,
}

impl DocumentHeader {
    /// Blank header dated today.
    pub fn today() -> Self {
        Self {
            title: String::new(),
            version_label: String::new(),
            code: String::new(),
            created_date: Local::now().date_naive(),
        }
    }
}

/// Result of a text-field update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct FieldUpdate {
    /// Set when the value was cut to the field's limit.
    pub truncated: Option<Truncation>,
}

/// Result of a structural removal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Removal {
    /// Storage keys no longer referenced by the document.
    pub orphaned_keys: Vec<StorageKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub header: DocumentHeader,
    external_item_id: ExternalItemId,
    sections: Vec<Section>,
}

impl Document {
    /// Create a fresh document: one seeded section, dated today.
    pub fn new(external_item_id: ExternalItemId) -> Self {
        Self::from_parts(DocumentHeader::today(), external_item_id, vec![Section::seeded()])
    }

    /// Assemble a document from already-ordered sections.
    pub fn from_parts(
        header: DocumentHeader,
        external_item_id: ExternalItemId,
        sections: Vec<Section>,
    ) -> Self {
        let mut doc = Self {
            header,
            external_item_id,
            sections,
        };
        doc.renumber_sections();
        doc
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn external_item_id(&self) -> &ExternalItemId {
        &self.external_item_id
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id)
    }

    /// Look up a block anywhere in the document.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.sections.iter().find_map(|s| s.block(id))
    }

    /// Section holding `block`, if any.
    pub fn section_of(&self, block: BlockId) -> Option<SectionId> {
        self.sections
            .iter()
            .find(|s| s.contains_block(block))
            .map(Section::id)
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks().len()).sum()
    }

    /// Every storage key referenced by an image block.
    pub fn storage_keys(&self) -> Vec<StorageKey> {
        self.sections.iter().flat_map(Section::storage_keys).collect()
    }

    /// Check whether any text block has a non-blank body.
    ///
    /// Gate for an explicit save; autosave ignores it.
    pub fn has_text_content(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|s| s.blocks())
            .any(|b| matches!(&b.content, BlockContent::Text(t) if !t.body.trim().is_empty()))
    }

    /// Copy with every image's editor-local state dropped.
    pub fn without_display(&self) -> Self {
        let mut doc = self.clone();
        for section in &mut doc.sections {
            let ids: Vec<BlockId> = section.blocks().iter().map(Block::id).collect();
            for id in ids {
                if let Some(img) = section.block_mut(id).and_then(Block::as_image_mut) {
                    *img = img.without_display();
                }
            }
        }
        doc
    }

    // =========================================================================
    // Sections
    // =========================================================================

    /// Append a section seeded with a text block and a signature slot.
    pub fn add_section(&mut self) -> SectionId {
        let mut section = Section::seeded();
        section.set_position(self.sections.len() as u32);
        let id = section.id();
        self.sections.push(section);
        debug!(document = %self.external_item_id, section = %id, "section added");
        id
    }

    /// Remove a section. The only remaining section cannot be removed.
    pub fn remove_section(&mut self, id: SectionId) -> Result<Removal> {
        let idx = self
            .sections
            .iter()
            .position(|s| s.id() == id)
            .ok_or(DocError::SectionNotFound(id))?;
        if self.sections.len() == 1 {
            return Err(DocError::LastSection);
        }
        let removed = self.sections.remove(idx);
        self.renumber_sections();
        Ok(Removal {
            orphaned_keys: removed.storage_keys(),
        })
    }

    fn section_mut(&mut self, id: SectionId) -> Result<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(DocError::SectionNotFound(id))
    }

    fn renumber_sections(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.set_position(i as u32);
        }
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    pub fn add_block(&mut self, section: SectionId, kind: BlockKind) -> Result<BlockId> {
        Ok(self.section_mut(section)?.add_block(kind))
    }

    pub fn remove_block(&mut self, section: SectionId, block: BlockId) -> Result<Removal> {
        let removed = self.section_mut(section)?.remove_block(block)?;
        Ok(Removal {
            orphaned_keys: removed.storage_key().cloned().into_iter().collect(),
        })
    }

    /// Returns whether the block moved.
    pub fn move_block(
        &mut self,
        section: SectionId,
        block: BlockId,
        direction: Direction,
    ) -> Result<bool> {
        self.section_mut(section)?.move_block(block, direction)
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.sections
            .iter_mut()
            .find_map(|s| s.block_mut(id))
            .ok_or(DocError::BlockNotFound(id))
    }

    /// Set a text or signature field, clamping it to the field's limit.
    pub fn update_block_field(
        &mut self,
        id: BlockId,
        field: BlockField,
        value: &str,
    ) -> Result<FieldUpdate> {
        let block = self.block_mut(id)?;
        let kind = block.kind();
        if field.kind() != kind {
            return Err(DocError::FieldMismatch { block: id, kind, field });
        }

        let (value, truncated) = limits::clamp(field, value);
        match (&mut block.content, field) {
            (BlockContent::Text(t), BlockField::Subtitle) => t.subtitle = value,
            (BlockContent::Text(t), BlockField::Body) => t.body = value,
            (BlockContent::Signature(s), BlockField::SignerName) => s.signer_name = value,
            (BlockContent::Signature(s), BlockField::Title) => s.title = value,
            _ => return Err(DocError::FieldMismatch { block: id, kind, field }),
        }
        if let Some(t) = truncated {
            debug!(block = %id, field = %t.field, max = t.max, "field truncated");
        }
        Ok(FieldUpdate { truncated })
    }

    /// Run `f` against an image block's data.
    pub fn with_image_mut<R>(
        &mut self,
        id: BlockId,
        f: impl FnOnce(&mut ImageData) -> R,
    ) -> Result<R> {
        let block = self.block_mut(id)?;
        let got = block.kind();
        let img = block.as_image_mut().ok_or(DocError::WrongKind {
            block: id,
            expected: BlockKind::Image,
            got,
        })?;
        Ok(f(img))
    }

    pub fn set_image_size(&mut self, id: BlockId, width: u32, height: u32) -> Result<()> {
        self.with_image_mut(id, |img| {
            img.width = width;
            img.height = height;
        })
    }

    pub fn edit_table(&mut self, id: BlockId, edit: TableEdit) -> Result<()> {
        let block = self.block_mut(id)?;
        match &mut block.content {
            BlockContent::Table(t) => table::apply(t, edit),
            other => Err(DocError::WrongKind {
                block: id,
                expected: BlockKind::Table,
                got: other.kind(),
            }),
        }
    }

    // =========================================================================
    // Side panel
    // =========================================================================

    pub fn add_side_item(&mut self, section: SectionId) -> Result<SideItemId> {
        Ok(self.section_mut(section)?.add_side_item())
    }

    pub fn update_side_item(
        &mut self,
        section: SectionId,
        item: SideItemId,
        field: SideField,
        value: &str,
    ) -> Result<()> {
        self.section_mut(section)?.update_side_item(item, field, value)
    }

    pub fn remove_side_item(&mut self, section: SectionId, item: SideItemId) -> Result<()> {
        self.section_mut(section)?.remove_side_item(item)?;
        Ok(())
    }
}
