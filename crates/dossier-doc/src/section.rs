//! A section: ordered blocks plus a side panel of label/value pairs.
//!
//! # Position invariant
//!
//! `blocks` and `side_items` are kept in array order with `position` equal to
//! the array index (`0..n-1`, no gaps, no duplicates). Every structural change
//! (insert, remove, move) renumbers the whole sequence, so positions can never
//! drift from order. Positions are only writable inside this crate.

use dossier_types::{Block, BlockId, BlockKind, SectionId, SideItemId, StorageKey};

use crate::grouping::{Group, group_blocks};
use crate::{DocError, Result};

/// Direction of a single-step move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards position 0.
    Up,
    /// Towards the end.
    Down,
}

impl Direction {
    /// Parse a `-1` / `+1` step.
    pub fn from_step(step: i8) -> Option<Self> {
        match step {
            -1 => Some(Direction::Up),
            1 => Some(Direction::Down),
            _ => None,
        }
    }

    fn target(&self, idx: usize, len: usize) -> Option<usize> {
        match self {
            Direction::Up => idx.checked_sub(1),
            Direction::Down => (idx + 1 < len).then_some(idx + 1),
        }
    }
}

/// Which half of a side item to edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideField {
    Label,
    Value,
}

/// One label/value pair in a section's side panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideItem {
    id: SideItemId,
    pub label: String,
    pub value: String,
    position: u32,
}

impl SideItem {
    pub fn new(id: SideItemId, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            value: value.into(),
            position: 0,
        }
    }

    pub fn id(&self) -> SideItemId {
        self.id
    }

    pub fn position(&self) -> u32 {
        self.position
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    position: u32,
    side_items: Vec<SideItem>,
    blocks: Vec<Block>,
}

impl Section {
    /// Create an empty section.
    pub fn new() -> Self {
        Self {
            id: SectionId::new(),
            position: 0,
            side_items: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Create a section seeded with an empty text block and a signature slot.
    pub fn seeded() -> Self {
        let mut section = Self::new();
        section.add_block(BlockKind::Text);
        section.add_block(BlockKind::Signature);
        section
    }

    /// Build a section from already-ordered parts, assigning dense positions.
    pub fn from_parts(id: SectionId, side_items: Vec<SideItem>, blocks: Vec<Block>) -> Self {
        let mut section = Self {
            id,
            position: 0,
            side_items,
            blocks,
        };
        section.renumber();
        section
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    /// Blocks in position order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Side items in position order.
    pub fn side_items(&self) -> &[SideItem] {
        &self.side_items
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.block(id).is_some()
    }

    /// Storage keys of every uploaded image in this section.
    pub fn storage_keys(&self) -> Vec<StorageKey> {
        self.blocks.iter().filter_map(|b| b.storage_key().cloned()).collect()
    }

    /// Render-time grouping of this section's blocks.
    pub fn groups(&self) -> Vec<Group<'_>> {
        group_blocks(&self.blocks)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Append an empty block of `kind`.
    pub fn add_block(&mut self, kind: BlockKind) -> BlockId {
        let mut block = Block::new(kind);
        block.position = self.blocks.len() as u32;
        let id = block.id();
        self.blocks.push(block);
        id
    }

    /// Remove a block and renumber. Returns the removed block.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block> {
        let idx = self.index_of(id)?;
        let removed = self.blocks.remove(idx);
        self.renumber_blocks();
        Ok(removed)
    }

    /// Swap a block with its neighbour.
    ///
    /// Returns `false` (and changes nothing) when the block is already at the
    /// edge in that direction.
    pub fn move_block(&mut self, id: BlockId, direction: Direction) -> Result<bool> {
        let idx = self.index_of(id)?;
        let Some(target) = direction.target(idx, self.blocks.len()) else {
            return Ok(false);
        };
        self.blocks.swap(idx, target);
        self.renumber_blocks();
        Ok(true)
    }

    fn index_of(&self, id: BlockId) -> Result<usize> {
        self.blocks
            .iter()
            .position(|b| b.id() == id)
            .ok_or(DocError::BlockNotFound(id))
    }

    // =========================================================================
    // Side panel
    // =========================================================================

    /// Append an empty side item.
    pub fn add_side_item(&mut self) -> SideItemId {
        let mut item = SideItem::new(SideItemId::new(), "", "");
        item.position = self.side_items.len() as u32;
        let id = item.id;
        self.side_items.push(item);
        id
    }

    pub fn update_side_item(&mut self, id: SideItemId, field: SideField, value: &str) -> Result<()> {
        let item = self
            .side_items
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DocError::SideItemNotFound(id))?;
        match field {
            SideField::Label => item.label = value.to_string(),
            SideField::Value => item.value = value.to_string(),
        }
        Ok(())
    }

    pub fn remove_side_item(&mut self, id: SideItemId) -> Result<SideItem> {
        let idx = self
            .side_items
            .iter()
            .position(|s| s.id == id)
            .ok_or(DocError::SideItemNotFound(id))?;
        let removed = self.side_items.remove(idx);
        self.renumber_side_items();
        Ok(removed)
    }

    // =========================================================================
    // Renumbering
    // =========================================================================

    fn renumber(&mut self) {
        self.renumber_blocks();
        self.renumber_side_items();
    }

    fn renumber_blocks(&mut self) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.position = i as u32;
        }
    }

    fn renumber_side_items(&mut self) {
        for (i, item) in self.side_items.iter_mut().enumerate() {
            item.position = i as u32;
        }
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}
