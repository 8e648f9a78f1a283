//! Render-time grouping of a section's blocks.
//!
//! Contiguous image blocks are laid out as one row, and so are contiguous
//! signature blocks. Text and table blocks stand alone. Grouping is a pure
//! projection: it borrows the blocks, never reorders them, and is recomputed
//! on every read.

use dossier_types::{Block, BlockKind};

/// One laid-out unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Group<'a> {
    /// A text or table block.
    Single(&'a Block),
    /// A maximal run of same-kind image or signature blocks.
    Run { kind: BlockKind, blocks: Vec<&'a Block> },
}

impl<'a> Group<'a> {
    pub fn kind(&self) -> BlockKind {
        match self {
            Group::Single(block) => block.kind(),
            Group::Run { kind, .. } => *kind,
        }
    }

    pub fn blocks(&self) -> &[&'a Block] {
        match self {
            Group::Single(block) => std::slice::from_ref(block),
            Group::Run { blocks, .. } => blocks,
        }
    }
}

/// Partition `blocks` (already in position order) into groups.
pub fn group_blocks(blocks: &[Block]) -> Vec<Group<'_>> {
    let mut groups = Vec::new();
    let mut run: Vec<&Block> = Vec::new();
    let mut current: Option<BlockKind> = None;

    for block in blocks {
        let kind = block.kind();
        if kind.is_batched() {
            if current != Some(kind) {
                flush(&mut groups, &mut run, current);
                current = Some(kind);
            }
            run.push(block);
        } else {
            flush(&mut groups, &mut run, current);
            current = None;
            groups.push(Group::Single(block));
        }
    }
    flush(&mut groups, &mut run, current);
    groups
}

fn flush<'a>(groups: &mut Vec<Group<'a>>, run: &mut Vec<&'a Block>, kind: Option<BlockKind>) {
    if let Some(kind) = kind
        && !run.is_empty()
    {
        groups.push(Group::Run {
            kind,
            blocks: std::mem::take(run),
        });
    }
}
