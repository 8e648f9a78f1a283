//! Conversion between [`Document`] and [`WireDocument`].
//!
//! Export is pure and infallible. Import sorts by wire position, rebuilds
//! dense local positions, and resolves every image's display URL in one
//! concurrent fan-out before the document is returned.
//!
//! Import fails as a whole if any section has an unknown kind, malformed
//! payload, or an id already used elsewhere in the document. Partially
//! loading a report would let the next full-replace flush erase the sections
//! that were skipped. Stored values are never rewritten on import: field
//! limits apply to edits, not to what the backend already holds.

use std::collections::HashSet;

use chrono::NaiveDate;
use dossier_doc::{Document, DocumentHeader, Section, SideItem};
use dossier_types::{
    Block, BlockContent, BlockId, BlockKind, ImageData, SectionId, SideItemId, SignatureData,
    StorageKey, TableData, TextData, WireDocument, WireImageData, WireItem, WireSection,
    WireSideItem, WireSignatureData, WireTableData, WireTextData,
};
use futures::future::join_all;
use serde_json::json;
use tracing::{info, warn};

use crate::assets::AssetCoordinator;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Errors
// ============================================================================

/// One item that could not be hydrated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("item {item}: unknown kind {kind:?}")]
    UnknownKind { item: String, kind: String },
    #[error("item {item}: malformed {kind} data: {message}")]
    MalformedData {
        item: String,
        kind: BlockKind,
        message: String,
    },
    /// Two wire ids resolve to the same local id.
    #[error("item {item}: duplicate id {id}")]
    DuplicateId { item: String, id: String },
}

/// Every failing item of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionError {
    /// Wire position of the section.
    pub position: i64,
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrateError {
    #[error("invalid createdDate {0:?}")]
    CreatedDate(String),
    #[error("{}", describe_sections(.0))]
    Sections(Vec<SectionError>),
}

fn describe_sections(sections: &[SectionError]) -> String {
    sections
        .iter()
        .map(|s| {
            let items: Vec<String> = s.errors.iter().map(ToString::to_string).collect();
            format!("section at position {}: {}", s.position, items.join("; "))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

// ============================================================================
// Export
// ============================================================================

fn item_data(content: &BlockContent) -> serde_json::Value {
    match content {
        BlockContent::Text(t) => json!({ "subtitle": t.subtitle, "body": t.body }),
        BlockContent::Image(img) => json!({
            "width": img.width,
            "height": img.height,
            "storageKey": img.storage_key.as_ref().filter(|k| !k.is_empty()).map(StorageKey::as_str),
        }),
        BlockContent::Signature(s) => json!({ "signerName": s.signer_name, "title": s.title }),
        BlockContent::Table(t) => json!({ "headers": t.headers, "rows": t.rows }),
    }
}

/// Flatten `doc` for persistence. Positions are dense and images carry only
/// their dimensions and storage key.
pub fn to_wire(doc: &Document) -> WireDocument {
    let sections = doc
        .sections()
        .iter()
        .map(|section| WireSection {
            id: Some(section.id().to_wire()),
            position: i64::from(section.position()),
            side_items: section
                .side_items()
                .iter()
                .map(|item| WireSideItem {
                    id: item.id().to_wire(),
                    label: item.label.clone(),
                    value: item.value.clone(),
                    position: i64::from(item.position()),
                })
                .collect(),
            items: section
                .blocks()
                .iter()
                .map(|block| WireItem {
                    id: block.id().to_wire(),
                    kind: block.kind().as_str().to_string(),
                    position: i64::from(block.position),
                    data: item_data(&block.content),
                })
                .collect(),
        })
        .collect();

    WireDocument {
        title: doc.header.title.clone(),
        version_label: doc.header.version_label.clone(),
        code: doc.header.code.clone(),
        created_date: doc.header.created_date.format(DATE_FORMAT).to_string(),
        external_item_id: doc.external_item_id().clone(),
        sections,
    }
}

// ============================================================================
// Import
// ============================================================================

fn decode<T: serde::de::DeserializeOwned>(item: &WireItem, kind: BlockKind) -> Result<T, ItemError> {
    serde_json::from_value(item.data.clone()).map_err(|e| ItemError::MalformedData {
        item: item.id.clone(),
        kind,
        message: e.to_string(),
    })
}

/// Local ids already handed out while hydrating one document.
#[derive(Default)]
struct SeenIds {
    sections: HashSet<SectionId>,
    blocks: HashSet<BlockId>,
    side_items: HashSet<SideItemId>,
}

fn duplicate(item: &str, id: impl ToString) -> ItemError {
    ItemError::DuplicateId {
        item: item.to_string(),
        id: id.to_string(),
    }
}

fn hydrate_item(item: &WireItem) -> Result<Block, ItemError> {
    let kind = BlockKind::from_str(&item.kind).ok_or_else(|| ItemError::UnknownKind {
        item: item.id.clone(),
        kind: item.kind.clone(),
    })?;

    let content = match kind {
        BlockKind::Text => {
            let d: WireTextData = decode(item, kind)?;
            BlockContent::Text(TextData {
                subtitle: d.subtitle,
                body: d.body,
            })
        }
        BlockKind::Image => {
            let d: WireImageData = decode(item, kind)?;
            BlockContent::Image(ImageData {
                width: d.width,
                height: d.height,
                storage_key: d.storage_key.filter(|k| !k.is_empty()).map(StorageKey::new),
                ..ImageData::default()
            })
        }
        BlockKind::Signature => {
            let d: WireSignatureData = decode(item, kind)?;
            BlockContent::Signature(SignatureData {
                signer_name: d.signer_name,
                title: d.title,
            })
        }
        BlockKind::Table => {
            let d: WireTableData = decode(item, kind)?;
            let arity = d.headers.len();
            if let Some((n, row)) = d.rows.iter().enumerate().find(|(_, r)| r.len() > arity) {
                return Err(ItemError::MalformedData {
                    item: item.id.clone(),
                    kind,
                    message: format!("row {n} has {} cells for {arity} headers", row.len()),
                });
            }
            // Short rows are padded; nothing stored is dropped.
            let rows = d
                .rows
                .into_iter()
                .map(|mut row| {
                    row.resize(arity, String::new());
                    row
                })
                .collect();
            BlockContent::Table(TableData {
                headers: d.headers,
                rows,
            })
        }
    };
    Ok(Block::with_content(BlockId::from_wire(&item.id), content))
}

fn hydrate_section(wire: &WireSection, seen: &mut SeenIds) -> Result<Section, SectionError> {
    let mut errors = Vec::new();

    let raw_id = wire.id.as_deref().filter(|s| !s.is_empty());
    let id = raw_id.map(SectionId::from_wire).unwrap_or_default();
    if !seen.sections.insert(id) {
        errors.push(duplicate(raw_id.unwrap_or_default(), id));
    }

    let mut side_items: Vec<&WireSideItem> = wire.side_items.iter().collect();
    side_items.sort_by_key(|s| s.position);
    let mut hydrated_side = Vec::with_capacity(side_items.len());
    for s in side_items {
        let side_id = SideItemId::from_wire(&s.id);
        if seen.side_items.insert(side_id) {
            hydrated_side.push(SideItem::new(side_id, s.label.clone(), s.value.clone()));
        } else {
            errors.push(duplicate(&s.id, side_id));
        }
    }

    let mut items: Vec<&WireItem> = wire.items.iter().collect();
    items.sort_by_key(|i| i.position);

    let mut blocks = Vec::with_capacity(items.len());
    for item in items {
        match hydrate_item(item) {
            Ok(block) if seen.blocks.insert(block.id()) => blocks.push(block),
            Ok(block) => errors.push(duplicate(&item.id, block.id())),
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(SectionError {
            position: wire.position,
            errors,
        });
    }
    Ok(Section::from_parts(id, hydrated_side, blocks))
}

fn parse_date(raw: &str) -> Result<NaiveDate, HydrateError> {
    // Backends may send a full timestamp; the calendar date is the prefix.
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, DATE_FORMAT).map_err(|_| HydrateError::CreatedDate(raw.to_string()))
}

/// Build the document structure without touching the network.
///
/// Images come back with no display URL and render as placeholders.
pub fn hydrate(wire: &WireDocument) -> Result<Document, HydrateError> {
    let created_date = parse_date(&wire.created_date)?;

    let mut sections: Vec<&WireSection> = wire.sections.iter().collect();
    sections.sort_by_key(|s| s.position);

    let mut seen = SeenIds::default();
    let mut hydrated = Vec::with_capacity(sections.len());
    let mut failures = Vec::new();
    for section in sections {
        match hydrate_section(section, &mut seen) {
            Ok(s) => hydrated.push(s),
            Err(e) => failures.push(e),
        }
    }
    if !failures.is_empty() {
        return Err(HydrateError::Sections(failures));
    }

    let header = DocumentHeader {
        title: wire.title.clone(),
        version_label: wire.version_label.clone(),
        code: wire.code.clone(),
        created_date,
    };
    Ok(Document::from_parts(header, wire.external_item_id.clone(), hydrated))
}

/// Hydrate and resolve display URLs for every uploaded image.
///
/// A key that fails to resolve leaves its block as a placeholder; the key is
/// kept so the next flush does not drop the image.
pub async fn from_wire(wire: &WireDocument, assets: &AssetCoordinator) -> Result<Document, HydrateError> {
    let mut doc = hydrate(wire)?;

    let targets: Vec<(BlockId, StorageKey)> = doc
        .sections()
        .iter()
        .flat_map(|s| s.blocks())
        .filter_map(|b| b.storage_key().map(|k| (b.id(), k.clone())))
        .collect();

    let resolved = join_all(targets.iter().map(|(_, key)| assets.resolve_for_display(key))).await;

    let mut failed = 0usize;
    for ((block, key), result) in targets.iter().zip(resolved) {
        match result {
            Ok(url) => {
                // The block was just hydrated as an image.
                let _ = doc.with_image_mut(*block, |img| img.display_url = Some(url));
            }
            Err(e) => {
                failed += 1;
                warn!(block = %block, key = %key, error = %e, "image proxy failed, showing placeholder");
            }
        }
    }

    info!(
        document = %doc.external_item_id(),
        sections = doc.sections().len(),
        images = targets.len(),
        unresolved = failed,
        "report hydrated"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_doc::{BlockField, SideField, TableEdit};
    use dossier_types::ExternalItemId;
    use serde_json::json;

    fn sample() -> Document {
        let mut doc = Document::new(ExternalItemId::new("item-9"));
        doc.header.title = "Plan".into();
        doc.header.code = "PL-9".into();
        let s = doc.sections()[0].id();
        let text = doc.sections()[0].blocks()[0].id();
        let _ = doc.update_block_field(text, BlockField::Body, "Body").unwrap();
        let img = doc.add_block(s, BlockKind::Image).unwrap();
        doc.with_image_mut(img, |i| {
            i.storage_key = Some(StorageKey::new("k1"));
            i.display_url = Some("data:image/jpeg;base64,AA==".into());
        })
        .unwrap();
        let table = doc.add_block(s, BlockKind::Table).unwrap();
        doc.edit_table(table, TableEdit::AddRow).unwrap();
        let side = doc.add_side_item(s).unwrap();
        doc.update_side_item(s, side, SideField::Label, "Owner").unwrap();
        doc.add_section();
        doc
    }

    #[test]
    fn test_to_wire_is_dense_and_valid() {
        let wire = to_wire(&sample());
        assert_eq!(wire.validate(), Ok(()));
        let positions: Vec<i64> = wire.sections[0].items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert!(wire.sections.iter().all(|s| s.id.is_some()));
    }

    #[test]
    fn test_image_exports_key_only() {
        let wire = to_wire(&sample());
        let image = wire.sections[0].items.iter().find(|i| i.kind == "image").unwrap();
        assert_eq!(image.data, json!({ "width": 100, "height": 100, "storageKey": "k1" }));
    }

    #[test]
    fn test_hydrate_round_trip() {
        let doc = sample();
        let back = hydrate(&to_wire(&doc)).unwrap();
        assert_eq!(back, doc.without_display());
    }

    #[test]
    fn test_hydrate_sorts_by_wire_position() {
        let mut wire = to_wire(&sample());
        wire.sections.reverse();
        wire.sections[1].items.reverse();
        let doc = hydrate(&wire).unwrap();
        let kinds: Vec<_> = doc.sections()[0].blocks().iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Text, BlockKind::Signature, BlockKind::Image, BlockKind::Table]
        );
    }

    #[test]
    fn test_unknown_kind_names_section() {
        let mut wire = to_wire(&sample());
        wire.sections[1].items[0].kind = "chart".into();
        match hydrate(&wire) {
            Err(HydrateError::Sections(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].position, 1);
                assert!(matches!(&failures[0].errors[0], ItemError::UnknownKind { kind, .. } if kind == "chart"));
            }
            other => panic!("expected section failure, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_image_data_fails() {
        let mut wire = to_wire(&sample());
        let image = wire.sections[0].items.iter_mut().find(|i| i.kind == "image").unwrap();
        image.data = json!({ "storageKey": "k1" });
        let err = hydrate(&wire).unwrap_err();
        assert!(err.to_string().contains("malformed image data"));
    }

    #[test]
    fn test_legacy_kinds_and_foreign_ids() {
        let wire: WireDocument = serde_json::from_value(json!({
            "createdDate": "2024-11-02T10:00:00.000Z",
            "externalItemId": "77",
            "sections": [{
                "position": 3,
                "items": [
                    { "id": "12", "kind": "firma", "position": 1, "data": { "signerName": "A", "title": "B" } },
                    { "id": "11", "kind": "texto", "position": 0, "data": { "subtitle": "", "body": "x" } }
                ]
            }]
        }))
        .unwrap();
        let doc = hydrate(&wire).unwrap();
        assert_eq!(doc.header.created_date, NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
        let blocks = doc.sections()[0].blocks();
        assert_eq!(blocks[0].kind(), BlockKind::Text);
        assert_eq!(blocks[0].id(), BlockId::from_wire("11"));
        assert_eq!(doc.sections()[0].position(), 0);
    }

    #[test]
    fn test_bad_date() {
        let mut wire = to_wire(&sample());
        wire.created_date = "yesterday".into();
        assert_eq!(hydrate(&wire), Err(HydrateError::CreatedDate("yesterday".into())));
    }

    #[test]
    fn test_short_table_rows_are_padded() {
        let mut wire = to_wire(&sample());
        let table = wire.sections[0].items.iter_mut().find(|i| i.kind == "table").unwrap();
        table.data = json!({ "headers": ["A", "B"], "rows": [["only"]] });
        let doc = hydrate(&wire).unwrap();
        let block = doc.sections()[0].blocks().iter().find(|b| b.kind() == BlockKind::Table).unwrap();
        match &block.content {
            BlockContent::Table(t) => assert_eq!(t.rows[0], vec!["only", ""]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_wide_table_row_fails() {
        let mut wire = to_wire(&sample());
        let table = wire.sections[0].items.iter_mut().find(|i| i.kind == "table").unwrap();
        table.data = json!({ "headers": ["A"], "rows": [["x", "y", "z"]] });
        let err = hydrate(&wire).unwrap_err();
        assert!(err.to_string().contains("row 0 has 3 cells for 1 headers"), "{err}");
    }

    #[test]
    fn test_stored_values_over_limit_are_kept() {
        let mut wire = to_wire(&sample());
        let long_name = "n".repeat(60);
        let long_subtitle = "s".repeat(150);
        for item in &mut wire.sections[0].items {
            match item.kind.as_str() {
                "signature" => item.data = json!({ "signerName": long_name, "title": "t".repeat(45) }),
                "text" => item.data = json!({ "subtitle": long_subtitle, "body": "" }),
                _ => {}
            }
        }
        let doc = hydrate(&wire).unwrap();
        let back = to_wire(&doc);
        assert_eq!(back.sections[0].items, wire.sections[0].items);
    }

    #[test]
    fn test_duplicate_block_ids_fail() {
        let mut wire = to_wire(&sample());
        let reused = wire.sections[0].items[0].id.clone();
        wire.sections[1].items[0].id = reused;
        match hydrate(&wire) {
            Err(HydrateError::Sections(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].position, 1);
                assert!(matches!(&failures[0].errors[0], ItemError::DuplicateId { .. }));
            }
            other => panic!("expected duplicate id failure, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_id_colliding_with_uuid_fails() {
        let folded = BlockId::from_wire("11").to_wire();
        let wire: WireDocument = serde_json::from_value(json!({
            "createdDate": "2024-11-02",
            "externalItemId": "77",
            "sections": [{
                "position": 0,
                "items": [
                    { "id": "11", "kind": "text", "position": 0, "data": {} },
                    { "id": folded, "kind": "text", "position": 1, "data": {} }
                ]
            }]
        }))
        .unwrap();
        let err = hydrate(&wire).unwrap_err();
        assert!(err.to_string().contains("duplicate id"), "{err}");
    }

    #[test]
    fn test_duplicate_side_item_ids_fail() {
        let mut wire = to_wire(&sample());
        let mut copy = wire.sections[0].side_items[0].clone();
        copy.position = 5;
        wire.sections[1].side_items.push(copy);
        assert!(matches!(
            hydrate(&wire),
            Err(HydrateError::Sections(ref f)) if matches!(f[0].errors[0], ItemError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_sparse_unordered_positions_become_dense() {
        let mut wire = to_wire(&sample());
        let first = wire.sections[0].id.clone();
        wire.sections[0].position = 40;
        wire.sections[1].position = 7;
        for (item, pos) in wire.sections[0].items.iter_mut().zip([90, 15, 30, 2]) {
            item.position = pos;
        }
        wire.sections[0].side_items[0].position = 12;

        let doc = hydrate(&wire).unwrap();
        assert_eq!(doc.sections()[1].id().to_wire(), first.unwrap());
        let positions: Vec<u32> = doc.sections().iter().map(Section::position).collect();
        assert_eq!(positions, vec![0, 1]);

        let moved = &doc.sections()[1];
        let kinds: Vec<_> = moved.blocks().iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Table, BlockKind::Signature, BlockKind::Image, BlockKind::Text]
        );
        let block_positions: Vec<u32> = moved.blocks().iter().map(|b| b.position).collect();
        assert_eq!(block_positions, vec![0, 1, 2, 3]);
        assert_eq!(moved.side_items()[0].position(), 0);
    }
}
