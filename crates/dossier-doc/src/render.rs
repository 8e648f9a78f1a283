//! Render tree handed to the page renderer.
//!
//! One [`RenderPage`] per section. The body is the section's groups in order
//! with signature runs lifted out: every signature lands in the page footer so
//! it prints at the bottom regardless of where it sits in the section.
//!
//! ```text
//! RenderPage
//! ├── header        (title, version, code, date)
//! ├── side_items    [label: value]
//! ├── body          Text | Table | Images[..]
//! └── signatures    [signer, title] ... (footer row)
//! ```

use dossier_types::{Block, BlockContent, BlockKind, SectionId, SignatureData, TableData, TextData};

use crate::document::{Document, DocumentHeader};
use crate::grouping::Group;
use crate::section::SideItem;

/// An image as the renderer sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderImage<'a> {
    /// Embeddable URL (a `data:` URL or a same-origin proxy link).
    Embedded { url: &'a str, width: u32, height: u32 },
    /// No display URL: draw an empty frame of the same size.
    Placeholder { width: u32, height: u32 },
}

impl<'a> RenderImage<'a> {
    fn from_block(block: &'a Block) -> Option<Self> {
        let img = block.as_image()?;
        Some(match img.display_url.as_deref() {
            Some(url) => RenderImage::Embedded {
                url,
                width: img.width,
                height: img.height,
            },
            None => RenderImage::Placeholder {
                width: img.width,
                height: img.height,
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderElement<'a> {
    Text(&'a TextData),
    Table(&'a TableData),
    /// A row of images laid out side by side.
    Images(Vec<RenderImage<'a>>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderPage<'a> {
    pub section: SectionId,
    pub header: &'a DocumentHeader,
    pub side_items: &'a [SideItem],
    pub body: Vec<RenderElement<'a>>,
    pub signatures: Vec<&'a SignatureData>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTree<'a> {
    pub header: &'a DocumentHeader,
    pub pages: Vec<RenderPage<'a>>,
}

impl<'a> RenderTree<'a> {
    /// Project `doc` into pages. Pure; borrows the document.
    pub fn assemble(doc: &'a Document) -> Self {
        let header = &doc.header;
        let pages = doc
            .sections()
            .iter()
            .map(|section| {
                let mut body = Vec::new();
                for group in section.groups() {
                    match group {
                        Group::Single(block) => match &block.content {
                            BlockContent::Text(t) => body.push(RenderElement::Text(t)),
                            BlockContent::Table(t) => body.push(RenderElement::Table(t)),
                            // Batched kinds always arrive as runs.
                            BlockContent::Image(_) | BlockContent::Signature(_) => {}
                        },
                        Group::Run { kind: BlockKind::Image, blocks } => {
                            let images = blocks.into_iter().filter_map(RenderImage::from_block).collect();
                            body.push(RenderElement::Images(images));
                        }
                        Group::Run { .. } => {}
                    }
                }

                let signatures = section
                    .blocks()
                    .iter()
                    .filter_map(|b| match &b.content {
                        BlockContent::Signature(s) => Some(s),
                        _ => None,
                    })
                    .collect();

                RenderPage {
                    section: section.id(),
                    header,
                    side_items: section.side_items(),
                    body,
                    signatures,
                }
            })
            .collect();
        Self { header, pages }
    }
}

/// A page-layout engine. The tree is all it gets to see.
pub trait Renderer {
    type Output;
    type Error;

    fn render(&self, tree: &RenderTree<'_>) -> Result<Self::Output, Self::Error>;
}
