//! Plain-text outline renderer.

use std::fmt::Write;

use dossier_doc::{RenderElement, RenderImage, RenderTree, Renderer};

/// Renders a render tree as an indented outline, one block per page.
#[derive(Debug, Default)]
pub struct OutlineRenderer;

fn one_line(s: &str) -> String {
    let line = s.lines().next().unwrap_or("");
    if s.lines().nth(1).is_some() {
        format!("{line} …")
    } else {
        line.to_string()
    }
}

impl Renderer for OutlineRenderer {
    type Output = String;
    type Error = std::fmt::Error;

    fn render(&self, tree: &RenderTree<'_>) -> Result<String, Self::Error> {
        let mut out = String::new();
        let h = tree.header;
        writeln!(
            out,
            "# {}  [{} | {} | {}]",
            h.title,
            h.version_label,
            h.code,
            h.created_date.format("%Y-%m-%d")
        )?;

        for (n, page) in tree.pages.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "== page {} ==", n + 1)?;
            for item in page.side_items {
                writeln!(out, "  | {}: {}", item.label, item.value)?;
            }
            for element in &page.body {
                match element {
                    RenderElement::Text(t) => {
                        if !t.subtitle.is_empty() {
                            writeln!(out, "  ## {}", t.subtitle)?;
                        }
                        writeln!(out, "  {}", one_line(&t.body))?;
                    }
                    RenderElement::Table(t) => {
                        writeln!(out, "  [table] {} ({} rows)", t.headers.join(" | "), t.rows.len())?;
                    }
                    RenderElement::Images(images) => {
                        let cells: Vec<String> = images
                            .iter()
                            .map(|img| match img {
                                RenderImage::Embedded { width, height, .. } => format!("{width}x{height}"),
                                RenderImage::Placeholder { width, height } => {
                                    format!("{width}x{height} (missing)")
                                }
                            })
                            .collect();
                        writeln!(out, "  [images] {}", cells.join(", "))?;
                    }
                }
            }
            if !page.signatures.is_empty() {
                writeln!(out, "  --")?;
                let names: Vec<String> = page
                    .signatures
                    .iter()
                    .map(|s| format!("{} ({})", s.signer_name, s.title))
                    .collect();
                writeln!(out, "  signed: {}", names.join("; "))?;
            }
        }
        Ok(out)
    }
}
