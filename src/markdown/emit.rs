use crate::caption::classify_paragraph;
use crate::error::Warning;
use crate::model::{DocumentNode, FigureReference, Paragraph, TableBlock};
use crate::reconcile::FigureMapping;

use super::table::TableFormatter;

/// Renders walked nodes to Markdown, one block per node, in input order.
///
/// A caption with a mapped image is preceded by the image tag; the caption
/// itself is rendered in italics. Nothing is buffered beyond the node being
/// rendered.
pub struct Emitter<'a> {
    mapping: &'a FigureMapping,
    asset_dir: &'a str,
    tables: &'a dyn TableFormatter,
}

/// Counters for the run summary.
#[derive(Debug, Default, PartialEq)]
pub struct EmitStats {
    pub paragraphs: usize,
    pub captions: usize,
    pub images_placed: usize,
    pub tables: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(mapping: &'a FigureMapping, asset_dir: &'a str, tables: &'a dyn TableFormatter) -> Self {
        Self {
            mapping,
            asset_dir: asset_dir.trim_end_matches('/'),
            tables,
        }
    }

    /// Link target for an asset, relative to the Markdown file.
    pub fn asset_link(&self, file_name: &str) -> String {
        let file_name = file_name.replace(' ', "%20");
        if self.asset_dir.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.asset_dir.replace(' ', "%20"), file_name)
        }
    }

    pub fn emit<I>(
        &self,
        nodes: I,
        title: Option<&str>,
        warnings: &mut Vec<Warning>,
    ) -> (String, EmitStats)
    where
        I: IntoIterator<Item = DocumentNode>,
    {
        let mut out = String::new();
        let mut stats = EmitStats::default();

        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            push_block(&mut out, &format!("# {}", escape_html(title)));
        }

        for node in nodes {
            match node {
                DocumentNode::Paragraph(para) => {
                    stats.paragraphs += 1;
                    if let Some(figure) = classify_paragraph(&para) {
                        stats.captions += 1;
                        if self.emit_caption(&mut out, &figure, warnings) {
                            stats.images_placed += 1;
                        }
                    } else {
                        push_block(&mut out, &paragraph_markdown(&para));
                    }
                }
                DocumentNode::Table(table) => {
                    stats.tables += 1;
                    let rendered = self.tables.format(&escape_table(table));
                    if !rendered.trim().is_empty() {
                        push_block(&mut out, &rendered);
                    }
                }
                DocumentNode::End => break,
            }
        }
        (out, stats)
    }

    /// Returns whether an image was placed.
    fn emit_caption(
        &self,
        out: &mut String,
        figure: &FigureReference,
        warnings: &mut Vec<Warning>,
    ) -> bool {
        let placed = match self.mapping.resolve(figure.number) {
            Some(file_name) => {
                log::debug!("Figure {} at #{} -> {file_name}", figure.number, figure.ordinal);
                push_block(
                    out,
                    &format!("![Figure {}]({})", figure.number, self.asset_link(file_name)),
                );
                true
            }
            None => {
                Warning::UnresolvedFigure {
                    number: figure.number,
                    caption: figure.caption.clone(),
                }
                .record(warnings);
                false
            }
        };
        push_block(out, &format!("*{}*", escape_caption(&figure.caption)));
        placed
    }
}

/// Document text is not markup: `<Enter>` must survive tag stripping in the
/// normalizer.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Backslash first, so a trailing `\` cannot escape the closing `*`.
fn escape_caption(caption: &str) -> String {
    escape_html(&caption.replace('\\', "\\\\").replace('*', "\\*"))
}

fn escape_table(mut table: TableBlock) -> TableBlock {
    for cell in table.rows.iter_mut().flatten() {
        *cell = escape_html(cell);
    }
    table
}

fn paragraph_markdown(para: &Paragraph) -> String {
    let text = escape_html(para.text.trim());
    match para.heading {
        Some(level) => format!("{} {text}", "#".repeat(level as usize)),
        None => text.to_string(),
    }
}

/// Append a block followed by a blank line.
fn push_block(out: &mut String, block: &str) {
    out.push_str(block);
    out.push_str("\n\n");
}
