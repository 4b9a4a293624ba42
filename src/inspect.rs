//! Structure report for a DOCX, without writing anything to disk.

use std::fmt;
use std::path::Path;

use crate::caption::collect_captions;
use crate::docx::body::BodyWalker;
use crate::docx::{self, Package, Relationship};
use crate::error::Error;
use crate::model::{DocumentNode, FigureReference, ImageAsset};
use crate::reconcile::{FigureMapping, ReconcileStrategy};

#[derive(Debug)]
pub struct Inspection {
    pub nodes: Vec<DocumentNode>,
    pub captions: Vec<FigureReference>,
    pub image_relationships: Vec<Relationship>,
    /// Positional pairing of distinct figure numbers with image parts, in
    /// relationship order.
    pub preview: FigureMapping,
}

pub fn inspect(path: &Path) -> Result<Inspection, Error> {
    let package = Package::open(path)?;
    let xml = roxmltree::Document::parse(package.document_xml())?;
    let body = docx::body_of(&xml)?;
    let nodes: Vec<DocumentNode> = BodyWalker::new(body).collect();
    let captions = collect_captions(&nodes);

    let image_relationships: Vec<Relationship> = package
        .image_relationships()
        .filter(|r| !r.external)
        .cloned()
        .collect();
    let parts: Vec<ImageAsset> = image_relationships
        .iter()
        .zip(1..)
        .map(|(rel, sequence)| ImageAsset {
            sequence,
            relationship_id: rel.id.clone(),
            part_name: rel.part_name(),
            data: Vec::new(),
            extension: String::new(),
            file_name: rel.part_name(),
        })
        .collect();
    let preview = FigureMapping::build(&captions, &parts, &ReconcileStrategy::Positional);

    Ok(Inspection {
        nodes,
        captions,
        image_relationships,
        preview,
    })
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paragraphs = self
            .nodes
            .iter()
            .filter(|n| matches!(n, DocumentNode::Paragraph(_)))
            .count();
        let tables = self
            .nodes
            .iter()
            .filter(|n| matches!(n, DocumentNode::Table(_)))
            .count();
        writeln!(f, "Body: {paragraphs} paragraphs, {tables} tables")?;

        writeln!(f, "\nImage relationships ({}):", self.image_relationships.len())?;
        for (i, rel) in self.image_relationships.iter().enumerate() {
            writeln!(f, "  {:>3}. {} -> {}", i + 1, rel.id, rel.part_name())?;
        }

        writeln!(f, "\nCaptions ({}):", self.captions.len())?;
        for caption in &self.captions {
            let text: String = caption.caption.chars().take(60).collect();
            writeln!(f, "  #{:<5} Figure {:<3} {text}", caption.ordinal, caption.number)?;
        }

        writeln!(f, "\nPositional mapping:")?;
        if self.preview.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for (number, part) in self.preview.iter() {
            writeln!(f, "  Figure {number:<3} -> {part}")?;
        }
        Ok(())
    }
}
