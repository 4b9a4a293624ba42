//! Figure caption detection.
//!
//! Captions are recognised by a short table of ordered rules; the first rule
//! that matches decides the [`CaptionKind`].

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{CaptionKind, DocumentNode, FigureReference, Paragraph};

static BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Figure\s*(\d+)\s*[.:]?$").unwrap());

static DESCRIBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^Figure\s*(\d+)(?:\s*[.:\-\u{2013}\u{2014}]\s*|\s+)\S").unwrap()
});

static RULES: [(CaptionKind, &LazyLock<Regex>); 2] =
    [(CaptionKind::Bare, &BARE), (CaptionKind::Described, &DESCRIBED)];

#[derive(Clone, Debug, PartialEq)]
pub struct CaptionMatch {
    pub number: u32,
    pub kind: CaptionKind,
    /// The whole caption, trimmed.
    pub text: String,
}

/// Classify paragraph text as a figure caption.
///
/// Matches text starting with the literal `Figure` followed by a positive
/// number, optionally followed by a separator and a description.
pub fn classify(text: &str) -> Option<CaptionMatch> {
    let text = text.trim();
    RULES.iter().find_map(|(kind, rule)| {
        let caps = rule.captures(text)?;
        let number = caps[1].parse::<u32>().ok().filter(|n| *n > 0)?;
        Some(CaptionMatch {
            number,
            kind: *kind,
            text: text.to_string(),
        })
    })
}

/// Headings are never captions.
pub fn classify_paragraph(para: &Paragraph) -> Option<FigureReference> {
    if para.heading.is_some() {
        return None;
    }
    classify(&para.text).map(|m| FigureReference {
        number: m.number,
        caption: m.text,
        kind: m.kind,
        ordinal: para.ordinal,
    })
}

/// All captions in document order.
pub fn collect_captions<'a>(nodes: impl IntoIterator<Item = &'a DocumentNode>) -> Vec<FigureReference> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            DocumentNode::Paragraph(p) => classify_paragraph(p),
            _ => None,
        })
        .collect()
}
