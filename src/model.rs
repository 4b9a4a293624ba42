#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    pub text: String,
    /// Index of the body child this paragraph came from, in document order.
    pub ordinal: usize,
    /// 1 for `Title`/`Heading1`, up to 6. `None` for body text.
    pub heading: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    /// Plain text of each cell, row by row.
    pub rows: Vec<Vec<String>>,
    pub ordinal: usize,
}

impl TableBlock {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DocumentNode {
    Paragraph(Paragraph),
    Table(TableBlock),
    End,
}

#[derive(Clone, Debug)]
pub struct ImageAsset {
    /// 1-based, assigned in extraction order.
    pub sequence: u32,
    pub relationship_id: String,
    /// Zip part the payload was read from, e.g. `word/media/image3.png`.
    pub part_name: String,
    pub data: Vec<u8>,
    pub extension: String,
    /// File name inside the asset directory.
    pub file_name: String,
}

/// A legacy image that was rewritten to a browser-friendly format.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionRecord {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaptionKind {
    /// Just "Figure N".
    Bare,
    /// "Figure N" followed by descriptive text.
    Described,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FigureReference {
    pub number: u32,
    pub caption: String,
    pub kind: CaptionKind,
    pub ordinal: usize,
}
