use crate::model::{DocumentNode, Paragraph, TableBlock};

use super::{is_wml, wml, wml_attr};

/// Lazily walks the children of `w:body` in document order.
///
/// `w:sdt` wrappers are entered in place, so content controls never change
/// the relative order of the blocks they contain. The last item is always
/// [`DocumentNode::End`].
pub struct BodyWalker<'a> {
    stack: Vec<roxmltree::Children<'a, 'a>>,
    ordinal: usize,
    finished: bool,
}

impl<'a> BodyWalker<'a> {
    pub fn new(body: roxmltree::Node<'a, 'a>) -> Self {
        Self {
            stack: vec![body.children()],
            ordinal: 0,
            finished: false,
        }
    }

    fn next_block(&mut self) -> Option<roxmltree::Node<'a, 'a>> {
        while let Some(cursor) = self.stack.last_mut() {
            match cursor.next() {
                Some(child) if is_wml(child, "sdt") => {
                    if let Some(content) = wml(child, "sdtContent") {
                        self.stack.push(content.children());
                    }
                }
                Some(child) if child.is_element() => return Some(child),
                Some(_) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

impl Iterator for BodyWalker<'_> {
    type Item = DocumentNode;

    fn next(&mut self) -> Option<DocumentNode> {
        if self.finished {
            return None;
        }
        while let Some(node) = self.next_block() {
            let ordinal = self.ordinal;
            self.ordinal += 1;

            if is_wml(node, "p") {
                let text = paragraph_text(node);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                return Some(DocumentNode::Paragraph(Paragraph {
                    text: text.to_string(),
                    ordinal,
                    heading: heading_level(node),
                }));
            }
            if is_wml(node, "tbl") {
                let table = table_block(node, ordinal);
                log::debug!(
                    "Table at #{ordinal}: {} rows x {} cols",
                    table.rows.len(),
                    table.column_count()
                );
                return Some(DocumentNode::Table(table));
            }
        }
        self.finished = true;
        Some(DocumentNode::End)
    }
}

/// Elements whose content never contributes visible paragraph text.
const SKIPPED: &[&str] = &[
    "pPr",
    "rPr",
    "del",
    "delText",
    "instrText",
    "drawing",
    "pict",
    "object",
    "footnoteReference",
    "endnoteReference",
];

/// Plain text of a paragraph: `w:t` runs, including those nested in
/// hyperlinks, simple fields, smart tags and tracked insertions.
pub(crate) fn paragraph_text(para: roxmltree::Node) -> String {
    let mut out = String::new();
    collect_text(para, &mut out);
    out
}

fn collect_text(node: roxmltree::Node, out: &mut String) {
    for child in node.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        // mc:AlternateContent duplicates its content in Choice and Fallback
        if name == "AlternateContent" {
            continue;
        }
        if child.tag_name().namespace() != Some(super::WML_NS) {
            collect_text(child, out);
            continue;
        }
        if SKIPPED.contains(&name) {
            continue;
        }
        match name {
            "t" => out.push_str(child.text().unwrap_or("")),
            "tab" | "ptab" => out.push('\t'),
            "br" | "cr" => out.push(' '),
            "noBreakHyphen" => out.push('-'),
            _ => collect_text(child, out),
        }
    }
}

fn heading_level(para: roxmltree::Node) -> Option<u8> {
    let style = wml(para, "pPr").and_then(|ppr| wml_attr(ppr, "pStyle"))?;
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lower = style.to_ascii_lowercase();
    let digits = lower.strip_prefix("heading")?.trim_start();
    match digits.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Flatten SDT wrappers: descend into w:sdtContent and collect effective children.
fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if is_wml(child, "sdt") {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

fn table_block(tbl: roxmltree::Node, ordinal: usize) -> TableBlock {
    let rows = collect_block_nodes(tbl)
        .into_iter()
        .filter(|n| is_wml(*n, "tr"))
        .map(|tr| {
            collect_block_nodes(tr)
                .into_iter()
                .filter(|n| is_wml(*n, "tc"))
                .map(cell_text)
                .collect()
        })
        .collect();
    TableBlock { rows, ordinal }
}

fn cell_text(tc: roxmltree::Node) -> String {
    tc.descendants()
        .filter(|n| is_wml(*n, "p"))
        .map(paragraph_text)
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_OPEN: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;
    const DOC_CLOSE: &str = "</w:body></w:document>";

    fn walk(body: &str) -> Vec<DocumentNode> {
        let xml = format!("{DOC_OPEN}{body}{DOC_CLOSE}");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let body = wml(doc.root_element(), "body").unwrap();
        BodyWalker::new(body).collect()
    }

    #[test]
    fn tables_stay_between_their_paragraphs() {
        let nodes = walk(concat!(
            "<w:p><w:r><w:t>Before</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "<w:p><w:r><w:t>After</w:t></w:r></w:p>",
        ));
        assert_eq!(nodes.len(), 4);
        assert!(matches!(&nodes[0], DocumentNode::Paragraph(p) if p.text == "Before"));
        assert!(matches!(&nodes[1], DocumentNode::Table(t) if t.rows == vec![vec!["Cell".to_string()]]));
        assert!(matches!(&nodes[2], DocumentNode::Paragraph(p) if p.text == "After"));
        assert_eq!(nodes[3], DocumentNode::End);
    }

    #[test]
    fn empty_paragraphs_are_skipped_but_keep_their_ordinal() {
        let nodes = walk(concat!(
            "<w:p><w:r><w:t>One</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>   </w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Three</w:t></w:r></w:p>",
        ));
        let ordinals: Vec<usize> = nodes
            .iter()
            .filter_map(|n| match n {
                DocumentNode::Paragraph(p) => Some(p.ordinal),
                _ => None,
            })
            .collect();
        assert_eq!(ordinals, [0, 2]);
    }

    #[test]
    fn field_results_count_but_instructions_do_not() {
        let nodes = walk(concat!(
            "<w:p><w:r><w:t xml:space=\"preserve\">Figure </w:t></w:r>",
            "<w:r><w:fldChar w:fldCharType=\"begin\"/></w:r>",
            "<w:r><w:instrText> SEQ Figure \\* ARABIC </w:instrText></w:r>",
            "<w:r><w:fldChar w:fldCharType=\"separate\"/></w:r>",
            "<w:r><w:t>3</w:t></w:r>",
            "<w:r><w:fldChar w:fldCharType=\"end\"/></w:r>",
            "<w:r><w:t xml:space=\"preserve\"> Sample mesh</w:t></w:r></w:p>",
        ));
        assert!(matches!(&nodes[0], DocumentNode::Paragraph(p) if p.text == "Figure 3 Sample mesh"));
    }

    #[test]
    fn sdt_content_is_walked_in_place() {
        let nodes = walk(concat!(
            "<w:p><w:r><w:t>A</w:t></w:r></w:p>",
            "<w:sdt><w:sdtContent><w:p><w:r><w:t>B</w:t></w:r></w:p></w:sdtContent></w:sdt>",
            "<w:p><w:r><w:t>C</w:t></w:r></w:p>",
        ));
        let texts: Vec<&str> = nodes
            .iter()
            .filter_map(|n| match n {
                DocumentNode::Paragraph(p) => Some(p.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["A", "B", "C"]);
    }

    #[test]
    fn heading_styles_are_detected() {
        let nodes = walk(concat!(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading2\"/></w:pPr><w:r><w:t>Setup</w:t></w:r></w:p>",
            "<w:p><w:pPr><w:pStyle w:val=\"Caption\"/></w:pPr><w:r><w:t>Figure 1</w:t></w:r></w:p>",
        ));
        assert!(matches!(&nodes[0], DocumentNode::Paragraph(p) if p.heading == Some(2)));
        assert!(matches!(&nodes[1], DocumentNode::Paragraph(p) if p.heading.is_none()));
    }

    #[test]
    fn walker_ends_exactly_once() {
        let xml = format!("{DOC_OPEN}{DOC_CLOSE}");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let body = wml(doc.root_element(), "body").unwrap();
        let mut walker = BodyWalker::new(body);
        assert_eq!(walker.next(), Some(DocumentNode::End));
        assert_eq!(walker.next(), None);
    }
}
