pub(crate) mod body;
pub(crate) mod media;

use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::Error;

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

pub(crate) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(crate) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(crate) fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

/// One `<Relationship>` entry of the main document part.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with("/image")
    }

    /// Zip part name of the target, resolved against `word/`.
    pub fn part_name(&self) -> String {
        resolve_target("word", &self.target)
    }
}

/// Resolve a relationship target relative to the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Relationships in the order they appear in the rels XML.
fn parse_rels_xml(xml_content: &str) -> Vec<Relationship> {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("{DOCUMENT_RELS_PART} is not well-formed XML; no relationships loaded");
        return Vec::new();
    };
    xml.root_element()
        .children()
        .filter(|n| {
            n.tag_name().name() == "Relationship"
                && n.tag_name().namespace().is_none_or(|ns| ns == PKG_REL_NS)
        })
        .filter_map(|node| {
            Some(Relationship {
                id: node.attribute("Id")?.to_string(),
                rel_type: node.attribute("Type").unwrap_or_default().to_string(),
                target: node.attribute("Target")?.to_string(),
                external: node.attribute("TargetMode") == Some("External"),
            })
        })
        .collect()
}

/// An opened DOCX container: the zip archive, the main document XML and its
/// relationships.
pub struct Package {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
    document_xml: String,
    relationships: Vec<Relationship>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

        let mut document_xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|_| {
                Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into())
            })?
            .read_to_string(&mut document_xml)?;

        let relationships = read_zip_text(&mut archive, DOCUMENT_RELS_PART)
            .map(|xml| parse_rels_xml(&xml))
            .unwrap_or_default();

        log::debug!(
            "Opened package: {} zip entries, {} relationships",
            archive.len(),
            relationships.len()
        );

        Ok(Self {
            archive,
            document_xml,
            relationships,
        })
    }

    pub fn document_xml(&self) -> &str {
        &self.document_xml
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn image_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(|r| r.is_image())
    }

    /// Read a binary part. A missing part and an unreadable stream (bad CRC,
    /// truncated data) are both reported as I/O errors.
    pub(crate) fn read_part(&mut self, name: &str) -> std::io::Result<Vec<u8>> {
        read_zip_bytes(&mut self.archive, name)
    }
}

pub(crate) fn read_zip_text<R: Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_zip_bytes<R: Read + std::io::Seek>(
    zip: &mut zip::ZipArchive<R>,
    name: &str,
) -> std::io::Result<Vec<u8>> {
    let mut entry = zip.by_name(name).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::NotFound, format!("{name}: {e}"))
    })?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    Ok(data)
}

/// Parse the main document XML and return its `w:body` element.
pub(crate) fn body_of<'a>(xml: &'a roxmltree::Document<'a>) -> Result<roxmltree::Node<'a, 'a>, Error> {
    wml(xml.root_element(), "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_targets() {
        assert_eq!(resolve_target("word", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word", "../media/image1.png"), "media/image1.png");
        assert_eq!(resolve_target("word", "/word/media/x.emf"), "word/media/x.emf");
        assert_eq!(resolve_target("word", "./media/a.png"), "word/media/a.png");
    }

    #[test]
    fn rels_keep_xml_order() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image2.png"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="https://example.org/x.png" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_rels_xml(xml);
        let ids: Vec<&str> = rels.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["rId9", "rId1", "rId3"]);
        assert!(rels[0].is_image());
        assert!(!rels[1].is_image());
        assert!(rels[2].external);
    }
}
