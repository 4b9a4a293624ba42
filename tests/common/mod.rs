#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

use docxide_md::{ConvertError, ImageConverter};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const STYLES_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Smallest byte string the image sniffer accepts as PNG.
pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];
/// Placeable WMF header key followed by padding.
pub const WMF: &[u8] = &[0xD7, 0xCD, 0xC6, 0x9A, 0, 0, 0, 0, 0, 0, 0, 0];

/// Converts WMF by writing [`PNG`] to the destination, or fails on demand.
pub struct FakeConverter {
    pub fail: bool,
}

impl ImageConverter for FakeConverter {
    fn can_convert(&self, extension: &str) -> bool {
        extension == "wmf"
    }

    fn convert(&self, _payload: &[u8], _extension: &str, dest: &Path) -> Result<(), ConvertError> {
        if self.fail {
            return Err(ConvertError("renderer crashed".into()));
        }
        fs::write(dest, PNG).map_err(|e| ConvertError(e.to_string()))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

struct Rel {
    id: String,
    rel_type: &'static str,
    target: String,
    external: bool,
}

/// Builds minimal DOCX containers in memory.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<Rel>,
    parts: Vec<(String, Vec<u8>)>,
    document_xml: Option<String>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    pub fn heading(mut self, level: u8, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body.push_str(&format!(
                    "<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>",
                    escape(cell)
                ));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// Body XML appended verbatim.
    pub fn raw(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    /// An image relationship and its media part under `word/`.
    pub fn image(mut self, id: &str, target: &str, data: &[u8]) -> Self {
        self.parts.push((format!("word/{target}"), data.to_vec()));
        self.image_rel(id, target)
    }

    /// An image relationship whose part is absent from the archive.
    pub fn image_rel(mut self, id: &str, target: &str) -> Self {
        self.rels.push(Rel {
            id: id.into(),
            rel_type: IMAGE_REL,
            target: target.into(),
            external: false,
        });
        self
    }

    pub fn external_image(mut self, id: &str, url: &str) -> Self {
        self.rels.push(Rel {
            id: id.into(),
            rel_type: IMAGE_REL,
            target: url.into(),
            external: true,
        });
        self
    }

    pub fn styles_rel(mut self, id: &str) -> Self {
        self.rels.push(Rel {
            id: id.into(),
            rel_type: STYLES_REL,
            target: "styles.xml".into(),
            external: false,
        });
        self
    }

    /// Replace the generated `word/document.xml`.
    pub fn document_xml(mut self, xml: &str) -> Self {
        self.document_xml = Some(xml.into());
        self
    }

    fn rels_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.rels {
            let mode = if rel.external { r#" TargetMode="External""# } else { "" };
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{mode}/>"#,
                rel.id,
                rel.rel_type,
                escape(&rel.target)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    pub fn build(&self) -> Vec<u8> {
        let document = self.document_xml.clone().unwrap_or_else(|| {
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML_NS}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
                self.body
            )
        });

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let mut add = |name: &str, data: &[u8]| {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        };
        add(
            "[Content_Types].xml",
            br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
        );
        add("word/document.xml", document.as_bytes());
        add("word/_rels/document.xml.rels", self.rels_xml().as_bytes());
        for (name, data) in &self.parts {
            add(name, data);
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        fs::write(path, self.build()).unwrap();
        path.to_path_buf()
    }
}

/// Sorted file names in `dir`, hidden files excluded.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

fn load_skiplist() -> HashSet<String> {
    let path = Path::new("tests/fixtures/SKIPLIST");
    let Ok(content) = fs::read_to_string(path) else {
        return HashSet::new();
    };
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

pub fn group_name(fixture: &Path) -> String {
    fixture
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// group/case, for failure messages.
pub fn display_name(fixture: &Path) -> String {
    let case = fixture.file_name().unwrap().to_string_lossy();
    format!("{}/{}", group_name(fixture), case)
}

/// Fixture case directories holding an `input.docx`, sorted by group then
/// name. Filter with DOCXIDE_CASE (case name) and DOCXIDE_GROUP (folder name).
pub fn discover_fixtures() -> io::Result<Vec<PathBuf>> {
    let fixtures_dir = Path::new("tests/fixtures");
    if !fixtures_dir.is_dir() {
        return Ok(Vec::new());
    }
    let case_filter = std::env::var("DOCXIDE_CASE").ok();
    let group_filter = std::env::var("DOCXIDE_GROUP").ok();
    let skiplist = load_skiplist();
    let mut fixtures: Vec<PathBuf> = Vec::new();
    for group_entry in fs::read_dir(fixtures_dir)? {
        let group = group_entry?.path();
        if !group.is_dir() {
            continue;
        }
        let gname = group.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if group_filter.as_deref().is_some_and(|gf| gname != gf) {
            continue;
        }
        for entry in fs::read_dir(&group)? {
            let path = entry?.path();
            if !path.join("input.docx").is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if let Some(ref filter) = case_filter {
                if name == filter.as_str() {
                    fixtures.push(path);
                }
            } else if !skiplist.contains(name) && !skiplist.contains(gname) {
                fixtures.push(path);
            }
        }
    }
    fixtures.sort_by(|a, b| {
        group_name(a)
            .cmp(&group_name(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(fixtures)
}
