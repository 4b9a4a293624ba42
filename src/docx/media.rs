use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::AssetNaming;
use crate::convert::ImageConverter;
use crate::error::{Error, Warning};
use crate::model::{ConversionRecord, ImageAsset};

use super::Package;

/// Hands out extraction sequence numbers, starting at 1.
#[derive(Debug)]
pub struct SequenceCounter {
    next: u32,
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequenceCounter {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    fn take(&mut self) -> u32 {
        let n = self.next;
        self.next += 1;
        n
    }
}

pub struct Extraction {
    /// In extraction order.
    pub assets: Vec<ImageAsset>,
    pub conversions: Vec<ConversionRecord>,
}

impl Extraction {
    /// Whether `file_name` exists in the asset directory after this run.
    pub fn has_file(&self, file_name: &str) -> bool {
        self.assets.iter().any(|a| a.file_name == file_name)
            || self.conversions.iter().any(|c| c.to == file_name)
    }
}

/// Files a previous run may have written: `image12.png`, `image_03.wmf`,
/// `image4_2.png`.
static MANAGED_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^image_?\d+(?:_\d+)?\.(?:png|jpe?g|gif|bmp|tiff?|wmf|emf|svg|webp)$").unwrap()
});

/// Lists every file the last run wrote, so names outside [`MANAGED_FILE`]
/// (original part names, suffixed duplicates) are cleared on rerun too.
const MANIFEST: &str = ".docxide-md-assets";

/// Remove files written by a previous run. Returns how many were removed
/// and the names of everything left in the directory.
fn clear_managed_files(asset_dir: &Path) -> Result<(usize, HashSet<String>), Error> {
    let listed: HashSet<String> = std::fs::read_to_string(asset_dir.join(MANIFEST))
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default();

    let mut removed = 0;
    let mut remaining = HashSet::new();
    for entry in std::fs::read_dir(asset_dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let managed = name != MANIFEST && (MANAGED_FILE.is_match(&name) || listed.contains(&name));
        if managed && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        } else {
            remaining.insert(name);
        }
    }
    remaining.remove(MANIFEST);
    Ok((removed, remaining))
}

fn write_manifest(asset_dir: &Path, assets: &[ImageAsset], conversions: &[ConversionRecord]) -> Result<(), Error> {
    let mut text = String::new();
    for name in assets.iter().map(|a| &a.file_name).chain(conversions.iter().map(|c| &c.to)) {
        text.push_str(name);
        text.push('\n');
    }
    std::fs::write(asset_dir.join(MANIFEST), text)?;
    Ok(())
}

fn is_wmf(data: &[u8]) -> bool {
    // Placeable header key, or a standard header: type 1|2, header size 9 words
    data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A])
        || (data.len() >= 4 && matches!(data[0..2], [1, 0] | [2, 0]) && data[2..4] == [9, 0])
}

fn is_emf(data: &[u8]) -> bool {
    data.len() >= 44 && data[0..4] == [1, 0, 0, 0] && &data[40..44] == b" EMF"
}

fn check_payload(data: &[u8], extension: &str) -> Result<(), String> {
    if data.is_empty() {
        return Err("empty payload".into());
    }
    match extension {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => image::guess_format(data)
            .map(|_| ())
            .map_err(|_| format!("payload is not a valid .{extension} image")),
        "wmf" if !is_wmf(data) => Err("payload has no WMF signature".into()),
        "emf" if !is_emf(data) => Err("payload has no EMF signature".into()),
        _ => Ok(()),
    }
}

fn infer_extension(part_name: &str, data: &[u8]) -> String {
    if let Some(ext) = Path::new(part_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        return ext.to_ascii_lowercase();
    }
    image::guess_format(data)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("png")
        .to_string()
}

/// Append `_2`, `_3`, … to the stem until the name is unused.
fn unique_name(stem: &str, extension: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = format!("{stem}.{extension}");
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{stem}_{n}.{extension}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn destination_name(
    naming: AssetNaming,
    sequence: u32,
    part_name: &str,
    extension: &str,
    used: &mut HashSet<String>,
) -> String {
    let stem = match naming {
        AssetNaming::Sequence => format!("image_{sequence:02}"),
        AssetNaming::Original => Path::new(part_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("image_{sequence:02}")),
    };
    unique_name(&stem, extension, used)
}

/// Extract every embedded image of the main document part into `asset_dir`.
///
/// Images are taken in relationship order; that order is not the order in
/// which figures are referenced in the text. A resource that cannot be read
/// is skipped with a warning. Only directory and file write failures are
/// fatal.
pub fn extract_images(
    package: &mut Package,
    asset_dir: &Path,
    naming: AssetNaming,
    converter: Option<&dyn ImageConverter>,
    counter: &mut SequenceCounter,
    warnings: &mut Vec<Warning>,
) -> Result<Extraction, Error> {
    std::fs::create_dir_all(asset_dir)?;
    let (removed, existing) = clear_managed_files(asset_dir)?;
    if removed > 0 {
        log::info!("Removed {removed} image files from a previous run in {}", asset_dir.display());
    }

    let relationships: Vec<_> = package.image_relationships().cloned().collect();
    // Files we did not write are never overwritten; colliding names get a suffix
    let mut used = existing;
    let mut assets = Vec::new();
    let mut conversions = Vec::new();

    for rel in relationships {
        if rel.external {
            log::info!("Image {} links to external {}; nothing to extract", rel.id, rel.target);
            continue;
        }
        let part_name = rel.part_name();
        let data = match package.read_part(&part_name) {
            Ok(data) => data,
            Err(e) => {
                Warning::AssetSkipped {
                    relationship_id: rel.id.clone(),
                    target: part_name,
                    reason: e.to_string(),
                }
                .record(warnings);
                continue;
            }
        };
        let extension = infer_extension(&part_name, &data);
        if let Err(reason) = check_payload(&data, &extension) {
            Warning::AssetSkipped {
                relationship_id: rel.id.clone(),
                target: part_name,
                reason,
            }
            .record(warnings);
            continue;
        }

        let sequence = counter.take();
        let file_name = destination_name(naming, sequence, &part_name, &extension, &mut used);
        std::fs::write(asset_dir.join(&file_name), &data)?;
        log::info!(
            "Extracted image {sequence}: {part_name} -> {file_name} ({} bytes)",
            data.len()
        );

        if let Some(converter) = converter.filter(|c| c.can_convert(&extension)) {
            let stem = Path::new(&file_name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&file_name)
                .to_string();
            let png_name = unique_name(&stem, "png", &mut used);
            match converter.convert(&data, &extension, &asset_dir.join(&png_name)) {
                Ok(()) => {
                    log::info!("Converted {file_name} -> {png_name}");
                    conversions.push(ConversionRecord {
                        from: file_name.clone(),
                        to: png_name,
                    });
                }
                Err(e) => {
                    used.remove(&png_name);
                    Warning::ConversionFailed {
                        file_name: file_name.clone(),
                        reason: e.to_string(),
                    }
                    .record(warnings);
                }
            }
        }

        assets.push(ImageAsset {
            sequence,
            relationship_id: rel.id,
            part_name,
            data,
            extension,
            file_name,
        });
    }

    write_manifest(asset_dir, &assets, &conversions)?;

    if assets.is_empty() {
        log::info!("No images found in the document");
    } else {
        log::info!("Extracted {} images", assets.len());
    }

    Ok(Extraction {
        assets,
        conversions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_pattern_matches_only_generated_names() {
        for name in ["image1.png", "image_03.wmf", "IMAGE12.JPEG", "image4_2.png"] {
            assert!(MANAGED_FILE.is_match(name), "{name}");
        }
        for name in ["logo.png", "image.png", "image1.md", "my_image1.png"] {
            assert!(!MANAGED_FILE.is_match(name), "{name}");
        }
    }

    #[test]
    fn extension_falls_back_to_sniffing_then_png() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(infer_extension("word/media/image1.JPG", &png), "jpg");
        assert_eq!(infer_extension("word/media/blob", &png), "png");
        assert_eq!(infer_extension("word/media/blob", b"GIF89a...."), "gif");
        assert_eq!(infer_extension("word/media/blob", b"????"), "png");
    }

    #[test]
    fn payload_checks() {
        assert!(check_payload(b"", "png").is_err());
        assert!(check_payload(b"not an image", "png").is_err());
        assert!(check_payload(&[0xD7, 0xCD, 0xC6, 0x9A, 0, 0], "wmf").is_ok());
        assert!(check_payload(b"junk", "emf").is_err());
        assert!(check_payload(b"<svg/>", "svg").is_ok());
    }

    #[test]
    fn original_names_are_deduplicated() {
        let mut used = HashSet::new();
        let a = destination_name(AssetNaming::Original, 1, "word/media/image1.png", "png", &mut used);
        let b = destination_name(AssetNaming::Original, 2, "media/image1.png", "png", &mut used);
        let c = destination_name(AssetNaming::Sequence, 3, "word/media/x.png", "png", &mut used);
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("image1.png", "image1_2.png", "image_03.png"));
    }
}
