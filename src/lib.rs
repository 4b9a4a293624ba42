mod caption;
mod config;
mod convert;
mod docx;
mod error;
mod inspect;
mod markdown;
mod model;
mod reconcile;

pub use caption::{CaptionMatch, classify, classify_paragraph, collect_captions};
pub use config::{AssetNaming, ConvertOptions, TableStyle};
pub use convert::{ConvertError, ImageConverter, StandardConverter};
pub use docx::body::BodyWalker;
pub use docx::media::{Extraction, SequenceCounter, extract_images};
pub use docx::{Package, Relationship};
pub use error::{Error, Warning};
pub use inspect::{Inspection, inspect};
pub use markdown::{
    EmitStats, Emitter, Normalizer, PipeTableFormatter, PlaceholderTableFormatter,
    TableFormatter, audit_image_links, image_targets, normalize,
};
pub use model::{
    CaptionKind, ConversionRecord, DocumentNode, FigureReference, ImageAsset, Paragraph,
    TableBlock,
};
pub use reconcile::{FigureMapping, FigureOverrides, ReconcileStrategy};

use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of a successful run. Recovered problems are listed in `warnings`.
#[derive(Debug)]
pub struct ConversionReport {
    pub markdown_path: PathBuf,
    pub asset_dir: PathBuf,
    pub assets: Vec<ImageAsset>,
    pub conversions: Vec<ConversionRecord>,
    pub captions: Vec<FigureReference>,
    pub mapping: FigureMapping,
    pub stats: EmitStats,
    pub warnings: Vec<Warning>,
}

/// Image converter and table formatter used by a conversion run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// `None` keeps legacy images as extracted.
    pub converter: Option<&'a dyn ImageConverter>,
    pub tables: &'a dyn TableFormatter,
}

pub fn convert_docx_to_markdown(
    input: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, Error> {
    let standard = StandardConverter::default();
    convert_docx_with(input, output_dir, options, default_collaborators(options, &standard))
}

/// Like [`convert_docx_to_markdown`], with caller-supplied collaborators in
/// place of `convert_legacy_images` and `table_style`.
pub fn convert_docx_with(
    input: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
    collaborators: Collaborators<'_>,
) -> Result<ConversionReport, Error> {
    let t0 = Instant::now();
    let package = Package::open(input)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    convert_package(package, stem, output_dir, options, collaborators, t0)
}

/// Like [`convert_docx_to_markdown`], for a DOCX already in memory. `name` is
/// the Markdown file stem unless the options set one.
pub fn convert_docx_bytes_to_markdown(
    input: &[u8],
    name: &str,
    output_dir: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, Error> {
    let standard = StandardConverter::default();
    convert_docx_bytes_with(input, name, output_dir, options, default_collaborators(options, &standard))
}

pub fn convert_docx_bytes_with(
    input: &[u8],
    name: &str,
    output_dir: &Path,
    options: &ConvertOptions,
    collaborators: Collaborators<'_>,
) -> Result<ConversionReport, Error> {
    let t0 = Instant::now();
    let package = Package::from_bytes(input.to_vec())?;
    convert_package(package, name, output_dir, options, collaborators, t0)
}

fn default_collaborators<'a>(
    options: &ConvertOptions,
    standard: &'a StandardConverter,
) -> Collaborators<'a> {
    Collaborators {
        converter: options
            .convert_legacy_images
            .then_some(standard as &dyn ImageConverter),
        tables: markdown::table_formatter(options.table_style),
    }
}

fn convert_package(
    mut package: Package,
    stem: &str,
    output_dir: &Path,
    options: &ConvertOptions,
    collaborators: Collaborators<'_>,
    t0: Instant,
) -> Result<ConversionReport, Error> {
    let t_open = t0.elapsed();
    std::fs::create_dir_all(output_dir)?;
    let asset_dir = output_dir.join(&options.asset_dir);
    let mut warnings = Vec::new();

    let extraction = extract_images(
        &mut package,
        &asset_dir,
        options.naming,
        collaborators.converter,
        &mut SequenceCounter::default(),
        &mut warnings,
    )?;
    let t_extract = t0.elapsed();

    let xml = roxmltree::Document::parse(package.document_xml())?;
    let body = docx::body_of(&xml)?;
    let nodes: Vec<DocumentNode> = BodyWalker::new(body).collect();
    let captions = collect_captions(&nodes);
    let mut mapping = FigureMapping::build(&captions, &extraction.assets, &options.strategy);
    mapping.retain_available(|f| extraction.has_file(f), &mut warnings);
    let t_reconcile = t0.elapsed();

    let emitter = Emitter::new(&mapping, &options.asset_dir, collaborators.tables);
    let (raw, stats) = emitter.emit(nodes, options.title.as_deref(), &mut warnings);
    let markdown = Normalizer::new(&extraction.conversions).normalize(&raw);
    let t_emit = t0.elapsed();

    let markdown_path = output_dir.join(options.markdown_file_name(stem));
    std::fs::write(&markdown_path, &markdown)?;
    audit_image_links(&markdown, output_dir, &mut warnings);
    let t_total = t0.elapsed();

    log::info!(
        "Figures: {} captions, {} images placed, {} extracted, {} warnings",
        stats.captions,
        stats.images_placed,
        extraction.assets.len(),
        warnings.len(),
    );
    log::info!(
        "Timing: open={:.1}ms, extract={:.1}ms, reconcile={:.1}ms, emit={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_open.as_secs_f64() * 1000.0,
        (t_extract - t_open).as_secs_f64() * 1000.0,
        (t_reconcile - t_extract).as_secs_f64() * 1000.0,
        (t_emit - t_reconcile).as_secs_f64() * 1000.0,
        (t_total - t_emit).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        markdown.len(),
    );

    Ok(ConversionReport {
        markdown_path,
        asset_dir,
        assets: extraction.assets,
        conversions: extraction.conversions,
        captions,
        mapping,
        stats,
        warnings,
    })
}
