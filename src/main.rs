use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use docxide_md::{
    AssetNaming, ConvertOptions, FigureOverrides, ReconcileStrategy, TableStyle,
    convert_docx_to_markdown, inspect,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Naming {
    /// image_01.png, image_02.jpeg, ...
    Sequence,
    /// Keep the media part's own file name
    Original,
}

/// Convert a DOCX document to Markdown with figures placed at their captions.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Input .docx file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Markdown file name (defaults to the input file stem)
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,

    /// JSON table of figure number to image file name
    #[arg(long, value_name = "FILE")]
    overrides: Option<PathBuf>,

    /// Do not fall back to positional matching for figures missing from --overrides
    #[arg(long, requires = "overrides")]
    strict_overrides: bool,

    #[arg(long, value_enum, default_value = "sequence")]
    naming: Naming,

    /// Level-1 heading placed before the body
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// Keep WMF/EMF/TIFF/BMP images as extracted
    #[arg(long)]
    no_convert: bool,

    /// Replace tables with a placeholder line
    #[arg(long)]
    table_placeholders: bool,

    /// Print the document structure and positional mapping, then exit
    #[arg(long)]
    inspect: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn options(args: &Args) -> Result<ConvertOptions, docxide_md::Error> {
    let mut options = ConvertOptions::default()
        .naming(match args.naming {
            Naming::Sequence => AssetNaming::Sequence,
            Naming::Original => AssetNaming::Original,
        })
        .convert_legacy_images(!args.no_convert);
    if args.table_placeholders {
        options = options.table_style(TableStyle::Placeholder);
    }
    if let Some(title) = &args.title {
        options = options.title(title.clone());
    }
    if let Some(name) = &args.name {
        options = options.output_name(name.clone());
    }
    if let Some(path) = &args.overrides {
        let table = FigureOverrides::from_json_file(path)?;
        log::info!("Loaded {} figure overrides from {}", table.len(), path.display());
        options = options.strategy(ReconcileStrategy::Overrides {
            table,
            positional_fallback: !args.strict_overrides,
        });
    }
    Ok(options)
}

fn run(args: &Args) -> Result<(), docxide_md::Error> {
    if args.inspect {
        print!("{}", inspect(&args.input)?);
        return Ok(());
    }

    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };
    let report = convert_docx_to_markdown(&args.input, &output_dir, &options(args)?)?;

    println!("{}", report.markdown_path.display());
    println!(
        "{} images, {}/{} figures placed, {} warnings",
        report.assets.len(),
        report.stats.images_placed,
        report.stats.captions,
        report.warnings.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
