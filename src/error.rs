use std::fmt;

/// Fatal conversion errors. Anything recoverable is reported as a
/// [`Warning`] instead and the run continues.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    InvalidDocx(String),
    Xml(roxmltree::Error),
    Overrides(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidDocx(msg) => write!(f, "invalid DOCX: {msg}"),
            Error::Xml(e) => write!(f, "XML parse error: {e}"),
            Error::Overrides(msg) => write!(f, "invalid figure override table: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

/// A failure the pipeline recovered from locally.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// An image relationship could not be extracted and was skipped.
    AssetSkipped {
        relationship_id: String,
        target: String,
        reason: String,
    },
    /// A caption references a figure number with no mapped asset.
    UnresolvedFigure { number: u32, caption: String },
    /// A legacy image could not be converted; the original file is referenced.
    ConversionFailed { file_name: String, reason: String },
    /// An override entry names a file that was never extracted.
    OverrideTargetMissing { number: u32, file_name: String },
    /// An image link in the written Markdown points at a missing file.
    BrokenImageLink { path: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::AssetSkipped {
                relationship_id,
                target,
                reason,
            } => write!(f, "skipped image {relationship_id} ({target}): {reason}"),
            Warning::UnresolvedFigure { number, caption } => {
                write!(f, "no image for Figure {number}: \"{caption}\"")
            }
            Warning::ConversionFailed { file_name, reason } => {
                write!(f, "could not convert {file_name}, keeping original: {reason}")
            }
            Warning::OverrideTargetMissing { number, file_name } => write!(
                f,
                "override for Figure {number} names {file_name}, which was not extracted"
            ),
            Warning::BrokenImageLink { path } => write!(f, "image link points at missing file {path}"),
        }
    }
}

impl Warning {
    /// Log the warning and keep it for the run report.
    pub(crate) fn record(self, warnings: &mut Vec<Warning>) {
        log::warn!("{self}");
        warnings.push(self);
    }
}
