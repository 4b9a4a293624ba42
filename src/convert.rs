//! Rasterizing legacy image formats that browsers and Markdown renderers
//! cannot display (Windows metafiles, TIFF, BMP).

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug)]
pub struct ConvertError(pub String);

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConvertError {}

pub fn is_legacy_vector(extension: &str) -> bool {
    matches!(extension, "wmf" | "emf")
}

pub fn is_legacy_raster(extension: &str) -> bool {
    matches!(extension, "tif" | "tiff" | "bmp")
}

/// Converts a legacy image payload to PNG at `dest`.
pub trait ImageConverter {
    fn can_convert(&self, extension: &str) -> bool;

    fn convert(&self, payload: &[u8], extension: &str, dest: &Path) -> Result<(), ConvertError>;
}

/// TIFF and BMP are decoded in-process; metafiles go through an ImageMagick
/// executable, tried in order.
pub struct StandardConverter {
    programs: Vec<String>,
}

impl Default for StandardConverter {
    fn default() -> Self {
        Self {
            programs: vec!["magick".into(), "convert".into()],
        }
    }
}

impl StandardConverter {
    pub fn with_programs<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            programs: programs.into_iter().map(Into::into).collect(),
        }
    }

    fn rasterize(&self, payload: &[u8], extension: &str, dest: &Path) -> Result<(), ConvertError> {
        let format = match extension {
            "bmp" => image::ImageFormat::Bmp,
            _ => image::ImageFormat::Tiff,
        };
        let img = image::load_from_memory_with_format(payload, format)
            .map_err(|e| ConvertError(format!("decode failed: {e}")))?;
        img.save_with_format(dest, image::ImageFormat::Png)
            .map_err(|e| ConvertError(format!("PNG encode failed: {e}")))
    }

    fn run_external(&self, payload: &[u8], extension: &str, dest: &Path) -> Result<(), ConvertError> {
        let mut last_error = String::from("no converter program configured");
        for program in &self.programs {
            match run_program(program, payload, extension, dest) {
                Ok(()) if dest.exists() => return Ok(()),
                Ok(()) => last_error = format!("{program} produced no output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("{program} not found on PATH");
                    last_error = format!("{program} not found");
                }
                Err(e) => last_error = format!("{program}: {e}"),
            }
        }
        Err(ConvertError(last_error))
    }
}

fn run_program(program: &str, payload: &[u8], extension: &str, dest: &Path) -> std::io::Result<()> {
    let mut child = Command::new(program)
        .arg(format!("{extension}:-"))
        .arg(format!("png:{}", dest.display()))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;
    // The child may exit before reading everything; it is reaped either way
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(payload),
        None => Ok(()),
    };
    let output = child.wait_with_output()?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    match (output.status.success(), written) {
        (true, Ok(())) => Ok(()),
        _ if !stderr.is_empty() => Err(std::io::Error::other(stderr)),
        (true, Err(e)) => Err(e),
        (false, _) => Err(std::io::Error::other(format!("{program} exited with {}", output.status))),
    }
}

impl ImageConverter for StandardConverter {
    fn can_convert(&self, extension: &str) -> bool {
        is_legacy_vector(extension) || is_legacy_raster(extension)
    }

    fn convert(&self, payload: &[u8], extension: &str, dest: &Path) -> Result<(), ConvertError> {
        if is_legacy_raster(extension) {
            self.rasterize(payload, extension, dest)
        } else if is_legacy_vector(extension) {
            self.run_external(payload, extension, dest)
        } else {
            Err(ConvertError(format!("unsupported source format .{extension}")))
        }
    }
}
