use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

pub const TIFF_EXTENSION: &str = "tiff";

/// Rasterizes PDF documents into fax TIFFs by running Ghostscript.
pub struct DocumentConverter {
    binary: String,
    args: Vec<String>,
}

impl DocumentConverter {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    /// Convert `pdf` into a TIFF next to it and return the TIFF path.
    ///
    /// Blocks until Ghostscript exits; no timeout is applied.
    pub async fn convert(&self, pdf: &Path) -> Result<PathBuf, ConvertError> {
        let tiff = tiff_path_for(pdf)?;

        tracing::info!(
            source = %pdf.display(),
            output = %tiff.display(),
            "Converting PDF to TIFF"
        );

        let mut command = Command::new(&self.binary);
        command
            .args(&self.args)
            .arg(format!("-sOutputFile={}", tiff.display()))
            .arg(pdf);

        tracing::debug!(command = ?command.as_std(), "Running converter");

        let output = command.output().await.map_err(|e| ConvertError::Spawn {
            binary: self.binary.clone(),
            source: e,
        })?;

        if !output.status.success() {
            discard_partial_output(&tiff).await;
            return Err(ConvertError::ConversionFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !tokio::fs::try_exists(&tiff).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput(tiff));
        }

        Ok(tiff)
    }
}

async fn discard_partial_output(tiff: &Path) {
    match tokio::fs::remove_file(tiff).await {
        Ok(()) => tracing::debug!(path = %tiff.display(), "Removed partial converter output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %tiff.display(), error = %e, "Failed to remove partial output"),
    }
}

/// Whether a file name carries the `.pdf` extension, in any case.
pub fn is_pdf_name(name: &str) -> bool {
    name.len() > 4
        && name
            .get(name.len() - 4..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".pdf"))
}

/// Derive the TIFF path for a PDF: same directory, `.pdf` swapped for `.tiff`,
/// whitespace in the file name replaced with `_` so Asterisk can read it back
/// from a call file.
pub fn tiff_path_for(pdf: &Path) -> Result<PathBuf, ConvertError> {
    let name = pdf
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| is_pdf_name(n))
        .ok_or_else(|| ConvertError::UnsupportedFormat(pdf.to_path_buf()))?;

    let stem = &name[..name.len() - 4];
    let safe: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    Ok(pdf.with_file_name(format!("{safe}.{TIFF_EXTENSION}")))
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Not a PDF document: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Could not start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not convert PDF to TIFF ({status}): {stderr}")]
    ConversionFailed { status: ExitStatus, stderr: String },

    #[error("Converter exited successfully but produced no file at {0}")]
    MissingOutput(PathBuf),
}
