//! Asterisk call file rendering.
//!
//! A call file is a line-oriented `Key:Value` document dropped into the
//! Asterisk outgoing spool. Retry behaviour is left to Asterisk through
//! `MaxRetries`/`RetryTime`; this crate never redials on its own.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::models::trunk::TrunkNumber;

pub const MAX_RETRIES: u32 = 4;
pub const RETRY_TIME_SECS: u32 = 60;
pub const WAIT_TIME_SECS: u32 = 45;

const CONTEXT: &str = "fax";
const EXTENSION: &str = "out";
const PRIORITY: u32 = 1;
const IDENTITY_HEADER_DIRECTIVE: &str = "Set:PJSIP_HEADER(add,P-Preferred-Identity)=";

pub const CALL_FILE_EXTENSION: &str = "call";

/// Everything needed to place one fax call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFile<'a> {
    pub trunk: &'a TrunkNumber,
    pub fax_id: i64,
    pub fax_file: &'a Path,
    pub receiver: &'a str,
}

impl CallFile<'_> {
    /// Render the call file, refusing any value Asterisk would not read back
    /// as written.
    pub fn render(&self) -> Result<String, CallFileError> {
        let trunk = self.trunk;
        let fax_file = self.fax_file.display().to_string();

        check_receiver(self.receiver)?;
        check_plain("full_number", &trunk.full_number)?;
        check_plain("ps_endpoints_id", &trunk.ps_endpoints_id)?;
        check_plain("fax_file", &fax_file)?;

        let header = match trunk.identity_header() {
            Some(header) => Some(check_escaped("header_ppid", header)?),
            None => None,
        };

        let mut out = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(out, "Channel:PJSIP/{}@{}", self.receiver, trunk.ps_endpoints_id);
        let _ = writeln!(out, "CallerID:\"{0}\"<{0}>", trunk.full_number);
        let _ = writeln!(out, "MaxRetries:{MAX_RETRIES}");
        let _ = writeln!(out, "RetryTime:{RETRY_TIME_SECS}");
        let _ = writeln!(out, "WaitTime:{WAIT_TIME_SECS}");
        let _ = writeln!(out, "Archive:Yes");
        let _ = writeln!(out, "Context:{CONTEXT}");
        let _ = writeln!(out, "Extension:{EXTENSION}");
        let _ = writeln!(out, "Priority:{PRIORITY}");
        let _ = writeln!(out, "Set:FAXID={}", self.fax_id);
        let _ = writeln!(out, "Set:FAXFILE={fax_file}");

        if let Some(header) = header {
            let _ = writeln!(out, "{IDENTITY_HEADER_DIRECTIVE}{header}");
        }

        Ok(out)
    }
}

/// Builds call files for converted faxes and writes them next to the TIFF.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallFileBuilder;

impl CallFileBuilder {
    /// Resolve the trunk from `matches`, render the call file and write it.
    ///
    /// `matches` is the raw lookup result for `outgoing_number_id`; anything
    /// other than exactly one row, or a value that cannot be rendered safely,
    /// aborts before a file is created.
    pub async fn build(
        &self,
        outgoing_number_id: i64,
        matches: &[TrunkNumber],
        fax_id: i64,
        fax_file: &Path,
        receiver: &str,
    ) -> Result<PathBuf, CallFileError> {
        let trunk = match matches {
            [trunk] => trunk,
            _ => {
                return Err(CallFileError::TrunkResolution {
                    outgoing_number_id,
                    matches: matches.len(),
                })
            }
        };

        let contents = CallFile {
            trunk,
            fax_id,
            fax_file,
            receiver,
        }
        .render()?;

        let path = fax_file.with_extension(CALL_FILE_EXTENSION);

        tracing::info!(fax_id, path = %path.display(), "Generating call file");

        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| CallFileError::DescriptorWrite {
                path: path.clone(),
                source: e,
            })?;

        Ok(path)
    }
}

/// Destination numbers go straight into the dial string.
fn check_receiver(receiver: &str) -> Result<(), CallFileError> {
    let dialable = |c: char| c.is_ascii_digit() || matches!(c, '+' | '*' | '#');
    if receiver.is_empty() || !receiver.chars().all(dialable) {
        return Err(invalid("to", receiver));
    }
    Ok(())
}

/// A value written verbatim must read back unchanged.
fn check_plain(field: &'static str, value: &str) -> Result<(), CallFileError> {
    if value.chars().any(char::is_control) || unescape_value(value) != value {
        return Err(invalid(field, value));
    }
    Ok(())
}

/// Escape `value` and make sure it reads back unchanged.
fn check_escaped(field: &'static str, value: &str) -> Result<String, CallFileError> {
    let escaped = escape_value(value);
    if value.chars().any(char::is_control) || unescape_value(&escaped) != value {
        return Err(invalid(field, value));
    }
    Ok(escaped)
}

fn invalid(field: &'static str, value: &str) -> CallFileError {
    CallFileError::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// Escape `;`, which otherwise starts a comment in a call file value.
pub fn escape_value(value: &str) -> String {
    value.replace(';', "\\;")
}

/// Read a value back the way Asterisk's call file parser does.
///
/// A `#` at the start or after a blank opens a comment, an unescaped `;` ends
/// the value, `\;` becomes `;` and trailing blanks are trimmed. Backslashes
/// are otherwise literal.
pub fn unescape_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let comment = (0..bytes.len())
        .find(|&i| bytes[i] == b'#' && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t')));
    let line = match comment {
        // `#` is ASCII, so `i` is a char boundary.
        Some(i) => &value[..i],
        None => value,
    };

    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                out.push(';');
                chars.next();
            }
            ';' => break,
            c => out.push(c),
        }
    }

    let trimmed = out.trim_end_matches([' ', '\t']).len();
    out.truncate(trimmed);
    out
}

#[derive(Debug, thiserror::Error)]
pub enum CallFileError {
    #[error("Expected one fax trunk for outgoing number {outgoing_number_id}, found {matches}")]
    TrunkResolution {
        outgoing_number_id: i64,
        matches: usize,
    },

    #[error("Refusing to write {field} {value:?} into a call file")]
    InvalidField { field: &'static str, value: String },

    #[error("Could not write call file {path}: {source}")]
    DescriptorWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
