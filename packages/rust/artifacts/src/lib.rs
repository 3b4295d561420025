//! Export files for Draftwright: keyword CSV and document markdown.
//!
//! Exports are written atomically (temp file, then rename) and described by
//! an [`ExportMeta`] carrying the SHA-256 of the written content.

mod csv;
mod document;

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use draftwright_shared::{DraftwrightError, Result};

pub use csv::{KEYWORD_CSV_HEADER, csv_escape, keywords_csv};
pub use document::{document_filename, document_markdown};

/// Metadata for a single export file.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Write `content` to `dir/filename` atomically and describe the result.
#[instrument(skip_all, fields(dir = %dir.display(), filename = %filename))]
pub fn write_export(dir: &Path, filename: &str, content: &str) -> Result<ExportMeta> {
    if filename.is_empty() || filename.contains(['/', '\\']) {
        return Err(DraftwrightError::Export(format!(
            "invalid export file name '{filename}'"
        )));
    }

    std::fs::create_dir_all(dir).map_err(|e| DraftwrightError::io(dir, e))?;

    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    // Write to temp file first
    std::fs::write(&temp, content).map_err(|e| DraftwrightError::io(&temp, e))?;

    // Atomic rename
    std::fs::rename(&temp, &target).map_err(|e| DraftwrightError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    debug!(size = content.len(), "wrote export");

    Ok(ExportMeta {
        filename: filename.to_string(),
        sha256: hash,
        size_bytes: content.len(),
    })
}
