//! Input resolution: turn a [`SourceRef`] into a local file the extractors
//! can open.
//!
//! Both extractors need a real path (pdfium opens files, the zip reader
//! seeks). Uploaded bytes are therefore spooled into a `TempDir` under their
//! original file name; the directory lives as long as the
//! [`ResolvedSource`] and is removed when the run ends, whatever the outcome.
//!
//! The extension is validated before anything else happens: an unsupported
//! upload is never written to disk, an unsupported selection is never
//! resolved against the sandbox.

use crate::error::NoteError;
use crate::pipeline::document::SourceFormat;
use crate::sandbox::SandboxRoot;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Where the source document comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Raw bytes plus the name the caller gave the file.
    Upload { file_name: String, bytes: Vec<u8> },
    /// A file under the input root, relative to it.
    Sandboxed { relative_path: String },
}

impl SourceRef {
    /// The name the caller knows the file by.
    pub fn display_name(&self) -> &str {
        match self {
            SourceRef::Upload { file_name, .. } => file_name,
            SourceRef::Sandboxed { relative_path } => relative_path,
        }
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Upload { file_name, bytes } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("bytes", &bytes.len())
                .finish(),
            SourceRef::Sandboxed { relative_path } => f
                .debug_struct("Sandboxed")
                .field("relative_path", relative_path)
                .finish(),
        }
    }
}

/// A source file ready for extraction.
#[derive(Debug)]
pub enum ResolvedSource {
    /// A file selected under the input root.
    Local {
        path: PathBuf,
        name: String,
        format: SourceFormat,
    },
    /// Upload spooled to a temp directory, removed on drop.
    Spooled {
        path: PathBuf,
        name: String,
        format: SourceFormat,
        _temp_dir: TempDir,
    },
}

impl ResolvedSource {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedSource::Local { path, .. } | ResolvedSource::Spooled { path, .. } => path,
        }
    }

    /// Original file name, used to name the note and the copy.
    pub fn name(&self) -> &str {
        match self {
            ResolvedSource::Local { name, .. } | ResolvedSource::Spooled { name, .. } => name,
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            ResolvedSource::Local { format, .. } | ResolvedSource::Spooled { format, .. } => *format,
        }
    }
}

/// Resolve `source` to a local file.
pub async fn resolve_source(
    source: SourceRef,
    input_root: &SandboxRoot,
) -> Result<ResolvedSource, NoteError> {
    match source {
        SourceRef::Upload { file_name, bytes } => spool_upload(&file_name, &bytes).await,
        SourceRef::Sandboxed { relative_path } => resolve_selected(&relative_path, input_root),
    }
}

fn resolve_selected(relative_path: &str, root: &SandboxRoot) -> Result<ResolvedSource, NoteError> {
    let format = SourceFormat::from_path(relative_path)?;
    let path = root.resolve_inside(relative_path)?;
    if !path.is_file() {
        return Err(NoteError::NotFound { path });
    }
    let name = file_name_of(&path).unwrap_or_else(|| relative_path.to_string());
    debug!("Resolved selected source: {}", path.display());
    Ok(ResolvedSource::Local { path, name, format })
}

async fn spool_upload(file_name: &str, bytes: &[u8]) -> Result<ResolvedSource, NoteError> {
    let format = SourceFormat::from_path(file_name)?;
    // Only the final component of a caller-supplied name is trusted.
    let name = file_name_of(Path::new(file_name)).ok_or_else(|| NoteError::InvalidFilename {
        name: file_name.to_string(),
    })?;

    let temp_dir = TempDir::new().map_err(|e| NoteError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(&name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| NoteError::Internal(format!("Failed to spool upload: {}", e)))?;

    info!("Spooled upload '{}' ({} bytes)", name, bytes.len());
    Ok(ResolvedSource::Spooled {
        path,
        name,
        format,
        _temp_dir: temp_dir,
    })
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}
