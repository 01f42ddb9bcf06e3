//! Pipeline stages for deck-to-note generation.
//!
//! Each submodule implements exactly one step; [`crate::convert`] sequences
//! them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ place
//! (upload/   (pptx|pdf   (chat   (note .md,
//!  select)    → text)    call)   source copy)
//! ```
//!
//! 1. [`input`] — spool an upload or resolve a selection under the input root
//! 2. [`extract`] — dispatch on the extension to [`pptx`] or [`pdf`]; both
//!    produce a [`document::ExtractedDocument`]. Blocking, so the
//!    orchestrator runs it in `spawn_blocking`
//! 3. [`llm`] — render the language prompt and call the backend; the only
//!    stage with network I/O
//! 4. [`place`] — write the note and copy the source

pub mod credentials;
pub mod document;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod place;
pub mod pptx;
pub mod tables;

use crate::error::NoteError;
use document::{ExtractedDocument, SourceFormat};
use std::path::Path;
use tracing::debug;

/// Knobs for [`extract`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    /// Append speaker notes to each slide (`.pptx` only).
    pub include_notes: bool,
    /// Minimum gap, in points, between two table cells (`.pdf` only).
    pub column_gap: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_notes: false,
            column_gap: 12.0,
        }
    }
}

/// Extract `path`, choosing the extractor by file extension.
///
/// An unsupported extension fails before the file is opened.
pub fn extract(path: &Path, options: &ExtractOptions) -> Result<ExtractedDocument, NoteError> {
    let format = SourceFormat::from_path(path)?;
    debug!("Extracting {} as {:?}", path.display(), format);
    match format {
        SourceFormat::SlideDeck => pptx::extract_pptx(path, options.include_notes),
        SourceFormat::PagedDocument => pdf::extract_pdf(path, options.column_gap),
    }
}
