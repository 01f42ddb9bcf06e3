//! Error type for the note-maker library.
//!
//! Every stage of the pipeline fails with a [`NoteError`]. There is no
//! non-fatal variant: extraction, generation and placement either succeed
//! completely or abort the run. The one deliberate exception, table
//! detection inside PDF extraction, never surfaces here at all; it degrades
//! to "no tables" and logs a warning.
//!
//! Messages are written for the person who picked the file: they name the
//! file or path involved and the constraint that was violated.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the note-maker library.
#[derive(Debug, Error)]
pub enum NoteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The file extension is not one of the two supported containers.
    #[error("Unsupported file type for '{name}'\nChoose a .pptx or .pdf file.")]
    UnsupportedFormat { name: String },

    /// The container was recognised but could not be decoded.
    #[error("Could not read '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Extraction produced no text to generate a note from.
    #[error("No text found in '{source_name}'")]
    EmptyInput { source_name: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The language key does not name a registered profile.
    #[error("Unknown language '{key}'. Available: {available}")]
    UnknownLanguage { key: String, available: String },

    /// The model identifier is not in the configured allow-list.
    #[error("Invalid model '{model}'. Allowed models: {allowed}")]
    InvalidModel { model: String, allowed: String },

    /// No backend credential could be found.
    #[error("No API key available.\n{hint}")]
    MissingCredential { hint: String },

    /// The backend answered but produced no content.
    #[error("Model '{model}' returned no content")]
    EmptyGeneration { model: String },

    /// Any failure surfaced by the text-generation call itself.
    #[error("Text generation failed: {message}")]
    GenerationBackendFailure { message: String },

    // ── Sandbox errors ────────────────────────────────────────────────────
    /// A relative path resolves outside its sandbox root.
    #[error("Path '{requested}' is outside the {root} directory")]
    PathEscape { root: String, requested: String },

    /// A bare filename contains separators or parent-directory tokens.
    #[error("Invalid file name '{name}'")]
    InvalidFilename { name: String },

    /// The requested file or directory does not exist.
    #[error("Not found: '{path}'")]
    NotFound { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a note or a copied source.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NoteError {
    /// Short machine-readable name of the variant, used in logs and JSON errors.
    pub fn kind(&self) -> &'static str {
        match self {
            NoteError::UnsupportedFormat { .. } => "unsupported_format",
            NoteError::ExtractionFailed { .. } => "extraction_failed",
            NoteError::EmptyInput { .. } => "empty_input",
            NoteError::UnknownLanguage { .. } => "unknown_language",
            NoteError::InvalidModel { .. } => "invalid_model",
            NoteError::MissingCredential { .. } => "missing_credential",
            NoteError::EmptyGeneration { .. } => "empty_generation",
            NoteError::GenerationBackendFailure { .. } => "generation_backend_failure",
            NoteError::PathEscape { .. } => "path_escape",
            NoteError::InvalidFilename { .. } => "invalid_filename",
            NoteError::NotFound { .. } => "not_found",
            NoteError::OutputWriteFailed { .. } => "output_write_failed",
            NoteError::InvalidConfig(_) => "invalid_config",
            NoteError::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the caller's input rather than the system.
    ///
    /// HTTP front-ends map these to 4xx responses.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            NoteError::GenerationBackendFailure { .. }
                | NoteError::MissingCredential { .. }
                | NoteError::OutputWriteFailed { .. }
                | NoteError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_file() {
        let e = NoteError::UnsupportedFormat {
            name: "notes.docx".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.docx"), "got: {msg}");
        assert!(msg.contains(".pptx"));
    }

    #[test]
    fn invalid_model_lists_allowed() {
        let e = NoteError::InvalidModel {
            model: "gpt-2".into(),
            allowed: "gpt-5, gpt-5.1".into(),
        };
        assert!(e.to_string().contains("gpt-2"));
        assert!(e.to_string().contains("gpt-5.1"));
    }

    #[test]
    fn path_escape_display() {
        let e = NoteError::PathEscape {
            root: "input".into(),
            requested: "../../etc".into(),
        };
        assert!(e.to_string().contains("../../etc"));
        assert!(e.to_string().contains("input"));
    }

    #[test]
    fn client_error_classification() {
        assert!(NoteError::InvalidFilename { name: "..".into() }.is_client_error());
        assert!(!NoteError::Internal("boom".into()).is_client_error());
        assert!(!NoteError::MissingCredential { hint: String::new() }.is_client_error());
    }

    #[test]
    fn kind_is_stable() {
        let e = NoteError::EmptyGeneration {
            model: "gpt-5".into(),
        };
        assert_eq!(e.kind(), "empty_generation");
    }
}
