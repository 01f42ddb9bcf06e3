//! Results handed back to callers, and their JSON payloads.
//!
//! Payloads use camelCase field names so a web front-end can consume them
//! unchanged.

use crate::config::NoteConfig;
use crate::language::Language;
use crate::sandbox::Sandbox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Route a note is downloadable under, followed by its file name.
pub const DOWNLOAD_ROUTE: &str = "/api/notes/";

/// Query parameter carrying the note's directory below the output root.
pub const DOWNLOAD_DIR_PARAM: &str = "dir";

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub note_path: PathBuf,
    /// Directory of the note relative to the output root, `""` at the root.
    pub note_dir: String,
    pub note_text: String,
    pub copied_path: Option<PathBuf>,
    pub model: String,
    pub language: Language,
}

impl GenerationResult {
    /// File name of the written note.
    pub fn note_name(&self) -> String {
        self.note_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Download reference resolvable by [`Sandbox::read_note_in`].
    pub fn download_url(&self) -> String {
        let note_name = self.note_name();
        if self.note_dir.is_empty() {
            format!("{DOWNLOAD_ROUTE}{note_name}")
        } else {
            format!(
                "{DOWNLOAD_ROUTE}{note_name}?{DOWNLOAD_DIR_PARAM}={}",
                self.note_dir
            )
        }
    }

    pub fn payload(&self) -> GenerationPayload {
        GenerationPayload {
            download_url: self.download_url(),
            note_name: self.note_name(),
            note_dir: self.note_dir.clone(),
            note_path: self.note_path.display().to_string(),
            note_text: self.note_text.clone(),
            copied_path: self.copied_path.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// JSON shape of a [`GenerationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub note_name: String,
    pub note_dir: String,
    pub note_path: String,
    pub note_text: String,
    pub copied_path: Option<String>,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPaths {
    pub input: String,
    pub output: String,
    pub copy: String,
}

/// Everything a front-end needs to render its selection controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPayload {
    pub models: Vec<String>,
    pub default_model: String,
    pub languages: Vec<LanguageOption>,
    pub default_language: String,
    pub paths: RootPaths,
}

impl OptionsPayload {
    pub fn new(config: &NoteConfig, sandbox: &Sandbox) -> Self {
        Self {
            models: config.models.clone(),
            default_model: config.default_model.clone(),
            languages: Language::ALL
                .iter()
                .map(|l| LanguageOption {
                    key: l.key().to_string(),
                    label: l.label().to_string(),
                })
                .collect(),
            default_language: config.default_language.key().to_string(),
            paths: RootPaths {
                input: sandbox.input.path().display().to_string(),
                output: sandbox.output.path().display().to_string(),
                copy: sandbox.copy.path().display().to_string(),
            },
        }
    }
}
