//! Configuration for note generation.
//!
//! Everything a run needs besides the request itself lives in
//! [`NoteConfig`]: the model allow-list, defaults for model and language,
//! the three sandbox roots, where the API key comes from, and an optional
//! pre-built backend. A config is built once at start-up, wrapped in an
//! `Arc`, and shared read-only by every request.

use crate::error::NoteError;
use crate::language::Language;
use crate::pipeline::llm::CompletionBackend;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Models a caller may request.
pub const AVAILABLE_MODELS: [&str; 5] = ["gpt-5", "gpt-5.1", "gpt-4.1", "gpt-4.1-mini", "gpt-5-mini"];

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gpt-5.1";

/// Environment variable holding the backend API key.
pub const DEFAULT_CREDENTIAL_ENV: &str = "OPENAI_API_KEY";

/// Configuration for the note pipeline.
///
/// Built via [`NoteConfig::builder()`] or [`NoteConfig::default()`].
///
/// # Example
/// ```rust
/// use note_maker::{Language, NoteConfig};
///
/// let config = NoteConfig::builder()
///     .output_root("/tmp/notes")
///     .default_language(Language::English)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_model, "gpt-5.1");
/// ```
#[derive(Clone)]
pub struct NoteConfig {
    /// Model identifiers a request may use.
    pub models: Vec<String>,

    /// Model used when a request leaves it unset. Must be in `models`.
    pub default_model: String,

    /// Language used when a request leaves it unset.
    pub default_language: Language,

    /// Append speaker notes to each slide of a `.pptx`. Default: false.
    pub include_notes: bool,

    /// Root under which callers may select input files.
    pub input_root: PathBuf,

    /// Root receiving generated notes. Directory selection only.
    pub output_root: PathBuf,

    /// Root receiving copies of the source file. Directory selection only.
    pub copy_root: PathBuf,

    /// Environment variable checked first for the API key.
    pub credential_env: String,

    /// Managed key file consulted when the environment variable is unset.
    pub credential_file: Option<PathBuf>,

    /// Minimum horizontal gap, in PDF points, separating two table cells.
    ///
    /// Text runs closer than this on the same line are treated as one cell.
    pub table_column_gap: f32,

    /// Pre-constructed backend. Takes precedence over the built-in client.
    pub backend: Option<Arc<dyn CompletionBackend>>,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            models: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: DEFAULT_MODEL.to_string(),
            default_language: Language::DEFAULT,
            include_notes: false,
            input_root: PathBuf::from("."),
            output_root: PathBuf::from("output"),
            copy_root: PathBuf::from("output").join("copies"),
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            credential_file: default_credential_file(),
            table_column_gap: 12.0,
            backend: None,
        }
    }
}

impl fmt::Debug for NoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteConfig")
            .field("models", &self.models)
            .field("default_model", &self.default_model)
            .field("default_language", &self.default_language)
            .field("include_notes", &self.include_notes)
            .field("input_root", &self.input_root)
            .field("output_root", &self.output_root)
            .field("copy_root", &self.copy_root)
            .field("credential_env", &self.credential_env)
            .field("credential_file", &self.credential_file)
            .field("table_column_gap", &self.table_column_gap)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .finish()
    }
}

impl NoteConfig {
    /// Create a new builder for `NoteConfig`.
    pub fn builder() -> NoteConfigBuilder {
        NoteConfigBuilder {
            config: Self::default(),
        }
    }

    /// True if `model` is in the allow-list.
    pub fn allows_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

/// `{config_dir}/note-maker/config.env`, where the setup tooling stores the key.
pub fn default_credential_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("note-maker").join("config.env"))
}

/// Builder for [`NoteConfig`].
#[derive(Debug)]
pub struct NoteConfigBuilder {
    config: NoteConfig,
}

impl NoteConfigBuilder {
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn default_language(mut self, language: Language) -> Self {
        self.config.default_language = language;
        self
    }

    pub fn include_notes(mut self, v: bool) -> Self {
        self.config.include_notes = v;
        self
    }

    pub fn input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_root = path.into();
        self
    }

    /// Set the output root. The copy root follows it (`{output}/copies`)
    /// unless [`Self::copy_root`] is called afterwards.
    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.config.copy_root = path.join("copies");
        self.config.output_root = path;
        self
    }

    pub fn copy_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.copy_root = path.into();
        self
    }

    pub fn credential_env(mut self, var: impl Into<String>) -> Self {
        self.config.credential_env = var.into();
        self
    }

    pub fn credential_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.credential_file = path;
        self
    }

    pub fn table_column_gap(mut self, points: f32) -> Self {
        self.config.table_column_gap = points.max(1.0);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NoteConfig, NoteError> {
        let c = &self.config;
        if c.models.is_empty() {
            return Err(NoteError::InvalidConfig(
                "Model allow-list must not be empty".into(),
            ));
        }
        if !c.allows_model(&c.default_model) {
            return Err(NoteError::InvalidConfig(format!(
                "Default model '{}' is not in the allow-list ({})",
                c.default_model,
                c.models.join(", ")
            )));
        }
        if c.credential_env.trim().is_empty() {
            return Err(NoteError::InvalidConfig(
                "Credential environment variable name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NoteConfig::builder().build().unwrap();
        assert!(config.allows_model(DEFAULT_MODEL));
        assert_eq!(config.default_language, Language::Nynorsk);
        assert!(!config.include_notes);
        assert_eq!(config.credential_env, "OPENAI_API_KEY");
    }

    #[test]
    fn default_model_outside_allow_list_is_rejected() {
        let err = NoteConfig::builder()
            .models(["gpt-4.1"])
            .build()
            .unwrap_err();
        assert!(matches!(err, NoteError::InvalidConfig(_)));
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let err = NoteConfig::builder()
            .models(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("allow-list"));
    }

    #[test]
    fn output_root_moves_copy_root() {
        let config = NoteConfig::builder().output_root("/srv/notes").build().unwrap();
        assert_eq!(config.copy_root, PathBuf::from("/srv/notes/copies"));

        let config = NoteConfig::builder()
            .output_root("/srv/notes")
            .copy_root("/srv/archive")
            .build()
            .unwrap();
        assert_eq!(config.copy_root, PathBuf::from("/srv/archive"));
    }

    #[test]
    fn column_gap_is_clamped() {
        let config = NoteConfig::builder().table_column_gap(0.0).build().unwrap();
        assert_eq!(config.table_column_gap, 1.0);
    }

    #[test]
    fn debug_hides_backend() {
        let s = format!("{:?}", NoteConfig::default());
        assert!(s.contains("backend: None"));
    }
}
