//! The note pipeline: one request in, one note (and maybe a copy) out.
//!
//! A run is an explicit state machine:
//!
//! ```text
//! Resolving ──▶ Extracting ──▶ Generating ──▶ Placing ──▶ Done
//!     │              │              │             │
//!     └──────────────┴──────┬───────┴─────────────┘
//!                           ▼
//!                         Failed
//! ```
//!
//! Each state owns exactly the data the next step needs, so a step cannot
//! run out of order. The first error ends the run and is returned as-is;
//! nothing is retried. An uploaded file lives in a temp directory owned by
//! the state and is removed however the run ends.

use crate::config::NoteConfig;
use crate::error::NoteError;
use crate::language::Language;
use crate::output::{GenerationResult, OptionsPayload};
use crate::pipeline::document::SourceFormat;
use crate::pipeline::input::{resolve_source, ResolvedSource, SourceRef};
use crate::pipeline::llm::NoteGenerator;
use crate::pipeline::{extract, place, ExtractOptions};
use crate::progress::{NoopObserver, SharedObserver, Stage};
use crate::sandbox::Sandbox;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to generate, and where to put it.
///
/// Unset options fall back to the [`NoteConfig`] defaults. Directories are
/// relative to their sandbox root.
#[derive(Debug, Clone)]
pub struct NoteRequest {
    pub source: SourceRef,
    pub model: Option<String>,
    pub language: Option<String>,
    /// Also copy the source file.
    pub copy_source: bool,
    /// Copy target, relative to the copy root. `None` copies into the
    /// note's output directory.
    pub copy_dir: Option<String>,
    /// Note directory, relative to the output root. `None` is the root.
    pub output_dir: Option<String>,
    pub include_notes: Option<bool>,
}

impl NoteRequest {
    pub fn new(source: SourceRef) -> Self {
        Self {
            source,
            model: None,
            language: None,
            copy_source: false,
            copy_dir: None,
            output_dir: None,
            include_notes: None,
        }
    }

    /// Request for uploaded bytes.
    pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(SourceRef::Upload {
            file_name: file_name.into(),
            bytes,
        })
    }

    /// Request for a file under the input root.
    pub fn select(relative_path: impl Into<String>) -> Self {
        Self::new(SourceRef::Sandboxed {
            relative_path: relative_path.into(),
        })
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn language(mut self, key: impl Into<String>) -> Self {
        self.language = Some(key.into());
        self
    }

    /// Copy the source; `dir` is relative to the copy root.
    pub fn copy_to(mut self, dir: Option<String>) -> Self {
        self.copy_source = true;
        self.copy_dir = dir;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn include_notes(mut self, v: bool) -> Self {
        self.include_notes = Some(v);
        self
    }
}

/// Request options with defaults applied and directories resolved.
#[derive(Debug)]
struct Plan {
    model: String,
    language: String,
    extract: ExtractOptions,
    output_dir: PathBuf,
    copy_dir: Option<PathBuf>,
}

enum State {
    Resolving(NoteRequest),
    Extracting {
        source: ResolvedSource,
        plan: Plan,
    },
    Generating {
        source: ResolvedSource,
        plan: Plan,
        text: String,
    },
    Placing {
        source: ResolvedSource,
        plan: Plan,
        note: String,
    },
    Done(GenerationResult),
}

impl State {
    fn stage(&self) -> Stage {
        match self {
            State::Resolving(_) => Stage::Resolving,
            State::Extracting { .. } => Stage::Extracting,
            State::Generating { .. } => Stage::Generating,
            State::Placing { .. } => Stage::Placing,
            State::Done(_) => Stage::Done,
        }
    }
}

/// Runs note requests against one configuration and sandbox.
///
/// Cheap to share behind an `Arc`; runs are independent of each other.
pub struct NotePipeline {
    config: Arc<NoteConfig>,
    sandbox: Sandbox,
    generator: NoteGenerator,
    observer: SharedObserver,
}

impl NotePipeline {
    /// Open the sandbox roots and set up the generator.
    pub fn new(config: NoteConfig) -> Result<Self, NoteError> {
        let sandbox = Sandbox::from_config(&config)?;
        let generator = NoteGenerator::from_config(&config);
        Ok(Self {
            config: Arc::new(config),
            sandbox,
            generator,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &NoteConfig {
        &self.config
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn options(&self) -> OptionsPayload {
        OptionsPayload::new(&self.config, &self.sandbox)
    }

    /// Run one request to completion.
    pub async fn run(&self, request: NoteRequest) -> Result<GenerationResult, NoteError> {
        let start = Instant::now();
        info!("Starting note run: {}", request.source.display_name());

        let mut state = State::Resolving(request);
        loop {
            let stage = state.stage();
            self.observer.on_stage(stage);

            state = match self.step(state).await {
                Ok(State::Done(result)) => {
                    self.observer.on_stage(Stage::Done);
                    self.observer.on_done(&result);
                    info!(
                        "Note complete: {} in {}ms",
                        result.note_path.display(),
                        start.elapsed().as_millis()
                    );
                    return Ok(result);
                }
                Ok(next) => next,
                Err(e) => {
                    warn!("Note run failed while {}: {}", stage, e);
                    self.observer.on_failed(stage, &e);
                    self.observer.on_stage(Stage::Failed);
                    return Err(e);
                }
            };
        }
    }

    async fn step(&self, state: State) -> Result<State, NoteError> {
        match state {
            State::Resolving(request) => self.resolve(request).await,

            State::Extracting { source, plan } => {
                let path = source.path().to_path_buf();
                let options = plan.extract;
                let doc = tokio::task::spawn_blocking(move || extract(&path, &options))
                    .await
                    .map_err(|e| NoteError::Internal(format!("extraction task: {}", e)))??;

                if doc.is_empty() {
                    return Err(NoteError::EmptyInput {
                        source_name: source.name().to_string(),
                    });
                }
                let text = doc.to_text();
                info!(
                    "Extracted {} units ({} chars) from {}",
                    doc.units().len(),
                    text.len(),
                    source.name()
                );
                Ok(State::Generating { source, plan, text })
            }

            State::Generating { source, plan, text } => {
                let note = self
                    .generator
                    .generate(&text, &plan.model, &plan.language)
                    .await?;
                Ok(State::Placing { source, plan, note })
            }

            State::Placing { source, plan, note } => {
                let language: Language = plan.language.parse()?;
                let note_path = place::write_note(
                    &note,
                    &plan.output_dir,
                    source.name(),
                    language.profile().note_suffix,
                )
                .await?;

                let copied_path = match &plan.copy_dir {
                    Some(dir) => Some(place::copy_source(source.path(), dir, Some(source.name())).await?),
                    None => None,
                };

                let note_dir = note_path
                    .parent()
                    .map(|dir| self.sandbox.output.relative_of(dir))
                    .unwrap_or_default();

                Ok(State::Done(GenerationResult {
                    note_path,
                    note_dir,
                    note_text: note,
                    copied_path,
                    model: plan.model,
                    language,
                }))
            }

            State::Done(result) => Ok(State::Done(result)),
        }
    }

    async fn resolve(&self, request: NoteRequest) -> Result<State, NoteError> {
        // Reject the wrong container before touching the filesystem.
        SourceFormat::from_path(request.source.display_name())?;

        let output_dir = match request.output_dir.as_deref() {
            Some(rel) => self.sandbox.output.resolve_inside(rel)?,
            None => self.sandbox.output.path().to_path_buf(),
        };
        let copy_dir = if request.copy_source {
            Some(match request.copy_dir.as_deref() {
                Some(rel) => self.sandbox.copy.resolve_inside(rel)?,
                None => output_dir.clone(),
            })
        } else {
            None
        };

        let plan = Plan {
            model: request
                .model
                .unwrap_or_else(|| self.config.default_model.clone()),
            language: request
                .language
                .unwrap_or_else(|| self.config.default_language.key().to_string()),
            extract: ExtractOptions {
                include_notes: request.include_notes.unwrap_or(self.config.include_notes),
                column_gap: self.config.table_column_gap,
            },
            output_dir,
            copy_dir,
        };
        debug!("Plan: {:?}", plan);

        let source = resolve_source(request.source, &self.sandbox.input).await?;
        Ok(State::Extracting { source, plan })
    }
}

impl std::fmt::Debug for NotePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotePipeline")
            .field("config", &self.config)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}

/// Run a single request with a fresh pipeline.
///
/// # Example
/// ```rust,no_run
/// use note_maker::{generate_note, NoteConfig, NoteRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = NoteConfig::builder().input_root("decks").build()?;
/// let request = NoteRequest::select("week1/intro.pptx").language("english");
/// let result = generate_note(request, config).await?;
/// println!("{}", result.note_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn generate_note(
    request: NoteRequest,
    config: NoteConfig,
) -> Result<GenerationResult, NoteError> {
    NotePipeline::new(config)?.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{CompletionBackend, Prompt};
    use crate::progress::StageObserver;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionBackend for Fixed {
        async fn complete(&self, _prompt: &Prompt) -> Result<String, NoteError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct Trace(Mutex<Vec<Stage>>);

    impl StageObserver for Trace {
        fn on_stage(&self, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    fn pipeline(dir: &TempDir) -> NotePipeline {
        let config = NoteConfig::builder()
            .input_root(dir.path())
            .output_root(dir.path().join("out"))
            .backend(Arc::new(Fixed("NOTE")))
            .build()
            .unwrap();
        NotePipeline::new(config).unwrap()
    }

    #[tokio::test]
    async fn unsupported_upload_fails_while_resolving() {
        let dir = TempDir::new().unwrap();
        let trace = Arc::new(Trace::default());
        let pipeline = pipeline(&dir).with_observer(trace.clone());

        let err = pipeline
            .run(NoteRequest::upload("notes.txt", b"hello".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::UnsupportedFormat { .. }));
        assert_eq!(*trace.0.lock().unwrap(), vec![Stage::Resolving, Stage::Failed]);
    }

    #[tokio::test]
    async fn output_dir_escape_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = pipeline(&dir)
            .run(NoteRequest::upload("deck.pptx", vec![]).output_dir("../../tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::PathEscape { .. }));
    }

    #[tokio::test]
    async fn corrupt_deck_fails_while_extracting() {
        let dir = TempDir::new().unwrap();
        let trace = Arc::new(Trace::default());
        let pipeline = pipeline(&dir).with_observer(trace.clone());

        let err = pipeline
            .run(NoteRequest::upload("deck.pptx", b"not a zip".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::ExtractionFailed { .. }));
        assert_eq!(
            *trace.0.lock().unwrap(),
            vec![Stage::Resolving, Stage::Extracting, Stage::Failed]
        );
    }

    #[test]
    fn request_builder() {
        let r = NoteRequest::select("a.pdf")
            .model("gpt-4.1")
            .language("bokmal")
            .copy_to(Some("archive".into()))
            .include_notes(true);
        assert!(r.copy_source);
        assert_eq!(r.copy_dir.as_deref(), Some("archive"));
        assert_eq!(r.include_notes, Some(true));
    }
}
