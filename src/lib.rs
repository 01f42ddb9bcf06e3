//! # note-maker
//!
//! Turn lecture slide decks (`.pptx`) and paged documents (`.pdf`) into
//! structured study notes written by an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload bytes / path under the input root
//!  │
//!  ├─ 1. Resolve   validate the extension, spool uploads, confine paths
//!  ├─ 2. Extract   slides → TITLE / bullets / tables / notes,
//!  │               pages  → text + detected tables (spawn_blocking)
//!  ├─ 3. Generate  one chat call with the language's prompt
//!  └─ 4. Place     {stem}_{suffix}.md in the output dir, optional copy
//! ```
//!
//! Every caller-supplied path is relative to one of three sandbox roots
//! (input, output, copy); see [`sandbox`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use note_maker::{NoteConfig, NotePipeline, NoteRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from OPENAI_API_KEY or the managed config.env
//!     let config = NoteConfig::builder()
//!         .input_root("lectures")
//!         .output_root("notes")
//!         .build()?;
//!     let pipeline = NotePipeline::new(config)?;
//!     let result = pipeline
//!         .run(NoteRequest::select("week1/intro.pptx").language("english"))
//!         .await?;
//!     println!("{}", result.note_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `note-maker` binary (clap + anyhow + tracing-subscriber) |
//!
//! PDF extraction binds to a pdfium shared library at run time: set
//! `PDFIUM_LIB_PATH`, place it in the working directory, or install it
//! system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sandbox;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NoteConfig, NoteConfigBuilder, AVAILABLE_MODELS, DEFAULT_MODEL};
pub use convert::{generate_note, NotePipeline, NoteRequest};
pub use error::NoteError;
pub use language::{Language, LanguageProfile};
pub use output::{GenerationPayload, GenerationResult, OptionsPayload};
pub use pipeline::document::{Block, ExtractedDocument, SourceFormat};
pub use pipeline::input::SourceRef;
pub use pipeline::llm::{CompletionBackend, NoteGenerator, Prompt};
pub use pipeline::{extract, ExtractOptions};
pub use progress::{Stage, StageObserver};
pub use sandbox::{DirectoryListing, RootTag, Sandbox, SandboxRoot};
