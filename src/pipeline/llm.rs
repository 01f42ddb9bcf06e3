//! Note generation: one chat request per note.
//!
//! [`NoteGenerator`] checks the request, renders the language's prompt and
//! hands a [`Prompt`] to a [`CompletionBackend`]. The backend is a trait so
//! the pipeline can run against a stub; the production [`LlmBackend`] talks
//! to OpenAI through `edgequake-llm`.
//!
//! There is no retry and no streaming: a failed call fails the run.

use crate::config::NoteConfig;
use crate::error::NoteError;
use crate::language::Language;
use crate::pipeline::credentials::{CredentialCache, CredentialSource};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A fully rendered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub model: String,
    pub system: String,
    pub user: String,
}

/// Something that turns a [`Prompt`] into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Raw completion text. May be empty; the caller decides what that means.
    async fn complete(&self, prompt: &Prompt) -> Result<String, NoteError>;
}

/// OpenAI chat completions via `edgequake-llm`.
#[derive(Debug)]
pub struct LlmBackend {
    cache: CredentialCache,
}

impl LlmBackend {
    pub fn new(cache: CredentialCache) -> Self {
        Self { cache }
    }

    pub fn from_config(config: &NoteConfig) -> Self {
        Self::new(CredentialCache::new(CredentialSource::from_config(config)))
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<String, NoteError> {
        let provider = self.cache.provider(&prompt.model)?;
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        // gpt-5 models reject a custom temperature; leave sampling at the defaults.
        let options = CompletionOptions::default();

        let start = Instant::now();
        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| NoteError::GenerationBackendFailure {
                message: e.to_string(),
            })?;
        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            prompt.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Validates requests and renders prompts for a backend.
#[derive(Clone)]
pub struct NoteGenerator {
    backend: Arc<dyn CompletionBackend>,
    models: Vec<String>,
}

impl NoteGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    /// Use the injected backend if the config has one, else [`LlmBackend`].
    pub fn from_config(config: &NoteConfig) -> Self {
        let backend = match &config.backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(LlmBackend::from_config(config)) as Arc<dyn CompletionBackend>,
        };
        Self::new(backend, config.models.clone())
    }

    /// Generate a note from extracted `text`.
    ///
    /// Checks, in order: non-blank text, allowed model, known language. The
    /// credential is the backend's concern.
    pub async fn generate(
        &self,
        text: &str,
        model: &str,
        language_key: &str,
    ) -> Result<String, NoteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NoteError::EmptyInput {
                source_name: "extracted text".into(),
            });
        }
        if !self.models.iter().any(|m| m == model) {
            return Err(NoteError::InvalidModel {
                model: model.to_string(),
                allowed: self.models.join(", "),
            });
        }
        let profile = language_key.parse::<Language>()?.profile();

        let prompt = Prompt {
            model: model.to_string(),
            system: profile.system_prompt.to_string(),
            user: profile.user_message(text),
        };
        info!(
            "Generating {} note with {} ({} chars of input)",
            profile.key,
            model,
            text.len()
        );

        let note = self.backend.complete(&prompt).await?;
        let note = note.trim();
        if note.is_empty() {
            return Err(NoteError::EmptyGeneration {
                model: model.to_string(),
            });
        }
        Ok(note.to_string())
    }
}

impl std::fmt::Debug for NoteGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteGenerator")
            .field("models", &self.models)
            .field("backend", &"<dyn CompletionBackend>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records prompts and answers with a fixed reply.
    struct StubBackend {
        reply: String,
        seen: Mutex<Vec<Prompt>>,
    }

    impl StubBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(&self, prompt: &Prompt) -> Result<String, NoteError> {
            self.seen.lock().unwrap().push(prompt.clone());
            Ok(self.reply.clone())
        }
    }

    fn generator(backend: Arc<StubBackend>) -> NoteGenerator {
        NoteGenerator::new(backend, vec!["gpt-5.1".into(), "gpt-4.1".into()])
    }

    #[tokio::test]
    async fn blank_text_never_reaches_backend() {
        let stub = StubBackend::new("NOTE");
        let err = generator(stub.clone())
            .generate("  \n", "gpt-5.1", "nynorsk")
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::EmptyInput { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn precondition_order() {
        let stub = StubBackend::new("NOTE");
        let gen = generator(stub.clone());

        // Both model and language are wrong: the model is reported.
        let err = gen.generate("text", "gpt-2", "klingon").await.unwrap_err();
        assert!(matches!(err, NoteError::InvalidModel { .. }));

        let err = gen.generate("text", "gpt-4.1", "klingon").await.unwrap_err();
        assert!(matches!(err, NoteError::UnknownLanguage { .. }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn prompt_carries_profile_and_trimmed_text() {
        let stub = StubBackend::new("  # Note\n\nBody  \n");
        let note = generator(stub.clone())
            .generate("\n  TITLE: Intro\n- Topic A  ", "gpt-4.1", "english")
            .await
            .unwrap();
        assert_eq!(note, "# Note\n\nBody");

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let prompt = &seen[0];
        assert_eq!(prompt.model, "gpt-4.1");
        assert_eq!(prompt.system, Language::English.profile().system_prompt);
        assert!(prompt.user.contains("TITLE: Intro\n- Topic A"));
        assert!(!prompt.user.contains("TITLE: Intro\n- Topic A  "));
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let stub = StubBackend::new(" \n ");
        let err = generator(stub)
            .generate("text", "gpt-5.1", "bokmal")
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::EmptyGeneration { .. }));
    }

    #[tokio::test]
    async fn injected_backend_wins() {
        let stub = StubBackend::new("from stub");
        let config = NoteConfig::builder()
            .backend(stub.clone())
            .build()
            .unwrap();
        let note = NoteGenerator::from_config(&config)
            .generate("text", "gpt-5.1", "nynorsk")
            .await
            .unwrap();
        assert_eq!(note, "from stub");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn missing_credential_surfaces_from_backend() {
        let config = NoteConfig::builder()
            .credential_env("NOTE_MAKER_TEST_KEY_THAT_IS_NEVER_SET")
            .credential_file(None)
            .build()
            .unwrap();
        let err = NoteGenerator::from_config(&config)
            .generate("text", "gpt-5.1", "nynorsk")
            .await
            .unwrap_err();
        assert!(matches!(err, NoteError::MissingCredential { .. }));
    }
}
