//! Backend credential lookup and the client cache built on it.
//!
//! The API key is looked up on every request, so rotating it (new env value
//! or an edited key file) takes effect without a restart. Clients are cheap
//! to keep and relatively costly to rebuild, so [`CredentialCache`] holds
//! them per model until the key changes.

use crate::config::NoteConfig;
use crate::error::NoteError;
use edgequake_llm::{LLMProvider, OpenAIProvider};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Where the API key is read from: an environment variable first, then a
/// managed key file.
#[derive(Debug, Clone)]
pub struct CredentialSource {
    env_var: String,
    file: Option<PathBuf>,
}

impl CredentialSource {
    pub fn new(env_var: impl Into<String>, file: Option<PathBuf>) -> Self {
        Self {
            env_var: env_var.into(),
            file,
        }
    }

    pub fn from_config(config: &NoteConfig) -> Self {
        Self::new(config.credential_env.clone(), config.credential_file.clone())
    }

    /// Current key, if any source provides a non-empty one.
    pub fn read(&self) -> Option<String> {
        if let Ok(value) = std::env::var(&self.env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        let path = self.file.as_ref()?;
        let content = std::fs::read_to_string(path).ok()?;
        parse_key_file(&content)
    }

    /// Read the key or fail with a hint naming both sources.
    pub fn require(&self) -> Result<String, NoteError> {
        self.read().ok_or_else(|| NoteError::MissingCredential {
            hint: match &self.file {
                Some(file) => format!(
                    "Set {} or put the key in {}",
                    self.env_var,
                    file.display()
                ),
                None => format!("Set {}", self.env_var),
            },
        })
    }
}

/// First usable value of a key file.
///
/// Blank lines and `#` comments are skipped. A line is either `KEY=VALUE`
/// (the value may be quoted) or the bare key.
pub fn parse_key_file(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let value = match line.split_once('=') {
            Some((_, value)) => unquote(value.trim()),
            None => line,
        };
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Builds a provider for `(api_key, model)`.
pub type ProviderBuilder = Box<dyn Fn(&str, &str) -> Arc<dyn LLMProvider> + Send + Sync>;

struct CachedClient {
    credential: String,
    providers: HashMap<String, Arc<dyn LLMProvider>>,
}

/// Lock-guarded cache of providers keyed by model, valid for one credential.
///
/// The lock is only held to compare the key and clone a provider out; no
/// request is ever awaited under it.
pub struct CredentialCache {
    source: CredentialSource,
    build: ProviderBuilder,
    state: Mutex<Option<CachedClient>>,
}

impl CredentialCache {
    /// Cache building OpenAI providers.
    pub fn new(source: CredentialSource) -> Self {
        Self::with_builder(
            source,
            Box::new(|key, model| Arc::new(OpenAIProvider::new(key).with_model(model))),
        )
    }

    pub fn with_builder(source: CredentialSource, build: ProviderBuilder) -> Self {
        Self {
            source,
            build,
            state: Mutex::new(None),
        }
    }

    /// Provider for `model` under the current credential.
    ///
    /// Reads the credential, drops every cached provider if it changed, and
    /// builds the model's provider on first use.
    pub fn provider(&self, model: &str) -> Result<Arc<dyn LLMProvider>, NoteError> {
        let credential = self.source.require()?;

        let mut state = self
            .state
            .lock()
            .map_err(|_| NoteError::Internal("credential cache lock poisoned".into()))?;

        if state.as_ref().map_or(true, |c| c.credential != credential) {
            debug!("Credential changed; rebuilding client cache");
            *state = Some(CachedClient {
                credential: credential.clone(),
                providers: HashMap::new(),
            });
        }

        let cached = state
            .as_mut()
            .ok_or_else(|| NoteError::Internal("credential cache empty".into()))?;
        let provider = cached
            .providers
            .entry(model.to_string())
            .or_insert_with(|| {
                debug!("Building provider for model {}", model);
                (self.build)(&credential, model)
            });
        Ok(Arc::clone(provider))
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn key_file_formats() {
        assert_eq!(parse_key_file("sk-bare\n").as_deref(), Some("sk-bare"));
        assert_eq!(
            parse_key_file("# managed\n\nOPENAI_API_KEY=\"sk-quoted\"\n").as_deref(),
            Some("sk-quoted")
        );
        assert_eq!(parse_key_file("KEY='sk-single'").as_deref(), Some("sk-single"));
        assert_eq!(
            parse_key_file("OPENAI_API_KEY=\nOTHER=sk-next").as_deref(),
            Some("sk-next")
        );
        assert_eq!(parse_key_file("# only a comment\n"), None);
    }

    fn file_source(dir: &TempDir, content: &str) -> CredentialSource {
        let path = dir.path().join("config.env");
        std::fs::write(&path, content).unwrap();
        CredentialSource::new("NOTE_MAKER_TEST_KEY_THAT_IS_NEVER_SET", Some(path))
    }

    #[test]
    fn missing_credential_names_sources() {
        let source = CredentialSource::new(
            "NOTE_MAKER_TEST_KEY_THAT_IS_NEVER_SET",
            Some(PathBuf::from("/nonexistent/config.env")),
        );
        let err = source.require().unwrap_err();
        assert!(matches!(err, NoteError::MissingCredential { .. }));
        assert!(err.to_string().contains("NOTE_MAKER_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    fn counting_cache(source: CredentialSource) -> (Arc<AtomicUsize>, CredentialCache) {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let cache = CredentialCache::with_builder(
            source,
            Box::new(move |key, model| {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(OpenAIProvider::new(key).with_model(model))
            }),
        );
        (builds, cache)
    }

    #[test]
    fn providers_are_reused_per_model() {
        let dir = TempDir::new().unwrap();
        let (builds, cache) = counting_cache(file_source(&dir, "sk-one"));

        cache.provider("gpt-5.1").unwrap();
        cache.provider("gpt-5.1").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        cache.provider("gpt-4.1").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn credential_change_rebuilds() {
        let dir = TempDir::new().unwrap();
        let (builds, cache) = counting_cache(file_source(&dir, "sk-one"));
        cache.provider("gpt-5.1").unwrap();

        std::fs::write(dir.path().join("config.env"), "sk-two").unwrap();
        cache.provider("gpt-5.1").unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_credential_builds_nothing() {
        let source = CredentialSource::new("NOTE_MAKER_TEST_KEY_THAT_IS_NEVER_SET", None);
        let (builds, cache) = counting_cache(source);
        assert!(cache.provider("gpt-5").is_err());
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }
}
