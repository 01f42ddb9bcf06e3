//! The closed set of output languages.
//!
//! A note is written in exactly one [`Language`]. Each variant owns a static
//! [`LanguageProfile`]: display label, system preamble, user template and the
//! suffix that ends up in the note's file name. Keys coming from outside
//! (CLI flags, form fields) are parsed once with [`Language::from_str`];
//! after that the language is a plain `Copy` value and cannot be misspelt.

use crate::error::NoteError;
use crate::prompts::{
    render_user_message, BOKMAL_SYSTEM_PROMPT, BOKMAL_USER_TEMPLATE, ENGLISH_SYSTEM_PROMPT,
    ENGLISH_USER_TEMPLATE, NYNORSK_SYSTEM_PROMPT, NYNORSK_USER_TEMPLATE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static per-language prompt and naming data.
#[derive(Debug, PartialEq, Eq)]
pub struct LanguageProfile {
    pub key: &'static str,
    pub label: &'static str,
    pub system_prompt: &'static str,
    pub user_template: &'static str,
    pub note_suffix: &'static str,
}

impl LanguageProfile {
    /// Build the user turn for `text`.
    pub fn user_message(&self, text: &str) -> String {
        render_user_message(self.user_template, text)
    }
}

static NYNORSK: LanguageProfile = LanguageProfile {
    key: "nynorsk",
    label: "Nynorsk",
    system_prompt: NYNORSK_SYSTEM_PROMPT,
    user_template: NYNORSK_USER_TEMPLATE,
    note_suffix: "notat_nynorsk",
};

static BOKMAL: LanguageProfile = LanguageProfile {
    key: "bokmal",
    label: "Bokmål",
    system_prompt: BOKMAL_SYSTEM_PROMPT,
    user_template: BOKMAL_USER_TEMPLATE,
    note_suffix: "notat_bokmal",
};

static ENGLISH: LanguageProfile = LanguageProfile {
    key: "english",
    label: "English",
    system_prompt: ENGLISH_SYSTEM_PROMPT,
    user_template: ENGLISH_USER_TEMPLATE,
    note_suffix: "note_english",
};

/// Output language of a generated note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Nynorsk,
    Bokmal,
    English,
}

impl Language {
    /// Every language, in display order.
    pub const ALL: [Language; 3] = [Language::Nynorsk, Language::Bokmal, Language::English];

    /// Language used when the caller does not pick one.
    pub const DEFAULT: Language = Language::Nynorsk;

    pub fn profile(self) -> &'static LanguageProfile {
        match self {
            Language::Nynorsk => &NYNORSK,
            Language::Bokmal => &BOKMAL,
            Language::English => &ENGLISH,
        }
    }

    pub fn key(self) -> &'static str {
        self.profile().key
    }

    pub fn label(self) -> &'static str {
        self.profile().label
    }

    /// Look a language up by its display label (e.g. "Bokmål").
    pub fn from_label(label: &str) -> Option<Language> {
        Self::ALL.into_iter().find(|l| l.label() == label)
    }

    /// Comma-separated list of valid keys, for error messages.
    pub fn available_keys() -> String {
        Self::ALL.map(Language::key).join(", ")
    }
}

impl FromStr for Language {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.key() == key)
            .ok_or_else(|| NoteError::UnknownLanguage {
                key: key.to_string(),
                available: Self::available_keys(),
            })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolve a language key straight to its profile.
pub fn resolve(key: &str) -> Result<&'static LanguageProfile, NoteError> {
    key.parse::<Language>().map(Language::profile)
}

/// All profiles, in display order.
pub fn profiles() -> impl Iterator<Item = &'static LanguageProfile> {
    Language::ALL.into_iter().map(Language::profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::TEXT_PLACEHOLDER;

    #[test]
    fn every_profile_is_complete() {
        for p in profiles() {
            assert!(!p.key.is_empty());
            assert!(!p.label.is_empty());
            assert!(!p.system_prompt.trim().is_empty());
            assert!(!p.note_suffix.is_empty());
            assert_eq!(p.user_template.matches(TEXT_PLACEHOLDER).count(), 1);
        }
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for lang in Language::ALL {
            assert_eq!(lang.key().parse::<Language>().unwrap(), lang);
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "klingon".parse::<Language>().unwrap_err();
        match err {
            NoteError::UnknownLanguage { key, available } => {
                assert_eq!(key, "klingon");
                assert!(available.contains("nynorsk"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn default_is_nynorsk() {
        assert_eq!(Language::DEFAULT, Language::default());
        assert_eq!(Language::DEFAULT.key(), "nynorsk");
    }

    #[test]
    fn label_lookup() {
        assert_eq!(Language::from_label("Bokmål"), Some(Language::Bokmal));
        assert_eq!(Language::from_label("Bokmal"), None);
    }

    #[test]
    fn english_suffix() {
        assert_eq!(resolve("english").unwrap().note_suffix, "note_english");
    }

    #[test]
    fn user_message_embeds_text() {
        let msg = Language::Bokmal.profile().user_message("Topic A");
        assert!(msg.contains("Topic A"));
        assert!(!msg.contains(TEXT_PLACEHOLDER));
    }
}
