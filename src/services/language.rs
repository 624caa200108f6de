//! Three-way language identification (English / isiZulu / Afrikaans).
//!
//! Short texts are statistically unreliable, so anything under the configured
//! minimum length bypasses detection and keeps the session's current
//! language. Low-confidence detections do the same.

use whatlang::{Detector, Lang};

use crate::domain::models::config::LanguageConfig;
use crate::domain::models::conversation::Language;

/// Pure, deterministic language detector over the three supported languages.
pub struct LanguageDetector {
    detector: Detector,
    config: LanguageConfig,
}

impl LanguageDetector {
    pub fn new(config: LanguageConfig) -> Self {
        let detector = Detector::with_allowlist(vec![Lang::Eng, Lang::Zul, Lang::Afr]);
        Self { detector, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(LanguageConfig::default())
    }

    /// Detect the language of `text`, substituting `fallback` whenever the
    /// signal is too short or too weak.
    pub fn detect(&self, text: &str, fallback: Language) -> Language {
        let trimmed = text.trim();
        if trimmed.len() < self.config.min_text_len {
            return fallback;
        }

        match self.detector.detect(trimmed) {
            Some(info) if info.confidence() >= self.config.min_confidence => {
                map_lang(info.lang()).unwrap_or(fallback)
            }
            _ => fallback,
        }
    }

    /// Detect with the winning confidence exposed, for diagnostics.
    ///
    /// Never substitutes a fallback silently: no-signal cases come back as
    /// `(En, 0.0)` so callers can tell "nothing detected" apart from
    /// "detected English".
    pub fn detect_with_confidence(&self, text: &str) -> (Language, f64) {
        let trimmed = text.trim();
        if trimmed.len() < self.config.min_text_len {
            return (Language::En, 0.0);
        }

        match self.detector.detect(trimmed) {
            Some(info) if info.confidence() >= self.config.min_confidence => {
                match map_lang(info.lang()) {
                    Some(language) => (language, info.confidence()),
                    None => (Language::En, 0.0),
                }
            }
            _ => (Language::En, 0.0),
        }
    }
}

fn map_lang(lang: Lang) -> Option<Language> {
    match lang {
        Lang::Eng => Some(Language::En),
        Lang::Zul => Some(Language::Zu),
        Lang::Afr => Some(Language::Af),
        _ => None,
    }
}
