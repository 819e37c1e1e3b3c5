use std::env;

use crate::models::DetectedIntent;
use crate::services::catalog::Catalog;

/// Signal vocabularies for the checkout heuristics. Defaults live here;
/// every list can be replaced from the environment without a code change.
#[derive(Debug, Clone)]
pub struct IntentVocabulary {
    pub checkout: Vec<String>,
    pub immediate: Vec<String>,
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for IntentVocabulary {
    fn default() -> Self {
        Self {
            checkout: words(&["order", "buy", "purchase", "checkout", "proceed"]),
            immediate: words(&[
                "proceeding",
                "your information",
                "your details",
                "your name",
            ]),
            affirmative: words(&[
                "yes", "yeah", "sure", "ok", "okay", "confirm", "go ahead", "deal", "take it",
                "what do you need",
            ]),
            negative: words(&["no", "cancel", "stop", "not now", "never mind"]),
        }
    }
}

impl IntentVocabulary {
    /// Comma-separated overrides: CHECKOUT_WORDS, IMMEDIACY_WORDS,
    /// AFFIRMATIVE_WORDS, NEGATIVE_WORDS.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            checkout: words_from_env("CHECKOUT_WORDS", defaults.checkout),
            immediate: words_from_env("IMMEDIACY_WORDS", defaults.immediate),
            affirmative: words_from_env("AFFIRMATIVE_WORDS", defaults.affirmative),
            negative: words_from_env("NEGATIVE_WORDS", defaults.negative),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn words_from_env(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => {
            let parsed: Vec<String> = raw
                .split(',')
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();
            if parsed.is_empty() {
                default
            } else {
                parsed
            }
        }
        Err(_) => default,
    }
}

fn contains_any(text: &str, vocabulary: &[String]) -> bool {
    vocabulary.iter().any(|word| text.contains(word.as_str()))
}

/// Scans one assistant reply for a catalog reference and checkout-readiness
/// signals. Case-insensitive substring search; the first item in catalog
/// order wins. Best-effort by design, but deterministic for the same input.
pub fn detect(assistant_text: &str, catalog: &Catalog, vocab: &IntentVocabulary) -> DetectedIntent {
    let lowered = assistant_text.to_lowercase();

    let item_id = catalog
        .items()
        .find(|indexed| lowered.contains(&indexed.item.name.to_lowercase()))
        .map(|indexed| indexed.item.id.clone());

    let wants_checkout = contains_any(&lowered, &vocab.checkout);
    let ready_immediately = wants_checkout && contains_any(&lowered, &vocab.immediate);

    DetectedIntent {
        item_id,
        wants_checkout,
        ready_immediately,
    }
}

pub fn is_affirmative(text: &str, vocab: &IntentVocabulary) -> bool {
    contains_any(&text.to_lowercase(), &vocab.affirmative)
}

pub fn is_negative(text: &str, vocab: &IntentVocabulary) -> bool {
    contains_any(&text.to_lowercase(), &vocab.negative)
}
