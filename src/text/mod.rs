pub mod features;
pub mod signals;

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub use features::TextFeatures;
pub use signals::SentimentIndicators;

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(\\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Emoticons, pictographs, transport symbols, flags, dingbats, and the wide
/// enclosed-character block that ad copy tends to sprinkle around.
pub(crate) static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{2702}-\x{27B0}",
        r"\x{24C2}-\x{1F251}",
        "]+",
    ))
    .unwrap()
});

const DEFAULT_STOP_WORDS: [&str; 12] = [
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

pub const DEFAULT_BUZZWORD_MIN_LENGTH: usize = 3;

/// Cleaning and feature extraction for short marketing copy.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    stop_words: BTreeSet<String>,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the processor can say about one piece of copy.
#[derive(Debug, Clone, Serialize)]
pub struct TextReport {
    pub cleaned: String,
    pub features: TextFeatures,
    pub buzzwords: Vec<String>,
    pub cta_phrases: Vec<String>,
    pub sentiment: SentimentIndicators,
}

impl TextProcessor {
    pub fn new() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Replace the stop list used by buzzword extraction. Words are lowercased.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Strip markup, links and (optionally) emoji, then normalize whitespace.
    pub fn clean_text(&self, text: &str, remove_emojis: bool) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = HTML_TAG_RE.replace_all(text, "");
        let text = URL_RE.replace_all(&text, "");
        let text = if remove_emojis {
            EMOJI_RE.replace_all(&text, "").into_owned()
        } else {
            text.into_owned()
        };

        WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
    }

    pub fn extract_features(&self, text: &str) -> TextFeatures {
        features::extract(text)
    }

    pub fn extract_buzzwords(&self, text: &str, min_length: usize) -> Vec<String> {
        signals::buzzwords(text, min_length, &self.stop_words)
    }

    pub fn extract_cta_text(&self, text: &str) -> Vec<String> {
        signals::cta_phrases(text)
    }

    pub fn analyze_sentiment_indicators(&self, text: &str) -> SentimentIndicators {
        signals::sentiment(text)
    }

    /// Clean the text once and run every extractor over the cleaned form.
    pub fn analyze(&self, text: &str, remove_emojis: bool, min_length: usize) -> TextReport {
        let cleaned = self.clean_text(text, remove_emojis);
        TextReport {
            features: self.extract_features(&cleaned),
            buzzwords: self.extract_buzzwords(&cleaned, min_length),
            cta_phrases: self.extract_cta_text(&cleaned),
            sentiment: self.analyze_sentiment_indicators(&cleaned),
            cleaned,
        }
    }
}

pub fn clean_text(text: &str, remove_emojis: bool) -> String {
    TextProcessor::new().clean_text(text, remove_emojis)
}

pub fn extract_features(text: &str) -> TextFeatures {
    TextProcessor::new().extract_features(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_tags_and_urls() {
        let raw = "<p>Shop   now</p> at https://example.com/deal?id=4! \n\t today";
        assert_eq!(clean_text(raw, false), "Shop now at today");
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_text("", true), "");
        assert_eq!(clean_text("   \n ", false), "");
    }

    #[test]
    fn test_clean_keeps_emoji_unless_asked() {
        let raw = "Great deal \u{1F600}\u{1F600} today";
        assert_eq!(clean_text(raw, false), raw);
        assert_eq!(clean_text(raw, true), "Great deal today");
    }

    #[test]
    fn test_analyze_runs_on_cleaned_text() {
        let processor = TextProcessor::new();
        let report = processor.analyze(
            "<b>AMAZING</b> offer, shop now: https://x.io/a",
            false,
            DEFAULT_BUZZWORD_MIN_LENGTH,
        );
        assert_eq!(report.cleaned, "AMAZING offer, shop now:");
        assert_eq!(report.features.all_caps_words, 1);
        assert_eq!(report.cta_phrases, vec!["shop now".to_string()]);
        assert_eq!(report.sentiment.positive_count, 1);
        assert!(report.buzzwords.contains(&"offer".to_string()));
    }

    #[test]
    fn test_custom_stop_words() {
        let processor = TextProcessor::new().with_stop_words(["Deal"]);
        let words = processor.extract_buzzwords("the deal of the day", 3);
        assert_eq!(words, vec!["day".to_string(), "the".to_string()]);
    }
}
