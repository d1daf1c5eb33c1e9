use super::EMOJI_RE;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static ALL_CAPS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{3,}\b").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+%").unwrap());
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());

/// Call-to-action verbs and time/interaction cues counted as separate signals.
static CTA_SIGNAL_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(shop|buy|get|try|learn|discover|sign up|download)\b").unwrap(),
        Regex::new(r"(?i)\b(now|today|click|tap|visit)\b").unwrap(),
    ]
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextFeatures {
    pub word_count: usize,
    pub char_count: usize,
    pub sentence_count: usize,
    pub all_caps_words: usize,
    /// Uppercase characters over all characters; 0.0 for empty text.
    pub caps_ratio: f64,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub emoji_count: usize,
    pub number_count: usize,
    pub percentage_mentions: usize,
    pub price_mentions: usize,
    pub cta_signals: usize,
}

pub(super) fn extract(text: &str) -> TextFeatures {
    let char_count = text.chars().count();
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    let caps_ratio = if char_count == 0 {
        0.0
    } else {
        upper as f64 / char_count as f64
    };

    TextFeatures {
        word_count: text.split_whitespace().count(),
        char_count,
        sentence_count: text.split('.').filter(|s| !s.trim().is_empty()).count(),
        all_caps_words: ALL_CAPS_RE.find_iter(text).count(),
        caps_ratio,
        exclamation_count: text.matches('!').count(),
        question_count: text.matches('?').count(),
        emoji_count: EMOJI_RE.find_iter(text).count(),
        number_count: NUMBER_RE.find_iter(text).count(),
        percentage_mentions: PERCENT_RE.find_iter(text).count(),
        price_mentions: PRICE_RE.find_iter(text).count(),
        cta_signals: CTA_SIGNAL_RES
            .iter()
            .map(|re| re.find_iter(text).count())
            .sum(),
    }
}
