use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// CTA phrase groups. Matches are reported group by group, in text order within each group.
static CTA_PHRASE_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(shop now|buy today|get started|learn more|sign up|download)\b").unwrap(),
        Regex::new(r"(?i)\b(click here|tap to|visit us|try free|order now)\b").unwrap(),
        Regex::new(r"(?i)\b(limited time|act now|don't miss|hurry up)\b").unwrap(),
    ]
});

static POSITIVE_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(amazing|awesome|great|excellent|perfect|love|best)\b").unwrap(),
        Regex::new(r"(?i)\b(incredible|fantastic|wonderful|outstanding|brilliant)\b").unwrap(),
    ]
});

static NEGATIVE_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(terrible|awful|worst|hate|horrible|bad)\b").unwrap(),
        Regex::new(r"(?i)\b(disappointing|frustrating|annoying|poor)\b").unwrap(),
    ]
});

static URGENCY_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(urgent|immediate|asap|quickly|fast|rapid)\b").unwrap(),
        Regex::new(r"(?i)\b(deadline|expires|limited|ending|final)\b").unwrap(),
    ]
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentIndicators {
    pub positive_count: usize,
    pub negative_count: usize,
    pub urgency_count: usize,
}

fn count_all(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

/// Lowercased, punctuation-free words of at least `min_length` chars that
/// aren't stop words. Sorted and deduplicated.
pub(super) fn buzzwords(text: &str, min_length: usize, stop_words: &BTreeSet<String>) -> Vec<String> {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase();

    stripped
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_length && !stop_words.contains(*w))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub(super) fn cta_phrases(text: &str) -> Vec<String> {
    CTA_PHRASE_RES
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect()
}

pub(super) fn sentiment(text: &str) -> SentimentIndicators {
    SentimentIndicators {
        positive_count: count_all(&*POSITIVE_RES, text),
        negative_count: count_all(&*NEGATIVE_RES, text),
        urgency_count: count_all(&*URGENCY_RES, text),
    }
}
