// src/engine/classifier.rs
//! Rule-based candidate classification. The rejection cascade is an ordered
//! table of named stages; order is load-bearing, since a later stage can veto
//! matches an earlier stage would have scored but not the other way around.

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::config::{EngineConfig, KeywordSets};
use crate::engine::ClassificationResult;

/// Base contribution of each matched keyword.
const KEYWORD_SCORE: f64 = 2.5;
/// Hard ceiling on the final score.
const MAX_SCORE: f64 = 10.0;
/// Posts shorter than this many characters lean toward genuine seekers.
const SHORT_POST_CHARS: usize = 300;
const SHORT_POST_BONUS: f64 = 1.5;
/// Per distinct known location phrase found in the text.
const LOCATION_BONUS: f64 = 0.5;
/// Granted once if any first-person job-seeking pattern is present.
const FIRST_PERSON_BONUS: f64 = 2.0;
const AGE_DISCLOSURE_BONUS: f64 = 1.5;
/// Characters inspected before a context-dependent phrase.
const CONTEXT_WINDOW_CHARS: usize = 50;

/// "age N" in either grammatical gender, followed by a two-digit number.
const AGE_PATTERN: &str = r"(בן|בת)\s?\d{2}";

/// Post text prepared for matching: the raw form plus a case-folded form.
/// Folding is a no-op for Hebrew, so non-Latin script is matched verbatim.
struct ScanText<'a> {
    raw: &'a str,
    folded: String,
    char_len: usize,
}

impl<'a> ScanText<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            folded: raw.to_lowercase(),
            char_len: raw.chars().count(),
        }
    }

    fn contains(&self, pattern: &str) -> bool {
        self.raw.contains(pattern) || self.folded.contains(pattern.to_lowercase().as_str())
    }
}

type RejectionCheck = fn(&PostClassifier, &ScanText) -> bool;

/// Rejection stages in evaluation order. Each is a pure predicate over the
/// prepared text; the first hit rejects the post outright.
const REJECTION_STAGES: [(&str, RejectionCheck); 3] = [
    ("hard_disqualify", PostClassifier::is_hard_disqualified),
    ("employer_only", PostClassifier::has_employer_only_signal),
    ("employer_context", PostClassifier::has_employer_context_signal),
];

/// Decides whether a post was written by a job seeker and how confidently.
pub struct PostClassifier {
    config: Arc<EngineConfig>,
    age_pattern: Regex,
}

impl PostClassifier {
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        let age_pattern =
            Regex::new(AGE_PATTERN).context("Failed to compile age disclosure pattern")?;
        Ok(Self {
            config,
            age_pattern,
        })
    }

    fn keywords(&self) -> &KeywordSets {
        &self.config.keywords
    }

    /// Classify raw post text. Total over any string; never panics.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        if text.is_empty() {
            return ClassificationResult::rejected();
        }

        let scan = ScanText::new(text);

        for (stage, rejects) in REJECTION_STAGES {
            if rejects(self, &scan) {
                debug!(stage, "post rejected");
                return ClassificationResult::rejected();
            }
        }

        let matched_keywords = self.collect_positive_signals(&scan);
        if matched_keywords.is_empty() {
            return ClassificationResult::rejected();
        }

        let score = self.score(&scan, &matched_keywords);
        ClassificationResult {
            is_candidate: score >= self.config.thresholds.candidacy,
            score,
            matched_keywords,
        }
    }

    /// A lone negative keyword is ambiguous; combined with an unambiguous
    /// employer phrase it is certain.
    fn is_hard_disqualified(&self, scan: &ScanText) -> bool {
        let negative_hit = self.keywords().negative.iter().any(|k| scan.contains(k));
        negative_hit
            && self
                .keywords()
                .always_disqualify
                .iter()
                .any(|p| scan.contains(p))
    }

    fn has_employer_only_signal(&self, scan: &ScanText) -> bool {
        self.keywords().employer_only.iter().any(|p| scan.contains(p))
    }

    /// Context-dependent phrases reject only when their surrounding text
    /// reads employer-side; candidate-side usage is neutral.
    fn has_employer_context_signal(&self, scan: &ScanText) -> bool {
        self.keywords()
            .context_dependent
            .iter()
            .any(|kw| scan.contains(kw) && self.is_employer_context(scan.raw, kw))
    }

    /// Inspect the window before the first case-insensitive occurrence of
    /// `keyword`. Later occurrences are deliberately not scanned; a post that
    /// repeats the keyword in employer phrasing further down is missed.
    pub fn is_employer_context(&self, text: &str, keyword: &str) -> bool {
        let folded = text.to_lowercase();
        let needle = keyword.to_lowercase();
        let Some(idx) = folded.find(&needle) else {
            return false;
        };

        let window_start = folded[..idx]
            .char_indices()
            .rev()
            .nth(CONTEXT_WINDOW_CHARS - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let window = &folded[window_start..idx];

        self.keywords()
            .employer_context_prefixes
            .iter()
            .any(|prefix| window.contains(prefix.to_lowercase().as_str()))
    }

    /// Positive keywords, then seeker-phrase labels deduplicated by label.
    fn collect_positive_signals(&self, scan: &ScanText) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();

        for keyword in &self.keywords().positive {
            if scan.contains(keyword) {
                matched.push(keyword.clone());
            }
        }

        for seeker in &self.keywords().seeker_phrases {
            if scan.contains(&seeker.phrase) && !matched.iter().any(|m| m == &seeker.label) {
                matched.push(seeker.label.clone());
            }
        }

        matched
    }

    fn score(&self, scan: &ScanText, matched_keywords: &[String]) -> f64 {
        let mut score = (matched_keywords.len() as f64 * KEYWORD_SCORE).min(MAX_SCORE);

        if scan.char_len < SHORT_POST_CHARS {
            score += SHORT_POST_BONUS;
        }

        for location in &self.keywords().locations {
            if scan.raw.contains(location.as_str()) {
                score += LOCATION_BONUS;
            }
        }

        if self
            .keywords()
            .first_person_patterns
            .iter()
            .any(|p| scan.contains(p))
        {
            score += FIRST_PERSON_BONUS;
        }

        if self.age_pattern.is_match(scan.raw) {
            score += AGE_DISCLOSURE_BONUS;
        }

        score.min(MAX_SCORE)
    }
}
