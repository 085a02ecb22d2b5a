// src/engine/extractor.rs
//! Pulls structured facts out of post text for reply personalization.
//! Independent of the classifier; runs only on accepted posts.

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::CandidateInfo;

/// Local phone-number shape: leading 0, 1-2 digits, optional separator,
/// 7 digits.
const PHONE_PATTERN: &str = r"0\d{1,2}[-\s]?\d{7}";

pub struct CandidateInfoExtractor {
    config: Arc<EngineConfig>,
    phone_pattern: Regex,
}

impl CandidateInfoExtractor {
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        let phone_pattern =
            Regex::new(PHONE_PATTERN).context("Failed to compile phone number pattern")?;
        Ok(Self {
            config,
            phone_pattern,
        })
    }

    /// Always succeeds; absent facts simply come back empty.
    pub fn extract(&self, text: &str, author_name: &str) -> CandidateInfo {
        let folded = text.to_lowercase();
        let keywords = &self.config.keywords;

        // Locations are proper nouns in a script without case semantics, so
        // they match against the raw text.
        let locations_mentioned = keywords
            .locations
            .iter()
            .filter(|location| text.contains(location.as_str()))
            .cloned()
            .collect();

        let skills_mentioned = keywords
            .skill_keywords
            .iter()
            .filter(|skill| folded.contains(skill.to_lowercase().as_str()))
            .cloned()
            .collect();

        CandidateInfo {
            name: author_name.to_string(),
            has_phone: self.phone_pattern.is_match(text),
            has_experience: keywords
                .experience_keywords
                .iter()
                .any(|keyword| folded.contains(keyword.to_lowercase().as_str())),
            locations_mentioned,
            skills_mentioned,
        }
    }
}
