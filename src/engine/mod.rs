// src/engine/mod.rs
//! The post-analysis engine: classification, fact extraction, job matching
//! and the respond/deny gate, composed into a single `analyze` entry point.
//!
//! Every component is a pure function over immutable configuration; the
//! engine holds no mutable state and may be called concurrently or
//! repeatedly on the same post with identical results.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{EngineConfig, JobDescriptor};

pub mod classifier;
pub mod extractor;
pub mod gate;
pub mod matcher;

pub use classifier::PostClassifier;
pub use extractor::CandidateInfoExtractor;
pub use gate::ResponseGate;
pub use matcher::JobMatcher;

/// Reason attached to analyses that never reach the response gate.
pub const REASON_NOT_CANDIDATE: &str = "not classified as candidate";

/// A scraped post as handed over by the browsing collaborator. Never mutated
/// by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub post_url: Option<String>,
    /// Raw timestamp string as scraped; may be absent or unparseable.
    #[serde(default)]
    pub posted_at: Option<String>,
}

/// Verdict of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_candidate: bool,
    /// Always within `[0, 10]`.
    pub score: f64,
    pub matched_keywords: Vec<String>,
}

impl ClassificationResult {
    pub(crate) fn rejected() -> Self {
        Self {
            is_candidate: false,
            score: 0.0,
            matched_keywords: Vec::new(),
        }
    }
}

/// Structured facts pulled out of the post text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub name: String,
    pub has_phone: bool,
    pub has_experience: bool,
    pub locations_mentioned: Vec<String>,
    pub skills_mentioned: Vec<String>,
}

/// Best open position for a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatch {
    pub job_key: String,
    pub job: JobDescriptor,
    pub match_score: f64,
    pub matched_keywords: Vec<String>,
}

/// The aggregate handed to persistence and reply rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub classification: ClassificationResult,
    pub candidate_info: Option<CandidateInfo>,
    pub matched_job: Option<JobMatch>,
    pub should_respond: bool,
    pub reason: String,
}

/// Composes the pipeline stages into one `analyze(post)` call.
pub struct PostAnalyzer {
    classifier: PostClassifier,
    extractor: CandidateInfoExtractor,
    matcher: JobMatcher,
    gate: ResponseGate,
}

impl PostAnalyzer {
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        Ok(Self {
            classifier: PostClassifier::new(config.clone())?,
            extractor: CandidateInfoExtractor::new(config.clone())?,
            matcher: JobMatcher::new(config.clone()),
            gate: ResponseGate::new(config),
        })
    }

    /// Analyze a single post. Non-candidates short-circuit with empty
    /// downstream fields; candidates run extraction, matching and the gate
    /// unconditionally.
    pub fn analyze(&self, post: &Post, now: DateTime<Utc>) -> AnalysisResult {
        let classification = self.classifier.classify(&post.text);

        if !classification.is_candidate {
            return AnalysisResult {
                classification,
                candidate_info: None,
                matched_job: None,
                should_respond: false,
                reason: REASON_NOT_CANDIDATE.to_string(),
            };
        }

        let candidate_info = self
            .extractor
            .extract(&post.text, post.author_name.as_deref().unwrap_or(""));
        let matched_job = self.matcher.best_match(&post.text);
        let (should_respond, reason) = self.gate.evaluate(
            &classification,
            matched_job.as_ref(),
            post.posted_at.as_deref(),
            now,
        );

        AnalysisResult {
            classification,
            candidate_info: Some(candidate_info),
            matched_job,
            should_respond,
            reason: reason.to_string(),
        }
    }
}
