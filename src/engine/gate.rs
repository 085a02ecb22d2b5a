// src/engine/gate.rs
//! Final respond/deny decision. Each check short-circuits with its own
//! reason; the age check fails open on missing or unparseable timestamps so
//! bad date data never blocks an otherwise-good match.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{ClassificationResult, JobMatch};

pub const REASON_POST_TOO_OLD: &str = "post too old";
pub const REASON_SCORE_TOO_LOW: &str = "score too low";
pub const REASON_NO_JOB_MATCH: &str = "no job match";
pub const REASON_ELIGIBLE: &str = "eligible to respond";

pub struct ResponseGate {
    config: Arc<EngineConfig>,
}

impl ResponseGate {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        classification: &ClassificationResult,
        job_match: Option<&JobMatch>,
        posted_at: Option<&str>,
        now: DateTime<Utc>,
    ) -> (bool, &'static str) {
        if let Some(posted) = posted_at.and_then(parse_posted_at) {
            let max_age = Duration::days(self.config.automation.max_post_age_days);
            if now.signed_duration_since(posted) > max_age {
                return (false, REASON_POST_TOO_OLD);
            }
        }

        if classification.score < self.config.thresholds.response {
            return (false, REASON_SCORE_TOO_LOW);
        }

        // Unreachable while the matcher falls back to a default job; kept for
        // a matcher that can legitimately return no match.
        if job_match.is_none() {
            return (false, REASON_NO_JOB_MATCH);
        }

        (true, REASON_ELIGIBLE)
    }
}

/// Lenient ISO-8601 parsing; naive timestamps are taken as UTC. Returns
/// `None` for anything unparseable, which skips the age check.
fn parse_posted_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{JobMatcher, PostClassifier};

    fn gate() -> ResponseGate {
        ResponseGate::new(Arc::new(EngineConfig::builtin()))
    }

    fn classification(score: f64) -> ClassificationResult {
        ClassificationResult {
            is_candidate: score >= 4.0,
            score,
            matched_keywords: vec!["מחפש עבודה".into()],
        }
    }

    fn some_match() -> JobMatch {
        let config = Arc::new(EngineConfig::builtin());
        JobMatcher::new(config).best_match("טקסט").expect("fallback")
    }

    #[test]
    fn test_stale_post_denied() {
        let now = Utc::now();
        let posted = (now - Duration::days(40)).to_rfc3339();

        let (respond, reason) =
            gate().evaluate(&classification(9.0), Some(&some_match()), Some(posted.as_str()), now);

        assert!(!respond);
        assert_eq!(reason, REASON_POST_TOO_OLD);
    }

    #[test]
    fn test_fresh_post_approved() {
        let now = Utc::now();
        let posted = (now - Duration::days(2)).to_rfc3339();

        let (respond, reason) =
            gate().evaluate(&classification(7.0), Some(&some_match()), Some(posted.as_str()), now);

        assert!(respond);
        assert_eq!(reason, REASON_ELIGIBLE);
    }

    #[test]
    fn test_unparseable_timestamp_fails_open() {
        let (respond, reason) = gate().evaluate(
            &classification(7.0),
            Some(&some_match()),
            Some("אתמול בערב"),
            Utc::now(),
        );

        assert!(respond);
        assert_eq!(reason, REASON_ELIGIBLE);
    }

    #[test]
    fn test_missing_timestamp_fails_open() {
        let (respond, _) = gate().evaluate(&classification(7.0), Some(&some_match()), None, Utc::now());
        assert!(respond);
    }

    #[test]
    fn test_candidate_below_response_threshold_denied() {
        // 4.5 clears the candidacy threshold but not the response threshold.
        let (respond, reason) =
            gate().evaluate(&classification(4.5), Some(&some_match()), None, Utc::now());

        assert!(!respond);
        assert_eq!(reason, REASON_SCORE_TOO_LOW);
    }

    #[test]
    fn test_missing_job_match_denied() {
        let (respond, reason) = gate().evaluate(&classification(7.0), None, None, Utc::now());

        assert!(!respond);
        assert_eq!(reason, REASON_NO_JOB_MATCH);
    }

    #[test]
    fn test_age_check_runs_before_score_check() {
        let now = Utc::now();
        let posted = (now - Duration::days(60)).to_rfc3339();

        let (_, reason) =
            gate().evaluate(&classification(3.0), Some(&some_match()), Some(posted.as_str()), now);

        assert_eq!(reason, REASON_POST_TOO_OLD);
    }

    #[test]
    fn test_naive_and_date_only_formats_accepted() {
        assert!(parse_posted_at("2026-07-01T10:30:00").is_some());
        assert!(parse_posted_at("2026-07-01").is_some());
        assert!(parse_posted_at("2026-07-01T10:30:00+03:00").is_some());
        assert!(parse_posted_at("not a date").is_none());
    }

    #[test]
    fn test_end_to_end_stale_post_scenario() {
        // A perfect-scoring post 40 days old with a 30-day limit.
        let config = Arc::new(EngineConfig::builtin());
        let classifier = PostClassifier::new(config.clone()).unwrap();
        let gate = ResponseGate::new(config.clone());
        let matcher = JobMatcher::new(config);

        let text = "היי, אני מחפש עבודה באזור פתח תקווה. יש לי ניסיון במכירות ושירות לקוחות.";
        let result = classifier.classify(text);
        assert!(result.score >= 5.0);

        let now = Utc::now();
        let posted = (now - Duration::days(40)).to_rfc3339();
        let job = matcher.best_match(text);

        let (respond, reason) = gate.evaluate(&result, job.as_ref(), Some(posted.as_str()), now);
        assert!(!respond);
        assert_eq!(reason, REASON_POST_TOO_OLD);
    }
}
