// src/engine/matcher.rs
//! Scores a post against every open position and picks the best one, falling
//! back to the designated default job so there is always a position to offer.

use std::sync::Arc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::JobMatch;

/// Contribution of each job keyword found in the post.
const KEYWORD_WEIGHT: f64 = 2.0;
/// Granted at most once per job, however many of its locations match.
const LOCATION_WEIGHT: f64 = 1.5;
/// Best score below this falls through to the fallback job.
const MIN_MATCH_SCORE: f64 = 1.5;
/// Fixed score assigned to the fallback job.
const FALLBACK_SCORE: f64 = 2.0;

pub struct JobMatcher {
    config: Arc<EngineConfig>,
}

impl JobMatcher {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Returns the best-scoring job, or the fallback when nothing reaches
    /// the minimum. `None` only when the fallback key is missing from the
    /// catalog, a state startup validation rejects.
    pub fn best_match(&self, text: &str) -> Option<JobMatch> {
        let folded = text.to_lowercase();
        let mut best: Option<JobMatch> = None;

        for job in &self.config.jobs {
            let mut match_score = 0.0;
            let mut matched_keywords = Vec::new();

            for keyword in &job.keywords {
                if folded.contains(keyword.to_lowercase().as_str()) {
                    match_score += KEYWORD_WEIGHT;
                    matched_keywords.push(keyword.clone());
                }
            }

            for location in &job.locations {
                if text.contains(location.as_str()) {
                    match_score += LOCATION_WEIGHT;
                    break;
                }
            }

            // Strict comparison: the first job in catalog order keeps ties.
            let is_better = match &best {
                Some(current) => match_score > current.match_score,
                None => match_score > 0.0,
            };
            if is_better {
                best = Some(JobMatch {
                    job_key: job.key.clone(),
                    job: job.clone(),
                    match_score,
                    matched_keywords,
                });
            }
        }

        if let Some(found) = best {
            if found.match_score >= MIN_MATCH_SCORE {
                return Some(found);
            }
        }

        debug!("no position scored above minimum, using fallback job");
        self.config
            .job_by_key(&self.config.fallback_job)
            .map(|job| JobMatch {
                job_key: job.key.clone(),
                job: job.clone(),
                match_score: FALLBACK_SCORE,
                matched_keywords: Vec::new(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, JobDescriptor};

    fn matcher() -> JobMatcher {
        JobMatcher::new(Arc::new(EngineConfig::builtin()))
    }

    #[test]
    fn test_keywords_and_location_scored() {
        let matched = matcher()
            .best_match("מחפשת תפקיד בשירות לקוחות בהוד השרון")
            .expect("match");

        // Two keywords plus the location bonus.
        assert_eq!(matched.job_key, "service_rep");
        assert_eq!(matched.match_score, 5.5);
        assert_eq!(matched.matched_keywords, vec!["שירות", "לקוחות"]);
    }

    #[test]
    fn test_location_counted_once_per_job() {
        // Both service_rep locations appear; the bonus applies once.
        let matched = matcher()
            .best_match("מענה לפניות, גרה בין הוד השרון לכפר סבא")
            .expect("match");

        assert_eq!(matched.job_key, "service_rep");
        assert_eq!(matched.match_score, 3.5);
    }

    #[test]
    fn test_empty_signal_returns_fallback() {
        let matched = matcher().best_match("סתם טקסט בלי שום דבר").expect("match");

        assert_eq!(matched.job_key, "insurance_agent");
        assert_eq!(matched.match_score, 2.0);
        assert!(matched.matched_keywords.is_empty());
    }

    #[test]
    fn test_first_job_wins_ties() {
        // "מכירות" is a sales_rep keyword and "ביטוח" an insurance_agent
        // keyword; with one keyword each and no locations both score 2.0,
        // and insurance_agent comes first in the catalog.
        let matched = matcher().best_match("ביטוח או מכירות, לא משנה לי").expect("match");

        assert_eq!(matched.job_key, "insurance_agent");
        assert_eq!(matched.match_score, 2.0);
    }

    #[test]
    fn test_below_minimum_falls_back() {
        // A lone location bonus (1.5) reaches the minimum, so give the
        // matcher a text with no signals at all instead.
        let matched = matcher().best_match("בוקר טוב לכולם").expect("match");
        assert_eq!(matched.job_key, "insurance_agent");
    }

    #[test]
    fn test_missing_fallback_yields_none() {
        let mut config = EngineConfig::builtin();
        config.fallback_job = "missing".into();
        let matcher = JobMatcher::new(Arc::new(config));

        assert!(matcher.best_match("בוקר טוב").is_none());
    }

    #[test]
    fn test_fallback_job_descriptor_carried() {
        let matched = matcher().best_match("שלום").expect("match");
        assert_eq!(matched.job.title, "סוכן/ת ביטוח");
        assert!(!matched.job.requirements.is_empty());
    }

    #[test]
    fn test_single_location_match_reaches_minimum() {
        let mut config = EngineConfig::builtin();
        config.jobs.push(JobDescriptor {
            key: "north_rep".into(),
            title: "נציג/ת צפון".into(),
            keywords: vec!["צפון".into()],
            locations: vec!["חיפה".into()],
            requirements: vec![],
        });
        let matcher = JobMatcher::new(Arc::new(config));

        // Location-only hit scores exactly the 1.5 minimum.
        let matched = matcher.best_match("גר בחיפה").expect("match");
        assert_eq!(matched.job_key, "north_rep");
        assert_eq!(matched.match_score, 1.5);
        assert!(matched.matched_keywords.is_empty());
    }
}
