// src/responder.rs
//! Renders the Hebrew reply for an approved candidate. Templates come from
//! configuration and vary between replies so consecutive comments do not
//! read identically.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

use crate::config::{EngineConfig, JobDescriptor};
use crate::engine::{CandidateInfo, JobMatch};

/// Area named when the candidate mentioned somewhere the job does not serve.
const GENERIC_AREA: &str = "המרכז";
/// Requirement text for jobs that list none.
const GENERIC_REQUIREMENT: &str = "רצון להתפתח";
/// Placeholder when the author name could not be scraped.
const NAME_PLACEHOLDER: &str = "שם";

pub struct ResponseGenerator {
    config: Arc<EngineConfig>,
}

impl ResponseGenerator {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Fill a randomly chosen template with candidate and job details.
    pub fn render(&self, candidate: &CandidateInfo, job_match: &JobMatch) -> String {
        let mut rng = rand::thread_rng();
        let template = self
            .config
            .response_templates
            .choose(&mut rng)
            .cloned()
            .unwrap_or_default();

        template
            .replace("{name}", &first_name(&candidate.name))
            .replace("{job_title}", &job_match.job.title)
            .replace("{location}", &self.choose_location(&job_match.job, candidate))
            .replace("{requirements}", &format_requirements(&job_match.job))
    }

    /// Prefer a location the candidate mentioned that the job serves; name
    /// the generic area when they mentioned somewhere else; otherwise pick
    /// one of the job's locations.
    fn choose_location(&self, job: &JobDescriptor, candidate: &CandidateInfo) -> String {
        for location in &candidate.locations_mentioned {
            if job.locations.contains(location) {
                return location.clone();
            }
        }

        if !candidate.locations_mentioned.is_empty() {
            return GENERIC_AREA.to_string();
        }

        job.locations
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| GENERIC_AREA.to_string())
    }
}

fn first_name(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or(NAME_PLACEHOLDER)
        .to_string()
}

/// 1-2 randomly sampled requirements joined with the Hebrew conjunction.
fn format_requirements(job: &JobDescriptor) -> String {
    if job.requirements.is_empty() {
        return GENERIC_REQUIREMENT.to_string();
    }

    let mut rng = rand::thread_rng();
    let count = rng.gen_range(1..=2).min(job.requirements.len());
    let selected: Vec<&str> = job
        .requirements
        .choose_multiple(&mut rng, count)
        .map(String::as_str)
        .collect();

    selected.join(" ו")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::JobMatch;

    fn generator() -> ResponseGenerator {
        ResponseGenerator::new(Arc::new(EngineConfig::builtin()))
    }

    fn candidate(name: &str, locations: &[&str]) -> CandidateInfo {
        CandidateInfo {
            name: name.to_string(),
            has_phone: false,
            has_experience: true,
            locations_mentioned: locations.iter().map(|s| s.to_string()).collect(),
            skills_mentioned: vec![],
        }
    }

    fn service_match() -> JobMatch {
        let config = EngineConfig::builtin();
        let job = config.job_by_key("service_rep").unwrap().clone();
        JobMatch {
            job_key: job.key.clone(),
            job,
            match_score: 4.0,
            matched_keywords: vec!["שירות".into()],
        }
    }

    #[test]
    fn test_placeholders_all_filled() {
        let rendered = generator().render(&candidate("דני כהן", &["הוד השרון"]), &service_match());

        assert!(!rendered.contains("{name}"));
        assert!(!rendered.contains("{job_title}"));
        assert!(!rendered.contains("{location}"));
        assert!(!rendered.contains("{requirements}"));
        assert!(rendered.contains("דני"));
        assert!(rendered.contains("נציג/ת שירות לקוחות"));
    }

    #[test]
    fn test_first_name_only() {
        let rendered = generator().render(&candidate("מיכל לוי", &[]), &service_match());
        assert!(rendered.contains("מיכל"));
        assert!(!rendered.contains("מיכל לוי"));
    }

    #[test]
    fn test_empty_name_uses_placeholder() {
        let rendered = generator().render(&candidate("", &[]), &service_match());
        assert!(rendered.contains(NAME_PLACEHOLDER));
    }

    #[test]
    fn test_candidate_location_preferred() {
        let generator = generator();
        let job_match = service_match();

        // "הוד השרון" is served by service_rep, so it must win.
        let location =
            generator.choose_location(&job_match.job, &candidate("", &["הוד השרון"]));
        assert_eq!(location, "הוד השרון");
    }

    #[test]
    fn test_unserved_location_falls_back_to_generic_area() {
        let generator = generator();
        let job_match = service_match();

        let location = generator.choose_location(&job_match.job, &candidate("", &["אילת"]));
        assert_eq!(location, GENERIC_AREA);
    }

    #[test]
    fn test_no_mentioned_location_picks_job_location() {
        let generator = generator();
        let job_match = service_match();

        let location = generator.choose_location(&job_match.job, &candidate("", &[]));
        assert!(job_match.job.locations.contains(&location));
    }

    #[test]
    fn test_requirements_sampled_from_job() {
        let job_match = service_match();
        for _ in 0..20 {
            let formatted = format_requirements(&job_match.job);
            let known = job_match
                .job
                .requirements
                .iter()
                .any(|r| formatted.contains(r.as_str()));
            assert!(known, "unexpected requirements text: {formatted}");
        }
    }

    #[test]
    fn test_empty_requirements_use_generic() {
        let mut job_match = service_match();
        job_match.job.requirements.clear();
        assert_eq!(format_requirements(&job_match.job), GENERIC_REQUIREMENT);
    }
}
