// src/config.rs
//! Engine configuration: keyword sets, job catalog, thresholds and automation
//! settings. Loaded once at startup and never mutated afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default candidacy threshold: posts scoring at or above this are candidates.
pub const DEFAULT_CANDIDACY_THRESHOLD: f64 = 4.0;
/// Default response threshold: stricter cutoff before a reply is committed.
pub const DEFAULT_RESPONSE_THRESHOLD: f64 = 5.0;

/// A fixed phrase that marks a job seeker, mapped to a human-readable label.
/// The label, not the phrase, lands in the matched-keyword list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekerPhrase {
    pub phrase: String,
    pub label: String,
}

/// Phrase lists the classifier and extractor scan for. All matching is plain
/// substring search; case folding only ever affects Latin script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSets {
    /// Signals a job seeker wrote the post. Each hit contributes to the score.
    pub positive: Vec<String>,
    /// Employer-leaning words; ambiguous on their own.
    pub negative: Vec<String>,
    /// Unambiguous employer phrasing. A negative hit plus one of these
    /// rejects the post outright.
    pub always_disqualify: Vec<String>,
    /// Phrases with no candidate-side reading; presence alone rejects.
    pub employer_only: Vec<String>,
    /// Phrases that disqualify only when used in employer context.
    pub context_dependent: Vec<String>,
    /// Seeker phrases with labels, deduplicated by label.
    pub seeker_phrases: Vec<SeekerPhrase>,
    /// Prefixes that mark employer context in the window preceding a
    /// context-dependent phrase.
    pub employer_context_prefixes: Vec<String>,
    /// First-person job-seeking patterns, masculine and feminine forms
    /// enumerated separately.
    pub first_person_patterns: Vec<String>,
    /// Known location phrases, matched case-sensitively.
    pub locations: Vec<String>,
    pub experience_keywords: Vec<String>,
    pub skill_keywords: Vec<String>,
}

/// One open position in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub key: String,
    pub title: String,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_candidacy")]
    pub candidacy: f64,
    #[serde(default = "default_response")]
    pub response: f64,
}

fn default_candidacy() -> f64 {
    DEFAULT_CANDIDACY_THRESHOLD
}

fn default_response() -> f64 {
    DEFAULT_RESPONSE_THRESHOLD
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            candidacy: DEFAULT_CANDIDACY_THRESHOLD,
            response: DEFAULT_RESPONSE_THRESHOLD,
        }
    }
}

/// Scheduling and rate limits for the scan loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSettings {
    pub max_responses_per_day: u32,
    pub max_post_age_days: i64,
    /// Active weekdays, 0 = Monday .. 6 = Sunday.
    pub active_days: Vec<u8>,
    pub active_hours_start: u32,
    pub active_hours_end: u32,
    pub scan_interval_hours: u64,
    pub database_path: PathBuf,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            max_responses_per_day: 10,
            max_post_age_days: 30,
            // Sunday through Thursday, the Israeli work week.
            active_days: vec![6, 0, 1, 2, 3],
            active_hours_start: 9,
            active_hours_end: 20,
            scan_interval_hours: 2,
            database_path: PathBuf::from("data/jobscout.db"),
        }
    }
}

/// Immutable engine configuration. Construct once, share by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub keywords: KeywordSets,
    /// Open positions in priority order. The matcher keeps the first job at a
    /// given score, so this order doubles as the tie-break policy.
    pub jobs: Vec<JobDescriptor>,
    /// Key of the job returned when nothing scores high enough.
    pub fallback_job: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub automation: AutomationSettings,
    pub response_templates: Vec<String>,
}

impl EngineConfig {
    /// Load configuration: an explicit path, else `JOBSCOUT_CONFIG`, else
    /// `jobscout.yaml` in the working directory, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("JOBSCOUT_CONFIG").ok().map(PathBuf::from));

        let config = match explicit {
            Some(candidate) if candidate.exists() => {
                info!("Loading configuration from {}", candidate.display());
                Self::from_file(&candidate)?
            }
            Some(candidate) => {
                anyhow::bail!("Config file not found: {}", candidate.display());
            }
            None => {
                let default_path = PathBuf::from("jobscout.yaml");
                if default_path.exists() {
                    info!("Loading configuration from {}", default_path.display());
                    Self::from_file(&default_path)?
                } else {
                    info!("No config file found, using built-in defaults");
                    Self::builtin()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reject configurations the engine has no contract for.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            anyhow::bail!("Job catalog is empty; at least one open position is required");
        }
        if self.job_by_key(&self.fallback_job).is_none() {
            anyhow::bail!(
                "Fallback job '{}' is not present in the job catalog",
                self.fallback_job
            );
        }
        if self.keywords.positive.is_empty() {
            anyhow::bail!("Positive keyword list is empty; no post could ever match");
        }
        if self.response_templates.is_empty() {
            anyhow::bail!("No response templates configured");
        }
        if self.thresholds.response < self.thresholds.candidacy {
            anyhow::bail!(
                "Response threshold {} is below candidacy threshold {}",
                self.thresholds.response,
                self.thresholds.candidacy
            );
        }
        if self.automation.active_hours_start >= 24 || self.automation.active_hours_end > 24 {
            anyhow::bail!("Active hours must fall within 0..24");
        }
        Ok(())
    }

    pub fn job_by_key(&self, key: &str) -> Option<&JobDescriptor> {
        self.jobs.iter().find(|job| job.key == key)
    }

    /// Built-in Hebrew vocabulary and the default insurance-agency catalog.
    pub fn builtin() -> Self {
        let owned =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };

        let keywords = KeywordSets {
            positive: owned(&[
                "מחפש עבודה",
                "מחפשת עבודה",
                "מחפש משרה",
                "מחפשת משרה",
                "מעוניין במשרה",
                "מעוניינת במשרה",
                "מעוניין בעבודה",
                "מעוניינת בעבודה",
                "ניסיון",
                "שירות לקוחות",
                "זמין לעבודה",
                "זמינה לעבודה",
                "אשמח להצעות",
                "דרוש לי",
            ]),
            negative: owned(&[
                "דרושים",
                "דרושות",
                "מגייסים",
                "מגייסת",
                "לצוות שלנו",
                "בואו לעבוד",
            ]),
            always_disqualify: owned(&[
                "חברתנו",
                "החברה שלנו",
                "מחפשים עובדים",
                "מחפשת עובדים",
                "הצטרפו אלינו",
            ]),
            employer_only: owned(&[
                "שלחו קורות חיים",
                "שלחו קו\"ח",
                "קו\"ח למייל",
                "להגשת מועמדות",
                "תנאים טובים למתאימים",
            ]),
            context_dependent: owned(&["משכורת", "שכר", "בונוסים"]),
            seeker_phrases: vec![
                SeekerPhrase {
                    phrase: "אני גר".into(),
                    label: "ציון אזור מגורים".into(),
                },
                SeekerPhrase {
                    phrase: "אני גרה".into(),
                    label: "ציון אזור מגורים".into(),
                },
                SeekerPhrase {
                    phrase: "פנוי לעבודה".into(),
                    label: "זמינות מיידית".into(),
                },
                SeekerPhrase {
                    phrase: "פנויה לעבודה".into(),
                    label: "זמינות מיידית".into(),
                },
                SeekerPhrase {
                    phrase: "אשמח לשמוע פרטים".into(),
                    label: "בקשת פרטים".into(),
                },
            ],
            employer_context_prefixes: owned(&[
                "אנחנו מציעים",
                "אנו מציעים",
                "מציעים",
                "מציעה",
                "כולל",
                "מעניקים",
            ]),
            first_person_patterns: owned(&[
                "אני מחפש",
                "אני מחפשת",
                "אני צריך",
                "אני צריכה",
                "אני זמין",
                "אני זמינה",
                "אני מעוניין",
                "אני מעוניינת",
            ]),
            locations: owned(&[
                "פתח תקווה",
                "הוד השרון",
                "כפר סבא",
                "רעננה",
                "תל אביב",
                "המרכז",
                "השרון",
            ]),
            experience_keywords: owned(&["ניסיון", "עבדתי", "התנסות", "שנים", "שנות"]),
            skill_keywords: owned(&[
                "מכירות",
                "שירות",
                "ביטוח",
                "לקוחות",
                "מחשב",
                "משרד",
                "טלפון",
            ]),
        };

        let jobs = vec![
            JobDescriptor {
                key: "insurance_agent".into(),
                title: "סוכן/ת ביטוח".into(),
                keywords: owned(&["ביטוח", "סוכן", "פיננסים"]),
                locations: owned(&["פתח תקווה", "תל אביב", "המרכז"]),
                requirements: owned(&["רצון ללמוד", "יחסי אנוש מעולים"]),
            },
            JobDescriptor {
                key: "sales_rep".into(),
                title: "נציג/ת מכירות".into(),
                keywords: owned(&["מכירות", "מוקד", "טלפוני"]),
                locations: owned(&["פתח תקווה", "רעננה"]),
                requirements: owned(&["ניסיון במכירות", "כושר שכנוע"]),
            },
            JobDescriptor {
                key: "service_rep".into(),
                title: "נציג/ת שירות לקוחות".into(),
                keywords: owned(&["שירות", "לקוחות", "מענה"]),
                locations: owned(&["הוד השרון", "כפר סבא", "פתח תקווה"]),
                requirements: owned(&["שירותיות", "עברית ברמה גבוהה"]),
            },
        ];

        let response_templates = vec![
            "היי {name}! ראיתי שאת/ה מחפש/ת עבודה 😊 יש לנו משרת {job_title} פתוחה באזור {location}. מחפשים אנשים עם {requirements}. מעניין אותך? אשמח לפרטים בפרטי!".to_string(),
            "שלום {name}, יש לנו משרה שיכולה להתאים לך - {job_title} באזור {location}. דרישות: {requirements}. אם זה רלוונטי, אשמח שתכתבו לי בפרטי 🙂".to_string(),
            "היי {name}, אנחנו מגייסים {job_title} באזור {location}. אם יש לך {requirements} - נשמח לשמוע ממך! פרטים בפרטי 💼".to_string(),
        ];

        Self {
            keywords,
            jobs,
            fallback_job: "insurance_agent".into(),
            thresholds: Thresholds::default(),
            automation: AutomationSettings::default(),
            response_templates,
        }
    }
}
