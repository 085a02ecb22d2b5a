// src/session.rs
//! Scan-session orchestration and the scheduling loop: pull posts, analyze,
//! persist, reply within the daily cap, accumulate statistics. One session
//! is one pass over whatever the source currently returns.

use anyhow::Result;
use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::database::Database;
use crate::engine::PostAnalyzer;
use crate::responder::ResponseGenerator;
use crate::source::{PostSource, ResponseSink};

/// Counters for one completed session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionReport {
    pub posts_scanned: u32,
    pub candidates_found: u32,
    pub responses_sent: u32,
    pub errors: u32,
}

pub struct ScanSession<'a> {
    config: &'a EngineConfig,
    analyzer: &'a PostAnalyzer,
    responder: &'a ResponseGenerator,
    db: &'a Database,
}

impl<'a> ScanSession<'a> {
    pub fn new(
        config: &'a EngineConfig,
        analyzer: &'a PostAnalyzer,
        responder: &'a ResponseGenerator,
        db: &'a Database,
    ) -> Self {
        Self {
            config,
            analyzer,
            responder,
            db,
        }
    }

    /// Run one full scan pass. Individual post failures are logged and
    /// counted, never fatal to the session.
    pub async fn run(
        &self,
        source: &mut dyn PostSource,
        sink: &mut dyn ResponseSink,
    ) -> Result<SessionReport> {
        let mut report = SessionReport::default();
        let today = Local::now().date_naive();
        let max_daily = self.config.automation.max_responses_per_day as i64;

        let posts = match source.fetch_posts().await {
            Ok(posts) => posts,
            Err(e) => {
                error!("fetching posts from {} failed: {e:#}", source.name());
                self.db
                    .log_error("scan_error", &format!("{e:#}"), source.name())
                    .await?;
                self.db.update_daily_stats(today, 0, 0, 0, 1).await?;
                return Err(e);
            }
        };

        for post in &posts {
            if self.db.is_post_processed(&post.post_id).await? {
                debug!(post_id = %post.post_id, "already processed, skipping");
                continue;
            }

            let analysis = self.analyzer.analyze(post, Utc::now());
            self.db.record_scanned_post(post, &analysis).await?;
            report.posts_scanned += 1;

            if !analysis.classification.is_candidate {
                continue;
            }

            report.candidates_found += 1;
            info!(
                post_id = %post.post_id,
                score = analysis.classification.score,
                "candidate found"
            );

            if !analysis.should_respond {
                debug!(post_id = %post.post_id, reason = %analysis.reason, "not replying");
                continue;
            }

            let sent_today = self.db.daily_response_count(today).await?;
            if sent_today >= max_daily {
                info!(sent_today, max_daily, "daily response cap reached");
                break;
            }

            let (candidate_info, job_match) =
                match (&analysis.candidate_info, &analysis.matched_job) {
                    (Some(info), Some(job)) => (info, job),
                    _ => continue,
                };

            let response_text = self.responder.render(candidate_info, job_match);

            // Claim before delivering so a concurrent worker or a retried
            // session cannot double-reply.
            let claimed = self
                .db
                .claim_response(
                    &post.post_id,
                    &response_text,
                    &job_match.job_key,
                    job_match.match_score,
                )
                .await?;
            if !claimed {
                debug!(post_id = %post.post_id, "reply already claimed elsewhere");
                continue;
            }

            match sink.deliver(post, &response_text).await {
                Ok(()) => {
                    report.responses_sent += 1;
                    info!(post_id = %post.post_id, job = %job_match.job_key, "reply sent");
                }
                Err(e) => {
                    warn!(post_id = %post.post_id, "reply delivery failed: {e:#}");
                    self.db.mark_response_failed(&post.post_id).await?;
                    self.db
                        .log_error("response_error", &format!("{e:#}"), &post.post_id)
                        .await?;
                    report.errors += 1;
                }
            }
        }

        self.db
            .update_daily_stats(
                today,
                report.posts_scanned,
                report.candidates_found,
                report.responses_sent,
                report.errors,
            )
            .await?;

        info!(
            scanned = report.posts_scanned,
            candidates = report.candidates_found,
            sent = report.responses_sent,
            errors = report.errors,
            "scan session completed"
        );
        Ok(report)
    }
}

/// Whether the given local time falls inside the configured activity window.
pub fn is_active_time(now: DateTime<Local>, config: &EngineConfig) -> bool {
    let settings = &config.automation;
    let weekday = now.weekday().num_days_from_monday() as u8;
    if !settings.active_days.contains(&weekday) {
        return false;
    }

    let hour = now.hour();
    settings.active_hours_start <= hour && hour < settings.active_hours_end
}

/// Periodic scan loop. Sleeps through inactive windows and stops replying
/// for the day once the cap is reached; runs until the process is stopped.
pub async fn run_scheduler(
    config: Arc<EngineConfig>,
    db: &Database,
    source: &mut dyn PostSource,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    let analyzer = PostAnalyzer::new(config.clone())?;
    let responder = ResponseGenerator::new(config.clone());
    let interval = Duration::from_secs(config.automation.scan_interval_hours * 3600);

    info!(
        every_hours = config.automation.scan_interval_hours,
        window_start = config.automation.active_hours_start,
        window_end = config.automation.active_hours_end,
        "scheduler started"
    );

    loop {
        if is_active_time(Local::now(), &config) {
            let today = Local::now().date_naive();
            let sent_today = db.daily_response_count(today).await?;
            let max_daily = config.automation.max_responses_per_day as i64;

            if sent_today >= max_daily {
                info!(sent_today, max_daily, "daily cap reached, skipping scan");
            } else {
                let session = ScanSession::new(&config, &analyzer, &responder, db);
                if let Err(e) = session.run(source, sink).await {
                    error!("scan session failed: {e:#}");
                }
            }
        } else {
            debug!("outside the activity window, skipping scan");
        }

        tokio::time::sleep(interval).await;
    }
}
