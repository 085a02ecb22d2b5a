// src/database.rs
//! SQLite persistence: scanned posts, sent responses, daily statistics and
//! the error log. The response table carries a UNIQUE post_id so recording a
//! reply doubles as an at-most-once claim; callers deliver only after the
//! claim succeeds.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::engine::{AnalysisResult, Post};

pub struct Database {
    pool: SqlitePool,
}

/// Aggregate counters over a trailing window of days.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatistics {
    pub period_days: i64,
    pub total_posts_scanned: i64,
    pub total_candidates_found: i64,
    pub total_responses_sent: i64,
    pub total_errors: i64,
    /// Responses sent per candidate found, as a percentage.
    pub conversion_rate: f64,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let db = Self::connect(&database_url).await?;
        info!("Database ready: {}", database_path.display());
        Ok(db)
    }

    /// Connect to an explicit sqlx URL (`sqlite::memory:` in tests).
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Writes are serial in this process; a single connection also keeps
        // in-memory databases coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {database_url}"))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scanned_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id TEXT UNIQUE NOT NULL,
                group_name TEXT,
                author_name TEXT,
                post_text TEXT,
                post_url TEXT,
                posted_at TEXT,
                scanned_at TEXT NOT NULL,
                is_candidate BOOLEAN NOT NULL DEFAULT 0,
                candidate_score REAL NOT NULL DEFAULT 0.0,
                matched_keywords TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id TEXT NOT NULL UNIQUE,
                response_text TEXT NOT NULL,
                matched_job TEXT,
                match_score REAL,
                sent_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'sent',
                FOREIGN KEY (post_id) REFERENCES scanned_posts(post_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL UNIQUE,
                posts_scanned INTEGER NOT NULL DEFAULT 0,
                candidates_found INTEGER NOT NULL DEFAULT 0,
                responses_sent INTEGER NOT NULL DEFAULT 0,
                errors INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS error_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                error_type TEXT,
                error_message TEXT,
                context TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_scanned_posts_post_id ON scanned_posts(post_id);")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_responses_sent_at ON responses(sent_at);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Record a scanned post with its analysis verdict. Re-scans of the same
    /// post are ignored.
    pub async fn record_scanned_post(&self, post: &Post, analysis: &AnalysisResult) -> Result<()> {
        let matched_keywords = serde_json::to_string(&analysis.classification.matched_keywords)
            .context("Failed to serialize matched keywords")?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO scanned_posts
            (post_id, group_name, author_name, post_text, post_url,
             posted_at, scanned_at, is_candidate, candidate_score, matched_keywords)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.post_id)
        .bind(&post.group_name)
        .bind(&post.author_name)
        .bind(&post.text)
        .bind(&post.post_url)
        .bind(&post.posted_at)
        .bind(Utc::now().to_rfc3339())
        .bind(analysis.classification.is_candidate)
        .bind(analysis.classification.score)
        .bind(matched_keywords)
        .execute(&self.pool)
        .await
        .context("Failed to record scanned post")?;

        Ok(())
    }

    pub async fn is_post_processed(&self, post_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT id FROM scanned_posts WHERE post_id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn has_responded(&self, post_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT id FROM responses WHERE post_id = ?")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Atomically claim the right to reply to a post. Returns false when a
    /// reply was already claimed, closing the check-then-act race between
    /// concurrent workers.
    pub async fn claim_response(
        &self,
        post_id: &str,
        response_text: &str,
        matched_job: &str,
        match_score: f64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO responses (post_id, response_text, matched_job, match_score, sent_at, status)
            VALUES (?, ?, ?, ?, ?, 'sent')
            ON CONFLICT(post_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(response_text)
        .bind(matched_job)
        .bind(match_score)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to claim response")?;

        Ok(result.rows_affected() == 1)
    }

    /// Downgrade a claimed response whose delivery failed.
    pub async fn mark_response_failed(&self, post_id: &str) -> Result<()> {
        sqlx::query("UPDATE responses SET status = 'failed' WHERE post_id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .context("Failed to mark response as failed")?;
        Ok(())
    }

    /// Replies recorded on a given date, regardless of delivery status.
    pub async fn daily_response_count(&self, date: NaiveDate) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM responses WHERE DATE(sent_at) = ?")
            .bind(date.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }

    /// Additively fold a session's counters into the day's row.
    pub async fn update_daily_stats(
        &self,
        date: NaiveDate,
        posts_scanned: u32,
        candidates_found: u32,
        responses_sent: u32,
        errors: u32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_stats (date, posts_scanned, candidates_found, responses_sent, errors)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                posts_scanned = posts_scanned + excluded.posts_scanned,
                candidates_found = candidates_found + excluded.candidates_found,
                responses_sent = responses_sent + excluded.responses_sent,
                errors = errors + excluded.errors
            "#,
        )
        .bind(date.to_string())
        .bind(posts_scanned)
        .bind(candidates_found)
        .bind(responses_sent)
        .bind(errors)
        .execute(&self.pool)
        .await
        .context("Failed to update daily stats")?;

        Ok(())
    }

    pub async fn log_error(&self, error_type: &str, message: &str, context: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO error_log (timestamp, error_type, error_message, context) VALUES (?, ?, ?, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(error_type)
        .bind(message)
        .bind(context)
        .execute(&self.pool)
        .await
        .context("Failed to write error log")?;

        Ok(())
    }

    pub async fn statistics(&self, days: i64) -> Result<ScanStatistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(posts_scanned), 0) AS posts,
                COALESCE(SUM(candidates_found), 0) AS candidates,
                COALESCE(SUM(responses_sent), 0) AS responses,
                COALESCE(SUM(errors), 0) AS errors
            FROM daily_stats
            WHERE date >= date('now', '-' || ? || ' days')
            "#,
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await
        .context("Failed to read statistics")?;

        let total_candidates_found: i64 = row.get("candidates");
        let total_responses_sent: i64 = row.get("responses");
        let conversion_rate = if total_candidates_found > 0 {
            (total_responses_sent as f64 / total_candidates_found as f64 * 10_000.0).round()
                / 100.0
        } else {
            0.0
        };

        Ok(ScanStatistics {
            period_days: days,
            total_posts_scanned: row.get("posts"),
            total_candidates_found,
            total_responses_sent,
            total_errors: row.get("errors"),
            conversion_rate,
        })
    }

    /// Drop scan rows and daily stats older than the retention window.
    pub async fn cleanup_old_data(&self, days: i64) -> Result<u64> {
        let posts = sqlx::query(
            "DELETE FROM scanned_posts WHERE DATE(scanned_at) < date('now', '-' || ? || ' days')",
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        let stats =
            sqlx::query("DELETE FROM daily_stats WHERE date < date('now', '-' || ? || ' days')")
                .bind(days)
                .execute(&self.pool)
                .await?;

        let removed = posts.rows_affected() + stats.rows_affected();
        info!(removed, "old rows cleaned up");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClassificationResult, Post};

    async fn db() -> Database {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    fn post(post_id: &str) -> Post {
        Post {
            post_id: post_id.into(),
            group_name: Some("דרושים פתח תקווה".into()),
            author_name: Some("דני".into()),
            text: "אני מחפש עבודה".into(),
            post_url: None,
            posted_at: None,
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            classification: ClassificationResult {
                is_candidate: true,
                score: 6.0,
                matched_keywords: vec!["מחפש עבודה".into()],
            },
            candidate_info: None,
            matched_job: None,
            should_respond: true,
            reason: "eligible to respond".into(),
        }
    }

    #[tokio::test]
    async fn test_scanned_post_roundtrip() {
        let db = db().await;
        assert!(!db.is_post_processed("p1").await.unwrap());

        db.record_scanned_post(&post("p1"), &analysis()).await.unwrap();
        assert!(db.is_post_processed("p1").await.unwrap());

        // Re-recording the same post is a no-op, not an error.
        db.record_scanned_post(&post("p1"), &analysis()).await.unwrap();
    }

    #[tokio::test]
    async fn test_response_claim_is_at_most_once() {
        let db = db().await;
        db.record_scanned_post(&post("p1"), &analysis()).await.unwrap();

        let first = db.claim_response("p1", "שלום!", "sales_rep", 4.0).await.unwrap();
        let second = db.claim_response("p1", "שלום שוב", "sales_rep", 4.0).await.unwrap();

        assert!(first);
        assert!(!second);
        assert!(db.has_responded("p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_daily_response_count() {
        let db = db().await;
        db.record_scanned_post(&post("p1"), &analysis()).await.unwrap();
        db.record_scanned_post(&post("p2"), &analysis()).await.unwrap();

        let today = Utc::now().date_naive();
        assert_eq!(db.daily_response_count(today).await.unwrap(), 0);

        db.claim_response("p1", "א", "sales_rep", 4.0).await.unwrap();
        db.claim_response("p2", "ב", "sales_rep", 4.0).await.unwrap();
        assert_eq!(db.daily_response_count(today).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_daily_stats_accumulate() {
        let db = db().await;
        let today = Utc::now().date_naive();

        db.update_daily_stats(today, 5, 2, 1, 0).await.unwrap();
        db.update_daily_stats(today, 3, 1, 0, 1).await.unwrap();

        let stats = db.statistics(7).await.unwrap();
        assert_eq!(stats.total_posts_scanned, 8);
        assert_eq!(stats.total_candidates_found, 3);
        assert_eq!(stats.total_responses_sent, 1);
        assert_eq!(stats.total_errors, 1);
    }

    #[tokio::test]
    async fn test_conversion_rate() {
        let db = db().await;
        let today = Utc::now().date_naive();

        db.update_daily_stats(today, 10, 4, 1, 0).await.unwrap();
        let stats = db.statistics(7).await.unwrap();

        assert_eq!(stats.conversion_rate, 25.0);
    }

    #[tokio::test]
    async fn test_empty_statistics() {
        let db = db().await;
        let stats = db.statistics(7).await.unwrap();

        assert_eq!(stats.total_posts_scanned, 0);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_mark_response_failed() {
        let db = db().await;
        db.record_scanned_post(&post("p1"), &analysis()).await.unwrap();
        db.claim_response("p1", "שלום", "sales_rep", 4.0).await.unwrap();
        db.mark_response_failed("p1").await.unwrap();

        // The claim still stands; a failed delivery is not retried blindly.
        assert!(db.has_responded("p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_error_log_writes() {
        let db = db().await;
        db.log_error("scan_error", "timeout", "group: דרושים מרכז").await.unwrap();
    }
}
