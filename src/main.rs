use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use job_scout::engine::PostAnalyzer;
use job_scout::responder::ResponseGenerator;
use job_scout::session::{self, ScanSession};
use job_scout::source::{DryRunSink, JsonPostSource};
use job_scout::{Database, EngineConfig};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Scan social group posts for job seekers and reply to the good matches")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a YAML configuration file; built-in defaults otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single scan session over a JSON posts file
    Run {
        /// Posts file exported by the scraping collaborator
        #[arg(long)]
        posts: PathBuf,
    },
    /// Run the periodic scan loop within the configured activity window
    Schedule {
        #[arg(long)]
        posts: PathBuf,
    },
    /// Print aggregate statistics for the last N days
    Stats {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Delete scan history older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Arc::new(EngineConfig::load(cli.config.as_deref())?);
    let db = Database::new(&config.automation.database_path).await?;

    match cli.command {
        Command::Run { posts } => {
            let analyzer = PostAnalyzer::new(config.clone())?;
            let responder = ResponseGenerator::new(config.clone());
            let session = ScanSession::new(&config, &analyzer, &responder, &db);

            let mut source = JsonPostSource::new(posts);
            let mut sink = DryRunSink;
            let report = session.run(&mut source, &mut sink).await?;

            info!(
                scanned = report.posts_scanned,
                candidates = report.candidates_found,
                sent = report.responses_sent,
                errors = report.errors,
                "one-shot scan finished"
            );
        }

        Command::Schedule { posts } => {
            let mut source = JsonPostSource::new(posts);
            let mut sink = DryRunSink;
            session::run_scheduler(config, &db, &mut source, &mut sink).await?;
        }

        Command::Stats { days } => {
            let stats = db.statistics(days).await?;
            info!(
                days = stats.period_days,
                posts_scanned = stats.total_posts_scanned,
                candidates_found = stats.total_candidates_found,
                responses_sent = stats.total_responses_sent,
                errors = stats.total_errors,
                conversion_rate = stats.conversion_rate,
                "statistics"
            );
        }

        Command::Cleanup { days } => {
            let removed = db.cleanup_old_data(days).await?;
            info!(removed, days, "cleanup finished");
        }
    }

    Ok(())
}
