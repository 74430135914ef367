//! # Funding News Scout
//!
//! A batch scraper that finds startup funding announcements through a web
//! search API, fetches the matching articles, extracts structured funding
//! fields and accumulates them into a de-duplicated CSV dataset.
//!
//! ## Features
//!
//! - Keyword phrases crossed with target news sites into search queries
//! - Lazy, limit-bounded pagination over the Google Programmable Search API
//! - Throttled page fetching with retry and a title/snippet fallback
//! - Heuristic extraction of company, round, amount, investors and date
//! - Dated append-only CSV plus a `funding_latest.csv` snapshot
//! - Optional Markdown digest with highlight tags
//!
//! ## Usage
//!
//! ```sh
//! GOOGLE_API_KEY=... GOOGLE_CSE_ID=... funding_news_scout --days 90 --limit 80
//! ```
//!
//! ## Exit status
//!
//! `0` success, `1` configuration or file failure (including rejected
//! arguments), `2` search API authentication failure, `3` search quota
//! exhausted (partial output kept).

use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod backoff;
mod cli;
mod config;
mod error;
mod extract;
mod fetch;
mod filters;
mod models;
mod outputs;
mod pipeline;
mod query;
mod search;
mod utils;

use cli::Cli;
use config::Config;
use error::ScoutError;
use fetch::PageFetcher;
use pipeline::{Pipeline, RunSummary};
use search::{GoogleCse, RetrySearch, SearchClient};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("funding_news_scout starting up");

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(cli::usage_exit_code(&e));
        }
    };
    debug!(queries = %args.queries, out_dir = %args.out_dir, "Parsed CLI arguments");

    let code = match run(&args).await {
        Ok(summary) if summary.quota_exhausted => {
            warn!("Finished early: search quota exhausted");
            ExitCode::from(ScoutError::QuotaExceeded(String::new()).exit_code())
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::from(e.exit_code())
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    code
}

#[instrument(level = "info", skip_all)]
async fn run(args: &Cli) -> Result<RunSummary, ScoutError> {
    let config = Config::from_cli(args)?;

    // Early check: fail before spending quota if nothing can be written
    if let Err(e) = ensure_writable_dir(&config.output.out_dir).await {
        error!(
            path = %config.output.out_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let cse = GoogleCse::new(config.credentials.clone(), config.http_timeout)?;
    let search = SearchClient::new(RetrySearch::new(cse, config.retry));
    let pages = PageFetcher::new(
        &config.user_agent,
        config.http_timeout,
        config.request_delay,
        config.retry,
    )?;

    let today = Utc::now().date_naive();
    let summary = Pipeline::new(&config, search, pages, today).run().await?;
    info!(
        queries = summary.queries_run,
        failed_queries = summary.queries_failed,
        results = summary.results_seen,
        records = summary.records_emitted,
        appended = summary.rows_appended,
        "Scouting finished"
    );
    Ok(summary)
}
