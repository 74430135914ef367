//! End-to-end scouting run.
//!
//! Strictly sequential: one query at a time, one page at a time. For every
//! search hit the steps are
//!
//! 1. skip links already handled earlier in the run
//! 2. pre-fetch filters (social sites, job boards, job postings)
//! 3. fetch the page, falling back to title and snippet on failure
//! 4. extract a [`FundingRecord`]
//! 5. relevance gates, for fetched pages only
//! 6. offer the record to the [`DatasetWriter`]
//!
//! Per-query failures are logged and the next query starts. Authentication
//! failures abort the run. An exhausted quota stops querying, but the latest
//! file is still written so nothing gathered so far is lost.

use crate::config::Config;
use crate::error::ScoutError;
use crate::extract::extract_record;
use crate::fetch::PageSource;
use crate::filters::{prefetch_skip, relevance_gate};
use crate::models::{FetchOutcome, SearchResult};
use crate::outputs::dataset::DatasetWriter;
use crate::outputs::digest::write_digest;
use crate::query::QueryBuilder;
use crate::search::{SearchApi, SearchClient};
use crate::utils::{normalize_url, truncate_for_log};
use chrono::NaiveDate;
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, error, info, instrument, warn};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub queries_run: usize,
    pub queries_failed: usize,
    pub results_seen: usize,
    /// Links already handled earlier in the run.
    pub duplicate_links: usize,
    /// Dropped by the pre-fetch filters.
    pub filtered: usize,
    pub fetch_failures: usize,
    /// Fetched pages rejected by the relevance gates.
    pub gated: usize,
    pub records_emitted: usize,
    pub rows_appended: usize,
    /// Querying stopped early because the search quota ran out.
    pub quota_exhausted: bool,
}

/// Wires search, fetch, extraction and output for one run.
pub struct Pipeline<'a, A, P> {
    config: &'a Config,
    search: SearchClient<A>,
    pages: P,
    today: NaiveDate,
}

/// Per-run mutable state threaded through hit handling.
struct RunState {
    writer: DatasetWriter,
    seen_links: HashSet<String>,
    summary: RunSummary,
}

impl<'a, A: SearchApi, P: PageSource> Pipeline<'a, A, P> {
    pub fn new(config: &'a Config, search: SearchClient<A>, pages: P, today: NaiveDate) -> Self {
        Self {
            config,
            search,
            pages,
            today,
        }
    }

    /// Run every query and write the dataset.
    ///
    /// # Errors
    ///
    /// Run-fatal errors other than an exhausted quota: [`ScoutError::Auth`],
    /// and I/O or CSV failures on the output files.
    #[instrument(level = "info", skip_all, fields(today = %self.today))]
    pub async fn run(&mut self) -> Result<RunSummary, ScoutError> {
        let mut state = RunState {
            writer: DatasetWriter::open(&self.config.output, self.today)?,
            seen_links: HashSet::new(),
            summary: RunSummary::default(),
        };

        match self.run_queries(&mut state).await {
            Ok(()) => {}
            Err(ScoutError::QuotaExceeded(msg)) => {
                warn!(%msg, "Search quota exhausted; stopping early and keeping partial results");
                state.summary.quota_exhausted = true;
            }
            Err(e) => return Err(e),
        }

        let RunState {
            writer, mut summary, ..
        } = state;
        summary.rows_appended = writer.appended();
        info!(
            path = %writer.dated_path().display(),
            appended = summary.rows_appended,
            "Dated dataset updated"
        );
        let records = writer.finish()?;

        if self.config.output.digest {
            if let Err(e) = write_digest(
                &self.config.output.out_dir,
                self.today,
                &records,
                &self.config.notable_investors,
            )
            .await
            {
                error!(error = %e, "Failed to write digest");
            }
        }

        info!(?summary, "Run complete");
        Ok(summary)
    }

    async fn run_queries(&mut self, state: &mut RunState) -> Result<(), ScoutError> {
        let config = self.config;
        let builder = QueryBuilder::from_config(config);

        for query in builder.queries() {
            let q = builder.render(&query);
            info!(phrase = %query.phrase, site = ?query.site, "Running query");
            state.summary.queries_run += 1;

            let results = self.search.results(&q, config.result_limit);
            futures::pin_mut!(results);
            while let Some(item) = results.next().await {
                match item {
                    Ok(hit) => {
                        handle_hit(hit, &mut self.pages, config, self.today, state).await?;
                    }
                    Err(e) if e.is_run_fatal() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, query = %truncate_for_log(&q, 120), "Query failed; moving on");
                        state.summary.queries_failed += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

async fn handle_hit<P: PageSource>(
    hit: SearchResult,
    pages: &mut P,
    config: &Config,
    today: NaiveDate,
    state: &mut RunState,
) -> Result<(), ScoutError> {
    let summary = &mut state.summary;
    summary.results_seen += 1;

    let link = hit.link.trim();
    if link.is_empty() {
        summary.filtered += 1;
        return Ok(());
    }
    let link_key = normalize_url(link).unwrap_or_else(|| link.to_string());
    if !state.seen_links.insert(link_key) {
        summary.duplicate_links += 1;
        debug!(%link, "Already handled in this run");
        return Ok(());
    }
    if let Some(reason) = prefetch_skip(&hit, config) {
        summary.filtered += 1;
        debug!(%link, %reason, "Skipped before fetch");
        return Ok(());
    }

    let outcome = pages.fetch(link).await;
    let record = extract_record(&hit, &outcome);

    match &outcome {
        FetchOutcome::Failed { reason } => {
            summary.fetch_failures += 1;
            debug!(%link, %reason, "Emitting record from title and snippet");
        }
        FetchOutcome::Fetched(_) => {
            if let Err(gate) = relevance_gate(&record, &hit.title, config, today) {
                summary.gated += 1;
                debug!(%link, %gate, "Rejected by relevance gate");
                return Ok(());
            }
        }
    }

    summary.records_emitted += 1;
    info!(
        company = %record.company,
        round = %record.round,
        amount_usd = ?record.amount_usd,
        %link,
        "Funding record"
    );
    state.writer.offer(record)?;
    Ok(())
}
