//! Result filters applied around the fetch step.
//!
//! [`prefetch_skip`] drops hits that are never worth a request: social sites,
//! job boards and anything that reads like a job posting. [`relevance_gate`]
//! runs after extraction on fetched pages only and rejects records with no
//! funding signal or a publish date outside the look-back window.

use crate::config::Config;
use crate::models::{FundingRecord, SearchResult};
use crate::utils::host_of;
use chrono::{Datelike, Days, NaiveDate};
use std::fmt;

/// Why a search hit was dropped before fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedDomain,
    JobDomain,
    JobKeyword,
}

/// Why a fetched record was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    NoFundingSignal,
    MissingDate,
    TooOld,
    BeforeMinYear,
    InFuture,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::ExcludedDomain => "excluded domain",
            SkipReason::JobDomain => "job board",
            SkipReason::JobKeyword => "job keyword",
        })
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GateFailure::NoFundingSignal => "no funding signal",
            GateFailure::MissingDate => "no publish date",
            GateFailure::TooOld => "older than look-back window",
            GateFailure::BeforeMinYear => "before minimum year",
            GateFailure::InFuture => "dated in the future",
        })
    }
}

/// `host` equals `domain` or is one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
    !domain.is_empty()
        && (host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.')))
}

fn has_word(text: &str, words: &[String]) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| words.iter().any(|k| k.eq_ignore_ascii_case(w)))
}

/// Decide whether a search hit is dropped before its page is fetched.
///
/// # Arguments
///
/// * `hit` - The search result under consideration
/// * `config` - Supplies the excluded and job domains and the job keywords
///
/// # Returns
///
/// The first matching [`SkipReason`], checking excluded domains, job
/// domains, then job words in the title or link; `None` keeps the hit.
pub fn prefetch_skip(hit: &SearchResult, config: &Config) -> Option<SkipReason> {
    if let Some(host) = host_of(&hit.link) {
        if config.excluded_domains.iter().any(|d| host_matches(&host, d)) {
            return Some(SkipReason::ExcludedDomain);
        }
        if config.job_domains.iter().any(|d| host_matches(&host, d)) {
            return Some(SkipReason::JobDomain);
        }
    }
    if has_word(&hit.title, &config.job_keywords) || has_word(&hit.link, &config.job_keywords) {
        return Some(SkipReason::JobKeyword);
    }
    None
}

/// A hard funding keyword in the headline or snippet, a large enough
/// amount, or a recognized round.
pub fn has_funding_signal(record: &FundingRecord, title: &str, config: &Config) -> bool {
    let headline = format!("{}\n{}", title, record.snippet).to_lowercase();
    config
        .hard_funding_keywords
        .iter()
        .any(|k| headline.contains(k.as_str()))
        || record
            .amount_usd
            .is_some_and(|a| a >= config.min_signal_amount_usd)
        || record.round.is_known()
}

/// Check the publish date against the window ending at `today`.
///
/// # Arguments
///
/// * `date` - Extracted publish date, if any
/// * `config` - Supplies the look-back days, minimum year and whether a date is required
/// * `today` - Last day of the window
///
/// # Returns
///
/// `Ok(())` when the date is acceptable, otherwise the first failed
/// [`GateFailure`]. A look-back reaching past the earliest representable
/// date leaves the window without a lower bound.
pub fn check_date(date: Option<NaiveDate>, config: &Config, today: NaiveDate) -> Result<(), GateFailure> {
    let Some(date) = date else {
        return if config.require_publish_date {
            Err(GateFailure::MissingDate)
        } else {
            Ok(())
        };
    };
    if date > today {
        return Err(GateFailure::InFuture);
    }
    if date.year() < config.min_year {
        return Err(GateFailure::BeforeMinYear);
    }
    let earliest = today.checked_sub_days(Days::new(u64::from(config.lookback_days)));
    if earliest.is_some_and(|earliest| date < earliest) {
        return Err(GateFailure::TooOld);
    }
    Ok(())
}

/// Post-fetch gates for a record built from a fetched page.
pub fn relevance_gate(
    record: &FundingRecord,
    title: &str,
    config: &Config,
    today: NaiveDate,
) -> Result<(), GateFailure> {
    if !has_funding_signal(record, title, config) {
        return Err(GateFailure::NoFundingSignal);
    }
    check_date(record.publish_date, config, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::models::Round;

    fn config() -> Config {
        Config::new(
            Credentials {
                api_key: "k".to_string(),
                engine_id: "cx".to_string(),
            },
            vec!["restaurant robotics".to_string()],
        )
    }

    fn hit(title: &str, link: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            link: link.to_string(),
            snippet: String::new(),
        }
    }

    fn record(snippet: &str) -> FundingRecord {
        FundingRecord {
            company: "Acme".to_string(),
            round: Round::Unknown,
            amount_usd: None,
            investors: vec![],
            publish_date: None,
            source_url: "https://example.com/a".to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_prefetch_domains() {
        let cfg = config();
        assert_eq!(
            prefetch_skip(&hit("Acme raises $5M", "https://www.linkedin.com/posts/acme"), &cfg),
            Some(SkipReason::ExcludedDomain)
        );
        assert_eq!(
            prefetch_skip(&hit("Acme", "https://boards.greenhouse.io/acme/123"), &cfg),
            Some(SkipReason::JobDomain)
        );
        assert_eq!(
            prefetch_skip(&hit("Acme", "https://uk.indeed.com/viewjob"), &cfg),
            Some(SkipReason::JobDomain)
        );
        assert_eq!(prefetch_skip(&hit("Acme raises $5M", "https://notx.com/a"), &cfg), None);
    }

    #[test]
    fn test_prefetch_job_keywords_are_whole_words() {
        let cfg = config();
        assert_eq!(
            prefetch_skip(&hit("Acme is hiring robotics engineers", "https://acme.com/news"), &cfg),
            Some(SkipReason::JobKeyword)
        );
        assert_eq!(
            prefetch_skip(&hit("Acme raises $5M", "https://acme.com/careers/eng"), &cfg),
            Some(SkipReason::JobKeyword)
        );
        // "Jobsite" and "applying" are not job keywords
        assert_eq!(
            prefetch_skip(&hit("Jobsite robotics startup raises seed", "https://acme.com/applying-ai"), &cfg),
            None
        );
    }

    #[test]
    fn test_funding_signal_sources() {
        let cfg = config();
        assert!(has_funding_signal(&record(""), "Acme raises $5M", &cfg));
        assert!(has_funding_signal(&record("the round was led by Foo"), "Acme news", &cfg));

        let mut by_amount = record("");
        by_amount.amount_usd = Some(250_000);
        assert!(has_funding_signal(&by_amount, "Acme news", &cfg));
        by_amount.amount_usd = Some(50_000);
        assert!(!has_funding_signal(&by_amount, "Acme news", &cfg));

        let mut by_round = record("");
        by_round.round = Round::Seed;
        assert!(has_funding_signal(&by_round, "Acme news", &cfg));
    }

    #[test]
    fn test_date_window() {
        let cfg = config();
        let today = ymd(2025, 6, 1);
        assert_eq!(check_date(Some(ymd(2025, 5, 1)), &cfg, today), Ok(()));
        assert_eq!(check_date(Some(today), &cfg, today), Ok(()));
        assert_eq!(check_date(Some(ymd(2025, 3, 3)), &cfg, today), Ok(()));
        assert_eq!(check_date(Some(ymd(2025, 3, 2)), &cfg, today), Err(GateFailure::TooOld));
        assert_eq!(check_date(Some(ymd(2025, 6, 2)), &cfg, today), Err(GateFailure::InFuture));
        assert_eq!(check_date(None, &cfg, today), Err(GateFailure::MissingDate));
    }

    #[test]
    fn test_min_year_and_optional_date() {
        let mut cfg = config();
        cfg.lookback_days = 5000;
        cfg.require_publish_date = false;
        let today = ymd(2025, 6, 1);
        assert_eq!(check_date(Some(ymd(2017, 12, 31)), &cfg, today), Err(GateFailure::BeforeMinYear));
        assert_eq!(check_date(None, &cfg, today), Ok(()));
    }

    #[test]
    fn test_huge_lookback_has_no_lower_bound() {
        let mut cfg = config();
        cfg.lookback_days = u32::MAX;
        let today = ymd(2025, 6, 1);
        assert_eq!(check_date(Some(ymd(2025, 5, 1)), &cfg, today), Ok(()));
        assert_eq!(check_date(Some(ymd(2018, 1, 1)), &cfg, today), Ok(()));
        assert_eq!(check_date(Some(ymd(2025, 6, 2)), &cfg, today), Err(GateFailure::InFuture));
    }

    #[test]
    fn test_relevance_gate_checks_signal_first() {
        let cfg = config();
        let today = ymd(2025, 6, 1);
        let mut rec = record("");
        rec.publish_date = Some(ymd(2025, 5, 20));
        assert_eq!(relevance_gate(&rec, "Acme opens kitchen", &cfg, today), Err(GateFailure::NoFundingSignal));
        assert_eq!(relevance_gate(&rec, "Acme raises seed", &cfg, today), Ok(()));
    }
}
