//! Run configuration.
//!
//! A [`Config`] is assembled once at startup from the CLI, the environment,
//! an optional YAML overrides file and the keyword phrase file, then passed by
//! reference through the pipeline. Nothing mutates it afterwards.
//!
//! # Overrides file
//!
//! Every key is optional; unknown keys are rejected so typos surface early.
//!
//! ```yaml
//! sites: ["techcrunch.com", "therobotreport.com"]
//! funding_keywords: ["raises", "series A", "seed round"]
//! notable_investors: ["Sequoia", "a16z"]
//! min_year: 2020
//! require_publish_date: false
//! ```

use crate::backoff::RetryPolicy;
use crate::cli::Cli;
use crate::error::ScoutError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Default target sites: tech/funding press, robotics and restaurant trades,
/// newswires and hospitality trades.
pub const DEFAULT_SITES: &[&str] = &[
    "techcrunch.com",
    "crunchbase.com",
    "pitchbook.com",
    "cbinsights.com",
    "venturebeat.com",
    "theinformation.com",
    "axios.com",
    "businessinsider.com",
    "forbes.com",
    "reuters.com",
    "bloomberg.com",
    "ft.com",
    "therobotreport.com",
    "robotics247.com",
    "roboticsbusinessreview.com",
    "thespoon.tech",
    "qsrmagazine.com",
    "nrn.com",
    "restaurantdive.com",
    "fastcasual.com",
    "modernrestaurantmanagement.com",
    "prnewswire.com",
    "globenewswire.com",
    "businesswire.com",
    "newswire.com",
    "asianhospitality.com",
    "hotelmanagement.net",
    "hospitalitynet.org",
];

/// Terms OR-ed into every query to bias results towards funding news.
pub const DEFAULT_FUNDING_KEYWORDS: &[&str] = &[
    "funding",
    "raises",
    "raised",
    "raise",
    "series A",
    "series B",
    "series C",
    "series D",
    "seed round",
    "pre-seed",
    "angel round",
    "venture funding",
    "equity financing",
    "convertible note",
    "round led by",
    "led by",
    "investment",
    "invests",
    "backs",
];

/// Strong funding signals checked against title and snippet.
pub const DEFAULT_HARD_FUNDING_KEYWORDS: &[&str] = &[
    "raises",
    "raised",
    "raise",
    "funding",
    "series a",
    "series b",
    "series c",
    "series d",
    "seed round",
    "pre-seed",
    "angel round",
    "investment round",
    "round led by",
    "led by",
    "backs",
    "invests in",
    "equity financing",
    "venture funding",
];

pub const DEFAULT_EXCLUDED_DOMAINS: &[&str] = &[
    "facebook.com",
    "x.com",
    "twitter.com",
    "linkedin.com",
    "youtube.com",
    "medium.com",
];

pub const DEFAULT_JOB_DOMAINS: &[&str] = &[
    "talents.vaia.com",
    "boards.greenhouse.io",
    "jobs.lever.co",
    "lever.co",
    "careers.google.com",
    "jobs.workable.com",
    "workable.com",
    "smartrecruiters.com",
    "indeed.com",
    "linkedin.com",
    "glassdoor.com",
    "angel.co",
    "wellfound.com",
    "monster.com",
    "ziprecruiter.com",
    "jobvite.com",
];

pub const DEFAULT_JOB_KEYWORDS: &[&str] = &[
    "job",
    "jobs",
    "career",
    "careers",
    "apply",
    "hiring",
    "recruit",
    "recruiting",
    "talent",
    "vacancy",
    "position",
    "opening",
    "role",
];

/// Excluded at query level with `-"term"`.
pub const DEFAULT_NEGATIVE_TERMS: &[&str] = &[
    "job", "jobs", "career", "careers", "apply", "hiring", "recruit", "talent",
];

pub const DEFAULT_NOTABLE_INVESTORS: &[&str] = &[
    "Sequoia",
    "Andreessen Horowitz",
    "a16z",
    "Accel",
    "Lightspeed",
    "SoftBank",
    "Tiger Global",
    "Temasek",
    "GGV",
    "DST",
    "Index Ventures",
    "General Catalyst",
    "Founders Fund",
    "Y Combinator",
    "YC",
    "Khosla",
];

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; FundingScout/0.1; +https://github.com/funding-news-scout)";

pub const DEFAULT_MIN_YEAR: i32 = 2018;
pub const DEFAULT_MIN_SIGNAL_AMOUNT_USD: u64 = 100_000;

/// Search API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub engine_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}

/// Where the dataset goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    /// Replaces `{out_dir}/funding_{date}.csv` when set.
    pub dated_override: Option<PathBuf>,
    pub digest: bool,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub lookback_days: u32,
    pub result_limit: usize,
    pub request_delay: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub phrases: Vec<String>,
    pub sites: Vec<String>,
    pub funding_keywords: Vec<String>,
    pub hard_funding_keywords: Vec<String>,
    pub excluded_domains: Vec<String>,
    pub job_domains: Vec<String>,
    pub job_keywords: Vec<String>,
    pub negative_terms: Vec<String>,
    pub notable_investors: Vec<String>,
    pub min_year: i32,
    pub min_signal_amount_usd: u64,
    pub require_publish_date: bool,
    pub user_agent: String,
    pub output: OutputConfig,
}

/// Optional overrides read from YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    pub sites: Option<Vec<String>>,
    pub funding_keywords: Option<Vec<String>>,
    pub hard_funding_keywords: Option<Vec<String>>,
    pub excluded_domains: Option<Vec<String>>,
    pub job_domains: Option<Vec<String>>,
    pub job_keywords: Option<Vec<String>>,
    pub negative_terms: Option<Vec<String>>,
    pub notable_investors: Option<Vec<String>>,
    pub min_year: Option<i32>,
    pub min_signal_amount_usd: Option<u64>,
    pub require_publish_date: Option<bool>,
    pub user_agent: Option<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Configuration with built-in defaults for everything except
    /// credentials and keyword phrases.
    pub fn new(credentials: Credentials, phrases: Vec<String>) -> Self {
        Self {
            credentials,
            lookback_days: 90,
            result_limit: 80,
            request_delay: Duration::from_secs(1),
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            phrases,
            sites: owned(DEFAULT_SITES),
            funding_keywords: owned(DEFAULT_FUNDING_KEYWORDS),
            hard_funding_keywords: owned(DEFAULT_HARD_FUNDING_KEYWORDS),
            excluded_domains: owned(DEFAULT_EXCLUDED_DOMAINS),
            job_domains: owned(DEFAULT_JOB_DOMAINS),
            job_keywords: owned(DEFAULT_JOB_KEYWORDS),
            negative_terms: owned(DEFAULT_NEGATIVE_TERMS),
            notable_investors: owned(DEFAULT_NOTABLE_INVESTORS),
            min_year: DEFAULT_MIN_YEAR,
            min_signal_amount_usd: DEFAULT_MIN_SIGNAL_AMOUNT_USD,
            require_publish_date: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output: OutputConfig {
                out_dir: PathBuf::from("data"),
                dated_override: None,
                digest: false,
            },
        }
    }

    /// Build the run configuration from parsed CLI arguments.
    ///
    /// # Errors
    ///
    /// [`ScoutError::Config`] when credentials are missing, numeric options
    /// are out of range, or the keyword/overrides files cannot be read.
    #[instrument(level = "info", skip_all, fields(queries = %cli.queries))]
    pub fn from_cli(cli: &Cli) -> Result<Self, ScoutError> {
        let credentials = match (non_empty(&cli.api_key), non_empty(&cli.cse_id)) {
            (Some(api_key), Some(engine_id)) => Credentials { api_key, engine_id },
            _ => {
                return Err(ScoutError::Config(
                    "please set GOOGLE_API_KEY and GOOGLE_CSE_ID environment variables".to_string(),
                ));
            }
        };

        let request_delay = Duration::try_from_secs_f64(cli.sleep).map_err(|e| {
            ScoutError::Config(format!(
                "--sleep must be a non-negative number of seconds, got {} ({})",
                cli.sleep, e
            ))
        })?;

        let phrases = load_phrases(Path::new(&cli.queries))?;
        if phrases.is_empty() {
            return Err(ScoutError::Config(format!(
                "keyword file {} contains no phrases",
                cli.queries
            )));
        }

        let mut config = Config::new(credentials, phrases);
        config.lookback_days = cli.days;
        config.result_limit = cli.limit;
        config.request_delay = request_delay;
        config.http_timeout = Duration::from_secs(cli.timeout);
        config.retry = RetryPolicy::new(cli.retries, Duration::from_millis(cli.backoff_ms));
        config.output = OutputConfig {
            out_dir: PathBuf::from(&cli.out_dir),
            dated_override: cli.outfile.as_ref().map(PathBuf::from),
            digest: cli.digest,
        };

        if let Some(path) = &cli.config {
            let overrides = load_overrides(Path::new(path))?;
            config.apply(overrides);
        }

        info!(
            phrases = config.phrases.len(),
            sites = config.sites.len(),
            days = config.lookback_days,
            limit = config.result_limit,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer YAML overrides on top of the current values.
    pub fn apply(&mut self, overrides: Overrides) {
        let Overrides {
            sites,
            funding_keywords,
            hard_funding_keywords,
            excluded_domains,
            job_domains,
            job_keywords,
            negative_terms,
            notable_investors,
            min_year,
            min_signal_amount_usd,
            require_publish_date,
            user_agent,
        } = overrides;

        if let Some(v) = sites {
            self.sites = v;
        }
        if let Some(v) = funding_keywords {
            self.funding_keywords = v;
        }
        if let Some(v) = hard_funding_keywords {
            self.hard_funding_keywords = v.into_iter().map(|k| k.to_lowercase()).collect();
        }
        if let Some(v) = excluded_domains {
            self.excluded_domains = v;
        }
        if let Some(v) = job_domains {
            self.job_domains = v;
        }
        if let Some(v) = job_keywords {
            self.job_keywords = v;
        }
        if let Some(v) = negative_terms {
            self.negative_terms = v;
        }
        if let Some(v) = notable_investors {
            self.notable_investors = v;
        }
        if let Some(v) = min_year {
            self.min_year = v;
        }
        if let Some(v) = min_signal_amount_usd {
            self.min_signal_amount_usd = v;
        }
        if let Some(v) = require_publish_date {
            self.require_publish_date = v;
        }
        if let Some(v) = user_agent {
            self.user_agent = v;
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a keyword file body: one phrase per line, `#` starts a comment line.
pub fn parse_phrases(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_phrases(path: &Path) -> Result<Vec<String>, ScoutError> {
    let body = fs::read_to_string(path).map_err(|e| {
        ScoutError::Config(format!("cannot read keyword file {}: {}", path.display(), e))
    })?;
    Ok(parse_phrases(&body))
}

pub fn load_overrides(path: &Path) -> Result<Overrides, ScoutError> {
    let body = fs::read_to_string(path).map_err(|e| {
        ScoutError::Config(format!("cannot read config file {}: {}", path.display(), e))
    })?;
    parse_overrides(&body)
        .map_err(|e| ScoutError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

pub fn parse_overrides(body: &str) -> Result<Overrides, serde_yaml::Error> {
    if body.trim().is_empty() {
        return Ok(Overrides::default());
    }
    serde_yaml::from_str(body)
}
