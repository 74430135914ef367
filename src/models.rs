//! Data models for search results, fetched pages and funding records.
//!
//! - [`SearchResult`]: one hit returned by the search API
//! - [`FetchOutcome`]: what the page fetcher produced for a hit
//! - [`Round`]: the closed vocabulary of funding stages
//! - [`FundingRecord`]: one extracted row of the output dataset
//!
//! [`FundingRecord`] is also the CSV row type, so the column order of the
//! output files is the field order declared here.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single hit returned by the search API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    /// Headline as shown by the search engine.
    #[serde(default)]
    pub title: String,
    /// Absolute URL of the article.
    #[serde(default)]
    pub link: String,
    /// Short excerpt chosen by the search engine.
    #[serde(default)]
    pub snippet: String,
}

/// Text rendering of a successfully fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Visible text with markup stripped and whitespace collapsed.
    pub text: String,
    /// Raw publish-date strings from structured metadata, highest priority first.
    pub published_hints: Vec<String>,
}

/// Result of fetching one search hit.
///
/// Fetch failures are data, not errors: the pipeline still builds a record
/// from the title and snippet alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(FetchedPage),
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn page(&self) -> Option<&FetchedPage> {
        match self {
            FetchOutcome::Fetched(page) => Some(page),
            FetchOutcome::Failed { .. } => None,
        }
    }
}

/// Funding stage, normalized to a small closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Round {
    PreSeed,
    Seed,
    Angel,
    SeriesA,
    SeriesB,
    SeriesC,
    /// Series D and every later lettered round.
    SeriesDPlus,
    Growth,
    Debt,
    Grant,
    #[default]
    Unknown,
}

impl Round {
    /// Label used in CSV output and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Round::PreSeed => "Pre-Seed",
            Round::Seed => "Seed",
            Round::Angel => "Angel",
            Round::SeriesA => "Series A",
            Round::SeriesB => "Series B",
            Round::SeriesC => "Series C",
            Round::SeriesDPlus => "Series D+",
            Round::Growth => "Growth",
            Round::Debt => "Debt",
            Round::Grant => "Grant",
            Round::Unknown => "Unknown",
        }
    }

    /// Inverse of [`Round::label`]. Anything unrecognized, including an empty
    /// field, reads back as [`Round::Unknown`].
    pub fn from_label(label: &str) -> Round {
        match label.trim().to_ascii_lowercase().as_str() {
            "pre-seed" => Round::PreSeed,
            "seed" => Round::Seed,
            "angel" => Round::Angel,
            "series a" => Round::SeriesA,
            "series b" => Round::SeriesB,
            "series c" => Round::SeriesC,
            "series d+" => Round::SeriesDPlus,
            "growth" => Round::Growth,
            "debt" => Round::Debt,
            "grant" => Round::Grant,
            _ => Round::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Round::Unknown
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Round {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Round {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Round::from_label(&raw))
    }
}

/// One row of the output dataset.
///
/// Created once per unique search hit and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRecord {
    /// Best-guess company name, `"Unknown"` when no heuristic matched.
    pub company: String,
    pub round: Round,
    /// Normalized amount in whole US dollars.
    pub amount_usd: Option<u64>,
    /// Investor names in order of appearance.
    #[serde(with = "investor_list")]
    pub investors: Vec<String>,
    pub publish_date: Option<NaiveDate>,
    pub source_url: String,
    pub snippet: String,
}

/// CSV cells are flat, so investor lists travel as a `"; "`-joined string.
mod investor_list {
    use serde::{Deserialize, Deserializer, Serializer};

    const SEPARATOR: &str = "; ";

    pub fn serialize<S: Serializer>(investors: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&investors.join(SEPARATOR))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
