//! Markdown digest of a run's records.
//!
//! Written as `funding_digest_{date}.md` next to the CSV files when
//! `--digest` is set. The table is sorted by amount, largest first, with
//! unknown amounts last, and each row carries highlight tags.

use crate::error::ScoutError;
use crate::models::FundingRecord;
use chrono::NaiveDate;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Amount from which a round is tagged as large.
pub const LARGE_ROUND_USD: u64 = 10_000_000;

/// Display units from largest to smallest: scale, suffix and decimals.
const MONEY_UNITS: [(f64, &str, usize); 3] = [(1e9, "B", 2), (1e6, "M", 2), (1e3, "K", 1)];

/// Render a USD amount compactly for the digest table.
///
/// # Arguments
///
/// * `usd` - Whole dollars, or `None` when no amount was found.
///
/// # Returns
///
/// `$1.20B`, `$4.50M`, `$12.5K`, `$900`, or `-` when the amount is unknown.
/// The unit is chosen after rounding, so `999_960` renders as `$1.00M`.
pub fn format_money(usd: Option<u64>) -> String {
    let Some(v) = usd else {
        return "-".to_string();
    };
    let f = v as f64;
    let Some(mut idx) = MONEY_UNITS.iter().position(|&(scale, _, _)| f >= scale) else {
        return format!("${}", v);
    };
    let (scale, _, precision) = MONEY_UNITS[idx];
    let factor = 10f64.powi(precision as i32);
    if idx > 0 && (f / scale * factor).round() / factor >= 1000.0 {
        idx -= 1;
    }
    let (scale, suffix, precision) = MONEY_UNITS[idx];
    format!("${:.*}{}", precision, f / scale, suffix)
}

/// `needle` occurs in `haystack` on word boundaries, ignoring case.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.to_lowercase();
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(&needle).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Highlight tags for one digest row.
///
/// # Arguments
///
/// * `record` - The record being rendered
/// * `notable_investors` - Investor names matched as whole words, ignoring case
///
/// # Returns
///
/// In order: `Large round` from [`LARGE_ROUND_USD`], `Notable investor`,
/// then the round label when the round is known.
pub fn tags(record: &FundingRecord, notable_investors: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    if record.amount_usd.is_some_and(|a| a >= LARGE_ROUND_USD) {
        tags.push("Large round".to_string());
    }
    let notable = record
        .investors
        .iter()
        .any(|inv| notable_investors.iter().any(|n| contains_phrase(inv, n)));
    if notable {
        tags.push("Notable investor".to_string());
    }
    if record.round.is_known() {
        tags.push(record.round.label().to_string());
    }
    tags
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render the digest document.
pub fn render(records: &[FundingRecord], notable_investors: &[String], date: NaiveDate) -> String {
    let mut sorted: Vec<&FundingRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.amount_usd.cmp(&a.amount_usd));

    let large = records
        .iter()
        .filter(|r| r.amount_usd.is_some_and(|a| a >= LARGE_ROUND_USD))
        .count();

    let mut md = String::new();
    writeln!(md, "# Funding digest {}\n", date).unwrap();
    writeln!(md, "{} records, {} large rounds.\n", records.len(), large).unwrap();
    if sorted.is_empty() {
        return md;
    }

    writeln!(md, "| Company | Round | Amount | Investors | Date | Tags | Source |").unwrap();
    writeln!(md, "|---|---|---|---|---|---|---|").unwrap();
    for r in sorted {
        let date = r.publish_date.map(|d| d.to_string()).unwrap_or_default();
        writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | [link]({}) |",
            cell(&r.company),
            r.round,
            format_money(r.amount_usd),
            cell(&r.investors.join(", ")),
            date,
            tags(r, notable_investors).join(", "),
            r.source_url
        )
        .unwrap();
    }
    md
}

pub fn digest_path(out_dir: &Path, date: NaiveDate) -> PathBuf {
    out_dir.join(format!("funding_digest_{}.md", date))
}

/// Write the digest for `records` into `out_dir`.
#[instrument(level = "info", skip_all, fields(out_dir = %out_dir.display()))]
pub async fn write_digest(
    out_dir: &Path,
    date: NaiveDate,
    records: &[FundingRecord],
    notable_investors: &[String],
) -> Result<PathBuf, ScoutError> {
    let path = digest_path(out_dir, date);
    let md = render(records, notable_investors, date);
    fs::write(&path, md)
        .await
        .map_err(|e| ScoutError::io(&path, e))?;
    info!(path = %path.display(), records = records.len(), "Wrote digest");
    Ok(path)
}
