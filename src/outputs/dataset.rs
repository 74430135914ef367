//! CSV dataset with de-duplication.
//!
//! # Files
//!
//! ```text
//! out_dir/
//! ├── funding_2025-03-14.csv   # append-only, one per day
//! └── funding_latest.csv       # replaced at the end of every run
//! ```
//!
//! # Identity
//!
//! A record is identified by its normalized source URL (see
//! [`normalize_url`]). Records without a usable URL fall back to the
//! lower-cased composite `company|round|publish_date`.
//!
//! # Resume
//!
//! On open, identities already present in today's dated file are loaded, plus
//! those in the latest file when it was written today. A second run on the
//! same day therefore appends only new rows. The latest file always holds the
//! records seen by the most recent run, old and new alike.

use crate::config::OutputConfig;
use crate::error::ScoutError;
use crate::models::FundingRecord;
use crate::utils::normalize_url;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Column order of both CSV files. Matches the field order of [`FundingRecord`].
pub const COLUMNS: [&str; 7] = [
    "company",
    "round",
    "amount_usd",
    "investors",
    "publish_date",
    "source_url",
    "snippet",
];

pub const LATEST_FILE: &str = "funding_latest.csv";

pub fn dated_path(output: &OutputConfig, today: NaiveDate) -> PathBuf {
    output
        .dated_override
        .clone()
        .unwrap_or_else(|| output.out_dir.join(format!("funding_{}.csv", today)))
}

pub fn latest_path(output: &OutputConfig) -> PathBuf {
    output.out_dir.join(LATEST_FILE)
}

/// Dedup key for a record.
///
/// # Arguments
///
/// * `record` - A record from this run or read back from a dataset file
///
/// # Returns
///
/// The normalized source URL, or `company|round|date` in lower case when the
/// URL cannot be normalized.
pub fn identity_key(record: &FundingRecord) -> String {
    normalize_url(&record.source_url).unwrap_or_else(|| {
        let date = record
            .publish_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        format!("{}|{}|{}", record.company, record.round.label(), date).to_lowercase()
    })
}

/// Every record in a dataset file, skipping rows that do not parse.
///
/// A missing file reads as empty.
pub fn read_records(path: &Path) -> Result<Vec<FundingRecord>, ScoutError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| ScoutError::csv(path, e))?;
    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<FundingRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), row = row + 1, error = %e, "Skipping unreadable row"),
        }
    }
    Ok(records)
}

fn modified_on(path: &Path, day: NaiveDate) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).date_naive() == day)
        .unwrap_or(false)
}

/// Append-only writer for the dated file plus the snapshot for the latest file.
#[derive(Debug)]
pub struct DatasetWriter {
    dated_path: PathBuf,
    latest_path: PathBuf,
    dated: csv::Writer<File>,
    /// Identities already in the dated file or resumed from today's latest file.
    known: HashSet<String>,
    /// Identities offered during this run.
    offered: HashSet<String>,
    snapshot: Vec<FundingRecord>,
    appended: usize,
}

impl DatasetWriter {
    /// Open today's dated file for appending and load known identities.
    ///
    /// # Errors
    ///
    /// [`ScoutError::Io`] or [`ScoutError::Csv`] when an existing file cannot
    /// be opened or the header cannot be written.
    #[instrument(level = "info", skip_all, fields(out_dir = %output.out_dir.display(), %today))]
    pub fn open(output: &OutputConfig, today: NaiveDate) -> Result<Self, ScoutError> {
        let dated_path = dated_path(output, today);
        let latest_path = latest_path(output);

        let mut known: HashSet<String> = read_records(&dated_path)?.iter().map(identity_key).collect();
        let from_dated = known.len();
        if modified_on(&latest_path, today) {
            known.extend(read_records(&latest_path)?.iter().map(identity_key));
        }

        if let Some(parent) = dated_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScoutError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&dated_path)
            .map_err(|e| ScoutError::io(&dated_path, e))?;
        let is_new = file
            .metadata()
            .map_err(|e| ScoutError::io(&dated_path, e))?
            .len()
            == 0;

        let mut dated = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            dated
                .write_record(COLUMNS)
                .and_then(|_| dated.flush().map_err(csv::Error::from))
                .map_err(|e| ScoutError::csv(&dated_path, e))?;
        }

        info!(
            path = %dated_path.display(),
            known = known.len(),
            from_dated,
            "Dataset opened"
        );
        Ok(Self {
            dated_path,
            latest_path,
            dated,
            known,
            offered: HashSet::new(),
            snapshot: Vec::new(),
            appended: 0,
        })
    }

    /// Offer one record. Returns `true` when it was appended to the dated file.
    pub fn offer(&mut self, record: FundingRecord) -> Result<bool, ScoutError> {
        let key = identity_key(&record);

        let appended = if self.known.insert(key.clone()) {
            self.dated
                .serialize(&record)
                .and_then(|_| self.dated.flush().map_err(csv::Error::from))
                .map_err(|e| ScoutError::csv(&self.dated_path, e))?;
            self.appended += 1;
            true
        } else {
            debug!(%key, "Already in dataset");
            false
        };

        if self.offered.insert(key) {
            self.snapshot.push(record);
        }
        Ok(appended)
    }

    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn dated_path(&self) -> &Path {
        &self.dated_path
    }

    /// Replace the latest file with this run's records and return them.
    #[instrument(level = "info", skip_all, fields(path = %self.latest_path.display()))]
    pub fn finish(self) -> Result<Vec<FundingRecord>, ScoutError> {
        let Self {
            latest_path,
            snapshot,
            appended,
            ..
        } = self;

        let tmp_path = latest_path.with_extension("csv.tmp");
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp_path)
            .map_err(|e| ScoutError::csv(&tmp_path, e))?;
        writer
            .write_record(COLUMNS)
            .map_err(|e| ScoutError::csv(&tmp_path, e))?;
        for record in &snapshot {
            writer
                .serialize(record)
                .map_err(|e| ScoutError::csv(&tmp_path, e))?;
        }
        writer.flush().map_err(|e| ScoutError::io(&tmp_path, e))?;
        drop(writer);

        fs::rename(&tmp_path, &latest_path).map_err(|e| ScoutError::io(&latest_path, e))?;
        info!(records = snapshot.len(), appended, "Latest dataset written");
        Ok(snapshot)
    }
}
