//! Error taxonomy for a scouting run.
//!
//! Failures fall into three groups:
//! - **Run-fatal**: bad credentials, exhausted quota, broken configuration and
//!   output file failures. The run stops (quota stops gracefully, keeping
//!   whatever was already written).
//! - **Per-query / per-page**: transient network trouble, unexpected API
//!   responses and unparseable payloads. The query or page is skipped.
//! - **Extraction misses** are not errors at all; extractors return `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while scouting.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The search API rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The search API refused the request because of rate or daily quota.
    #[error("search quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Network failure, timeout or a 5xx response.
    #[error("transient network error: {0}")]
    Transient(String),

    /// Any other non-success API response.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API body
        message: String,
    },

    /// The API answered 2xx but the payload did not decode.
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing credentials, unreadable keyword file, malformed overrides.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ScoutError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Only transient failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Errors that end the whole run rather than a single query or page.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::QuotaExceeded(_) | Self::Config(_) | Self::Io { .. } | Self::Csv { .. }
        )
    }

    /// Process exit status reported to the scheduler.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Auth(_) => 2,
            Self::QuotaExceeded(_) => 3,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for ScoutError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ScoutError::Parse(e.to_string())
        } else {
            ScoutError::Transient(e.to_string())
        }
    }
}
