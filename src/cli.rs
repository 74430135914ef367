//! Command-line interface definitions for the funding news scout.
//!
//! Credentials can be passed as flags but are normally read from the
//! `GOOGLE_API_KEY` and `GOOGLE_CSE_ID` environment variables.

use crate::error::ScoutError;
use clap::Parser;

/// Command-line arguments for a scouting run.
///
/// # Examples
///
/// ```sh
/// export GOOGLE_API_KEY=xxx
/// export GOOGLE_CSE_ID=yyy
/// funding_news_scout --days 90 --limit 80 --sleep 1.5
///
/// # Custom keyword file, site/vocabulary overrides and a Markdown digest
/// funding_news_scout -q keywords.txt -c scout.yaml --digest
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Look-back window (days) for the publish date
    #[arg(long, default_value_t = 90)]
    pub days: u32,

    /// Maximum number of search results per query
    #[arg(long, default_value_t = 80)]
    pub limit: usize,

    /// Delay between page requests (seconds)
    #[arg(long, default_value_t = 1.0)]
    pub sleep: f64,

    /// HTTP timeout for search and page requests (seconds)
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Retries for transient network failures before a query or page is skipped
    #[arg(long, default_value_t = 3)]
    pub retries: usize,

    /// Initial backoff between retries (milliseconds), doubled per attempt
    #[arg(long, default_value_t = 1000)]
    pub backoff_ms: u64,

    /// Keyword phrase file, one phrase per line
    #[arg(short, long, default_value = "queries.txt")]
    pub queries: String,

    /// Directory for the dated and latest CSV files
    #[arg(short, long, default_value = "data")]
    pub out_dir: String,

    /// Override the path of the dated CSV file
    #[arg(long)]
    pub outfile: Option<String>,

    /// Optional YAML file overriding sites and vocabularies
    #[arg(short, long)]
    pub config: Option<String>,

    /// Also write a Markdown digest of this run's records
    #[arg(long)]
    pub digest: bool,

    /// Search API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Search engine identifier
    #[arg(long, env = "GOOGLE_CSE_ID", hide_env_values = true)]
    pub cse_id: Option<String>,
}

/// Exit status for a command line clap did not accept.
///
/// Rejected arguments are configuration failures and share their status, so
/// clap's own usage status (`2`) never collides with a search API
/// authentication failure. `--help` and `--version` exit successfully.
///
/// # Arguments
///
/// * `err` - The error returned by [`Cli::try_parse`].
///
/// # Returns
///
/// The process exit status to report.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        ScoutError::Config(err.to_string()).exit_code()
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["funding_news_scout"]);

        assert_eq!(cli.days, 90);
        assert_eq!(cli.limit, 80);
        assert_eq!(cli.sleep, 1.0);
        assert_eq!(cli.queries, "queries.txt");
        assert_eq!(cli.out_dir, "data");
        assert!(cli.outfile.is_none());
        assert!(!cli.digest);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "funding_news_scout",
            "--days",
            "30",
            "--limit",
            "25",
            "--sleep",
            "2.5",
            "-q",
            "/tmp/keywords.txt",
            "-o",
            "/tmp/out",
            "--outfile",
            "/tmp/out/custom.csv",
            "--api-key",
            "k",
            "--cse-id",
            "cx",
            "--digest",
        ]);

        assert_eq!(cli.days, 30);
        assert_eq!(cli.limit, 25);
        assert_eq!(cli.sleep, 2.5);
        assert_eq!(cli.queries, "/tmp/keywords.txt");
        assert_eq!(cli.out_dir, "/tmp/out");
        assert_eq!(cli.outfile.as_deref(), Some("/tmp/out/custom.csv"));
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert_eq!(cli.cse_id.as_deref(), Some("cx"));
        assert!(cli.digest);
    }

    #[test]
    fn test_usage_errors_exit_like_config_errors() {
        let err = Cli::try_parse_from(["funding_news_scout", "--days", "soon"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);

        let err = Cli::try_parse_from(["funding_news_scout", "--no-such-flag"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);

        let err = Cli::try_parse_from(["funding_news_scout", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 0);
    }
}
