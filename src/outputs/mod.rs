//! Output files of a run.
//!
//! # Submodules
//!
//! - [`dataset`]: the dated and latest CSV files, with de-duplication
//! - [`digest`]: optional Markdown summary of the run's records
//!
//! # Output Structure
//!
//! ```text
//! out_dir/
//! ├── funding_2025-05-06.csv         # append-only, one per day
//! ├── funding_latest.csv             # records seen by the most recent run
//! └── funding_digest_2025-05-06.md   # with --digest
//! ```

pub mod dataset;
pub mod digest;
