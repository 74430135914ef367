//! Heuristic field extractors.
//!
//! Each submodule exposes one pure function over an [`ExtractionInput`]
//! returning a best-guess value. Extractors share no state and may run in
//! any order; a miss is `None`, an empty list or `"Unknown"`, never an
//! error.
//!
//! | Field | Module | Miss value |
//! |-------|--------|------------|
//! | company | [`company`] | `"Unknown"` |
//! | round | [`round`] | [`crate::models::Round::Unknown`] |
//! | amount_usd | [`amount`] | `None` |
//! | investors | [`investors`] | `[]` |
//! | publish_date | [`date`] | `None` |

pub mod amount;
pub mod company;
pub mod date;
pub mod investors;
pub mod round;

use crate::models::{FetchOutcome, FundingRecord, SearchResult};

/// Everything the extractors may look at for one search hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionInput<'a> {
    pub title: &'a str,
    pub snippet: &'a str,
    /// Page text, empty when the fetch failed.
    pub body: &'a str,
    /// Raw date strings from page metadata.
    pub published_hints: &'a [String],
}

impl<'a> ExtractionInput<'a> {
    pub fn new(result: &'a SearchResult, outcome: &'a FetchOutcome) -> Self {
        let (body, published_hints) = match outcome.page() {
            Some(page) => (page.text.as_str(), page.published_hints.as_slice()),
            None => ("", &[][..]),
        };
        Self {
            title: &result.title,
            snippet: &result.snippet,
            body,
            published_hints,
        }
    }

    /// Title, snippet and body joined by newlines, empty parts skipped.
    pub fn combined_text(&self) -> String {
        [self.title, self.snippet, self.body]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run every extractor and assemble the output row.
pub fn extract_record(result: &SearchResult, outcome: &FetchOutcome) -> FundingRecord {
    let input = ExtractionInput::new(result, outcome);
    FundingRecord {
        company: company::extract(&input),
        round: round::extract(&input),
        amount_usd: amount::extract(&input),
        investors: investors::extract(&input),
        publish_date: date::extract(&input),
        source_url: result.link.trim().to_string(),
        snippet: result.snippet.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchedPage, Round};
    use chrono::NaiveDate;

    fn hit() -> SearchResult {
        SearchResult {
            title: "Miso Robotics raises $4.5M Series B - The Spoon".to_string(),
            link: " https://thespoon.tech/miso-raises ".to_string(),
            snippet: "Mar 14, 2025 ... The kitchen robotics company closed a round led by Acme Ventures and Beta Capital.".to_string(),
        }
    }

    #[test]
    fn test_extract_record_from_fetched_page() {
        let outcome = FetchOutcome::Fetched(FetchedPage {
            text: "Miso Robotics announced today it raised $4.5 million.".to_string(),
            published_hints: vec!["2025-03-14T08:00:00Z".to_string()],
        });
        let record = extract_record(&hit(), &outcome);

        assert_eq!(record.company, "Miso Robotics");
        assert_eq!(record.round, Round::SeriesB);
        assert_eq!(record.amount_usd, Some(4_500_000));
        assert_eq!(record.investors, vec!["Acme Ventures", "Beta Capital"]);
        assert_eq!(record.publish_date, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(record.source_url, "https://thespoon.tech/miso-raises");
    }

    #[test]
    fn test_extract_record_without_body_uses_title_and_snippet() {
        let outcome = FetchOutcome::Failed {
            reason: "timeout".to_string(),
        };
        let record = extract_record(&hit(), &outcome);

        assert_eq!(record.company, "Miso Robotics");
        assert_eq!(record.round, Round::SeriesB);
        assert_eq!(record.amount_usd, Some(4_500_000));
        assert_eq!(record.publish_date, NaiveDate::from_ymd_opt(2025, 3, 14));
    }

    #[test]
    fn test_combined_text_skips_empty_parts() {
        let input = ExtractionInput {
            title: "Title",
            snippet: "  ",
            body: "Body",
            published_hints: &[],
        };
        assert_eq!(input.combined_text(), "Title\nBody");
    }
}
