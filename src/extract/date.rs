//! Publish date extraction.
//!
//! Structured metadata hints win over dates spotted in the text. Hints are
//! tried in the order the fetcher collected them; the first one that parses
//! is used. Otherwise the first well-formed date in title, snippet and body.

use super::ExtractionInput;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

static DATE_PAT: Lazy<Regex> = Lazy::new(|| {
    let month = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
    Regex::new(&format!(
        r"(?ix)
        \b(?P<mon>{month})\b\.?\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?,?\s+(?P<year>\d{{4}})\b
        | \b(?P<iy>\d{{4}})-(?P<im>\d{{2}})-(?P<id>\d{{2}})\b
        | \b(?P<dday>\d{{1,2}})\s+(?P<dmon>{month})\b\.?,?\s+(?P<dyear>\d{{4}})\b"
    ))
    .expect("static regex")
});

pub fn extract(input: &ExtractionInput<'_>) -> Option<NaiveDate> {
    input
        .published_hints
        .iter()
        .find_map(|hint| parse_hint(hint))
        .or_else(|| from_text(&input.combined_text()))
}

/// Parse a metadata date: RFC 3339, RFC 2822 or a leading `YYYY-MM-DD`.
pub fn parse_hint(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    let prefix = raw.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(prefix, "%Y/%m/%d"))
        .ok()
}

/// First valid calendar date written out in `text`.
pub fn from_text(text: &str) -> Option<NaiveDate> {
    DATE_PAT.captures_iter(text).find_map(|caps| to_date(&caps))
}

fn to_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let num = |name: &str| -> Option<u32> { caps.name(name)?.as_str().parse().ok() };
    let (year, month, day) = if let Some(mon) = caps.name("mon") {
        (num("year")?, month_number(mon.as_str())?, num("day")?)
    } else if caps.name("iy").is_some() {
        (num("iy")?, num("im")?, num("id")?)
    } else {
        (num("dyear")?, month_number(caps.name("dmon")?.as_str())?, num("dday")?)
    };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    MONTH_PREFIXES
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_hint_formats() {
        assert_eq!(parse_hint("2025-03-14T08:00:00Z"), ymd(2025, 3, 14));
        assert_eq!(parse_hint("2025-03-14T23:30:00-05:00"), ymd(2025, 3, 14));
        assert_eq!(parse_hint("Fri, 14 Mar 2025 08:00:00 +0000"), ymd(2025, 3, 14));
        assert_eq!(parse_hint(" 2025-03-14 "), ymd(2025, 3, 14));
        assert_eq!(parse_hint("2025/03/14 10:00"), ymd(2025, 3, 14));
        assert_eq!(parse_hint("last Tuesday"), None);
        assert_eq!(parse_hint(""), None);
    }

    #[test]
    fn test_text_formats() {
        assert_eq!(from_text("Mar 14, 2025 ... Acme raised"), ymd(2025, 3, 14));
        assert_eq!(from_text("Published Sept. 3, 2024"), ymd(2024, 9, 3));
        assert_eq!(from_text("on January 2nd, 2024 the company"), ymd(2024, 1, 2));
        assert_eq!(from_text("posted 2023-11-30 by staff"), ymd(2023, 11, 30));
        assert_eq!(from_text("Updated 7 June 2022"), ymd(2022, 6, 7));
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        assert_eq!(from_text("Feb 30, 2024 or maybe Mar 1, 2024"), ymd(2024, 3, 1));
        assert_eq!(from_text("Mayor 12, 2024"), None);
        assert_eq!(from_text("raised $12M in 2024"), None);
    }

    #[test]
    fn test_hints_beat_text() {
        let hints = vec!["not a date".to_string(), "2024-12-01".to_string()];
        let input = ExtractionInput {
            title: "Acme raises $5M",
            snippet: "Mar 14, 2025 ...",
            body: "",
            published_hints: &hints,
        };
        assert_eq!(extract(&input), ymd(2024, 12, 1));
    }

    #[test]
    fn test_falls_back_to_text_then_none() {
        let input = ExtractionInput {
            snippet: "Mar 14, 2025 ...",
            ..Default::default()
        };
        assert_eq!(extract(&input), ymd(2025, 3, 14));
        assert_eq!(extract(&ExtractionInput::default()), None);
    }
}
