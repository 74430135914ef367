//! Funding round detection.
//!
//! A single case-insensitive alternation runs over the combined text. The
//! leftmost match wins, so the title beats the snippet and the snippet beats
//! the body; at the same position the earlier alternative wins (`pre-seed`
//! before `seed`).

use super::ExtractionInput;
use crate::models::Round;
use once_cell::sync::Lazy;
use regex::Regex;

static ROUND_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            (?P<preseed>pre[-\s]?seed)
          | (?P<series>series\s+(?P<letter>[a-k]))\b
          | (?P<seed>seed)
          | (?P<angel>angel\s+(?:round|investment|funding))
          | (?P<growth>growth\s+(?:equity|round|funding|investment)|mezzanine)
          | (?P<debt>venture\s+debt|debt\s+(?:financing|funding|round)|credit\s+facility)
          | (?P<grant>grants?)
        )\b",
    )
    .expect("static regex")
});

/// Best-guess funding round, [`Round::Unknown`] when nothing matches.
pub fn extract(input: &ExtractionInput<'_>) -> Round {
    classify(&input.combined_text())
}

/// Round named by the leftmost vocabulary match in `text`.
pub fn classify(text: &str) -> Round {
    let Some(caps) = ROUND_PAT.captures(text) else {
        return Round::Unknown;
    };

    if caps.name("preseed").is_some() {
        Round::PreSeed
    } else if let Some(letter) = caps.name("letter") {
        match letter.as_str().to_ascii_lowercase().as_str() {
            "a" => Round::SeriesA,
            "b" => Round::SeriesB,
            "c" => Round::SeriesC,
            _ => Round::SeriesDPlus,
        }
    } else if caps.name("seed").is_some() {
        Round::Seed
    } else if caps.name("angel").is_some() {
        Round::Angel
    } else if caps.name("growth").is_some() {
        Round::Growth
    } else if caps.name("debt").is_some() {
        Round::Debt
    } else if caps.name("grant").is_some() {
        Round::Grant
    } else {
        Round::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_b_from_title() {
        let input = ExtractionInput {
            title: "XCompany raises Series B funding",
            ..Default::default()
        };
        assert_eq!(extract(&input), Round::SeriesB);
    }

    #[test]
    fn test_no_match_is_unknown() {
        let input = ExtractionInput {
            title: "XCompany opens a new office in Austin",
            snippet: "The restaurant chain hired a new CFO.",
            ..Default::default()
        };
        assert_eq!(extract(&input), Round::Unknown);
    }

    #[test]
    fn test_vocabulary() {
        assert_eq!(classify("closes $2M pre-seed round"), Round::PreSeed);
        assert_eq!(classify("closes $2M Pre Seed round"), Round::PreSeed);
        assert_eq!(classify("a $3M seed round"), Round::Seed);
        assert_eq!(classify("SERIES A led by Foo"), Round::SeriesA);
        assert_eq!(classify("its series c extension"), Round::SeriesC);
        assert_eq!(classify("a Series F round"), Round::SeriesDPlus);
        assert_eq!(classify("an angel round from operators"), Round::Angel);
        assert_eq!(classify("a growth equity investment"), Round::Growth);
        assert_eq!(classify("secures $40M in venture debt"), Round::Debt);
        assert_eq!(classify("awarded a federal grant"), Round::Grant);
    }

    #[test]
    fn test_leftmost_match_wins() {
        let input = ExtractionInput {
            title: "Acme lands seed funding",
            body: "Investors in its earlier Series A include ...",
            ..Default::default()
        };
        assert_eq!(extract(&input), Round::Seed);
    }

    #[test]
    fn test_word_boundaries() {
        assert_eq!(classify("seedling farms expand"), Round::Unknown);
        assert_eq!(classify("a series about kitchens"), Round::Unknown);
        assert_eq!(classify("Angela joins the board"), Round::Unknown);
    }
}
