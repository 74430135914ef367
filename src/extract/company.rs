//! Company name guess from the headline.
//!
//! Funding headlines overwhelmingly read "<Company> raises ...", so the
//! company is taken from the text before the first funding verb, after
//! dropping the publisher suffix ("... - TechCrunch") and a leading label
//! ("Exclusive: ..."). Only the trailing run of capitalized tokens is kept,
//! which turns "Kitchen robotics startup Chef Robotics" into "Chef Robotics".

use super::ExtractionInput;
use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN_COMPANY: &str = "Unknown";

const TITLE_SEPARATORS: &[&str] = &[" - ", " | ", " — ", " – "];

/// Longest prefix, in words, treated as a label before a colon.
const MAX_LABEL_WORDS: usize = 3;

static FUNDING_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:raises|raised|raise|raising|secures|secured|lands|landed|closes|closed|bags|nabs|snags|gets|receives|announces|completes|scores|pulls in|attracts)\b",
    )
    .expect("static regex")
});

/// Best-guess company, [`UNKNOWN_COMPANY`] when no heuristic matches.
pub fn extract(input: &ExtractionInput<'_>) -> String {
    from_title(input.title).unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

pub fn from_title(title: &str) -> Option<String> {
    let segment = headline_segment(title.trim());
    let segment = strip_label(segment);

    let verb = FUNDING_VERB.find(segment)?;
    let subject = segment[..verb.start()].trim();
    let subject = subject.split(',').next().unwrap_or(subject);

    trailing_name(subject)
}

/// The title segment carrying a funding verb, or the first one.
fn headline_segment(title: &str) -> &str {
    let mut segments = vec![title];
    for sep in TITLE_SEPARATORS {
        segments = segments.into_iter().flat_map(|s| s.split(sep)).collect();
    }
    segments
        .iter()
        .copied()
        .find(|s| FUNDING_VERB.is_match(s))
        .or_else(|| segments.first().copied())
        .unwrap_or(title)
}

fn strip_label(segment: &str) -> &str {
    match segment.split_once(':') {
        Some((label, rest))
            if !rest.trim().is_empty()
                && label.split_whitespace().count() <= MAX_LABEL_WORDS
                && !FUNDING_VERB.is_match(label) =>
        {
            rest.trim()
        }
        _ => segment,
    }
}

fn is_name_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
        || token.chars().any(|c| c.is_ascii_digit())
        || token == "&"
}

fn clean_token(token: &str) -> &str {
    let token = token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("’s"))
        .unwrap_or(token);
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '.')
}

fn trailing_name(subject: &str) -> Option<String> {
    let tokens: Vec<&str> = subject
        .split_whitespace()
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .collect();

    let keep = tokens.iter().rev().take_while(|t| is_name_token(t)).count();
    let mut run = &tokens[tokens.len() - keep..];
    while run.first() == Some(&"&") {
        run = &run[1..];
    }
    (!run.is_empty()).then(|| run.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(title: &str) -> String {
        extract(&ExtractionInput {
            title,
            ..Default::default()
        })
    }

    #[test]
    fn test_publisher_suffix_dropped() {
        assert_eq!(company("Miso Robotics raises $4.5M Series B - The Spoon"), "Miso Robotics");
        assert_eq!(company("Picnic lands $30M | TechCrunch"), "Picnic");
    }

    #[test]
    fn test_descriptor_prefix_dropped() {
        assert_eq!(
            company("Exclusive: Kitchen robotics startup Chef Robotics lands $15M"),
            "Chef Robotics"
        );
    }

    #[test]
    fn test_appositive_dropped() {
        assert_eq!(company("Hyphen, a robotics startup, raises $2M"), "Hyphen");
    }

    #[test]
    fn test_digits_and_possessive() {
        assert_eq!(company("Robotics firm 6d Bytes closes seed round"), "6d Bytes");
        assert_eq!(company("Creator's kitchen arm Acme secures funding"), "Acme");
    }

    #[test]
    fn test_colon_after_verb_is_not_a_label() {
        assert_eq!(company("Acme raises $5M: report"), "Acme");
    }

    #[test]
    fn test_unknown_fallbacks() {
        assert_eq!(company("The best robot kitchens of 2025"), UNKNOWN_COMPANY);
        assert_eq!(company(""), UNKNOWN_COMPANY);
        assert_eq!(company("kitchen robot maker raises $3M"), UNKNOWN_COMPANY);
    }
}
