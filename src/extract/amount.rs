//! Funding amount extraction and normalization to whole US dollars.
//!
//! Recognized shapes: currency-prefixed (`$4.5M`, `US$12 million`,
//! `€8m`, `USD 30 mn`) and currency-suffixed (`5 million dollars`,
//! `20M EUR`). Magnitudes: `k`/`thousand`, `m`/`mm`/`mn`/`mln`/`million`,
//! `b`/`bn`/`billion`.
//!
//! Tie-break: the first candidate with a funding keyword in the 60 bytes
//! before it, otherwise the first candidate. Values outside
//! [`MIN_PLAUSIBLE_USD`]..=[`MAX_PLAUSIBLE_USD`] are dropped as noise.

use super::ExtractionInput;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const MIN_PLAUSIBLE_USD: u64 = 10_000;
pub const MAX_PLAUSIBLE_USD: u64 = 10_000_000_000;

/// Fixed conversion rates into USD.
pub const EUR_TO_USD: f64 = 1.08;
pub const GBP_TO_USD: f64 = 1.27;

const CONTEXT_WINDOW: usize = 60;

const FUNDING_CONTEXT: &[&str] = &[
    "raise", "raising", "secure", "close", "lands", "landed", "bags", "nabs",
    "funding", "round", "investment", "financing", "series", "seed", "led by", "backed", "capital",
];

static AMOUNT_PAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?:
            (?P<pcur>US\$|\$|€|£|\bUSD|\bEUR|\bGBP)\s?
            (?P<pnum>\d[\d,]*(?:\.\d+)?)
            (?:\s*(?P<pmag>billion|bn|b|million|mln|mm|mn|m|thousand|k))?
            \b
        )
        |
        (?:
            \b(?P<snum>\d[\d,]*(?:\.\d+)?)
            (?:\s*(?P<smag>billion|bn|b|million|mln|mm|mn|m|thousand|k))?
            \s*(?P<scur>USD|EUR|GBP|dollars|euros|pounds)\b
        )",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    fn parse(token: &str) -> Currency {
        match token.to_ascii_lowercase().as_str() {
            "€" | "eur" | "euros" => Currency::Eur,
            "£" | "gbp" | "pounds" => Currency::Gbp,
            _ => Currency::Usd,
        }
    }
}

/// One monetary expression found in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Byte offset of the expression in the scanned text.
    pub start: usize,
    pub usd: u64,
}

/// Best-guess funding amount in USD.
pub fn extract(input: &ExtractionInput<'_>) -> Option<u64> {
    pick(&input.combined_text())
}

/// Apply the tie-break over every plausible candidate in `text`.
pub fn pick(text: &str) -> Option<u64> {
    let found = candidates(text);
    found
        .iter()
        .find(|c| has_funding_context(text, c.start))
        .or_else(|| found.first())
        .map(|c| c.usd)
}

/// All plausible monetary expressions in document order.
pub fn candidates(text: &str) -> Vec<Candidate> {
    AMOUNT_PAT
        .captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let usd = to_usd(&caps)?;
            (MIN_PLAUSIBLE_USD..=MAX_PLAUSIBLE_USD)
                .contains(&usd)
                .then_some(Candidate { start, usd })
        })
        .collect()
}

fn to_usd(caps: &Captures<'_>) -> Option<u64> {
    let (num, mag, cur) = match caps.name("pnum") {
        Some(num) => (num, caps.name("pmag"), caps.name("pcur")?),
        None => (caps.name("snum")?, caps.name("smag"), caps.name("scur")?),
    };
    let amount = normalize(num.as_str(), mag.map(|m| m.as_str()))?;
    match Currency::parse(cur.as_str()) {
        Currency::Usd => Some(amount),
        Currency::Eur => Some((amount as f64 * EUR_TO_USD).round() as u64),
        Currency::Gbp => Some((amount as f64 * GBP_TO_USD).round() as u64),
    }
}

/// Scale a decimal string by a magnitude suffix using exact integer math.
///
/// `normalize("4.5", Some("M")) == Some(4_500_000)`
pub fn normalize(number: &str, magnitude: Option<&str>) -> Option<u64> {
    let digits: String = number.chars().filter(|c| *c != ',').collect();
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits.as_str(), ""),
    };
    if whole.is_empty() || frac.len() > 18 {
        return None;
    }
    let mantissa: u128 = format!("{}{}", whole, frac).parse().ok()?;
    let scale = 10u128.checked_pow(frac.len() as u32)?;

    let multiplier: u128 = match magnitude.map(|m| m.to_ascii_lowercase()).as_deref() {
        Some("billion" | "bn" | "b") => 1_000_000_000,
        Some("million" | "mln" | "mm" | "mn" | "m") => 1_000_000,
        Some("thousand" | "k") => 1_000,
        _ => 1,
    };

    let value = mantissa.checked_mul(multiplier)? / scale;
    u64::try_from(value).ok()
}

fn has_funding_context(text: &str, start: usize) -> bool {
    let mut from = start.saturating_sub(CONTEXT_WINDOW);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let window = text[from..start].to_lowercase();
    FUNDING_CONTEXT.iter().any(|k| window.contains(k))
}
