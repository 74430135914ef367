//! Investor list extraction.
//!
//! Finds the first clause introduced by a connector phrase ("led by",
//! "with participation from", "backed by", ...), cuts it at the end of the
//! sentence and splits it into names along commas and conjunctions. Each
//! piece keeps its first run of name-like tokens, so trailing prose such as
//! "to expand into Texas" falls away. A piece after a bare comma must start
//! with the name, which keeps asides like ", the company said on Tuesday"
//! out of the list.

use super::ExtractionInput;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest clause considered after a connector.
const MAX_CLAUSE_BYTES: usize = 200;

/// Lower-case words that may precede a name after a connector or conjunction.
const MAX_LEADING_WORDS: usize = 3;

/// Lower-case words allowed inside a name ("Bank of America").
const NAME_JOINERS: &[&str] = &["of", "de", "der", "van", "von", "&"];

static CONNECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:co-led by|led by|with participation from|participation from|backed by|investors include|investors including|invested by|funded by)\b",
    )
    .expect("static regex")
});

static SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i),|\band\b|\bas well as\b|\balong with\b|\bco-led by\b|\bled by\b|\bwith participation from\b|\bparticipation from\b|\bbacked by\b|\bincluding\b",
    )
    .expect("static regex")
});

/// Investor names in order of appearance; empty when no clause is found.
pub fn extract(input: &ExtractionInput<'_>) -> Vec<String> {
    from_text(&input.combined_text())
}

pub fn from_text(text: &str) -> Vec<String> {
    let Some(m) = CONNECTOR.find(text) else {
        return Vec::new();
    };
    let clause = sentence_clause(&text[m.end()..]);

    // a piece after a bare comma must open with the name itself
    let mut names = Vec::new();
    let mut piece_start = 0;
    let mut skip_prose = true;
    for sep in SEPARATOR.find_iter(clause) {
        names.extend(name_from_piece(&clause[piece_start..sep.start()], skip_prose));
        skip_prose = sep.as_str() != ",";
        piece_start = sep.end();
    }
    names.extend(name_from_piece(&clause[piece_start..], skip_prose));

    names.into_iter().unique().collect()
}

/// Text up to the end of the sentence, capped at [`MAX_CLAUSE_BYTES`].
fn sentence_clause(rest: &str) -> &str {
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if i >= MAX_CLAUSE_BYTES {
            return &rest[..i];
        }
        let ends_sentence = match c {
            ';' | '\n' => true,
            '.' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if ends_sentence {
            return &rest[..i];
        }
    }
    rest
}

/// Capitalized ("Accel") or letter-led with digits ("a16z").
fn is_name_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_uppercase() => true,
        Some(c) if c.is_alphabetic() => chars.any(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Whether a name can begin at `tokens[i]`. A number only opens a name
/// when a capitalized word follows it ("500 Startups", not "50 million").
fn opens_name(tokens: &[&str], i: usize) -> bool {
    let token = tokens[i];
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return token.chars().all(|c| c.is_ascii_alphanumeric())
            && tokens
                .get(i + 1)
                .is_some_and(|next| next.starts_with(char::is_uppercase));
    }
    is_name_token(token)
}

/// First run of name-like tokens in `piece`.
///
/// With `skip_prose`, up to [`MAX_LEADING_WORDS`] lower-case words
/// ("existing investors") may precede the name; otherwise the piece must
/// start with it.
fn name_from_piece(piece: &str, skip_prose: bool) -> Option<String> {
    let tokens: Vec<&str> = piece
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '&'))
        .filter(|t| !t.is_empty())
        .collect();

    let lead = if skip_prose { MAX_LEADING_WORDS } else { 0 };
    let start = (0..tokens.len().min(lead + 1)).find(|&i| opens_name(&tokens, i))?;
    let mut run: Vec<&str> = std::iter::once(tokens[start])
        .chain(
            tokens[start + 1..]
                .iter()
                .take_while(|t| is_name_token(t) || NAME_JOINERS.contains(t))
                .copied(),
        )
        .collect();
    while run.last().is_some_and(|t| NAME_JOINERS.contains(t)) {
        run.pop();
    }

    (!run.is_empty()).then(|| run.join(" "))
}
