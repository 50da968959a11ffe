use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").unwrap());
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2}),(\d{2})\s*€?").unwrap());

/// Leftmost price token on a line: byte offset of the match start (the name
/// part of the line ends there) and the digit-exact amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceHit {
    pub start: usize,
    pub cents: i64,
}

/// What one trimmed line carries. A line can hold both a date and a price
/// token; the parser decides which one governs. Neither present = plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub date: Option<NaiveDate>,
    pub price: Option<PriceHit>,
}

pub fn classify(line: &str) -> Classified {
    Classified {
        date: date_token(line),
        price: price_token(line),
    }
}

/// First `DD.MM.YYYY` token on the line, if it is a real calendar date.
/// A shape match that fails calendar validity (32.01.2026) is no date,
/// not an error.
pub fn date_token(line: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(line)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Leftmost `D,DD` / `DD,DD` token (optional trailing euro sign). When a line
/// holds several price-shaped substrings only the first one governs.
pub fn price_token(line: &str) -> Option<PriceHit> {
    let caps = PRICE_RE.captures(line)?;
    let whole = caps.get(0)?;
    let euros: i64 = caps[1].parse().ok()?;
    let fraction: i64 = caps[2].parse().ok()?;
    Some(PriceHit {
        start: whole.start(),
        cents: euros * 100 + fraction,
    })
}
