//! Balance extraction heuristics.
//!
//! Pure, synchronous functions shared by all platform strategies. The core
//! idea: on a portfolio page the balance is reliably the dominant monetary
//! figure, while fees, PnL, and rewards are smaller or signed. Strategies
//! therefore scan the rendered text for currency amounts, drop sub-floor
//! noise, and keep the largest survivor. The semantic variant additionally
//! inspects the text surrounding each candidate.

use regex::Regex;
use std::sync::LazyLock;

/// Blacklisted context terms for the semantic Net-Worth scan. A candidate
/// whose surrounding text mentions any of these is not the portfolio total.
const BLACKLIST_KEYWORDS: &[&str] = &["pnl", "holdings", "claimable"];

/// Characters of context captured on each side of a candidate value.
const CONTEXT_WINDOW: usize = 100;

/// US-formatted dollar amount: `$1,250` or `$1,250.00`.
static DOLLAR_US: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").unwrap());

/// Either US or European formatted dollar amount: `$1,911.36` / `$1.911,36`.
static DOLLAR_ANY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[\d.,]+").unwrap());

/// Portfolio header line: `$1,234.56 -0.12%` (value followed by a signed
/// day-change percentage).
static PORTFOLIO_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\s*([\d,]+(?:\.\d{2})?)\s+[-+][\d.]+%").unwrap());

/// A line that opens with a bare dollar value.
static DOLLAR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\s*([\d,]+\.?\d*)").unwrap());

/// Dollar amount anywhere in a short string (page titles).
static DOLLAR_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+\.?\d*").unwrap());

/// EVM address embedded in a wallet link.
static EVM_ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").unwrap());

// ---------------------------------------------------------------------------
// Numeric parsing
// ---------------------------------------------------------------------------

/// Parse a US-formatted currency string (`$1,250.00`): `$` and `,` stripped,
/// `.` is the decimal point.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Normalize a locale-ambiguous currency string to a numeric value.
///
/// When both `.` and `,` are present, the right-most separator is the
/// decimal point and the other is a thousands separator. A lone `,` is a
/// decimal point. Dots alone are thousands separators unless the final
/// group has exactly two digits ("$1.911" is 1911, "$1250.00" is 1250).
pub fn normalize_amount(raw: &str) -> Option<f64> {
    normalize_amount_str(raw).map(|(value, _)| value)
}

/// Like [`normalize_amount`] but also returns the normalized string
/// (`"1911.36"`), preserving the digits exactly as scraped.
fn normalize_amount_str(raw: &str) -> Option<(f64, String)> {
    let s: String = raw
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            let (decimal, thousands) = if d > c { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|ch| *ch != thousands)
                .map(|ch| if ch == decimal { '.' } else { ch })
                .collect::<String>()
        }
        (None, Some(_)) => {
            if s.matches(',').count() > 1 {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        (Some(d), None) => {
            let fraction_len = s.len() - d - 1;
            if s.matches('.').count() == 1 && fraction_len == 2 {
                s
            } else {
                s.replace('.', "")
            }
        }
        (None, None) => s,
    };

    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then(|| (value, normalized))
}

// ---------------------------------------------------------------------------
// Opportunistic scan
// ---------------------------------------------------------------------------

/// Extract the largest plausible dollar value from rendered page text.
///
/// Amounts parsing below `floor` are discarded as noise (fees, dust,
/// per-token rows). Returns the original matched string, or None when
/// nothing survives — a `$0` page is "no value found", not a zero balance.
pub fn largest_dollar_value(text: &str, floor: f64) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;

    for m in DOLLAR_US.find_iter(text) {
        let Some(num) = parse_currency(m.as_str()) else {
            continue;
        };
        if num < floor {
            continue;
        }
        if best.map_or(true, |(b, _)| num > b) {
            best = Some((num, m.as_str()));
        }
    }

    best.map(|(_, s)| s.to_string())
}

/// Semantic Net-Worth scan: like [`largest_dollar_value`] but each candidate
/// carries ~100 chars of surrounding text, and candidates whose context
/// contains a blacklisted term or a negative sign are rejected. Handles both
/// US and European numeral formats; the winner is returned normalized
/// (`"$1911.36"`).
pub fn net_worth_value(text: &str, floor: f64) -> Option<String> {
    let mut best: Option<(f64, String)> = None;

    for m in DOLLAR_ANY.find_iter(text) {
        let start = m.start().saturating_sub(CONTEXT_WINDOW);
        let end = (m.end() + CONTEXT_WINDOW).min(text.len());
        // Clamp to char boundaries so multi-byte text can't split a scalar.
        let start = floor_char_boundary(text, start);
        let end = floor_char_boundary(text, end);
        let context = text[start..end].to_lowercase();

        if BLACKLIST_KEYWORDS.iter().any(|k| context.contains(k)) {
            continue;
        }
        if context.contains('-') {
            continue;
        }

        let Some((num, normalized)) = normalize_amount_str(m.as_str()) else {
            continue;
        };
        if num < floor || num <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |(b, _)| num > *b) {
            best = Some((num, normalized));
        }
    }

    best.map(|(_, s)| format!("${s}"))
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

// ---------------------------------------------------------------------------
// Platform-specific scans
// ---------------------------------------------------------------------------

/// Lines of page text examined for the portfolio header pattern.
const HEADER_SCAN_LINES: usize = 30;
/// Lines examined for the standalone dollar-line fallback.
const FALLBACK_SCAN_LINES: usize = 50;
/// Upper sanity bound for the fallback scan; values at or above are ignored.
const FALLBACK_MAX_VALUE: f64 = 10_000_000.0;

/// Extract the Net Worth figure from an EVM-portfolio page's rendered text.
///
/// Primary pattern: the top-of-page portfolio total, a `$` value followed
/// by a signed day-change percentage. Fallback: the first line that starts
/// with a `$` value within a sane range.
pub fn evm_net_worth(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for line in lines.iter().take(HEADER_SCAN_LINES) {
        if let Some(caps) = PORTFOLIO_HEADER.captures(line) {
            return Some(format!("${}", &caps[1]));
        }
    }

    for line in lines.iter().take(FALLBACK_SCAN_LINES) {
        if !line.starts_with('$') {
            continue;
        }
        if let Some(caps) = DOLLAR_LINE.captures(line) {
            let value = &caps[1];
            if let Some(num) = parse_currency(value) {
                if num > 0.0 && num < FALLBACK_MAX_VALUE {
                    return Some(format!("${value}"));
                }
            }
        }
    }

    None
}

/// Last-resort scan of a page title for a dollar amount.
pub fn title_dollar_value(title: &str) -> Option<String> {
    DOLLAR_LOOSE
        .find(title)
        .map(|m| m.as_str().to_string())
        .filter(|s| parse_currency(s).map_or(false, |v| v > 0.0))
}

/// Extract an EVM address (`0x` + 40 hex chars) from a wallet link.
pub fn extract_address(link: &str) -> Option<&str> {
    EVM_ADDRESS.find(link).map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
