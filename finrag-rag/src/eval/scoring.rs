//! Answer accuracy scoring.
//!
//! Answers are compared as text first and as numbers second; numeric answers
//! earn partial credit that falls off with the square of the relative error.

/// Case-insensitive equality after trimming.
pub fn exact_match(predicted: &str, expected: &str) -> bool {
    predicted.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Parse a financial figure such as `$1,200`, `-3.5`, or `12.5%`.
///
/// A trailing `%` divides by 100. Returns `None` for anything that is not a
/// finite number after stripping currency signs and thousands separators.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let cleaned = cleaned.trim();
    let (digits, divisor) = match cleaned.strip_suffix('%') {
        Some(rest) => (rest.trim_end(), 100.0),
        None => (cleaned, 1.0),
    };
    digits
        .parse::<f64>()
        .ok()
        .map(|n| n / divisor)
        .filter(|n| n.is_finite())
}

/// `1 - (|a - b| / max(|a|, |b|))^2`, clamped to `[0, 1]`.
///
/// Two zeros score 1.
pub fn relative_score(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return 1.0;
    }
    let relative = (a - b).abs() / scale;
    let score = 1.0 - relative * relative;
    if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 }
}

/// Relative score of two numeric answers; 0 if either does not parse.
pub fn numeric_match(predicted: &str, expected: &str) -> f64 {
    match (parse_number(predicted), parse_number(expected)) {
        (Some(a), Some(b)) => relative_score(a, b),
        _ => 0.0,
    }
}
