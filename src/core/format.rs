//! Display formatting for monetary values, ratios and percentages.

pub const NOT_AVAILABLE: &str = "N/A";

/// Inserts `,` every three digits of the integer part of an already
/// formatted number, e.g. `-1234567.89` becomes `-1,234,567.89`.
pub fn format_with_separators(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Currency-prefixed value scaled to trillions, billions or millions.
pub fn format_magnitude(value: Option<f64>) -> String {
    let Some(num) = value.filter(|v| !v.is_nan()) else {
        return NOT_AVAILABLE.to_string();
    };

    let abs = num.abs();
    if abs >= 1e12 {
        format!("${:.2}T", num / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", num / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", num / 1e6)
    } else {
        format!("${}", format_with_separators(num, 2))
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|v| !v.is_nan()) {
        Some(num) => format!("{:.2}%", num * 100.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_price(value: f64) -> String {
    format!("${}", format_with_separators(value, 2))
}

/// Zero is reported as unavailable, as providers use it for "no data".
pub fn format_eps(value: Option<f64>) -> String {
    match value.filter(|v| *v != 0.0 && !v.is_nan()) {
        Some(eps) => format!("${eps:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value.filter(|v| *v != 0.0 && !v.is_nan()) {
        Some(ratio) => format!("{ratio:.1}x"),
        None => NOT_AVAILABLE.to_string(),
    }
}
