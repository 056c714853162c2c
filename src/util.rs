// Utility helpers for parsing cells and formatting numbers.
//
// Raw cells arrive as text from CSV exports; this module turns them into
// typed values so the rest of the code can assume clean input.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, forgiving the formatting issues that
/// are common in exports (surrounding spaces, thousands separators).
///
/// Values containing letters are rejected, as is anything that does not
/// parse to a finite number.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer cell. Integral decimals such as `"12.0"` are accepted
/// because database exports often widen integer columns.
pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = s.replace(',', "");
    if let Ok(v) = cleaned.parse::<i64>() {
        return Some(v);
    }
    let f = parse_f64_safe(Some(&cleaned))?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Uppercase every letter that follows a non-letter, lowercase the rest.
///
/// `"andaman & nicobar"` becomes `"Andaman & Nicobar"`, `"NCT OF DELHI"`
/// becomes `"Nct Of Delhi"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render a growth percentage, or `n/a` when it is undefined.
pub fn format_pct(p: Option<f64>) -> String {
    match p {
        Some(v) => format!("{}%", format_number(v, 2)),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forgiving_numbers() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("12abc")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_i64_safe(Some("42")), Some(42));
        assert_eq!(parse_i64_safe(Some("42.0")), Some(42));
        assert_eq!(parse_i64_safe(Some("42.5")), None);
        assert_eq!(parse_i64_safe(Some("1,000")), Some(1000));
    }

    #[test]
    fn title_cases_like_state_names() {
        assert_eq!(title_case("andaman & nicobar"), "Andaman & Nicobar");
        assert_eq!(title_case("NCT OF DELHI"), "Nct Of Delhi");
        assert_eq!(title_case("jammu-kashmir"), "Jammu-Kashmir");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn formats_numbers_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_int(9855i64), "9,855");
        assert_eq!(format_pct(Some(50.0)), "50.00%");
        assert_eq!(format_pct(None), "n/a");
    }
}
