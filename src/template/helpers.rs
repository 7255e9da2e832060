//! Formatting helpers callable from templates: `formatDuration`,
//! `formatNumberUser` and `add`.

use serde_json::Value;

/// Helper names recognised inside a `{{name arg...}}` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Add,
    FormatDuration,
    FormatNumberUser,
}

impl Helper {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Self::Add),
            "formatDuration" => Some(Self::FormatDuration),
            "formatNumberUser" => Some(Self::FormatNumberUser),
            _ => None,
        }
    }

    /// Apply a single-argument formatting helper. `add` takes two operands and
    /// goes through [`add`] instead.
    pub fn format(self, value: &Value) -> Option<String> {
        match self {
            Self::FormatDuration => as_number(value).map(format_duration),
            Self::FormatNumberUser => as_number(value).map(format_number_user),
            Self::Add => None,
        }
    }
}

/// Numbers and numeric strings are both accepted, the catalog is not strict
/// about which one it sends.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// `75` → `"1:15"`, `4` → `"0:04"`. Minutes never roll over into hours.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// en-US grouping: `1234567` → `"1,234,567"`, `1234.5` → `"1,234.5"`.
/// At most three fractional digits are kept.
pub fn format_number_user(number: f64) -> String {
    if !number.is_finite() {
        return number.to_string();
    }

    let rounded = (number.abs() * 1000.0).round() / 1000.0;
    let int_part = rounded.trunc() as u64;
    let frac = format!("{:.3}", rounded.fract());
    let frac = frac.trim_start_matches('0').trim_end_matches('0');

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if number < 0.0 && rounded > 0.0 { "-" } else { "" };
    if frac == "." || frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}{frac}")
    }
}

/// Integer addition used to turn a loop index into a 1-based ordinal.
pub fn add(a: i64, b: i64) -> i64 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(75.0), "1:15");
        assert_eq!(format_duration(4.0), "0:04");
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(3600.0), "60:00");
        assert_eq!(format_duration(75.9), "1:15");
        assert_eq!(format_duration(-3.0), "0:00");
    }

    #[test]
    fn test_format_number_user() {
        assert_eq!(format_number_user(1234567.0), "1,234,567");
        assert_eq!(format_number_user(999.0), "999");
        assert_eq!(format_number_user(1000.0), "1,000");
        assert_eq!(format_number_user(0.0), "0");
        assert_eq!(format_number_user(-45210.0), "-45,210");
        assert_eq!(format_number_user(1234.5), "1,234.5");
        assert_eq!(format_number_user(1.23456), "1.235");
    }

    #[test]
    fn test_helper_lookup_and_format() {
        assert_eq!(Helper::from_name("add"), Some(Helper::Add));
        assert_eq!(Helper::from_name("upper"), None);

        let fd = Helper::FormatDuration;
        assert_eq!(fd.format(&json!(125)), Some("2:05".to_string()));
        assert_eq!(fd.format(&json!("61")), Some("1:01".to_string()));
        assert_eq!(fd.format(&json!("abc")), None);
        assert_eq!(fd.format(&json!(null)), None);
        assert_eq!(Helper::Add.format(&json!(1)), None);
    }

    #[test]
    fn test_add() {
        assert_eq!(add(0, 1), 1);
        assert_eq!(add(i64::MAX, 1), i64::MAX);
    }
}
