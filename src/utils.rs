//! Small parsing and formatting helpers shared across the SDK

/// Parse the leading integer of a string, the way form inputs are coerced.
///
/// Leading whitespace and an optional sign are accepted; parsing stops at
/// the first non-digit. Returns `None` when no digits are found or the
/// value does not fit in an `i64`.
///
/// # Example
/// ```
/// use quarters_sdk::utils::parse_leading_int;
///
/// assert_eq!(parse_leading_int("10"), Some(10));
/// assert_eq!(parse_leading_int("  25 coins"), Some(25));
/// assert_eq!(parse_leading_int("coins"), None);
/// ```
#[must_use]
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Truncate a response body for error messages and logs.
///
/// Cuts at a UTF-8 boundary and appends "..." when anything was dropped.
#[must_use]
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...", &s[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("10"), Some(10));
        assert_eq!(parse_leading_int("10.9"), Some(10));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+7x"), Some(7));
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), None);
    }

    #[test]
    fn test_truncate_for_display() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("This is a long message", 10), "This is a ...");
        // 4-byte emoji must not be split
        assert_eq!(truncate_for_display("ab🔍cd", 3), "ab...");
    }
}
