use thiserror::Error;

/// Prices are stored as integer cents so no floating point reaches the store.
/// `1299.90` is held as `129990`.
pub type Cents = i64;

/// Format cents as a two-decimal string.
/// Example: 129990 -> "1299.90", -5 -> "-0.05"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a price string into cents.
///
/// Accepts either `.` or `,` as the decimal separator ("49.9", "49,90").
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let digits = digits.replace(',', ".");

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits.as_str(), ""),
    };

    if decimal_str.contains('.') {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }
    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        parse_digits(units_str, input)?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => parse_digits(decimal_str, input)? * 10,
        _ => parse_digits(&decimal_str[..2], input)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

fn parse_digits(s: &str, original: &str) -> Result<i64, ParseCentsError> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat(original.to_string()));
    }
    s.parse().map_err(|_| ParseCentsError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("empty price")]
    Empty,

    #[error("invalid price format: {0}")]
    InvalidFormat(String),

    #[error("price is too large")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(129990), "1299.90");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-250), "-2.50");
    }

    #[test]
    fn test_parse_cents_accepts_both_separators() {
        assert_eq!(parse_cents("1299.90"), Ok(129990));
        assert_eq!(parse_cents("1299,90"), Ok(129990));
        assert_eq!(parse_cents("49.9"), Ok(4990));
        assert_eq!(parse_cents("15"), Ok(1500));
        assert_eq!(parse_cents(".75"), Ok(75));
        assert_eq!(parse_cents("3.999"), Ok(399));
        assert_eq!(parse_cents("-1.50"), Ok(-150));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert_eq!(parse_cents("  "), Err(ParseCentsError::Empty));
        assert!(matches!(
            parse_cents("12.3.4"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("abc"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("."),
            Err(ParseCentsError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_cents("+5"),
            Err(ParseCentsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_cents_overflow() {
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::Overflow)
        );
    }
}
