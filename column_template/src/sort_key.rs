//! Order-preserving numeric sort keys
//!
//! The host compares numeric columns by an unsigned 32-bit key instead of a
//! string. Text is parsed as a number (leading-prefix rules), narrowed to
//! single precision, and its IEEE-754 bit pattern is folded so that unsigned
//! integer order matches numeric order:
//!
//! - the sign bit is flipped unconditionally, moving positives above negatives
//! - all other bits are flipped for negatives, reversing their magnitude order
//!
//! Both happen in one XOR with `(bits as i32 >> 31) as u32 | 0x8000_0000`.
//! Text without a numeric prefix maps to [`NON_NUMERIC_SORT_KEY`], which sorts
//! before every number: the only bit pattern that would fold to `0` is
//! `0xFFFF_FFFF`, a NaN, so no real number can collide with it.

/// Key for NaN, infinities and text with no numeric prefix
pub const NON_NUMERIC_SORT_KEY: u32 = 0;

/// Encode `text` into a key whose unsigned order follows numeric order
pub fn encode_order_preserving(text: &str) -> u32 {
    let value = parse_float_prefix(text);
    if !value.is_finite() {
        return NON_NUMERIC_SORT_KEY;
    }

    // Values beyond single precision saturate to the infinity patterns
    let bits = (value as f32).to_bits();
    let mask = (((bits as i32) >> 31) as u32) | 0x8000_0000;
    bits ^ mask
}

/// Same bits as a signed integer, for hosts that declare the key as `i32`
pub fn as_signed(key: u32) -> i32 {
    key as i32
}

/// Parse the longest numeric prefix of `text`, ignoring leading whitespace
///
/// Accepts an optional sign followed by `Infinity` or by
/// `digits [. digits] [(e|E) [sign] digits]` with at least one mantissa digit.
/// Returns NaN when no prefix qualifies.
pub fn parse_float_prefix(text: &str) -> f64 {
    let trimmed = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = if unsigned.starts_with("Infinity") {
        f64::INFINITY
    } else {
        let end = decimal_prefix_len(unsigned.as_bytes());
        if end == 0 {
            return f64::NAN;
        }
        match unsigned[..end].parse::<f64>() {
            Ok(value) => value,
            Err(_) => return f64::NAN,
        }
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn decimal_prefix_len(bytes: &[u8]) -> usize {
    let int_digits = count_digits(bytes);
    let mut end = int_digits;
    let mut frac_digits = 0;

    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+') | Some(b'-')) {
            exponent += 1;
        }
        let exp_digits = count_digits(&bytes[exponent.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exponent + exp_digits;
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_parsing() {
        assert_eq!(parse_float_prefix("42"), 42.0);
        assert_eq!(parse_float_prefix("  -3.5e2 apples"), -350.0);
        assert_eq!(parse_float_prefix("12abc"), 12.0);
        assert_eq!(parse_float_prefix(".5"), 0.5);
        assert_eq!(parse_float_prefix("1."), 1.0);
        assert_eq!(parse_float_prefix("+7"), 7.0);
        assert_eq!(parse_float_prefix("1e"), 1.0);
        assert_eq!(parse_float_prefix("2E+3x"), 2000.0);
        assert_eq!(parse_float_prefix("\u{feff}\t8"), 8.0);
        assert_eq!(parse_float_prefix("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float_prefix("not a number").is_nan());
        assert!(parse_float_prefix("").is_nan());
        assert!(parse_float_prefix(".").is_nan());
        assert!(parse_float_prefix("-").is_nan());
        assert!(parse_float_prefix("e5").is_nan());
        assert!(parse_float_prefix("NaN").is_nan());
    }

    #[test]
    fn test_non_numeric_sentinel() {
        assert_eq!(encode_order_preserving("not a number"), NON_NUMERIC_SORT_KEY);
        assert_eq!(encode_order_preserving("Infinity"), NON_NUMERIC_SORT_KEY);
        assert_eq!(encode_order_preserving("1e400"), NON_NUMERIC_SORT_KEY);
        assert!(NON_NUMERIC_SORT_KEY < encode_order_preserving("-1000000"));
        assert!(NON_NUMERIC_SORT_KEY < encode_order_preserving("-3.4e38"));
    }

    #[test]
    fn test_order_is_preserved() {
        let ascending = [
            "-3.4e38", "-1000000", "-2.5", "-1", "-1e-30", "-0", "0", "1e-30", "0.5", "1",
            "2", "10", "1000000", "3.4e38", "1e39",
        ];

        for pair in ascending.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                encode_order_preserving(a) < encode_order_preserving(b),
                "{} should sort before {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_signed_zero_straddles_midpoint() {
        assert_eq!(encode_order_preserving("0"), 0x8000_0000);
        assert_eq!(encode_order_preserving("-0"), 0x7FFF_FFFF);
        assert_eq!(as_signed(encode_order_preserving("0")), i32::MIN);
    }

    #[test]
    fn test_equal_magnitudes_tie() {
        assert_eq!(encode_order_preserving("1.0"), encode_order_preserving("1"));
        assert_eq!(encode_order_preserving("  5 kB"), encode_order_preserving("5"));
        // Narrowing to single precision merges neighbours it cannot tell apart
        assert_eq!(
            encode_order_preserving("16777217"),
            encode_order_preserving("16777216")
        );
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_order_preserving("1"), 0x3F80_0000 ^ 0x8000_0000);
        assert_eq!(encode_order_preserving("-1"), !0xBF80_0000u32);
    }
}
