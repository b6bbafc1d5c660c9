//! ASCII integer/float parsing. Totality property:
//! for every finite byte sequence the parsers either consume a
//! positive-length prefix and return a value, or return `invalid_format`;
//! they never read past `window`.

use crate::error::{CodaError, Result};

fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn skip_ws(window: &[u8]) -> usize {
    window.iter().take_while(|&&b| is_space_or_tab(b)).count()
}

/// After the numeric prefix ending at `consumed`, validate the trailing
/// policy: if `ignore_trailing_bytes` is false, anything left in `window`
/// must be space/tab.
fn apply_trailing_policy(
    window: &[u8],
    consumed: usize,
    ignore_trailing_bytes: bool,
) -> Result<usize> {
    if ignore_trailing_bytes {
        return Ok(consumed);
    }
    if window[consumed..].iter().any(|&b| !is_space_or_tab(b)) {
        return Err(CodaError::invalid_format(
            "",
            "unexpected non-whitespace trailing bytes after numeric value",
        ));
    }
    Ok(consumed)
}

/// Parse a signed 64-bit integer from the start of `window`. Returns
/// `(value, consumed)`.
pub fn parse_signed_integer(
    window: &[u8],
    ignore_trailing_bytes: bool,
) -> Result<(i64, usize)> {
    let mut pos = skip_ws(window);
    let start = pos;
    let negative = match window.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };
    let digits_start = pos;
    let mut value: i64 = 0;
    while let Some(&b) = window.get(pos) {
        if !b.is_ascii_digit() {
            break;
        }
        let digit = i64::from(b - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or_else(|| {
                CodaError::invalid_format("", "integer literal overflows a signed 64-bit value")
            })?;
        pos += 1;
    }
    if pos == digits_start {
        return Err(CodaError::invalid_format(
            "",
            format!("expected a decimal digit at byte {start}"),
        ));
    }
    let consumed = apply_trailing_policy(window, pos, ignore_trailing_bytes)?;
    Ok((value, consumed))
}

/// Parse an unsigned 64-bit integer (leading `+` accepted, no `-`).
pub fn parse_unsigned_integer(
    window: &[u8],
    ignore_trailing_bytes: bool,
) -> Result<(u64, usize)> {
    let mut pos = skip_ws(window);
    if window.get(pos) == Some(&b'+') {
        pos += 1;
    }
    let digits_start = pos;
    let mut value: u64 = 0;
    while let Some(&b) = window.get(pos) {
        if !b.is_ascii_digit() {
            break;
        }
        let digit = u64::from(b - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| {
                CodaError::invalid_format("", "integer literal overflows an unsigned 64-bit value")
            })?;
        pos += 1;
    }
    if pos == digits_start {
        return Err(CodaError::invalid_format(
            "",
            "expected a decimal digit",
        ));
    }
    let consumed = apply_trailing_policy(window, pos, ignore_trailing_bytes)?;
    Ok((value, consumed))
}

/// 10^exp as an `f64`, clamped to infinity rather than overflowing an
/// exponent accumulator.
fn pow10_clamped(exp: i64) -> f64 {
    if exp > 308 {
        f64::INFINITY
    } else if exp < -308 {
        0.0
    } else {
        10f64.powi(exp as i32)
    }
}

/// Parse a double: `nan`/`inf` literals (case-insensitive; `nan` takes no
/// sign, `inf` may), or a decimal mantissa with an optional exponent.
pub fn parse_double(window: &[u8], ignore_trailing_bytes: bool) -> Result<(f64, usize)> {
    let mut pos = skip_ws(window);

    // case-insensitive "nan" (no sign allowed)
    if window[pos..].len() >= 3 && window[pos..pos + 3].eq_ignore_ascii_case(b"nan") {
        let consumed = apply_trailing_policy(window, pos + 3, ignore_trailing_bytes)?;
        return Ok((f64::NAN, consumed));
    }

    let sign_start = pos;
    let negative = match window.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    if window[pos..].len() >= 3 && window[pos..pos + 3].eq_ignore_ascii_case(b"inf") {
        let value = if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        let consumed = apply_trailing_policy(window, pos + 3, ignore_trailing_bytes)?;
        return Ok((value, consumed));
    }
    // sign was consumed speculatively for "inf"; if this isn't "inf" we
    // still want it applied to the mantissa, so just continue from `pos`.

    let mantissa_start = pos;
    let mut int_digits = 0usize;
    while window.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
        int_digits += 1;
    }
    let mut frac_digits = 0usize;
    if window.get(pos) == Some(&b'.') {
        pos += 1;
        while window.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
            frac_digits += 1;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return Err(CodaError::invalid_format(
            "",
            format!("expected a digit in float mantissa at byte {sign_start}"),
        ));
    }
    let mantissa_str = std::str::from_utf8(&window[mantissa_start..pos])
        .map_err(|_| CodaError::invalid_format("", "non-UTF8 float mantissa"))?;
    let mut value: f64 = mantissa_str.parse().map_err(|_| {
        CodaError::invalid_format("", "malformed float mantissa")
    })?;
    if negative {
        value = -value;
    }

    if matches!(window.get(pos), Some(b'e' | b'E' | b'd' | b'D')) {
        let exp_marker = pos;
        pos += 1;
        let exp_negative = match window.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let exp_digits_start = pos;
        let mut exp_value: i64 = 0;
        let mut overflowed = false;
        while let Some(&b) = window.get(pos) {
            if !b.is_ascii_digit() {
                break;
            }
            let digit = i64::from(b - b'0');
            match exp_value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => exp_value = v,
                None => overflowed = true,
            }
            pos += 1;
        }
        if pos == exp_digits_start {
            // no digits after the marker: the marker wasn't an exponent,
            // rewind.
            pos = exp_marker;
        } else {
            if exp_negative {
                exp_value = -exp_value;
            }
            value *= if overflowed {
                if exp_negative {
                    0.0
                } else {
                    f64::INFINITY
                }
            } else {
                pow10_clamped(exp_value)
            };
        }
    }

    let consumed = apply_trailing_policy(window, pos, ignore_trailing_bytes)?;
    Ok((value, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn float_with_trailing_whitespace(#[case] ignore_trailing: bool) {
        let (value, consumed) = parse_double(b" -3.5e2 \t", ignore_trailing).unwrap();
        assert_eq!(value, -350.0);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let err = parse_signed_integer(b"99999999999999999999", false).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFormat);
    }

    #[test]
    fn non_whitespace_trailing_rejected_when_not_ignored() {
        let err = parse_signed_integer(b"42x", false).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFormat);
    }

    #[test]
    fn non_whitespace_trailing_allowed_when_ignored() {
        let (value, consumed) = parse_signed_integer(b"42x", true).unwrap();
        assert_eq!(value, 42);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn nan_literal_has_no_sign() {
        let (value, consumed) = parse_double(b"NaN", true).unwrap();
        assert!(value.is_nan());
        assert_eq!(consumed, 3);
    }

    #[test]
    fn inf_literal_accepts_sign() {
        let (value, _) = parse_double(b"-inf", true).unwrap();
        assert_eq!(value, f64::NEG_INFINITY);
    }

    #[test]
    fn huge_exponent_clamps_to_infinity_rather_than_overflow() {
        let (value, _) = parse_double(b"1e999999999999999999", true).unwrap();
        assert_eq!(value, f64::INFINITY);
    }

    #[test]
    fn parser_never_panics_on_empty_window() {
        assert!(parse_signed_integer(b"", true).is_err());
        assert!(parse_unsigned_integer(b"", true).is_err());
        assert!(parse_double(b"", true).is_err());
    }

    #[test]
    fn unsigned_accepts_leading_plus() {
        let (value, consumed) = parse_unsigned_integer(b"+123", true).unwrap();
        assert_eq!(value, 123);
        assert_eq!(consumed, 4);
    }
}
