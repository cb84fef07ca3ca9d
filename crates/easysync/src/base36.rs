//! Base-36 numbers as they appear on the wire.
//!
//! Every length, line count and attribute number in a changeset is written
//! with the digits `0-9a-z`. Encoding is lowercase and never has a leading
//! zero; decoding rejects anything else so that each number has exactly one
//! textual form.

use std::fmt;

use crate::error::ParseError;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encodes `num` in lowercase base 36.
pub fn encode(num: usize) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write(&mut out, num);
    out
}

/// Writes `num` in lowercase base 36 into any `fmt::Write` sink.
pub fn write<W: fmt::Write + ?Sized>(out: &mut W, mut num: usize) -> fmt::Result {
    if num == 0 {
        return out.write_char('0');
    }
    // usize::MAX in base 36 has 13 digits on 64-bit targets.
    let mut buf = [0u8; 16];
    let mut i = buf.len();
    while num > 0 {
        i -= 1;
        buf[i] = DIGITS[num % 36];
        num /= 36;
    }
    for &b in &buf[i..] {
        out.write_char(b as char)?;
    }
    Ok(())
}

#[inline]
pub(crate) fn is_digit(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_lowercase()
}

/// Decodes a canonical base-36 number.
pub fn decode(s: &str) -> Result<usize, ParseError> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return Err(ParseError::EmptyNumber);
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return Err(ParseError::LeadingZero(s.to_string()));
    }
    let mut value: usize = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'z' => b - b'a' + 10,
            _ => {
                let c = s[i..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::InvalidDigit(c));
            }
        };
        value = value
            .checked_mul(36)
            .and_then(|v| v.checked_add(digit as usize))
            .ok_or_else(|| ParseError::Overflow(s.to_string()))?;
    }
    Ok(value)
}

/// Decodes an attribute number, which must fit in `u32`.
pub fn decode_u32(s: &str) -> Result<u32, ParseError> {
    let n = decode(s)?;
    u32::try_from(n).map_err(|_| ParseError::Overflow(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_lowercase_without_padding() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(35), "z");
        assert_eq!(encode(36), "10");
        assert_eq!(encode(1295), "zz");
        assert_eq!(encode(400), "b4");
    }

    #[test]
    fn rejects_non_canonical_input() {
        assert_eq!(decode(""), Err(ParseError::EmptyNumber));
        assert_eq!(decode("01"), Err(ParseError::LeadingZero("01".into())));
        assert_eq!(decode("A"), Err(ParseError::InvalidDigit('A')));
        assert_eq!(decode("1-"), Err(ParseError::InvalidDigit('-')));
        assert!(matches!(
            decode("zzzzzzzzzzzzzzzzzzzz"),
            Err(ParseError::Overflow(_))
        ));
        assert!(matches!(decode_u32("zzzzzzz"), Err(ParseError::Overflow(_))));
        assert_eq!(decode("0"), Ok(0));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(n in any::<usize>()) {
            prop_assert_eq!(decode(&encode(n)), Ok(n));
        }
    }
}
