//! # STNP Character Set
//!
//! Usernames and failure reasons travel as indices into a 37-symbol table:
//!
//! ```text
//! 0        space
//! 1..=26   a..=z
//! 27..=36  0..=9
//! ```
//!
//! Byte `0` ends a decoded string, so zero-padded fields decode to their
//! meaningful prefix. Any byte from 37 up is invalid wherever it sits
//! before that point.

use crate::error::{LoginError, Result};

/// Number of printable symbols in the table
pub const CHARSET_LEN: u8 = 37;

/// Map a wire index to its printable symbol.
#[inline]
pub fn symbol(index: u8) -> Option<char> {
    match index {
        0 => Some(' '),
        1..=26 => Some((b'a' + index - 1) as char),
        27..=36 => Some((b'0' + index - 27) as char),
        _ => None,
    }
}

/// Map a printable symbol to its wire index.
#[inline]
pub fn index_of(c: char) -> Option<u8> {
    match c {
        ' ' => Some(0),
        'a'..='z' => Some(c as u8 - b'a' + 1),
        '0'..='9' => Some(c as u8 - b'0' + 27),
        _ => None,
    }
}

/// Decode a fixed-width field.
///
/// `base_offset` is the field's position in the enclosing frame and is only
/// used to report where an invalid byte sits.
pub fn decode_field(field: &[u8], base_offset: usize) -> Result<String> {
    let mut value = String::with_capacity(field.len());
    for (i, &byte) in field.iter().enumerate() {
        if byte == 0 {
            break;
        }
        match symbol(byte) {
            Some(c) => value.push(c),
            None => {
                return Err(LoginError::InvalidCharacter {
                    offset: base_offset + i,
                    value: byte,
                })
            }
        }
    }
    Ok(value)
}

/// Encode `text` into `out`, zero-filling whatever is left.
pub fn encode_field(text: &str, out: &mut [u8]) -> Result<()> {
    if text.chars().count() > out.len() {
        return Err(LoginError::InvalidReason(text.to_string()));
    }
    out.fill(0);
    for (slot, c) in out.iter_mut().zip(text.chars()) {
        *slot = index_of(c).ok_or_else(|| LoginError::InvalidReason(text.to_string()))?;
    }
    Ok(())
}

/// Encode a string that must fill `N` symbols exactly.
pub fn encode_exact<const N: usize>(text: &str) -> Result<[u8; N]> {
    if text.chars().count() != N {
        return Err(LoginError::InvalidReason(text.to_string()));
    }
    let mut out = [0u8; N];
    encode_field(text, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order() {
        assert_eq!(symbol(0), Some(' '));
        assert_eq!(symbol(1), Some('a'));
        assert_eq!(symbol(26), Some('z'));
        assert_eq!(symbol(27), Some('0'));
        assert_eq!(symbol(36), Some('9'));
        assert_eq!(symbol(CHARSET_LEN), None);
        for index in 0..CHARSET_LEN {
            let c = symbol(index).unwrap();
            assert_eq!(index_of(c), Some(index));
        }
    }

    #[test]
    fn test_decode_stops_at_zero() {
        // garbage after the first zero is never looked at
        let field = [1, 2, 3, 0, 200, 255, 0, 0];
        assert_eq!(decode_field(&field, 2).unwrap(), "abc");
    }

    #[test]
    fn test_first_index_past_table_rejected() {
        let field = [27, 28, CHARSET_LEN, 0];
        match decode_field(&field, 2) {
            Err(LoginError::InvalidCharacter { offset, value }) => {
                assert_eq!(offset, 4);
                assert_eq!(value, CHARSET_LEN);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_decode_reports_offset() {
        let field = [1, 2, 40, 0];
        match decode_field(&field, 2) {
            Err(LoginError::InvalidCharacter { offset, value }) => {
                assert_eq!(offset, 4);
                assert_eq!(value, 40);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_encode_rejects_foreign_characters() {
        let mut out = [0u8; 16];
        assert!(encode_field("Bob", &mut out).is_err());
        assert!(encode_field("a-b", &mut out).is_err());
        assert!(encode_field("this name is far too long", &mut out).is_err());
    }

    #[test]
    fn test_encode_exact_length() {
        assert!(encode_exact::<4>("ab c").is_ok());
        assert!(encode_exact::<4>("abc").is_err());
        assert!(encode_exact::<4>("abcde").is_err());
    }
}
