//! UTF-16 offset helpers
//!
//! Character ranges are counted in UTF-16 code units on both the capture and
//! the layout path. Rust strings are UTF-8, so every crossing goes through
//! these conversions.

use crate::annotation::TextRange;

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Byte offset of a UTF-16 offset
///
/// `None` when the offset is past the end or splits a surrogate pair.
pub fn utf16_to_byte(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units == offset {
            return Some(byte);
        }
        units += ch.len_utf16();
        if units > offset {
            return None;
        }
    }
    (units == offset).then_some(text.len())
}

/// The slice of `text` covered by a UTF-16 range
pub fn utf16_slice<'a>(text: &'a str, range: TextRange) -> Option<&'a str> {
    if !range.is_ordered() {
        return None;
    }
    let start = utf16_to_byte(text, range.start)?;
    let end = utf16_to_byte(text, range.end)?;
    Some(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets() {
        assert_eq!(utf16_len("Hello world"), 11);
        assert_eq!(utf16_to_byte("Hello world", 6), Some(6));
        assert_eq!(utf16_to_byte("Hello world", 11), Some(11));
        assert_eq!(utf16_to_byte("Hello world", 12), None);
        assert_eq!(utf16_slice("Hello world", TextRange::new(6, 11)), Some("world"));
    }

    #[test]
    fn test_multibyte_offsets() {
        // 'é' is 2 bytes / 1 unit, '😀' is 4 bytes / 2 units
        let text = "é😀x";
        assert_eq!(utf16_len(text), 4);
        assert_eq!(utf16_to_byte(text, 1), Some(2));
        assert_eq!(utf16_to_byte(text, 2), None);
        assert_eq!(utf16_to_byte(text, 3), Some(6));
        assert_eq!(utf16_slice(text, TextRange::new(1, 3)), Some("😀"));
    }

    #[test]
    fn test_inverted_slice() {
        assert_eq!(utf16_slice("abc", TextRange::new(2, 1)), None);
    }
}
