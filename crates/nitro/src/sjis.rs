//! Shift-JIS helpers. Every name stored in a Nitro file table uses this encoding, regardless of
//! the byte order or encoding of the surrounding data.

use encoding_rs::SHIFT_JIS;
use std::borrow::Cow;

/// Decodes Shift-JIS bytes into text. Malformed sequences are replaced by U+FFFD and the returned
/// flag is set.
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    SHIFT_JIS.decode_without_bom_handling(bytes)
}

/// Encodes text as Shift-JIS. Returns [`None`] if any character has no Shift-JIS representation.
pub fn encode(text: &str) -> Option<Cow<'_, [u8]>> {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    (!had_errors).then_some(bytes)
}

/// Length in bytes of the Shift-JIS encoding of the given text.
pub fn byte_len(text: &str) -> Option<usize> {
    encode(text).map(|bytes| bytes.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii_is_one_byte_per_char() {
        assert_eq!(byte_len("ARM9.BIN"), Some(8));
        assert_eq!(encode("a_b").as_deref(), Some(&b"a_b"[..]));
    }

    #[test]
    fn kana_is_two_bytes_per_char() {
        assert_eq!(byte_len("セーブ"), Some(6));
        assert_eq!(encode("セ").as_deref(), Some(&[0x83, 0x5A][..]));

        let (text, had_errors) = decode(&[0x83, 0x5A]);
        assert_eq!(text, "セ");
        assert!(!had_errors);
    }

    #[test]
    fn unmappable_text() {
        assert_eq!(encode("🦀"), None);
        assert_eq!(byte_len("crab 🦀"), None);
    }

    #[test]
    fn truncated_sequence_is_replaced() {
        let (text, had_errors) = decode(&[b'A', 0x83]);
        assert_eq!(text, "A\u{FFFD}");
        assert!(had_errors);
    }
}
