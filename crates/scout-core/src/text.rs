//! Text helpers shared by tools and formatting

/// Longest prefix of `text` holding at most `max_chars` characters.
///
/// Never splits a UTF-8 code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
