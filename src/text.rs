//! Text offsets and name normalization
//!
//! Every public offset is a char index into the caller's text. Regex matches
//! come back as byte offsets, so each scan builds a `TextIndex` once and
//! converts through it. Pure-ASCII text skips the lookup table entirely.

// =============================================================================
// TextIndex
// =============================================================================

/// Char <-> byte offset conversion over one text
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of each char start (None for ASCII text, where both coincide)
    char_starts: Option<Vec<usize>>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let char_starts = if text.is_ascii() {
            None
        } else {
            Some(text.char_indices().map(|(b, _)| b).collect())
        };
        Self { text, char_starts }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn char_len(&self) -> usize {
        match &self.char_starts {
            Some(starts) => starts.len(),
            None => self.text.len(),
        }
    }

    /// Byte offset (on a char boundary) -> char offset
    pub fn to_char(&self, byte: usize) -> usize {
        match &self.char_starts {
            Some(starts) => starts.partition_point(|&b| b < byte),
            None => byte.min(self.text.len()),
        }
    }

    /// Char offset -> byte offset, clamped to the end of the text
    pub fn to_byte(&self, ch: usize) -> usize {
        match &self.char_starts {
            Some(starts) => starts.get(ch).copied().unwrap_or(self.text.len()),
            None => ch.min(self.text.len()),
        }
    }

    /// Slice by char range (clamped)
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let b_start = self.to_byte(start);
        let b_end = self.to_byte(end.max(start));
        &self.text[b_start..b_end]
    }

    /// Whitespace-collapsed context around a char span
    pub fn context(&self, start: usize, end: usize, half_width: usize) -> String {
        let from = start.saturating_sub(half_width);
        let to = end.saturating_add(half_width).min(self.char_len());
        collapse_whitespace(self.slice(from, to))
    }
}

// =============================================================================
// Normalization
// =============================================================================

const TRAILING_PUNCT: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '\'', '\u{2019}', '\u{201D}', ')', ']', '\u{2026}',
];

/// Canonical surface form: trim, drop possessive suffix and trailing punctuation,
/// collapse inner whitespace. Case is preserved.
pub fn normalize_name(raw: &str) -> String {
    let mut name = raw.trim();
    loop {
        let before = name.len();
        name = name.trim_end_matches(TRAILING_PUNCT);
        for suffix in ["'s", "\u{2019}s"] {
            if let Some(stripped) = name.strip_suffix(suffix) {
                name = stripped;
            }
        }
        name = name.trim_end();
        if name.len() == before {
            break;
        }
    }
    collapse_whitespace(name)
}

/// Case-folded identity key for a name
pub fn name_key(raw: &str) -> String {
    normalize_name(raw).to_lowercase()
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` chars of `s`, with an ellipsis when cut
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(s);
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets_are_identity() {
        let idx = TextIndex::new("Sarah smiled.");
        assert_eq!(idx.to_char(6), 6);
        assert_eq!(idx.to_byte(6), 6);
        assert_eq!(idx.slice(0, 5), "Sarah");
    }

    #[test]
    fn test_multibyte_offsets() {
        // 'É' is two bytes
        let text = "Éowyn rode. Merry followed.";
        let idx = TextIndex::new(text);
        let merry_byte = text.find("Merry").unwrap();
        assert_eq!(merry_byte, 13);
        assert_eq!(idx.to_char(merry_byte), 12);
        assert_eq!(idx.to_byte(12), 13);
        assert_eq!(idx.slice(0, 5), "Éowyn");
        assert_eq!(idx.char_len(), text.chars().count());
    }

    #[test]
    fn test_slice_clamps() {
        let idx = TextIndex::new("short");
        assert_eq!(idx.slice(2, 100), "ort");
        assert_eq!(idx.slice(50, 60), "");
    }

    #[test]
    fn test_normalize_strips_possessive_and_punct() {
        assert_eq!(normalize_name("  Sarah's "), "Sarah");
        assert_eq!(normalize_name("Marcus,"), "Marcus");
        assert_eq!(normalize_name("Frodo\u{2019}s."), "Frodo");
        assert_eq!(normalize_name("Captain   Reyes!"), "Captain Reyes");
    }

    #[test]
    fn test_name_key_case_folds() {
        assert_eq!(name_key("SARAH's"), name_key("sarah"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}
