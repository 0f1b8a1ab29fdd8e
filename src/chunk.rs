/// Discord refuses messages longer than this many characters
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Splits `text` into consecutive segments of at most `max_chars` characters.
///
/// Segments are cut on `char` boundaries and concatenate back to `text`.
/// An empty `text` yields no segment at all.
pub fn segments(text: &str, max_chars: usize) -> Segments<'_> {
    assert!(max_chars > 0, "segment size must be positive");
    Segments {
        rest: text,
        max_chars,
    }
}

pub struct Segments<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let end = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map_or(self.rest.len(), |(idx, _)| idx);
        let (segment, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(segment)
    }
}
