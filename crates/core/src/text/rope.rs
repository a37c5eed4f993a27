use std::fmt;

pub type TextVersion = u64;

/// The editable script text.
///
/// Edits are addressed by character index and are logarithmic in the text
/// size. Every mutation bumps the text version; the scanner compares the
/// version to decide whether a re-scan is due.
#[derive(Debug, Clone)]
pub struct Rope {
    inner: ropey::Rope,
    version: TextVersion,
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl Rope {
    pub fn new() -> Self {
        Self {
            inner: ropey::Rope::new(),
            version: 1,
        }
    }

    pub fn from_str(text: &str) -> Self {
        Self {
            inner: ropey::Rope::from_str(text),
            version: 1,
        }
    }

    pub fn version(&self) -> TextVersion {
        self.version
    }

    pub fn len_chars(&self) -> usize {
        self.inner.len_chars()
    }

    pub fn len_bytes(&self) -> usize {
        self.inner.len_bytes()
    }

    pub fn insert_text_at(&mut self, char_idx: usize, text: &str) {
        let at = char_idx.min(self.inner.len_chars());
        self.inner.insert(at, text);
        self.version += 1;
    }

    pub fn insert_char_at(&mut self, char_idx: usize, codepoint: u32) {
        let c = char::from_u32(codepoint).unwrap_or(char::REPLACEMENT_CHARACTER);
        let at = char_idx.min(self.inner.len_chars());
        self.inner.insert_char(at, c);
        self.version += 1;
    }

    pub fn erase_range(&mut self, char_idx: usize, count: usize) {
        let begin = char_idx.min(self.inner.len_chars());
        let end = (char_idx + count).min(self.inner.len_chars());
        self.inner.remove(begin..end);
        self.version += 1;
    }

    pub fn replace_all(&mut self, text: &str) {
        self.inner = ropey::Rope::from_str(text);
        self.version += 1;
    }

    /// Materialize the text with the two NUL padding bytes the scanner
    /// expects at the end of its input buffer.
    pub fn to_padded_string(&self) -> String {
        let mut out = String::with_capacity(self.inner.len_bytes() + 2);
        for chunk in self.inner.chunks() {
            out.push_str(chunk);
        }
        out.push('\0');
        out.push('\0');
        out
    }

    pub fn byte_size(&self) -> usize {
        self.inner.len_bytes()
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.inner.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rope_edits_bump_version() {
        let mut rope = Rope::new();
        assert_eq!(rope.version(), 1);
        rope.insert_text_at(0, "select 1");
        assert_eq!(rope.version(), 2);
        rope.erase_range(0, 7);
        assert_eq!(rope.version(), 3);
        assert_eq!(rope.to_string(), "1");
        rope.replace_all("select 2");
        assert_eq!(rope.version(), 4);
        assert_eq!(rope.to_string(), "select 2");
    }

    #[test]
    fn test_rope_insert_erase_roundtrip() {
        let mut rope = Rope::from_str("select a from t");
        rope.insert_text_at(8, "xyz, ");
        assert_eq!(rope.to_string(), "select axyz, a from t");
        rope.erase_range(8, 5);
        assert_eq!(rope.to_string(), "select a from t");
    }

    #[test]
    fn test_rope_padding() {
        let rope = Rope::from_str("x");
        assert_eq!(rope.to_padded_string(), "x\0\0");
        let empty = Rope::new();
        assert_eq!(empty.to_padded_string(), "\0\0");
    }

    #[test]
    fn test_rope_insert_codepoint() {
        let mut rope = Rope::new();
        for (i, c) in "select".chars().enumerate() {
            rope.insert_char_at(i, c as u32);
        }
        assert_eq!(rope.to_string(), "select");
        assert_eq!(rope.version(), 7);
    }

    #[test]
    fn test_rope_clamps_out_of_bounds() {
        let mut rope = Rope::from_str("ab");
        rope.insert_text_at(100, "c");
        assert_eq!(rope.to_string(), "abc");
        rope.erase_range(1, 100);
        assert_eq!(rope.to_string(), "a");
    }
}
