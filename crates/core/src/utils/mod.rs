pub mod topk;

use std::cmp::Ordering;

/// Case folding used for identifiers and fuzzy name matching.
/// ASCII-only, like the scanner's identifier folding.
#[inline]
pub fn fold_char(c: char) -> char {
    c.to_ascii_lowercase()
}

/// Fold a string to its case-insensitive form.
pub fn fold_case(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Compare two strings case-insensitively.
pub fn ci_compare(left: &str, right: &str) -> Ordering {
    let mut l = left.chars().map(fold_char);
    let mut r = right.chars().map(fold_char);
    loop {
        match (l.next(), r.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => match lc.cmp(&rc) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Does `text` start with `prefix`, ignoring case?
pub fn ci_starts_with(text: &str, prefix: &str) -> bool {
    let mut t = text.chars().map(fold_char);
    for p in prefix.chars().map(fold_char) {
        match t.next() {
            Some(c) if c == p => {}
            _ => return false,
        }
    }
    true
}

/// Find `needle` in `haystack`, ignoring case.
/// Returns the character index of the first match.
pub fn ci_find(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let hay: Vec<char> = haystack.chars().map(fold_char).collect();
    let ndl: Vec<char> = needle.chars().map(fold_char).collect();
    if ndl.len() > hay.len() {
        return None;
    }
    (0..=(hay.len() - ndl.len())).find(|&start| hay[start..start + ndl.len()] == ndl[..])
}

/// A deterministic 64-bit FNV-1a fold.
/// Used for snippet signatures which must be stable across runs and platforms.
#[derive(Debug, Clone, Copy)]
pub struct SignatureHasher(u64);

impl Default for SignatureHasher {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl SignatureHasher {
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_bytes(&[0xff]);
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ci_helpers() {
        assert_eq!(ci_compare("Foo", "foo"), Ordering::Equal);
        assert_eq!(ci_compare("bar", "foo"), Ordering::Less);
        assert!(ci_starts_with("SELECT", "sel"));
        assert!(!ci_starts_with("sel", "select"));
        assert_eq!(ci_find("warehouse", "HOUSE"), Some(4));
        assert_eq!(ci_find("warehouse", "castle"), None);
        assert_eq!(ci_find("abc", ""), Some(0));
    }

    #[test]
    fn test_signature_determinism() {
        let mut a = SignatureHasher::default();
        let mut b = SignatureHasher::default();
        a.write_u16(42);
        a.write_str("foo");
        b.write_u16(42);
        b.write_str("foo");
        assert_eq!(a.finish(), b.finish());

        let mut c = SignatureHasher::default();
        c.write_u16(42);
        c.write_str("fop");
        assert_ne!(a.finish(), c.finish());
    }
}
