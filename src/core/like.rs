//! SQL `LIKE` pattern matching over entry names.

use regex::Regex;

/// Compiled `LIKE` pattern.
///
/// `%` matches any run of characters and `_` exactly one. ASCII letters
/// match without regard to case; every other character matches itself.
/// There is no escape character.
#[derive(Debug, Clone)]
pub struct LikePattern {
    re: Regex,
}

impl LikePattern {
    /// Compiles `pattern`.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut src = String::with_capacity(pattern.len() * 4 + 8);
        src.push_str("(?s)^");
        let mut buf = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '%' => src.push_str(".*"),
                '_' => src.push('.'),
                c if c.is_ascii_alphabetic() => {
                    src.push('[');
                    src.push(c.to_ascii_lowercase());
                    src.push(c.to_ascii_uppercase());
                    src.push(']');
                }
                c => src.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
        src.push('$');
        Ok(Self {
            re: Regex::new(&src)?,
        })
    }

    /// True when `text` matches the whole pattern.
    pub fn matches(&self, text: &str) -> bool {
        self.re.is_match(text)
    }
}
