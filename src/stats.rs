use std::fmt;

/// Word and character counts for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub words: usize,
    pub chars: usize,
}

impl TextStats {
    /// Blank text has no words; otherwise words are runs separated by
    /// whitespace. Characters are Unicode scalar values, newlines included.
    pub fn of(text: &str) -> Self {
        TextStats {
            words: text.split_whitespace().count(),
            chars: text.chars().count(),
        }
    }
}

impl fmt::Display for TextStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Words: {} | Characters: {}", self.words, self.chars)
    }
}
