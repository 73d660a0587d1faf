//! Regex colouring for the editor view.
//!
//! Rules are applied in order and later rules overwrite earlier ones, so a
//! keyword inside a string literal is coloured as part of the string.

use crossterm::style::Color;
use regex::Regex;

use crate::config::HighlightConfig;

const KEYWORDS: &[&str] = &[
    "fun", "val", "var", "class", "object", "if", "else", "for", "while", "return",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Number,
    Str,
}

impl TokenKind {
    pub fn color(self) -> Color {
        match self {
            TokenKind::Keyword => Color::Magenta,
            TokenKind::Number => Color::Cyan,
            TokenKind::Str => Color::DarkYellow,
        }
    }
}

#[derive(Debug)]
struct Rule {
    pattern: Regex,
    kind: TokenKind,
}

#[derive(Debug)]
pub struct Highlighter {
    rules: Vec<Rule>,
}

impl Highlighter {
    /// Build the rule set, or `None` when highlighting is disabled.
    pub fn from_config(config: &HighlightConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let keywords = KEYWORDS
            .iter()
            .map(|k| regex::escape(k))
            .chain(
                config
                    .extra_keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| regex::escape(k.trim())),
            )
            .collect::<Vec<_>>()
            .join("|");

        let specs = [
            (format!(r"\b({keywords})\b"), TokenKind::Keyword),
            (r"\b\d+\b".to_string(), TokenKind::Number),
            (r#"".*?""#.to_string(), TokenKind::Str),
        ];

        let mut rules = Vec::with_capacity(specs.len());
        for (source, kind) in specs {
            match Regex::new(&source) {
                Ok(pattern) => rules.push(Rule { pattern, kind }),
                Err(e) => tracing::warn!(?kind, error = %e, "skipping highlight rule"),
            }
        }
        Some(Highlighter { rules })
    }

    /// Token kind for every character of `line`, indexed by char position.
    pub fn classify(&self, line: &str) -> Vec<Option<TokenKind>> {
        let mut kinds = vec![None; line.chars().count()];
        for rule in &self.rules {
            for m in rule.pattern.find_iter(line) {
                let start = line[..m.start()].chars().count();
                let len = m.as_str().chars().count();
                for slot in &mut kinds[start..start + len] {
                    *slot = Some(rule.kind);
                }
            }
        }
        kinds
    }
}
