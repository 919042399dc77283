//! Reversible placeholder substitution.
//!
//! Protected spans are swapped for `\u{E000}<index>\u{E001}` tokens so that later
//! global rewrites (whitespace collapsing, citation stripping) cannot touch them.
//! Both delimiters live in the Private Use Area and are scrubbed from input
//! before any protection happens, so a token can never be forged by content.

use regex::{Captures, Regex};
use std::sync::OnceLock;

pub const TOKEN_OPEN: char = '\u{E000}';
pub const TOKEN_CLOSE: char = '\u{E001}';

fn lazy_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protected {
    ParagraphBreak,
    /// `marker` is the opening `=` run; `title` is kept exactly as matched.
    Header { marker: String, title: String },
    Formula(String),
}

/// Position of a token in a protected text, with the span it stands for.
#[derive(Debug)]
pub struct TokenRef<'a> {
    pub start: usize,
    pub end: usize,
    pub span: &'a Protected,
}

#[derive(Debug, Default)]
pub struct TokenMap {
    spans: Vec<Protected>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every match of `re` with a fresh token, remembering what `classify` makes of it.
    pub fn protect<F>(&mut self, text: &str, re: &Regex, mut classify: F) -> String
    where
        F: FnMut(&Captures) -> Protected,
    {
        re.replace_all(text, |caps: &Captures| {
            let index = self.spans.len();
            self.spans.push(classify(caps));
            token(index)
        })
        .into_owned()
    }

    /// Tokens in `text`, in order of appearance.
    pub fn tokens<'a>(&'a self, text: &str) -> Vec<TokenRef<'a>> {
        lazy_token_regex()
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let index: usize = caps[1].parse().ok()?;
                let span = self.spans.get(index)?;
                Some(TokenRef {
                    start: whole.start(),
                    end: whole.end(),
                    span,
                })
            })
            .collect()
    }

    /// Swaps every token back, rendering each span through `render`.
    /// Tokens with no recorded span are dropped.
    pub fn restore<F>(&self, text: &str, mut render: F) -> String
    where
        F: FnMut(&Protected) -> String,
    {
        lazy_token_regex()
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.spans.get(i))
                    .map(&mut render)
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

pub fn token(index: usize) -> String {
    format!("{TOKEN_OPEN}{index}{TOKEN_CLOSE}")
}

/// Removes the token delimiters from untrusted input.
pub fn scrub_delimiters(text: &str) -> String {
    text.chars()
        .filter(|c| *c != TOKEN_OPEN && *c != TOKEN_CLOSE)
        .collect()
}
