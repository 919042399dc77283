//! Wikipedia plain-text normalisation.
//!
//! Pass ordering matters for idempotence. Everything that can change which spans
//! count as headers, formulas or paragraph breaks (protection, section stripping,
//! citation and locator removal) runs inside one loop until the text stops changing.
//! Whitespace collapsing, punctuation spacing, restoration and tidying then run
//! exactly once, and each of them leaves input that the loop would not touch again.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::protect::{scrub_delimiters, Protected, TokenMap};
use crate::models::Metadata;

/// Sections dropped wholesale, compared case-insensitively.
const UNWANTED_SECTIONS: &[&str] = &[
    "see also",
    "references",
    "further reading",
    "external links",
    "notes",
];

/// Function application, zero-width space/joiners, LRM/RLM, word joiner, soft hyphen, BOM.
const INVISIBLE_CHARS: &[char] = &[
    '\u{2061}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{200E}', '\u{200F}', '\u{2060}',
    '\u{00AD}', '\u{FEFF}',
];

// ── Lazy regexes ─────────────────────────────────────────────────────────────

fn lazy_paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}

fn lazy_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A title needs at least one visible character.
    RE.get_or_init(|| {
        Regex::new("(={2,})([^=\u{E000}\u{E001}]*?[^=\\s\u{E000}\u{E001}][^=\u{E000}\u{E001}]*?)(={2,})")
            .unwrap()
    })
}

fn lazy_display_math_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\\{\\\\displaystyle[^}\u{E000}\u{E001}]+\\}").unwrap())
}

fn lazy_inline_math_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // May span single newlines so that `$` pairing never depends on whitespace layout.
    RE.get_or_init(|| Regex::new("\\$[^$\u{E000}\u{E001}]+\\$").unwrap())
}

fn lazy_citation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[(?:\d+|citation needed|clarification needed)\]").unwrap())
}

fn lazy_locator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s*:\s*[\d§–]+(?:\s*[,–]\s*[\d§–]+)*(?:\s*:\s*[\d§–]+(?:\s*[,–]\s*[\d§–]+)*)*")
            .unwrap()
    })
}

fn lazy_whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn lazy_space_before_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([.,;:!?])").unwrap())
}

fn lazy_space_after_paren_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s+").unwrap())
}

fn lazy_space_before_paren_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\)").unwrap())
}

fn lazy_excess_newlines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn lazy_category_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[Category:[^\]]*\]\]").unwrap())
}

fn lazy_language_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[[a-z\-]+:[^\]]+\]\]").unwrap())
}

fn lazy_disambiguation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)This article is about.*?For other uses.*?\n").unwrap())
}

fn lazy_infobox_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{Infobox.*?\}\}").unwrap())
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Cleans Wikipedia content and lifts the first infobox, if any, into `metadata.infobox`.
///
/// Markup stripping and text cleaning alternate until neither changes the text. Every
/// productive strip removes visible characters that `clean_text` never adds back, so
/// the loop terminates.
pub fn clean(content: &str, metadata: &mut Metadata) -> String {
    if let Some(infobox) = lazy_infobox_regex().find(content) {
        metadata.insert("infobox".into(), Value::String(infobox.as_str().to_string()));
    }

    let mut text = content.to_string();
    loop {
        let cleaned = clean_text(&strip_markup(&text));
        if strip_markup(&cleaned) == cleaned {
            return cleaned;
        }
        text = cleaned;
    }
}

/// Normalises Wikipedia plain text. `clean_text(clean_text(t)) == clean_text(t)`.
pub fn clean_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = normalize_line_endings(text);
    let text = strip_invisible(&scrub_delimiters(&text));

    let mut tokens = TokenMap::new();
    let text = protect_and_strip(text, &mut tokens);

    let text = lazy_whitespace_regex().replace_all(&text, " ");
    let text = fix_punctuation_spacing(&text);
    let text = tokens.restore(&text, render_protected);
    tidy(&text)
}

// ── Passes ───────────────────────────────────────────────────────────────────

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect()
}

fn protect_and_strip(mut text: String, tokens: &mut TokenMap) -> String {
    loop {
        let before = text.clone();

        text = tokens.protect(&text, lazy_paragraph_regex(), |_| Protected::ParagraphBreak);
        text = tokens.protect(&text, lazy_display_math_regex(), |c| {
            Protected::Formula(c[0].to_string())
        });
        text = tokens.protect(&text, lazy_inline_math_regex(), |c| {
            Protected::Formula(c[0].to_string())
        });
        text = tokens.protect(&text, lazy_header_regex(), |c| Protected::Header {
            marker: c[1].to_string(),
            title: c[2].to_string(),
        });
        text = strip_unwanted_sections(&text, tokens);
        text = remove_citations(&text);

        if text == before {
            return text;
        }
    }
}

/// Drops each unwanted header token together with everything up to the next header token.
fn strip_unwanted_sections(text: &str, tokens: &TokenMap) -> String {
    let headers: Vec<_> = tokens
        .tokens(text)
        .into_iter()
        .filter_map(|t| match t.span {
            Protected::Header { title, .. } => Some((t.start, t.end, is_unwanted(title))),
            _ => None,
        })
        .collect();

    if !headers.iter().any(|(_, _, unwanted)| *unwanted) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (i, (start, _, unwanted)) in headers.iter().enumerate() {
        if !unwanted {
            continue;
        }
        if *start < cursor {
            continue;
        }
        out.push_str(&text[cursor..*start]);
        cursor = headers.get(i + 1).map(|(next, _, _)| *next).unwrap_or(text.len());
    }
    out.push_str(&text[cursor..]);
    out
}

fn is_unwanted(title: &str) -> bool {
    let normalized = collapse_title(title).to_lowercase();
    UNWANTED_SECTIONS.contains(&normalized.as_str())
}

/// Numeric citation markers and trailing page/section locators, to a fixed point.
pub fn remove_citations(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = {
            let uncited = lazy_citation_regex().replace_all(&current, "");
            lazy_locator_regex().replace_all(&uncited, "").into_owned()
        };
        if next == current {
            return next;
        }
        current = next;
    }
}

pub fn fix_punctuation_spacing(text: &str) -> String {
    let text = lazy_space_before_punct_regex().replace_all(text, "$1");
    let text = lazy_space_after_paren_regex().replace_all(&text, "(");
    lazy_space_before_paren_regex().replace_all(&text, ")").into_owned()
}

fn render_protected(span: &Protected) -> String {
    match span {
        Protected::ParagraphBreak => "\n\n".to_string(),
        Protected::Formula(f) => f.clone(),
        // Closing run mirrors the opening one.
        Protected::Header { marker, title } => {
            format!("\n\n{marker} {} {marker}\n\n", collapse_title(title))
        }
    }
}

fn collapse_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims lines, drops stray `=` rules and caps blank runs at one empty line.
fn tidy(text: &str) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| line.is_empty() || !line.chars().all(|c| c == '='))
        .collect();
    let joined = lines.join("\n");
    lazy_excess_newlines_regex()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

// ── Wiki markup residue ──────────────────────────────────────────────────────

/// Infoboxes, category and interlanguage links, and the "This article is about" hatnote.
fn strip_markup(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = {
            let unboxed = lazy_infobox_regex().replace_all(&current, "");
            let unnoted = lazy_disambiguation_regex().replace_all(&unboxed, "");
            let uncategorised = lazy_category_link_regex().replace_all(&unnoted, "");
            lazy_language_link_regex().replace_all(&uncategorised, "").into_owned()
        };
        if next == current {
            return next;
        }
        current = next;
    }
}
