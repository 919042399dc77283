//! PubMed abstract structuring and abbreviation expansion.

use regex::Regex;
use std::sync::OnceLock;

/// Expanded once per text; skipped when the long form is already present.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("RCT", "Randomized Controlled Trial"),
    ("DOI", "Digital Object Identifier"),
    ("PMID", "PubMed ID"),
];

fn lazy_whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn lazy_section_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\s*\b(BACKGROUND|INTRODUCTION|MATERIALS AND METHODS|METHODS|RESULTS|CONCLUSIONS|CONCLUSION|DISCUSSION)\s*:\s*",
        )
        .unwrap()
    })
}

fn lazy_abbreviation_regexes() -> &'static [(Regex, &'static str)] {
    static RES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RES.get_or_init(|| {
        ABBREVIATIONS
            .iter()
            .map(|(abbr, full)| (Regex::new(&format!(r"(?i)\b{abbr}\b")).unwrap(), *full))
            .collect()
    })
}

pub fn clean_text(text: &str) -> String {
    let structured = structure_abstract(text);
    expand_abbreviations(&structured)
}

/// Puts each recognised section label on its own paragraph: `"\n\nRESULTS:\n..."`.
/// Whitespace runs spanning a blank line stay paragraph breaks; all others become one space.
pub fn structure_abstract(text: &str) -> String {
    let flat = lazy_whitespace_regex().replace_all(text, |caps: &regex::Captures<'_>| {
        if caps[0].matches('\n').count() >= 2 {
            "\n\n"
        } else {
            " "
        }
    });
    lazy_section_label_regex()
        .replace_all(&flat, "\n\n$1:\n")
        .trim()
        .to_string()
}

/// Expands only the first occurrence of each abbreviation.
pub fn expand_abbreviations(text: &str) -> String {
    let mut out = text.to_string();
    for (re, full) in lazy_abbreviation_regexes() {
        if out.to_lowercase().contains(&full.to_lowercase()) {
            continue;
        }
        out = re.replace(&out, *full).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_occurrence_only() {
        assert_eq!(
            clean_text("RCT showed X. Another RCT confirmed."),
            "Randomized Controlled Trial showed X. Another RCT confirmed."
        );
    }

    #[test]
    fn test_section_labels_become_paragraphs() {
        let out = clean_text("BACKGROUND: Cells die. METHODS: We looked.   Results:  It worked.");
        assert_eq!(out, "BACKGROUND:\nCells die.\n\nMETHODS:\nWe looked.\n\nResults:\nIt worked.");
    }

    #[test]
    fn test_materials_and_methods_kept_whole() {
        let out = clean_text("Intro. MATERIALS AND METHODS: Mice.");
        assert_eq!(out, "Intro.\n\nMATERIALS AND METHODS:\nMice.");
    }

    #[test]
    fn test_paragraph_breaks_survive() {
        let out = clean_text("First finding.\r\n\r\nSecond\n finding.\n \n\nThird.");
        assert_eq!(out, "First finding.\n\nSecond finding.\n\nThird.");
        assert_eq!(clean_text(&out), out);
    }

    #[test]
    fn test_label_absorbs_surrounding_paragraph_breaks() {
        let out = clean_text("Cells die.\n\nRESULTS:\n\nThey recover.");
        assert_eq!(out, "Cells die.\n\nRESULTS:\nThey recover.");
    }

    #[test]
    fn test_existing_long_form_blocks_expansion() {
        let text = "A Randomized Controlled Trial (RCT) was run.";
        assert_eq!(clean_text(text), text);
    }

    #[test]
    fn test_idempotent() {
        for text in [
            "RCT showed X. Another RCT confirmed.",
            "BACKGROUND: a PMID 123 doi: 10.1/x RESULTS: b CONCLUSION: c",
            "  conclusions :   fine  ",
            "a\n\nb\nc RESULTS:\n\n\nd\n\nCONCLUSIONS: e\n\n",
            "",
        ] {
            let once = clean_text(text);
            assert_eq!(clean_text(&once), once, "not idempotent for {text:?}");
        }
    }
}
