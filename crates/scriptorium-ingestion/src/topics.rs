//! Closed-vocabulary scientific topic tagging.
//!
//! A topic is assigned when any of its keywords occurs as a substring of the
//! lower-cased text. This is deliberately a keyword lookup, not a classifier.

use std::collections::BTreeSet;

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("dna", &["dna", "genome", "genetic", "chromosome", "nucleotide", "gene"]),
    ("rna", &["rna", "mrna", "trna", "ribonucleic", "transcription"]),
    ("protein", &["protein", "amino acid", "peptide", "enzyme", "antibody"]),
    ("cell", &["cell", "cellular", "mitochondria", "nucleus", "organelle"]),
    ("biology", &["biology", "biological", "organism", "species", "taxonomy"]),
    ("physics", &["physics", "quantum", "relativity", "particle", "atomic"]),
    ("chemistry", &["chemistry", "chemical", "molecule", "compound", "reaction"]),
    ("math", &["math", "mathematics", "algorithm", "calculus", "equation"]),
    ("neuroscience", &["neuron", "brain", "neural", "synaptic", "cognitive"]),
    ("climate", &["climate", "atmospheric", "temperature", "greenhouse", "carbon"]),
];

/// Returns the set of topics whose keywords appear in `text`.
pub fn extract_topics(text: &str) -> BTreeSet<String> {
    if text.is_empty() {
        return BTreeSet::new();
    }
    let lower = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}
