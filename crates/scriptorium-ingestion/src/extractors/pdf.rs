//! lopdf-based PDF text and document-info extraction.

use lopdf::{Dictionary, Document, Object};
use serde_json::Value;
use tracing::warn;

use crate::models::Metadata;

/// Document-info keys copied into metadata, with their metadata names.
const INFO_FIELDS: &[(&[u8], &str)] = &[
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
];

#[derive(Debug, Clone)]
pub struct ParsedPdf {
    pub text: String,
    pub page_count: usize,
    /// Only the info fields that are present and non-blank.
    pub info: Metadata,
}

/// Extracts per-page text joined by newlines. A page that fails to decode
/// contributes an empty string rather than failing the whole document.
pub fn parse_pdf(bytes: &[u8]) -> Result<ParsedPdf, lopdf::Error> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();

    let mut texts = Vec::with_capacity(pages.len());
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from PDF page");
                texts.push(String::new());
            }
        }
    }

    let mut info = Metadata::new();
    if let Some(dict) = info_dictionary(&doc) {
        for (key, name) in INFO_FIELDS {
            if let Some(value) = info_string(dict, key) {
                info.insert(name.to_string(), Value::String(value));
            }
        }
    }

    Ok(ParsedPdf {
        text: texts.join("\n"),
        page_count: pages.len(),
        info,
    })
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let Object::String(bytes, _) = dict.get(key).ok()? else {
        return None;
    };
    let text = decode_pdf_string(bytes);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// PDF text strings are UTF-16BE when they carry a BOM, PDFDocEncoding otherwise.
/// PDFDocEncoding is treated as Latin-1, which agrees on the printable range.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
