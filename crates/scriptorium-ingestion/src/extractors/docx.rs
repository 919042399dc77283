//! DOCX text extraction straight from the OOXML package.
//!
//! Body paragraphs come first, one per line, followed by the text of every
//! table cell in document order. Core properties live in `docProps/core.xml`.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::models::Metadata;

const DOCUMENT_PART: &str = "word/document.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Core property element (local name) → metadata key.
const CORE_FIELDS: &[(&[u8], &str)] = &[
    (b"title", "title"),
    (b"creator", "author"),
    (b"subject", "subject"),
    (b"keywords", "keywords"),
    (b"created", "created"),
    (b"modified", "modified"),
    (b"lastModifiedBy", "last_modified_by"),
];

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a readable DOCX package: {0}")]
    Zip(#[from] ZipError),

    #[error("failed to read package part: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed WordprocessingML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("package has no word/document.xml part")]
    MissingDocument,
}

#[derive(Debug, Clone)]
pub struct ParsedDocx {
    pub text: String,
    pub paragraph_count: usize,
    pub table_cell_count: usize,
    pub properties: Metadata,
}

pub fn parse_docx(bytes: &[u8]) -> Result<ParsedDocx, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let document_xml = match read_part(&mut archive, DOCUMENT_PART)? {
        Some(xml) => xml,
        None => return Err(DocxError::MissingDocument),
    };
    let body = parse_body(&document_xml)?;

    let properties = match read_part(&mut archive, CORE_PROPERTIES_PART)? {
        Some(xml) => parse_core_properties(&xml)?,
        None => Metadata::new(),
    };

    let mut text = body.paragraphs.join("\n");
    if !body.cells.is_empty() {
        text.push('\n');
        for cell in &body.cells {
            text.push_str(cell);
            text.push('\n');
        }
    }

    Ok(ParsedDocx {
        text,
        paragraph_count: body.paragraphs.len(),
        table_cell_count: body.cells.len(),
        properties,
    })
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, DocxError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

#[derive(Debug, Default)]
struct Body {
    paragraphs: Vec<String>,
    cells: Vec<String>,
}

fn parse_body(xml: &str) -> Result<Body, DocxError> {
    let mut reader = Reader::from_str(xml);

    let mut body = Body::default();
    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut cell: Option<Vec<String>> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                b"tbl" => table_depth += 1,
                b"tc" if table_depth == 1 => cell = Some(Vec::new()),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                b"p" => finish_paragraph(String::new(), table_depth, &mut cell, &mut body),
                _ => {}
            },
            Event::Text(ref e) if in_text => {
                paragraph.push_str(&e.unescape()?);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    finish_paragraph(std::mem::take(&mut paragraph), table_depth, &mut cell, &mut body)
                }
                b"tc" if table_depth == 1 => {
                    if let Some(paragraphs) = cell.take() {
                        body.cells.push(paragraphs.join("\n"));
                    }
                }
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(body)
}

fn finish_paragraph(text: String, table_depth: usize, cell: &mut Option<Vec<String>>, body: &mut Body) {
    if table_depth == 0 {
        body.paragraphs.push(text);
    } else if let Some(paragraphs) = cell.as_mut() {
        paragraphs.push(text);
    }
}

fn parse_core_properties(xml: &str) -> Result<Metadata, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut properties = Metadata::new();
    let mut current: Option<&'static str> = None;
    let mut value = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                current = CORE_FIELDS
                    .iter()
                    .find(|(element, _)| *element == e.local_name().as_ref())
                    .map(|(_, key)| *key);
                value.clear();
            }
            Event::Text(ref e) if current.is_some() => value.push_str(&e.unescape()?),
            Event::End(_) => {
                if let Some(key) = current.take() {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        properties.insert(key.to_string(), Value::String(trimmed.to_string()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(properties)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub(crate) fn build_docx(document_xml: &str, core_xml: Option<&str>) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(DOCUMENT_PART, options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        if let Some(core) = core_xml {
            writer.start_file(CORE_PROPERTIES_PART, options).unwrap();
            writer.write_all(core.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) const SAMPLE_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Mitochondria &amp; energy</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Split </w:t></w:r><w:r><w:t>run</w:t></w:r></w:p>
    <w:p/>
    <w:tbl>
      <w:tr>
        <w:tc><w:p><w:r><w:t>Gene</w:t></w:r></w:p></w:tc>
        <w:tc><w:p><w:r><w:t>TP53</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:p><w:r><w:t>After table</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    pub(crate) const SAMPLE_CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Cell Energy</dc:title>
  <dc:creator>R. Franklin</dc:creator>
  <dc:subject></dc:subject>
  <cp:lastModifiedBy>M. Wilkins</cp:lastModifiedBy>
  <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;

    #[test]
    fn test_paragraphs_then_cells() {
        let bytes = build_docx(SAMPLE_DOCUMENT, None);
        let parsed = parse_docx(&bytes).unwrap();
        assert_eq!(
            parsed.text,
            "Mitochondria & energy\nSplit run\n\nAfter table\nGene\nTP53\n"
        );
        assert_eq!(parsed.paragraph_count, 4);
        assert_eq!(parsed.table_cell_count, 2);
        assert!(parsed.properties.is_empty());
    }

    #[test]
    fn test_core_properties() {
        let bytes = build_docx(SAMPLE_DOCUMENT, Some(SAMPLE_CORE));
        let props = parse_docx(&bytes).unwrap().properties;
        assert_eq!(props["title"], "Cell Energy");
        assert_eq!(props["author"], "R. Franklin");
        assert_eq!(props["last_modified_by"], "M. Wilkins");
        assert_eq!(props["created"], "2024-01-02T03:04:05Z");
        assert!(props.get("subject").is_none());
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(parse_docx(&bytes), Err(DocxError::MissingDocument)));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(parse_docx(b"plain text"), Err(DocxError::Zip(_))));
    }
}
