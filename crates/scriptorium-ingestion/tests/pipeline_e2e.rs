//! Full pipeline runs over inputs that need no network.

use std::io::{Cursor, Write};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use scriptorium_ingestion::{
    BroadcastPublisher, CollectionService, InMemoryCollectionRepository, IngestRequest,
    IngestionConfig, IngestionError, IngestionPipeline, Metadata, ValidationError,
};

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>The brain has billions of neurons.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Each enzyme is a protein.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Brain Notes</dc:title>
  <dc:creator>S. Ramon y Cajal</dc:creator>
</cp:coreProperties>"#;

fn docx_bytes() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(DOCUMENT_XML.as_bytes()).unwrap();
    writer.start_file("docProps/core.xml", options).unwrap();
    writer.write_all(CORE_XML.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn pipeline(config: &IngestionConfig) -> IngestionPipeline {
    IngestionPipeline::new(config).expect("http client")
}

#[tokio::test]
async fn test_script_end_to_end() {
    let draft = pipeline(&IngestionConfig::default())
        .run(IngestRequest::Script {
            content: "Quantum particles and the DNA double helix.".into(),
            title: Some("Tiny Things".into()),
        })
        .await
        .unwrap();

    assert_eq!(draft.url, None);
    assert_eq!(draft.title, "Tiny Things");
    assert_eq!(draft.scientific_topics, vec!["dna", "physics"]);
    assert_eq!(draft.metadata["cleaned"], Value::Bool(true));
    assert_eq!(draft.metadata["word_count"], json!(7));
}

#[tokio::test]
async fn test_docx_end_to_end() {
    let draft = pipeline(&IngestionConfig::default())
        .run(IngestRequest::File {
            filename: "upload.docx".into(),
            bytes: docx_bytes(),
        })
        .await
        .unwrap();

    assert_eq!(draft.title, "Brain Notes");
    assert_eq!(draft.content, "The brain has billions of neurons.\nEach enzyme is a protein.");
    assert_eq!(draft.scientific_topics, vec!["neuroscience", "protein"]);
    assert_eq!(draft.metadata["author"], "S. Ramon y Cajal");
    assert_eq!(draft.metadata["source"], "file_upload");
    assert_eq!(draft.metadata["file_type"], "docx");
    assert_eq!(draft.metadata["extraction_method"], "ooxml");
}

#[tokio::test]
async fn test_latin1_text_file_decodes() {
    let draft = pipeline(&IngestionConfig::default())
        .run(IngestRequest::File {
            filename: "menu.txt".into(),
            bytes: b"Caf\xe9 chemistry\n".to_vec(),
        })
        .await
        .unwrap();

    assert_eq!(draft.content, "Caf\u{e9} chemistry");
    assert_eq!(draft.metadata["encoding"], "latin-1");
    assert_eq!(draft.scientific_topics, vec!["chemistry"]);
}

#[tokio::test]
async fn test_empty_and_oversized_files_rejected() {
    let config = IngestionConfig {
        max_file_size: 8,
        ..IngestionConfig::default()
    };
    let pipeline = pipeline(&config);

    let err = pipeline
        .run(IngestRequest::File {
            filename: "empty.pdf".into(),
            bytes: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Validation(ValidationError::EmptyFile { .. })));

    // Not a valid PDF either; validation fires before parsing.
    let err = pipeline
        .run(IngestRequest::File {
            filename: "big.pdf".into(),
            bytes: vec![b'x'; 9],
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestionError::Validation(ValidationError::FileTooLarge { size: 9, max: 8, .. })
    ));
}

#[tokio::test]
async fn test_malformed_docx_is_extraction_error() {
    let err = pipeline(&IngestionConfig::default())
        .run(IngestRequest::File {
            filename: "broken.docx".into(),
            bytes: b"not a zip archive".to_vec(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Extraction { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_service_concurrent_collections() {
    let repository = Arc::new(InMemoryCollectionRepository::new());
    let publisher = Arc::new(BroadcastPublisher::default());
    let mut rx = publisher.subscribe();
    let service = CollectionService::new(
        Arc::new(pipeline(&IngestionConfig::default())),
        repository.clone(),
        publisher,
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .collect_script(&format!("Script number {i} about climate."), None, Metadata::new())
                    .await
            })
        })
        .collect();

    for handle in handles {
        let collection = handle.await.unwrap().unwrap();
        assert_eq!(collection.scientific_topics, vec!["climate"]);
    }

    assert_eq!(repository.len().await, 8);
    assert_eq!(service.list(5).await.unwrap().len(), 5);
    for _ in 0..8 {
        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload["source_type"], "video_script");
    }
}
