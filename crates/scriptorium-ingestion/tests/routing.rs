use proptest::prelude::*;

use scriptorium_ingestion::{route, Cleaner, FileType, IngestionError, Source, SourceDescriptor};

proptest! {
    #[test]
    fn wikipedia_urls_get_wikipedia_pair(
        url in r"https?://(www\.)?([a-z]{2}\.)?wikipedia\.org/wiki/[A-Za-z0-9_%()]{1,30}"
    ) {
        let r = route(SourceDescriptor::Url(&url)).unwrap();
        prop_assert_eq!(r.source, Source::Wikipedia);
        prop_assert_eq!(r.cleaner, Cleaner::Wikipedia);
    }

    #[test]
    fn pubmed_urls_get_pubmed_pair(url in r"https?://(www\.)?pubmed\.ncbi\.nlm\.nih\.gov/[0-9]{1,9}/?") {
        let r = route(SourceDescriptor::Url(&url)).unwrap();
        prop_assert_eq!(r.source, Source::PubMed);
        prop_assert_eq!(r.cleaner, Cleaner::PubMed);
    }

    #[test]
    fn other_urls_are_unsupported(url in r"https?://(example|github|docs)\.(com|org|io)/[a-z]{0,12}") {
        match route(SourceDescriptor::Url(&url)) {
            Err(IngestionError::UnsupportedSource(id)) => prop_assert_eq!(id, url),
            other => prop_assert!(false, "expected UnsupportedSource, got {:?}", other),
        }
    }

    #[test]
    fn routing_is_pure(url in r"https://[a-z]{2}\.wikipedia\.org/wiki/[A-Za-z]{1,10}") {
        let first = route(SourceDescriptor::Url(&url)).unwrap();
        let second = route(SourceDescriptor::Url(&url)).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_pubmed_search_pages_are_not_articles() {
    let err = route(SourceDescriptor::Url("https://pubmed.ncbi.nlm.nih.gov/?term=kras")).unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedSource(_)));
}

#[test]
fn test_files_route_by_extension() {
    for (name, file_type) in [
        ("paper.pdf", FileType::Pdf),
        ("Report.DOCX", FileType::Docx),
        ("notes.txt", FileType::Txt),
    ] {
        let r = route(SourceDescriptor::File(name)).unwrap();
        assert_eq!(r.source.file_type(), Some(file_type));
        assert_eq!(r.cleaner, Cleaner::File(file_type));
    }

    let err = route(SourceDescriptor::File("slides.pptx")).unwrap_err();
    assert!(matches!(err, IngestionError::UnsupportedSource(id) if id == "slides.pptx"));
}

#[test]
fn test_script_routes_to_default_cleaner() {
    let r = route(SourceDescriptor::Script).unwrap();
    assert_eq!(r.source, Source::Script);
    assert_eq!(r.cleaner, Cleaner::Default);
}
