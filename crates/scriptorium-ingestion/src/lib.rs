//! Scriptorium content ingestion.
//!
//! Turns a URL, an uploaded file or a raw script into a normalised collection
//! record: the input is routed to an extractor, topic-tagged, cleaned by the
//! source's cleaner and assembled into a [`CollectionDraft`]. The
//! [`CollectionService`] then stores the draft and announces it.

pub mod cleaners;
pub mod collection;
pub mod error;
pub mod extractors;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod repository;
pub mod router;
pub mod service;
pub mod topics;

pub use cleaners::Cleaner;
pub use collection::{Collection, CollectionDraft, CollectionPatch, DataCollectedMessage};
pub use error::{IngestionError, Result, ValidationError};
pub use models::{CleanedResult, ExtractionResult, FileType, Metadata, SourceKind};
pub use pipeline::{IngestRequest, IngestionConfig, IngestionPipeline};
pub use publisher::{BroadcastPublisher, CollectionPublisher, PublishedMessage};
pub use repository::{CollectionRepository, InMemoryCollectionRepository};
pub use router::{route, Route, Source, SourceDescriptor};
pub use service::CollectionService;
pub use topics::extract_topics;
