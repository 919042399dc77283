//! Composes the pipeline with its storage and messaging collaborators.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::collection::{Collection, CollectionPatch, DataCollectedMessage};
use crate::error::Result;
use crate::extractors::wikipedia::{self, RelatedArticle};
use crate::models::{Metadata, SourceKind};
use crate::pipeline::{IngestRequest, IngestionPipeline};
use crate::publisher::{CollectionPublisher, DEFAULT_ROUTING_KEY};
use crate::repository::CollectionRepository;

/// Run pipeline → persist → publish. Holds only `Arc` collaborators, so clones
/// are cheap and one instance serves any number of concurrent requests.
#[derive(Clone)]
pub struct CollectionService {
    pipeline: Arc<IngestionPipeline>,
    repository: Arc<dyn CollectionRepository>,
    publisher: Arc<dyn CollectionPublisher>,
    routing_key: String,
    related_limit: usize,
}

impl CollectionService {
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        repository: Arc<dyn CollectionRepository>,
        publisher: Arc<dyn CollectionPublisher>,
    ) -> Self {
        Self {
            pipeline,
            repository,
            publisher,
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            related_limit: 5,
        }
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn with_related_limit(mut self, limit: usize) -> Self {
        self.related_limit = limit;
        self
    }

    // ── Collection ────────────────────────────────────────────────────────────

    /// Stores the collection before announcing it; a publish failure is
    /// reported but the stored record stays.
    #[instrument(skip(self, request, generation_params))]
    pub async fn collect(&self, request: IngestRequest, generation_params: Metadata) -> Result<Collection> {
        let draft = self.pipeline.run(request).await?;
        let collection = self.repository.insert(draft).await?;

        let message = DataCollectedMessage::for_collection(&collection, generation_params);
        self.publisher.publish(&self.routing_key, &message).await?;

        info!(
            collection_id = %collection.id,
            source_type = collection.source_type(),
            "Collected"
        );
        Ok(collection)
    }

    pub async fn collect_url(&self, url: &str, generation_params: Metadata) -> Result<Collection> {
        self.collect(IngestRequest::Url(url.to_string()), generation_params)
            .await
    }

    pub async fn collect_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        generation_params: Metadata,
    ) -> Result<Collection> {
        self.collect(
            IngestRequest::File {
                filename: filename.to_string(),
                bytes,
            },
            generation_params,
        )
        .await
    }

    pub async fn collect_script(
        &self,
        content: &str,
        title: Option<&str>,
        generation_params: Metadata,
    ) -> Result<Collection> {
        self.collect(
            IngestRequest::Script {
                content: content.to_string(),
                title: title.map(str::to_string),
            },
            generation_params,
        )
        .await
    }

    // ── Queries and edits ─────────────────────────────────────────────────────

    pub async fn get(&self, id: Uuid) -> Result<Option<Collection>> {
        self.repository.find_by_id(id).await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Collection>> {
        self.repository.find_all(limit).await
    }

    pub async fn find_by_title(&self, title: &str) -> Result<Option<Collection>> {
        self.repository.find_by_title(title).await
    }

    /// An empty patch changes nothing, `updated_at` included; it only reports whether `id` exists.
    pub async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<bool> {
        if patch.is_empty() {
            let exists = self.repository.find_by_id(id).await?.is_some();
            debug!(%id, exists, "Empty collection patch");
            return Ok(exists);
        }
        let updated = self.repository.update(id, patch).await?;
        debug!(%id, updated, "Update collection");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = self.repository.delete(id).await?;
        debug!(%id, deleted, "Delete collection");
        Ok(deleted)
    }

    /// Wikipedia articles related to a stored Wikipedia collection. Empty for
    /// any other source, and for unknown ids.
    #[instrument(skip(self))]
    pub async fn related_articles(&self, id: Uuid) -> Result<Vec<RelatedArticle>> {
        let Some(collection) = self.repository.find_by_id(id).await? else {
            debug!("No such collection");
            return Ok(Vec::new());
        };
        if collection.source_type() != SourceKind::Wikipedia.as_str() {
            return Ok(Vec::new());
        }

        let language = collection
            .url
            .as_deref()
            .map(wikipedia::language_from_url)
            .unwrap_or_else(|| wikipedia::DEFAULT_LANGUAGE.to_string());

        self.pipeline
            .extractors()
            .wikipedia()
            .related_articles(&collection.title, &language, self.related_limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionError;
    use crate::pipeline::IngestionConfig;
    use crate::publisher::BroadcastPublisher;
    use crate::repository::InMemoryCollectionRepository;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FailingPublisher;

    #[async_trait]
    impl CollectionPublisher for FailingPublisher {
        async fn publish(&self, _routing_key: &str, _message: &DataCollectedMessage) -> Result<()> {
            Err(IngestionError::Publish("broker unavailable".into()))
        }
    }

    fn pipeline() -> Arc<IngestionPipeline> {
        Arc::new(IngestionPipeline::new(&IngestionConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_collect_script_persists_and_publishes() {
        let repository = Arc::new(InMemoryCollectionRepository::new());
        let publisher = Arc::new(BroadcastPublisher::default());
        let mut rx = publisher.subscribe();
        let service = CollectionService::new(pipeline(), repository.clone(), publisher);

        let mut params = Metadata::new();
        params.insert("style".into(), json!("casual"));
        let collection = service
            .collect_script("A neuron fires.", Some("Brains"), params)
            .await
            .unwrap();

        assert_eq!(repository.len().await, 1);
        assert_eq!(service.get(collection.id).await.unwrap(), Some(collection.clone()));

        let published = rx.recv().await.unwrap();
        assert_eq!(published.routing_key, "data.collected");
        assert_eq!(published.payload["collection_id"], json!(collection.id));
        assert_eq!(published.payload["source_type"], "video_script");
        assert_eq!(published.payload["style"], "casual");
        assert_eq!(published.payload["content"], "A neuron fires.");
    }

    #[tokio::test]
    async fn test_publish_failure_propagates_after_store() {
        let repository = Arc::new(InMemoryCollectionRepository::new());
        let service = CollectionService::new(pipeline(), repository.clone(), Arc::new(FailingPublisher));

        let err = service
            .collect_script("text", None, Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Publish(_)));
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_pipeline_stores_nothing() {
        let repository = Arc::new(InMemoryCollectionRepository::new());
        let service = CollectionService::new(
            pipeline(),
            repository.clone(),
            Arc::new(BroadcastPublisher::default()),
        );

        let err = service
            .collect_file("empty.txt", Vec::new(), Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Validation(_)));
        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = CollectionService::new(
            pipeline(),
            Arc::new(InMemoryCollectionRepository::new()),
            Arc::new(BroadcastPublisher::default()),
        );
        let collection = service
            .collect_script("draft", Some("Draft"), Metadata::new())
            .await
            .unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("reviewed".into(), Value::Bool(true));
        let patch = CollectionPatch {
            content: Some("final".into()),
            metadata: Some(metadata),
            ..Default::default()
        };
        assert!(service.update(collection.id, patch).await.unwrap());

        let stored = service.find_by_title("draft").await.unwrap().unwrap();
        assert_eq!(stored.content, "final");
        assert_eq!(stored.metadata["reviewed"], Value::Bool(true));
        assert_eq!(stored.metadata["source"], "video_script");

        assert!(service.delete(collection.id).await.unwrap());
        assert!(!service.delete(collection.id).await.unwrap());
        assert!(service.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_patch_leaves_collection_untouched() {
        let service = CollectionService::new(
            pipeline(),
            Arc::new(InMemoryCollectionRepository::new()),
            Arc::new(BroadcastPublisher::default()),
        );
        let collection = service
            .collect_script("draft", Some("Draft"), Metadata::new())
            .await
            .unwrap();

        assert!(service.update(collection.id, CollectionPatch::default()).await.unwrap());
        assert_eq!(service.get(collection.id).await.unwrap(), Some(collection));
        assert!(!service.update(Uuid::new_v4(), CollectionPatch::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_related_articles_empty_for_non_wikipedia() {
        let service = CollectionService::new(
            pipeline(),
            Arc::new(InMemoryCollectionRepository::new()),
            Arc::new(BroadcastPublisher::default()),
        );
        let collection = service
            .collect_script("text", None, Metadata::new())
            .await
            .unwrap();
        assert!(service.related_articles(collection.id).await.unwrap().is_empty());
        assert!(service.related_articles(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
