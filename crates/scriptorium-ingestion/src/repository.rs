//! Persistence seam for collections.
//!
//! The pipeline never touches storage itself; the service hands finished drafts
//! to a `CollectionRepository`, which owns id assignment.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::collection::{Collection, CollectionDraft, CollectionPatch};
use crate::error::Result;

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Stores a draft and returns it with its newly assigned id.
    async fn insert(&self, draft: CollectionDraft) -> Result<Collection>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Collection>>;

    /// Newest first.
    async fn find_all(&self, limit: usize) -> Result<Vec<Collection>>;

    /// Newest collection whose title contains `title`, ignoring case.
    async fn find_by_title(&self, title: &str) -> Result<Option<Collection>>;

    /// Returns false when no collection has this id.
    async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<bool>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Process-local store, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct InMemoryCollectionRepository {
    collections: RwLock<HashMap<Uuid, Collection>>,
}

impl InMemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.collections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.collections.read().await.is_empty()
    }
}

fn newest_first(collections: &mut [Collection]) {
    collections.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.title.cmp(&b.title)));
}

#[async_trait]
impl CollectionRepository for InMemoryCollectionRepository {
    async fn insert(&self, draft: CollectionDraft) -> Result<Collection> {
        let collection = Collection::from_draft(Uuid::new_v4(), draft);
        debug!(collection_id = %collection.id, "Inserted collection");
        self.collections
            .write()
            .await
            .insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Collection>> {
        Ok(self.collections.read().await.get(&id).cloned())
    }

    async fn find_all(&self, limit: usize) -> Result<Vec<Collection>> {
        let mut all: Vec<Collection> = self.collections.read().await.values().cloned().collect();
        newest_first(&mut all);
        all.truncate(limit);
        Ok(all)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Collection>> {
        let needle = title.to_lowercase();
        let mut matches: Vec<Collection> = self
            .collections
            .read()
            .await
            .values()
            .filter(|c| c.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        newest_first(&mut matches);
        Ok(matches.into_iter().next())
    }

    async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<bool> {
        let mut guard = self.collections.write().await;
        let Some(collection) = guard.get_mut(&id) else {
            return Ok(false);
        };
        collection.apply(patch);
        debug!(collection_id = %id, updated_at = %collection.updated_at, "Updated collection");
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.collections.write().await.remove(&id).is_some())
    }
}
