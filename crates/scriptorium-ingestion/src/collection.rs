//! The persisted record and the payload announced for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Metadata;

/// A fully built record that has not been stored yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub scientific_topics: Vec<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub scientific_topics: Vec<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn from_draft(id: Uuid, draft: CollectionDraft) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            url: draft.url,
            scientific_topics: draft.scientific_topics,
            metadata: draft.metadata,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        }
    }

    pub fn source_type(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    /// Applies a patch in place. Metadata keys are merged, not replaced wholesale.
    pub fn apply(&mut self, patch: CollectionPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata.extend(metadata);
        }
        self.updated_at = Utc::now();
    }
}

/// Explicit out-of-pipeline edit of a stored collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl CollectionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.metadata.is_none()
    }
}

/// Flat payload published once a collection is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCollectedMessage {
    pub content: String,
    pub metadata: Metadata,
    pub collection_id: Uuid,
    pub source_type: String,
    /// Caller-supplied generation parameters, serialised at the top level.
    #[serde(flatten)]
    pub generation_params: Metadata,
}

impl DataCollectedMessage {
    pub fn for_collection(collection: &Collection, generation_params: Metadata) -> Self {
        // Reserved keys win over caller params with the same name.
        let generation_params = generation_params
            .into_iter()
            .filter(|(k, _)| !matches!(k.as_str(), "content" | "metadata" | "collection_id" | "source_type"))
            .collect();
        Self {
            content: collection.content.clone(),
            metadata: collection.metadata.clone(),
            collection_id: collection.id,
            source_type: collection.source_type().to_string(),
            generation_params,
        }
    }
}
