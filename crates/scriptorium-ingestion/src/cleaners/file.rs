use serde_json::Value;

use crate::models::{FileType, Metadata, SourceKind};

pub fn clean(content: &str, file_type: FileType, metadata: &mut Metadata) -> String {
    metadata.insert("file_type".into(), Value::from(file_type.as_str()));
    metadata.insert("source".into(), Value::from(SourceKind::FileUpload.as_str()));
    content.trim().to_string()
}
