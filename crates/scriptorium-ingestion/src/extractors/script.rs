use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::models::{ExtractionResult, SourceKind};

/// Passes user-submitted script text through, annotated with line and word counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptExtractor;

impl ScriptExtractor {
    pub fn extract(&self, script: &str) -> ExtractionResult {
        ExtractionResult::new(script, SourceKind::VideoScript)
            .with_meta("line_count", script.split('\n').count())
            .with_meta("word_count", script.split_whitespace().count())
    }

    /// Entry point for untyped payloads: anything other than a JSON string is rejected.
    pub fn extract_value(&self, value: &Value) -> Result<ExtractionResult> {
        match value {
            Value::String(script) => Ok(self.extract(script)),
            other => Err(ValidationError::InvalidInput(format!(
                "script content must be a string, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    Value::Array(_) => "an array",
                    _ => "an object",
                }
            ))
            .into()),
        }
    }
}
