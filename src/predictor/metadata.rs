//! Model metadata file

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::errors::{PipelineError, Result};

/// Description of the trend model shipped alongside the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Window length the model was trained on
    pub sequence_length: usize,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub version: String,
}

impl ModelMetadata {
    /// Read and parse a metadata JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "cannot read model metadata {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let metadata: ModelMetadata = serde_json::from_str(data)?;
        if metadata.sequence_length == 0 {
            return Err(PipelineError::Configuration(
                "model metadata sequence_length must be greater than zero".to_string(),
            ));
        }
        Ok(metadata)
    }
}
