//! Options shared by vision tasks
//!
//! [`BaseOptions`] and [`ClassifierOptions`] are the user-facing structs.
//! [`BaseOptionsConfig`] is the form embedded in a graph description, where
//! the model buffer travels as base64 and the stream-mode flag is derived
//! from the task's running mode.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hardware the model should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delegate {
    /// CPU inference
    #[default]
    Cpu,
    /// GPU inference
    Gpu,
}

/// Model location and inference settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseOptions {
    /// Path to the model file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_asset_path: Option<PathBuf>,

    /// In-memory model contents (not loadable from config files)
    #[serde(skip)]
    pub model_asset_buffer: Option<Vec<u8>>,

    /// Inference delegate
    #[serde(default)]
    pub delegate: Delegate,
}

impl BaseOptions {
    /// Options pointing at a model file
    pub fn from_model_path(path: impl Into<PathBuf>) -> Self {
        Self {
            model_asset_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Options carrying the model bytes directly
    pub fn from_model_buffer(buffer: Vec<u8>) -> Self {
        Self {
            model_asset_buffer: Some(buffer),
            ..Default::default()
        }
    }
}

/// Base options as embedded in a graph node's options payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseOptionsConfig {
    /// Path to the model file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_asset_path: Option<String>,

    /// Base64-encoded model contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_asset_buffer: Option<String>,

    /// Inference delegate
    #[serde(default)]
    pub delegate: Delegate,

    /// Whether the runner receives a continuous stream of inputs
    #[serde(default)]
    pub use_stream_mode: bool,
}

impl BaseOptionsConfig {
    /// Decode the embedded model buffer, if any
    pub fn model_asset_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.model_asset_buffer
            .as_deref()
            .map(|encoded| {
                BASE64
                    .decode(encoded)
                    .map_err(|e| Error::Config(format!("Invalid model asset buffer: {}", e)))
            })
            .transpose()
    }
}

impl From<&BaseOptions> for BaseOptionsConfig {
    fn from(options: &BaseOptions) -> Self {
        Self {
            model_asset_path: options
                .model_asset_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            model_asset_buffer: options.model_asset_buffer.as_ref().map(|b| BASE64.encode(b)),
            delegate: options.delegate,
            use_stream_mode: false,
        }
    }
}

/// Post-processing applied to classification scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Locale for display names from the model metadata
    pub display_names_locale: String,

    /// Maximum number of top-scored categories to return; negative means all
    pub max_results: i32,

    /// Categories scoring below this are dropped
    pub score_threshold: f32,

    /// Only these category names are kept (exclusive with the denylist)
    pub category_allowlist: Vec<String>,

    /// These category names are dropped (exclusive with the allowlist)
    pub category_denylist: Vec<String>,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            display_names_locale: "en".to_string(),
            max_results: -1,
            score_threshold: 0.0,
            category_allowlist: Vec::new(),
            category_denylist: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_defaults() {
        let options = ClassifierOptions::default();
        assert_eq!(options.display_names_locale, "en");
        assert_eq!(options.max_results, -1);
        assert_eq!(options.score_threshold, 0.0);
        assert!(options.category_allowlist.is_empty());
    }

    #[test]
    fn test_partial_classifier_config_uses_defaults() {
        let options: ClassifierOptions = serde_json::from_str(r#"{"max_results": 3}"#).unwrap();
        assert_eq!(options.max_results, 3);
        assert_eq!(options.display_names_locale, "en");
    }

    #[test]
    fn test_base_options_config_copies_fields() {
        let mut options = BaseOptions::from_model_path("/models/mobilenet.tflite");
        options.delegate = Delegate::Gpu;
        let config = BaseOptionsConfig::from(&options);
        assert_eq!(config.model_asset_path.as_deref(), Some("/models/mobilenet.tflite"));
        assert_eq!(config.delegate, Delegate::Gpu);
        assert!(!config.use_stream_mode);
        assert!(config.model_asset_bytes().unwrap().is_none());
    }

    #[test]
    fn test_model_buffer_survives_encoding() {
        let options = BaseOptions::from_model_buffer(vec![0, 1, 2, 254, 255]);
        let config = BaseOptionsConfig::from(&options);
        assert_eq!(config.model_asset_bytes().unwrap(), Some(vec![0, 1, 2, 254, 255]));
    }

    #[test]
    fn test_corrupt_model_buffer() {
        let config = BaseOptionsConfig {
            model_asset_buffer: Some("not base64!".into()),
            ..Default::default()
        };
        assert!(config.model_asset_bytes().is_err());
    }
}
