//! Image classifier options and their graph representation
//!
//! [`ImageClassifierOptions`] is what callers configure (in code or from a
//! TOML/YAML/JSON file). [`ImageClassifierGraphOptions`] is the payload the
//! classification graph node receives; [`convert_options`] maps one to the
//! other.

use crate::result::ClassifierOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use vision_tasks_core::config::{self, ConfigFormat};
use vision_tasks_core::options::{BaseOptions, BaseOptionsConfig, ClassifierOptions};
use vision_tasks_core::{Result, RunningMode};

/// Live-stream result sink
///
/// Invoked once per classified frame, or with the error when the runner
/// fails a frame. Runs on the runner's delivery task, so it should return
/// quickly.
pub type ResultCallback = Arc<dyn Fn(Result<ClassifierOutput>) + Send + Sync>;

/// Options for creating an image classifier
///
/// # Example
///
/// ```
/// use vision_tasks_image_classifier::ImageClassifierOptions;
/// use vision_tasks_core::RunningMode;
///
/// let options = ImageClassifierOptions::from_toml_str(r#"
///     running_mode = "video"
///
///     [base_options]
///     model_asset_path = "/models/mobilenet_v2.tflite"
///
///     [classifier_options]
///     max_results = 3
/// "#).unwrap();
/// assert_eq!(options.running_mode, RunningMode::Video);
/// assert_eq!(options.classifier_options.max_results, 3);
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ImageClassifierOptions {
    /// Model location and delegate
    #[serde(default)]
    pub base_options: BaseOptions,

    /// Running mode, fixed for the classifier's lifetime
    #[serde(default)]
    pub running_mode: RunningMode,

    /// Score post-processing
    #[serde(default)]
    pub classifier_options: ClassifierOptions,

    /// Required in live-stream mode, forbidden otherwise
    #[serde(skip)]
    pub result_callback: Option<ResultCallback>,
}

impl ImageClassifierOptions {
    /// Options for a model file in the given mode
    pub fn new(model_asset_path: impl AsRef<Path>, running_mode: RunningMode) -> Self {
        Self {
            base_options: BaseOptions::from_model_path(model_asset_path.as_ref()),
            running_mode,
            ..Default::default()
        }
    }

    /// Load options from a `.toml`, `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        config::load_file(path)
    }

    /// Parse TOML options
    pub fn from_toml_str(text: &str) -> Result<Self> {
        config::parse_str(text, ConfigFormat::Toml)
    }

    /// Parse YAML options
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        config::parse_str(text, ConfigFormat::Yaml)
    }

    /// Parse JSON options
    pub fn from_json_str(text: &str) -> Result<Self> {
        config::parse_str(text, ConfigFormat::Json)
    }

    /// Builder pattern: set running mode
    pub fn with_running_mode(mut self, running_mode: RunningMode) -> Self {
        self.running_mode = running_mode;
        self
    }

    /// Builder pattern: set classifier options
    pub fn with_classifier_options(mut self, classifier_options: ClassifierOptions) -> Self {
        self.classifier_options = classifier_options;
        self
    }

    /// Builder pattern: register the live-stream result callback
    pub fn with_result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Result<ClassifierOutput>) + Send + Sync + 'static,
    {
        self.result_callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ImageClassifierOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageClassifierOptions")
            .field("base_options", &self.base_options)
            .field("running_mode", &self.running_mode)
            .field("classifier_options", &self.classifier_options)
            .field("result_callback", &self.result_callback.is_some())
            .finish()
    }
}

/// Options payload of the classification graph node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageClassifierGraphOptions {
    /// Base options with the derived stream-mode flag
    pub base_options: BaseOptionsConfig,
    /// Classifier options, copied verbatim
    pub classifier_options: ClassifierOptions,
}

/// Convert user-facing options into the graph node payload
///
/// Everything is copied as-is except `use_stream_mode`, which is set
/// whenever the running mode is not image mode.
pub fn convert_options(options: &ImageClassifierOptions) -> ImageClassifierGraphOptions {
    let mut base_options = BaseOptionsConfig::from(&options.base_options);
    base_options.use_stream_mode = options.running_mode.is_streaming();
    ImageClassifierGraphOptions {
        base_options,
        classifier_options: options.classifier_options.clone(),
    }
}
