//! Classification result containers
//!
//! These are produced by the classification graph node and relayed to
//! callers untouched.

use serde::{Deserialize, Serialize};
use vision_tasks_core::Image;

/// A single scored class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Index of the class in the model's label map
    pub index: i32,
    /// Confidence score
    pub score: f32,
    /// Label from the model metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Localized display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Categories predicted by one classification head
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classifications {
    /// Categories sorted by descending score
    pub categories: Vec<Category>,
    /// Index of the head in the model
    pub head_index: i32,
    /// Name of the head, when the model metadata provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_name: Option<String>,
}

/// Output of the image classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// One entry per classification head
    pub classifications: Vec<Classifications>,
    /// Timestamp of the classified frame, when the graph sets one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl ClassificationResult {
    /// Highest-scoring category across all heads
    pub fn top_category(&self) -> Option<&Category> {
        self.classifications
            .iter()
            .flat_map(|c| c.categories.iter())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// What a live-stream callback receives for one classified frame
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    /// Classification of the frame
    pub result: ClassificationResult,
    /// The frame as echoed back by the graph
    pub image: Image,
    /// Frame timestamp in milliseconds
    pub timestamp_ms: i64,
}
