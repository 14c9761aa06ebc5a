//! Shared test backends
//!
//! - [`MockRunnerFactory`]: records every submission and answers with a
//!   canned classification; exposes the registered callback so tests can
//!   inject arbitrary output sets
//! - [`local_factory`]: the in-process runner with a fake classification
//!   node, for end-to-end runs

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vision_tasks_core::graph::GraphConfig;
use vision_tasks_core::runner::{
    GraphNode, LocalRunnerFactory, NodeFactory, NodeRegistry, PacketsCallback, TaskRunner,
    TaskRunnerFactory,
};
use vision_tasks_core::{Error, Image, ImageFormat, Packet, PacketMap, Result, Timestamp};
use vision_tasks_image_classifier::graph::{
    CLASSIFICATION_RESULT_STREAM_NAME, CLASSIFICATION_RESULT_TAG, IMAGE_IN_STREAM_NAME,
    IMAGE_OUT_STREAM_NAME, IMAGE_TAG, NORM_RECT_TAG, SUBGRAPH_TYPE_NAME,
};
use vision_tasks_image_classifier::options::ImageClassifierGraphOptions;
use vision_tasks_image_classifier::{Category, ClassificationResult, Classifications};

/// Small RGB test frame
pub fn cpu_image(width: u32, height: u32) -> Image {
    let len = ImageFormat::Srgb.buffer_size(width, height);
    Image::from_pixels(ImageFormat::Srgb, width, height, vec![128u8; len]).unwrap()
}

pub fn gpu_image() -> Image {
    Image::from_gpu_texture(42, 640, 480)
}

/// Result the mock backend returns for a frame at `timestamp_ms`
pub fn canned_result(timestamp_ms: i64) -> ClassificationResult {
    ClassificationResult {
        classifications: vec![Classifications {
            categories: vec![Category {
                index: 281,
                score: 0.87,
                category_name: Some("tabby".to_string()),
                display_name: None,
            }],
            head_index: 0,
            head_name: None,
        }],
        timestamp_ms: Some(timestamp_ms),
    }
}

/// Output set as the classification graph would produce it
pub fn output_set(image: Option<Image>, timestamp: Timestamp) -> PacketMap {
    let mut outputs = PacketMap::new();
    outputs.insert(
        CLASSIFICATION_RESULT_STREAM_NAME.to_string(),
        Packet::new(canned_result(timestamp.to_millis())).at(timestamp),
    );
    let image = image.map_or_else(Packet::empty, Packet::new);
    outputs.insert(IMAGE_OUT_STREAM_NAME.to_string(), image.at(timestamp));
    outputs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Process,
    Send,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: SubmissionKind,
    pub packets: PacketMap,
}

#[derive(Default)]
struct MockState {
    config: Option<GraphConfig>,
    callback: Option<PacketsCallback>,
    submissions: Vec<Submission>,
    next_implicit: i64,
    fail_next: Option<String>,
    closed: bool,
}

/// Recording backend
#[derive(Clone, Default)]
pub struct MockRunnerFactory {
    state: Arc<Mutex<MockState>>,
    reject_with: Option<String>,
}

impl MockRunnerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose runner creation always fails
    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Graph handed to the most recent runner
    pub fn config(&self) -> Option<GraphConfig> {
        self.state.lock().config.clone()
    }

    /// Callback registered by the most recent runner
    pub fn callback(&self) -> Option<PacketsCallback> {
        self.state.lock().callback.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Make the next submission fail with a backend error
    pub fn fail_next(&self, message: &str) {
        self.state.lock().fail_next = Some(message.to_string());
    }
}

#[async_trait]
impl TaskRunnerFactory for MockRunnerFactory {
    async fn create_runner(
        &self,
        config: GraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn TaskRunner>> {
        if let Some(message) = &self.reject_with {
            return Err(Error::Backend(message.clone()));
        }
        let mut state = self.state.lock();
        state.config = Some(config);
        state.callback = callback;
        Ok(Box::new(MockRunner {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    fn respond(&self, kind: SubmissionKind, packets: PacketMap) -> Result<PacketMap> {
        let mut state = self.state.lock();
        state.submissions.push(Submission {
            kind,
            packets: packets.clone(),
        });
        if let Some(message) = state.fail_next.take() {
            return Err(Error::Backend(message));
        }

        let image = packets
            .get(IMAGE_IN_STREAM_NAME)
            .ok_or_else(|| Error::Backend("missing image_in".to_string()))?;
        let timestamp = if image.timestamp().is_set() {
            image.timestamp()
        } else {
            let ts = Timestamp::new(state.next_implicit);
            state.next_implicit += 1;
            ts
        };
        Ok(output_set(Some(image.get::<Image>()?.clone()), timestamp))
    }
}

#[async_trait]
impl TaskRunner for MockRunner {
    async fn process(&self, packets: PacketMap) -> Result<PacketMap> {
        self.respond(SubmissionKind::Process, packets)
    }

    fn send(&self, packets: PacketMap) -> Result<()> {
        let outputs = self.respond(SubmissionKind::Send, packets);
        let callback = self.state.lock().callback.clone();
        if let Some(callback) = callback {
            callback(outputs);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

/// Classification node that reports the frame width as the class index
struct FakeClassifierNode {
    options: ImageClassifierGraphOptions,
    delay: Duration,
}

#[async_trait]
impl GraphNode for FakeClassifierNode {
    fn node_type(&self) -> &str {
        SUBGRAPH_TYPE_NAME
    }

    async fn process(&self, inputs: HashMap<String, Packet>) -> Result<HashMap<String, Packet>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let image_packet = inputs
            .get(IMAGE_TAG)
            .ok_or_else(|| Error::Backend("IMAGE input missing".to_string()))?;
        if !inputs.contains_key(NORM_RECT_TAG) {
            return Err(Error::Backend("NORM_RECT input missing".to_string()));
        }
        let image = image_packet.get::<Image>()?;

        let result = ClassificationResult {
            classifications: vec![Classifications {
                categories: vec![Category {
                    index: image.width() as i32,
                    score: 1.0,
                    category_name: None,
                    display_name: Some(self.options.classifier_options.display_names_locale.clone()),
                }],
                head_index: 0,
                head_name: None,
            }],
            timestamp_ms: Some(image_packet.timestamp().to_millis()),
        };

        let mut outputs = HashMap::new();
        outputs.insert(CLASSIFICATION_RESULT_TAG.to_string(), Packet::new(result));
        outputs.insert(IMAGE_TAG.to_string(), image_packet.clone());
        Ok(outputs)
    }
}

struct FakeClassifierFactory {
    delay: Duration,
}

impl NodeFactory for FakeClassifierFactory {
    fn node_type(&self) -> &str {
        SUBGRAPH_TYPE_NAME
    }

    fn create(&self, options: &Value) -> Result<Box<dyn GraphNode>> {
        let options: ImageClassifierGraphOptions = serde_json::from_value(options.clone())?;
        if options.base_options.model_asset_path.is_none()
            && options.base_options.model_asset_buffer.is_none()
        {
            return Err(Error::Construction("No model asset provided".to_string()));
        }
        Ok(Box::new(FakeClassifierNode {
            options,
            delay: self.delay,
        }))
    }
}

/// In-process runner factory executing the fake classification node
pub fn local_factory(delay: Duration) -> LocalRunnerFactory {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(FakeClassifierFactory { delay }));
    LocalRunnerFactory::new(Arc::new(registry))
}
