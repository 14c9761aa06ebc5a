//! Image classifier task
//!
//! [`ImageClassifier`] builds the classification graph, starts a runner for
//! it and exposes one call per running mode:
//!
//! | Mode        | Call                                      | Result delivery     |
//! |-------------|-------------------------------------------|---------------------|
//! | Image       | [`classify`](ImageClassifier::classify)   | returned            |
//! | Video       | [`classify_for_video`](ImageClassifier::classify_for_video) | returned |
//! | Live stream | [`classify_async`](ImageClassifier::classify_async) | result callback |
//!
//! Calling a method outside its mode fails with `Error::ModeViolation`.

use crate::graph::create_graph_config;
use crate::options::ImageClassifierOptions;
use crate::request::{build_packets, ensure_cpu_image};
use crate::response::{extract_result, live_stream_callback};
use crate::result::ClassificationResult;
use parking_lot::RwLock;
use std::sync::Arc;
use vision_tasks_core::graph::GraphConfig;
use vision_tasks_core::runner::TaskRunnerFactory;
use vision_tasks_core::vision_task::VisionTaskApi;
use vision_tasks_core::{Error, Image, NormalizedRect, Result, RunningMode, Timestamp};

/// Classifies images with a model run by a task runner
///
/// # Example
///
/// ```ignore
/// let options = ImageClassifierOptions::new("mobilenet_v2.tflite", RunningMode::Image);
/// let classifier = ImageClassifier::create(options, &factory).await?;
/// let result = classifier.classify(&image, None).await?;
/// println!("{:?}", result.top_category());
/// classifier.close().await?;
/// ```
pub struct ImageClassifier {
    task: VisionTaskApi,
    alive: Arc<RwLock<bool>>,
}

impl ImageClassifier {
    /// Create a classifier
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - live-stream mode without a result
    ///   callback, or a callback in image/video mode
    /// * `Error::Construction` - the runner rejected the graph or model
    pub async fn create(
        options: ImageClassifierOptions,
        factory: &dyn TaskRunnerFactory,
    ) -> Result<Self> {
        let running_mode = options.running_mode;
        let graph_config = create_graph_config(&options, running_mode == RunningMode::LiveStream)
            .map_err(Error::into_construction)?;

        let alive = Arc::new(RwLock::new(true));
        let packets_callback = options
            .result_callback
            .clone()
            .map(|callback| live_stream_callback(callback, Arc::clone(&alive)));

        let task = VisionTaskApi::create(factory, graph_config, running_mode, packets_callback).await?;
        tracing::debug!("Image classifier ready in {} mode", running_mode);
        Ok(Self { task, alive })
    }

    /// Classify a single image (image mode)
    ///
    /// `roi` defaults to the whole image.
    ///
    /// # Errors
    ///
    /// * `Error::UnsupportedInput` - GPU-backed image
    /// * `Error::ModeViolation` - classifier is not in image mode
    /// * `Error::Backend` - the runner failed
    pub async fn classify(
        &self,
        image: &Image,
        roi: Option<NormalizedRect>,
    ) -> Result<ClassificationResult> {
        ensure_cpu_image(image)?;
        let packets = build_packets(image, roi, None);
        let outputs = self.task.process_image_data(packets).await?;
        extract_result(&outputs)
    }

    /// Classify one video frame (video mode)
    ///
    /// Timestamps must increase strictly across calls.
    ///
    /// # Errors
    ///
    /// * `Error::UnsupportedInput` - GPU-backed image, or a timestamp with no
    ///   tick representation
    /// * `Error::ModeViolation` - classifier is not in video mode
    /// * `Error::Backend` - the runner failed or the timestamp did not increase
    pub async fn classify_for_video(
        &self,
        image: &Image,
        timestamp_ms: i64,
        roi: Option<NormalizedRect>,
    ) -> Result<ClassificationResult> {
        ensure_cpu_image(image)?;
        let timestamp = Timestamp::from_millis(timestamp_ms)?;
        let packets = build_packets(image, roi, Some(timestamp));
        let outputs = self.task.process_video_data(packets).await?;
        extract_result(&outputs)
    }

    /// Submit one live-stream frame (live-stream mode)
    ///
    /// Returns once the frame is accepted; its result reaches the callback
    /// given at creation. Frames may be dropped while the classifier is busy,
    /// in which case the callback is not invoked for them.
    ///
    /// # Errors
    ///
    /// * `Error::UnsupportedInput` - GPU-backed image, or a timestamp with no
    ///   tick representation
    /// * `Error::ModeViolation` - classifier is not in live-stream mode
    /// * `Error::Backend` - the timestamp did not increase or the runner no
    ///   longer accepts input
    pub fn classify_async(
        &self,
        image: &Image,
        timestamp_ms: i64,
        roi: Option<NormalizedRect>,
    ) -> Result<()> {
        ensure_cpu_image(image)?;
        let timestamp = Timestamp::from_millis(timestamp_ms)?;
        let packets = build_packets(image, roi, Some(timestamp));
        self.task.send_live_stream_data(packets)
    }

    /// Drain pending work and release the runner
    ///
    /// Results for frames already accepted are still delivered while this
    /// runs; none are delivered after it returns.
    pub async fn close(&self) -> Result<()> {
        let result = self.task.close().await;
        *self.alive.write() = false;
        result
    }

    /// Mode the classifier was created with
    pub fn running_mode(&self) -> RunningMode {
        self.task.running_mode()
    }

    /// Graph handed to the runner
    pub fn graph_config(&self) -> &GraphConfig {
        self.task.graph_config()
    }
}

impl Drop for ImageClassifier {
    /// Waits for a result callback that is already running, then stops the
    /// runner without draining it.
    fn drop(&mut self) {
        *self.alive.write() = false;
    }
}

impl std::fmt::Debug for ImageClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClassifier")
            .field("task", &self.task)
            .field("alive", &*self.alive.read())
            .finish()
    }
}
