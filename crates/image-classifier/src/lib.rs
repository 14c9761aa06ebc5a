//! Image classifier task
//!
//! Classifies CPU images in one of three running modes on top of any
//! [`TaskRunnerFactory`](vision_tasks_core::runner::TaskRunnerFactory):
//! single images, timestamped video frames, or a live stream whose results
//! arrive through a callback.
//!
//! # Example
//!
//! ```ignore
//! use vision_tasks_image_classifier::{ImageClassifier, ImageClassifierOptions};
//!
//! let options = ImageClassifierOptions::from_file("classifier.toml")?
//!     .with_result_callback(|result| match result {
//!         Ok(output) => println!("{} ms: {:?}", output.timestamp_ms, output.result.top_category()),
//!         Err(e) => eprintln!("classification failed: {}", e),
//!     });
//! let classifier = ImageClassifier::create(options, &factory).await?;
//! classifier.classify_async(&frame, 100, None)?;
//! ```

pub mod classifier;
pub mod graph;
pub mod options;
pub mod request;
pub mod response;
pub mod result;

pub use classifier::ImageClassifier;
pub use options::{ImageClassifierOptions, ResultCallback};
pub use result::{Category, ClassificationResult, Classifications, ClassifierOutput};
