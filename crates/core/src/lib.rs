//! Vision Tasks Core - shared plumbing for running-mode vision tasks
//!
//! This crate provides everything a vision task needs to talk to a graph
//! execution backend without knowing how that backend schedules work.
//!
//! # Architecture
//!
//! - [`packet`]: timestamped, type-erased packets and stream maps
//! - [`graph`]: serializable graph descriptions, a builder and flow-limiter
//!   insertion
//! - [`runner`]: the `TaskRunner` backend interface plus an in-process
//!   reference runner driven by a node registry
//! - [`vision_task`]: running-mode dispatch (`VisionTaskApi`)
//! - [`image`], [`rect`], [`options`], [`running_mode`]: the value types
//!   tasks accept from callers
//!
//! ```text
//! Task → VisionTaskApi → TaskRunner → graph nodes
//!   ↑                        │
//!   └──── PacketsCallback ◄──┘   (live stream)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vision_tasks_core::runner::{LocalRunnerFactory, NodeRegistry};
//! use vision_tasks_core::vision_task::VisionTaskApi;
//!
//! let factory = LocalRunnerFactory::new(Arc::new(registry));
//! let task = VisionTaskApi::create(&factory, graph, RunningMode::Image, None).await?;
//! let outputs = task.process_image_data(packets).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod image;
pub mod options;
pub mod packet;
pub mod rect;
pub mod runner;
pub mod running_mode;
pub mod vision_task;

// Error types
mod error;
pub use error::{Error, Result, TaskErrorCode};

pub use image::{Image, ImageFormat};
pub use packet::{Packet, PacketMap, Timestamp};
pub use rect::NormalizedRect;
pub use running_mode::RunningMode;

/// Initialize logging for binaries and tests embedding vision tasks
///
/// Installs a `tracing` fmt subscriber honouring `RUST_LOG` (default
/// `info`). Safe to call more than once; later calls are no-ops.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Vision Tasks Core initialized");
    }
    Ok(())
}
