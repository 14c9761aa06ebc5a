//! Task runner abstraction
//!
//! A task runner executes a [`GraphConfig`] over timestamped packets. Vision
//! tasks know nothing about how a runner schedules nodes; they only build
//! the graph, hand packets in and read packets out.
//!
//! # Execution modes
//!
//! - **Synchronous**: [`TaskRunner::process`] resolves with the output
//!   packets for one input set. Used when no callback is registered.
//! - **Streaming**: [`TaskRunner::send`] enqueues an input set and returns;
//!   outputs (or errors) are delivered to the [`PacketsCallback`] given at
//!   creation, on a thread owned by the runner.
//!
//! # Example
//!
//! ```ignore
//! use vision_tasks_core::runner::{LocalRunnerFactory, NodeRegistry, TaskRunnerFactory};
//!
//! let factory = LocalRunnerFactory::new(Arc::new(registry));
//! let runner = factory.create_runner(graph_config, None).await?;
//! let outputs = runner.process(packets).await?;
//! runner.close().await?;
//! ```

use crate::graph::GraphConfig;
use crate::packet::PacketMap;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

mod local;
mod registry;

pub use local::{LocalRunnerFactory, LocalTaskRunner};
pub use registry::{GraphNode, NodeFactory, NodeRegistry};

/// Receives streaming outputs (or the failure for one submission)
pub type PacketsCallback = Arc<dyn Fn(Result<PacketMap>) + Send + Sync>;

/// A live graph instance
///
/// # Thread Safety
///
/// Implementations must be Send + Sync; callers serialize `process` calls
/// per instance.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run one input set through the graph and return its outputs
    ///
    /// Only legal when the runner was created without a callback.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidUsage` - runner is streaming or closed
    /// * `Error::Backend` - a node failed or timestamps are out of order
    async fn process(&self, packets: PacketMap) -> Result<PacketMap>;

    /// Enqueue one input set; outputs arrive via the callback
    ///
    /// Only legal when the runner was created with a callback. Returns as
    /// soon as the packets are accepted.
    fn send(&self, packets: PacketMap) -> Result<()>;

    /// Finish in-flight work and release the graph
    ///
    /// Once this returns the callback is never invoked again.
    async fn close(&self) -> Result<()>;
}

/// Creates runners from graph descriptions
#[async_trait]
pub trait TaskRunnerFactory: Send + Sync {
    /// Start a runner for `config`
    ///
    /// # Errors
    ///
    /// * `Error::Construction` - the graph or a node's options were rejected
    async fn create_runner(
        &self,
        config: GraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn TaskRunner>>;
}
