//! Admission control for live-stream graphs
//!
//! A flow limiter sits between the graph inputs and a task node. It admits
//! at most `max_in_flight` input sets at a time, holds up to `max_in_queue`
//! more behind them and drops the rest; the task node's result stream, wired
//! back as `FINISHED`, releases the next admission.

use super::{Graph, NodeHandle};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Node type of the flow limiter
pub const FLOW_LIMITER_NODE_TYPE: &str = "FlowLimiterCalculator";

/// Back-edge tag carrying the completion signal
pub const FLOW_LIMITER_FINISHED_TAG: &str = "FINISHED";

/// Flow limiter options payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLimiterOptions {
    /// Input sets admitted concurrently
    pub max_in_flight: usize,
    /// Input sets waiting behind the in-flight ones; anything beyond is
    /// dropped
    pub max_in_queue: usize,
}

impl Default for FlowLimiterOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            max_in_queue: 0,
        }
    }
}

/// Insert a flow limiter in front of `node`
///
/// Every tag in `input_tags` must already be a graph input; it is rerouted
/// through the limiter as `throttled_<name>` before reaching `node` on the
/// same tag. `finished_tag` must already be declared as an output of `node`.
///
/// The caller must not have wired the graph inputs into `node` itself.
pub fn add_flow_limiter(
    graph: &mut Graph,
    node: NodeHandle,
    input_tags: &[&str],
    finished_tag: &str,
) -> Result<NodeHandle> {
    let finished = graph.output_of(node, finished_tag).ok_or_else(|| {
        Error::InvalidGraph(format!(
            "Node '{}' has no '{}' output to signal completion",
            graph.node(node).id,
            finished_tag
        ))
    })?;

    let limiter = graph.add_node(FLOW_LIMITER_NODE_TYPE);
    graph.set_options(limiter, &FlowLimiterOptions::default())?;

    for tag in input_tags {
        let source = graph.graph_input(tag).ok_or_else(|| {
            Error::InvalidGraph(format!("No graph input with tag '{}' to throttle", tag))
        })?;
        graph.connect(&source, limiter, tag);
        let throttled_name = format!("throttled_{}", source.name());
        let throttled = graph.node_output(limiter, tag, &throttled_name);
        graph.connect(&throttled, node, tag);
    }

    graph.connect_back_edge(&finished, limiter, FLOW_LIMITER_FINISHED_TAG);
    Ok(limiter)
}
