//! Programmatic construction of graph descriptions

use super::{GraphConfig, NodeConfig, StreamRef};
use crate::Result;
use serde::Serialize;

/// A named stream that can be wired into node inputs or graph outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    name: String,
}

impl Source {
    /// Global stream name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to a node added to a [`Graph`]
///
/// Only valid for the graph that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

/// Builder for [`GraphConfig`]
///
/// ```
/// use vision_tasks_core::graph::Graph;
///
/// let mut graph = Graph::new();
/// let input = graph.input("IN", "in");
/// let node = graph.add_node("PassThrough");
/// graph.connect(&input, node, "IN");
/// let out = graph.node_output(node, "OUT", "out");
/// graph.output(&out, "OUT");
/// let config = graph.into_config();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct Graph {
    inputs: Vec<StreamRef>,
    outputs: Vec<StreamRef>,
    nodes: Vec<NodeConfig>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a graph input, returning the existing one if `tag` is taken
    pub fn input(&mut self, tag: &str, name: &str) -> Source {
        if let Some(existing) = self.graph_input(tag) {
            return existing;
        }
        self.inputs.push(StreamRef::new(tag, name));
        Source { name: name.to_string() }
    }

    /// Graph input declared under `tag`
    pub fn graph_input(&self, tag: &str) -> Option<Source> {
        self.inputs.iter().find(|s| s.tag == tag).map(|s| Source {
            name: s.name.clone(),
        })
    }

    /// Add a node of the given type
    ///
    /// Node IDs are derived from the last segment of the type name plus the
    /// insertion index, which keeps them unique.
    pub fn add_node(&mut self, node_type: &str) -> NodeHandle {
        let index = self.nodes.len();
        let short = node_type.rsplit('.').next().unwrap_or(node_type);
        self.nodes.push(NodeConfig {
            id: format!("{}_{}", short, index),
            node_type: node_type.to_string(),
            ..Default::default()
        });
        NodeHandle(index)
    }

    /// Serialize `options` into the node's options payload
    pub fn set_options<T: Serialize>(&mut self, node: NodeHandle, options: &T) -> Result<()> {
        self.nodes[node.0].options = serde_json::to_value(options)?;
        Ok(())
    }

    /// Declare an output port on a node, producing stream `name`
    pub fn node_output(&mut self, node: NodeHandle, tag: &str, name: &str) -> Source {
        if let Some(existing) = self.output_of(node, tag) {
            return existing;
        }
        self.nodes[node.0]
            .output_streams
            .push(StreamRef::new(tag, name).to_string());
        Source { name: name.to_string() }
    }

    /// Stream produced by `node` on `tag`
    pub fn output_of(&self, node: NodeHandle, tag: &str) -> Option<Source> {
        self.nodes[node.0]
            .output_streams
            .iter()
            .filter_map(|s| StreamRef::parse(s).ok())
            .find(|s| s.tag == tag)
            .map(|s| Source { name: s.name })
    }

    /// Feed `source` into `node` on input `tag`
    pub fn connect(&mut self, source: &Source, node: NodeHandle, tag: &str) {
        self.nodes[node.0]
            .input_streams
            .push(StreamRef::new(tag, source.name.as_str()).to_string());
    }

    /// Feed `source` into `node` on `tag`, marking the input as a back edge
    pub fn connect_back_edge(&mut self, source: &Source, node: NodeHandle, tag: &str) {
        self.connect(source, node, tag);
        self.nodes[node.0].back_edges.push(tag.to_string());
    }

    /// Expose `source` as a graph output under `tag`
    pub fn output(&mut self, source: &Source, tag: &str) {
        self.outputs.push(StreamRef::new(tag, source.name.as_str()));
    }

    /// Node description behind a handle
    pub fn node(&self, node: NodeHandle) -> &NodeConfig {
        &self.nodes[node.0]
    }

    /// Finish building
    pub fn into_config(self) -> GraphConfig {
        GraphConfig {
            input_streams: self.inputs.iter().map(ToString::to_string).collect(),
            output_streams: self.outputs.iter().map(ToString::to_string).collect(),
            nodes: self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_unique() {
        let mut graph = Graph::new();
        let a = graph.add_node("pkg.Detector");
        let b = graph.add_node("pkg.Detector");
        assert_eq!(graph.node(a).id, "Detector_0");
        assert_eq!(graph.node(b).id, "Detector_1");
    }

    #[test]
    fn test_input_declared_once_per_tag() {
        let mut graph = Graph::new();
        let first = graph.input("IMAGE", "image_in");
        let second = graph.input("IMAGE", "other");
        assert_eq!(first, second);
        assert_eq!(graph.into_config().input_streams, vec!["IMAGE:image_in"]);
    }

    #[test]
    fn test_wiring_and_options() {
        #[derive(Serialize)]
        struct Opts {
            threshold: f32,
        }

        let mut graph = Graph::new();
        let input = graph.input("IN", "in");
        let node = graph.add_node("Scale");
        graph.connect(&input, node, "IN");
        graph.set_options(node, &Opts { threshold: 0.5 }).unwrap();
        let out = graph.node_output(node, "OUT", "out");
        assert_eq!(graph.output_of(node, "OUT"), Some(out.clone()));
        graph.output(&out, "OUT");

        let config = graph.into_config();
        config.validate().unwrap();
        assert_eq!(config.nodes[0].input_streams, vec!["IN:in"]);
        assert_eq!(config.nodes[0].options["threshold"], 0.5);
        assert_eq!(config.output_streams, vec!["OUT:out"]);
    }
}
