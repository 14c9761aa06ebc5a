//! Graph descriptions handed to a task runner
//!
//! A [`GraphConfig`] lists graph-level input and output streams and the
//! nodes between them. Streams are written as `TAG:name`: the tag names the
//! port on the graph or node, the name identifies the stream globally.
//! Descriptions are plain data (serde) so they can be logged, stored or
//! shipped to an out-of-process runner.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

mod builder;
mod flow_limiter;

pub use builder::{Graph, NodeHandle, Source};
pub use flow_limiter::{
    add_flow_limiter, FlowLimiterOptions, FLOW_LIMITER_FINISHED_TAG, FLOW_LIMITER_NODE_TYPE,
};

/// A `TAG:name` stream reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamRef {
    /// Port tag (may be empty)
    pub tag: String,
    /// Global stream name
    pub name: String,
}

impl StreamRef {
    /// Create a stream reference
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }

    /// Parse `TAG:name` or a bare `name`
    pub fn parse(spec: &str) -> Result<Self> {
        let (tag, name) = match spec.split_once(':') {
            Some((tag, name)) => (tag, name),
            None => ("", spec),
        };
        if name.is_empty() || name.contains(':') {
            return Err(Error::InvalidGraph(format!("Malformed stream spec: '{}'", spec)));
        }
        if !tag.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            return Err(Error::InvalidGraph(format!(
                "Stream tag must be upper case: '{}'",
                spec
            )));
        }
        Ok(Self::new(tag, name))
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.tag, self.name)
        }
    }
}

/// A node in a graph description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node ID within the graph
    pub id: String,

    /// Registered node type (e.g. a subgraph or calculator name)
    pub node_type: String,

    /// Consumed streams, `TAG:name`
    #[serde(default)]
    pub input_streams: Vec<String>,

    /// Produced streams, `TAG:name`
    #[serde(default)]
    pub output_streams: Vec<String>,

    /// Input tags that close a loop (fed by a downstream node)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub back_edges: Vec<String>,

    /// Node-specific options payload
    #[serde(default)]
    pub options: serde_json::Value,
}

impl NodeConfig {
    /// Parsed input streams
    pub fn inputs(&self) -> Result<Vec<StreamRef>> {
        self.input_streams.iter().map(|s| StreamRef::parse(s)).collect()
    }

    /// Parsed output streams
    pub fn outputs(&self) -> Result<Vec<StreamRef>> {
        self.output_streams.iter().map(|s| StreamRef::parse(s)).collect()
    }

    /// Stream consumed on `tag`
    pub fn input_for_tag(&self, tag: &str) -> Result<Option<StreamRef>> {
        Ok(self.inputs()?.into_iter().find(|s| s.tag == tag))
    }

    /// Stream produced on `tag`
    pub fn output_for_tag(&self, tag: &str) -> Result<Option<StreamRef>> {
        Ok(self.outputs()?.into_iter().find(|s| s.tag == tag))
    }

    /// Deserialize the options payload
    pub fn options_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.options.clone()).map_err(|e| {
            Error::InvalidGraph(format!("Invalid options for node '{}': {}", self.id, e))
        })
    }
}

/// Complete graph description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Graph-level inputs, `TAG:name`
    #[serde(default)]
    pub input_streams: Vec<String>,

    /// Graph-level outputs, `TAG:name`
    #[serde(default)]
    pub output_streams: Vec<String>,

    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

impl GraphConfig {
    /// Parse a JSON graph description
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidGraph(format!("Failed to parse graph: {}", e)))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed graph inputs
    pub fn inputs(&self) -> Result<Vec<StreamRef>> {
        self.input_streams.iter().map(|s| StreamRef::parse(s)).collect()
    }

    /// Parsed graph outputs
    pub fn outputs(&self) -> Result<Vec<StreamRef>> {
        self.output_streams.iter().map(|s| StreamRef::parse(s)).collect()
    }

    /// Whether any node has the given type
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.nodes.iter().any(|n| n.node_type == node_type)
    }

    /// Number of nodes with the given type
    pub fn count_node_type(&self, node_type: &str) -> usize {
        self.nodes.iter().filter(|n| n.node_type == node_type).count()
    }

    /// First node with the given type
    pub fn node_by_type(&self, node_type: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.node_type == node_type)
    }

    /// Node with the given ID
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// ID of the node producing `stream`, or `None` for graph inputs and
    /// unknown streams
    pub fn producer_of(&self, stream: &str) -> Result<Option<&NodeConfig>> {
        for node in &self.nodes {
            if node.outputs()?.iter().any(|s| s.name == stream) {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Validate the description for structural correctness
    ///
    /// Checks that node IDs are unique, every stream has exactly one
    /// producer, every consumed stream and graph output is produced, and
    /// back edges name existing input tags.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidGraph(
                "Graph must contain at least one node".to_string(),
            ));
        }

        let mut seen_ids = HashSet::new();
        for node in &self.nodes {
            if !seen_ids.insert(node.id.as_str()) {
                return Err(Error::InvalidGraph(format!("Duplicate node ID: {}", node.id)));
            }
        }

        // stream name -> producer description
        let mut producers: HashMap<String, String> = HashMap::new();
        for input in self.inputs()? {
            if producers.insert(input.name.clone(), "graph input".into()).is_some() {
                return Err(Error::InvalidGraph(format!(
                    "Stream '{}' is declared twice as a graph input",
                    input.name
                )));
            }
        }
        for node in &self.nodes {
            for output in node.outputs()? {
                if let Some(previous) = producers.insert(output.name.clone(), node.id.clone()) {
                    return Err(Error::InvalidGraph(format!(
                        "Stream '{}' is produced by both '{}' and '{}'",
                        output.name, previous, node.id
                    )));
                }
            }
        }

        for node in &self.nodes {
            let inputs = node.inputs()?;
            for input in &inputs {
                if !producers.contains_key(&input.name) {
                    return Err(Error::InvalidGraph(format!(
                        "Node '{}' consumes unknown stream '{}'",
                        node.id, input.name
                    )));
                }
            }
            for tag in &node.back_edges {
                if !inputs.iter().any(|s| &s.tag == tag) {
                    return Err(Error::InvalidGraph(format!(
                        "Node '{}' marks back edge on missing input tag '{}'",
                        node.id, tag
                    )));
                }
            }
        }

        for output in self.outputs()? {
            if !producers.contains_key(&output.name) {
                return Err(Error::InvalidGraph(format!(
                    "Graph output '{}' is not produced by any node",
                    output
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough_graph() -> GraphConfig {
        GraphConfig {
            input_streams: vec!["IN:in".into()],
            output_streams: vec!["OUT:out".into()],
            nodes: vec![NodeConfig {
                id: "pass".into(),
                node_type: "PassThrough".into(),
                input_streams: vec!["IN:in".into()],
                output_streams: vec!["OUT:out".into()],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_stream_ref_parse() {
        assert_eq!(StreamRef::parse("IMAGE:image_in").unwrap(), StreamRef::new("IMAGE", "image_in"));
        assert_eq!(StreamRef::parse("image_in").unwrap(), StreamRef::new("", "image_in"));
        assert!(StreamRef::parse("IMAGE:").is_err());
        assert!(StreamRef::parse("image:x").is_err());
        assert_eq!(StreamRef::new("NORM_RECT", "r").to_string(), "NORM_RECT:r");
    }

    #[test]
    fn test_validate_ok() {
        passthrough_graph().validate().unwrap();
    }

    #[test]
    fn test_validate_empty_nodes() {
        assert!(GraphConfig::default().validate().is_err());
    }

    #[test]
    fn test_validate_unknown_input() {
        let mut graph = passthrough_graph();
        graph.nodes[0].input_streams = vec!["IN:missing".into()];
        let err = graph.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_duplicate_producer() {
        let mut graph = passthrough_graph();
        let mut second = graph.nodes[0].clone();
        second.id = "pass2".into();
        graph.nodes.push(second);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_unproduced_output() {
        let mut graph = passthrough_graph();
        graph.output_streams.push("EXTRA:extra".into());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_bad_back_edge() {
        let mut graph = passthrough_graph();
        graph.nodes[0].back_edges = vec!["FINISHED".into()];
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_and_lookup() {
        let graph = passthrough_graph();
        let parsed = GraphConfig::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(parsed, graph);
        assert!(parsed.has_node_type("PassThrough"));
        assert_eq!(parsed.producer_of("out").unwrap().unwrap().id, "pass");
        assert!(parsed.producer_of("in").unwrap().is_none());
    }
}
