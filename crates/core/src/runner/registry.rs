//! Node registry for the local runner
//!
//! The registry maps node type names to factories. The local runner looks
//! up every task node of a graph here when it starts; unknown types fail
//! runner construction.

use crate::packet::Packet;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A node the local runner can execute
///
/// Inputs and outputs are keyed by port tag. The runner stamps outputs with
/// the input timestamp when the node leaves them unset.
#[async_trait]
pub trait GraphNode: Send + Sync {
    /// Get the node type name
    fn node_type(&self) -> &str;

    /// Process one input set
    async fn process(&self, inputs: HashMap<String, Packet>) -> Result<HashMap<String, Packet>>;
}

/// Factory trait for creating graph nodes
pub trait NodeFactory: Send + Sync {
    /// Get the node type name
    fn node_type(&self) -> &str;

    /// Create a node from its options payload
    fn create(&self, options: &Value) -> Result<Box<dyn GraphNode>>;
}

/// Node registry for managing node factories
#[derive(Default, Clone)]
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one for the same type
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type().to_string();
        if self.factories.insert(node_type.clone(), factory).is_some() {
            tracing::warn!("Replacing registered factory for node type {}", node_type);
        }
    }

    /// Create a node of the given type
    pub fn create_node(&self, node_type: &str, options: &Value) -> Result<Box<dyn GraphNode>> {
        let factory = self.factories.get(node_type).ok_or_else(|| {
            Error::Construction(format!(
                "No implementation available for node type: {}",
                node_type
            ))
        })?;
        factory.create(options)
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// List all registered node types
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("node_types", &self.list_node_types())
            .finish()
    }
}
