//! Fluent chain construction

use super::handler::{ChainRequest, Handler};
use super::node::ChainNode;
use crate::context::{ContextMap, SharedContext};
use crate::response::ResponseWriter;

/// Collects handlers in order and links them into a chain
#[derive(Default)]
pub struct ChainBuilder {
    handlers: Vec<Box<dyn Handler>>,
    initial: Option<SharedContext>,
}

impl ChainBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            initial: None,
        }
    }

    /// Append a handler to the chain
    pub fn add<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Append a plain closure to the chain
    pub fn add_fn<F>(self, f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &ChainRequest, &mut ContextMap) + Send + Sync + 'static,
    {
        self.add(f)
    }

    /// Append an already-boxed handler to the chain
    pub fn add_boxed(mut self, handler: Box<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Pre-seed the head node's context map with a shared handle
    pub fn with_context(mut self, initial: SharedContext) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Number of handlers added so far
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler was added
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in insertion order
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Link the handlers into a chain, returning its head by value
    pub fn build(self) -> ChainNode {
        ChainNode::new(self.initial, self.handlers)
    }

    /// Link the handlers into a chain, returning `None` if there are no handlers
    pub fn build_boxed(self) -> Option<Box<ChainNode>> {
        ChainNode::new_boxed(self.initial, self.handlers)
    }
}
