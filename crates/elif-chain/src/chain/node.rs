//! Chain nodes: construction and dispatch
//!
//! A chain is a singly linked list of nodes, each owning the next. Dispatch
//! walks it with one context map per traversal: a node runs its handler, then
//! hands the same map to the next node only if the continuation flag holds
//! the boolean `true`.

use std::fmt;
use std::sync::PoisonError;

use tracing::{debug, trace};

use super::handler::{ChainRequest, Handler};
use crate::context::{ContextMap, SharedContext};
use crate::response::ResponseWriter;

/// Outcome of running a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Control passes to the next node
    Continued,
    /// The traversal ends at this node
    Stopped,
}

/// One position of a chain
#[derive(Default)]
pub struct ChainNode {
    handler: Option<Box<dyn Handler>>,
    next: Option<Box<ChainNode>>,
    context: Option<SharedContext>,
}

impl ChainNode {
    /// Build a chain from handlers, returning its head by value
    ///
    /// `initial` pre-seeds the head node's context map; the handle is kept, so
    /// every request served by this chain, and any other chain built from the
    /// same handle, works on that one map. With no handlers the
    /// result is an empty node: no handler, no next node, no map. Handling a
    /// request with it does nothing.
    pub fn new<I>(initial: Option<SharedContext>, handlers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Handler>>,
    {
        match Self::new_boxed(initial, handlers) {
            Some(head) => *head,
            None => Self::default(),
        }
    }

    /// Build a chain from handlers, returning a boxed head or `None` if there are no handlers
    pub fn new_boxed<I>(initial: Option<SharedContext>, handlers: I) -> Option<Box<Self>>
    where
        I: IntoIterator<Item = Box<dyn Handler>>,
    {
        let handlers: Vec<Box<dyn Handler>> = handlers.into_iter().collect();

        let mut next: Option<Box<ChainNode>> = None;
        for handler in handlers.into_iter().rev() {
            next = Some(Box::new(ChainNode {
                handler: Some(handler),
                next,
                context: None,
            }));
        }

        let mut head = next?;
        head.context = initial;
        Some(head)
    }

    /// Handle one request
    ///
    /// Runs the chain from this node on the pre-seeded map, locked for the
    /// whole traversal, or on a fresh map created for this request. A handler
    /// must not re-enter a chain seeded with the same map.
    pub fn handle(&self, response: &mut ResponseWriter, request: &ChainRequest) {
        if self.handler.is_none() {
            debug!("Empty chain node invoked, nothing to handle");
            return;
        }

        match &self.context {
            Some(shared) => {
                // A handler that panicked mid-traversal leaves the map usable.
                let mut context = shared.lock().unwrap_or_else(PoisonError::into_inner);
                self.handle_with_context(response, request, &mut context);
            }
            None => {
                let mut context = ContextMap::new();
                self.handle_with_context(response, request, &mut context);
            }
        }
    }

    /// Handle one request with a caller-supplied context map
    ///
    /// Every node reached during the traversal receives `context` itself, so
    /// the caller sees everything the handlers wrote once this returns.
    pub fn handle_with_context(
        &self,
        response: &mut ResponseWriter,
        request: &ChainRequest,
        context: &mut ContextMap,
    ) {
        let mut current = Some(self);
        let mut position = 0usize;

        while let Some(node) = current {
            current = match node.run_node(response, request, context) {
                NodeState::Continued => node.next.as_deref(),
                NodeState::Stopped => {
                    debug!(
                        "Chain stopped at node {} ({})",
                        position,
                        node.name()
                    );
                    None
                }
            };
            position += 1;
        }
    }

    /// Run this node's handler and decide whether the traversal continues
    ///
    /// Returns [`NodeState::Continued`] only when the continuation flag is the
    /// boolean `true` and a next node exists. The next node is not run.
    pub fn run_node(
        &self,
        response: &mut ResponseWriter,
        request: &ChainRequest,
        context: &mut ContextMap,
    ) -> NodeState {
        let Some(handler) = self.handler.as_deref() else {
            return NodeState::Stopped;
        };

        trace!("Running handler {}", handler.name());
        handler.handle(response, request, context);

        if context.should_next() && self.next.is_some() {
            NodeState::Continued
        } else {
            NodeState::Stopped
        }
    }

    /// Wrapped handler, `None` for an empty node
    pub fn handler(&self) -> Option<&dyn Handler> {
        self.handler.as_deref()
    }

    /// Next node in the chain
    pub fn next(&self) -> Option<&ChainNode> {
        self.next.as_deref()
    }

    /// Context map pre-seeded on this node
    pub fn context(&self) -> Option<&SharedContext> {
        self.context.as_ref()
    }

    /// Name of the wrapped handler, `"Empty"` for an empty node
    pub fn name(&self) -> &'static str {
        self.handler().map_or("Empty", |handler| handler.name())
    }

    /// Iterate over this node and every node after it
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            current: Some(self).filter(|node| node.handler.is_some()),
        }
    }

    /// Number of handler nodes from this node to the end of the chain
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if this is an empty node
    pub fn is_empty(&self) -> bool {
        self.handler.is_none()
    }

    /// Handler names in chain order, for debugging
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(ChainNode::name).collect()
    }
}

// Unlink iteratively so long chains do not recurse on drop.
impl Drop for ChainNode {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

impl fmt::Debug for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainNode")
            .field("handlers", &self.names())
            .field("context", &self.context)
            .finish()
    }
}

/// Iterator over the nodes of a chain
pub struct Iter<'a> {
    current: Option<&'a ChainNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ChainNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::handler::handler_fn;
    use crate::context::NEXT_KEY;
    use axum::body::Bytes;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    fn request() -> ChainRequest {
        Request::builder().uri("/").body(Bytes::new()).unwrap()
    }

    fn respond_not_found(
        response: &mut ResponseWriter,
        _request: &ChainRequest,
        _context: &mut ContextMap,
    ) {
        response.write_header(StatusCode::NOT_FOUND);
    }

    fn respond_ok_and_continue(
        response: &mut ResponseWriter,
        _request: &ChainRequest,
        context: &mut ContextMap,
    ) {
        response.write_header(StatusCode::OK);
        context.set_next(true);
    }

    fn write_hello_and_continue(
        response: &mut ResponseWriter,
        _request: &ChainRequest,
        context: &mut ContextMap,
    ) {
        response.write_str("hello");
        context.set_next(true);
    }

    fn write_world(
        response: &mut ResponseWriter,
        _request: &ChainRequest,
        _context: &mut ContextMap,
    ) {
        response.write_str("world");
    }

    fn write_hello(
        response: &mut ResponseWriter,
        _request: &ChainRequest,
        _context: &mut ContextMap,
    ) {
        response.write_str("hello");
    }

    /// Handler recording its label into a shared log, optionally continuing
    fn recorder(
        label: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        continue_chain: bool,
    ) -> Box<dyn Handler> {
        let log = Arc::clone(log);
        Box::new(handler_fn(label, move |_response, _request, context| {
            log.lock().unwrap().push(label);
            if continue_chain {
                context.set_next(true);
            }
        }))
    }

    fn serve(chain: &ChainNode) -> ResponseWriter {
        let mut response = ResponseWriter::new();
        chain.handle(&mut response, &request());
        response
    }

    #[test]
    fn test_single_handler_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let chain = ChainNode::new(
            None,
            vec![Box::new(handler_fn("count", move |_response, _request, context| {
                counter.fetch_add(1, Ordering::SeqCst);
                context.set_next(true);
            })) as Box<dyn Handler>],
        );

        serve(&chain);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(chain.len(), 1);
        assert!(chain.next().is_none());
    }

    #[test]
    fn test_not_found_scenario() {
        let chain = ChainNode::new(None, vec![Box::new(respond_not_found) as Box<dyn Handler>]);

        let response = serve(&chain);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_str(), Some(""));
    }

    #[test]
    fn test_chain_accumulates_output_in_order() {
        let chain = ChainNode::new(
            None,
            vec![
                Box::new(respond_ok_and_continue) as Box<dyn Handler>,
                Box::new(write_hello_and_continue),
                Box::new(write_world),
            ],
        );

        let response = serve(&chain);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_str(), Some("helloworld"));
    }

    #[test]
    fn test_chain_rejects_without_flag() {
        let chain = ChainNode::new(
            None,
            vec![
                Box::new(respond_not_found) as Box<dyn Handler>,
                Box::new(write_hello),
            ],
        );

        let response = serve(&chain);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_str(), Some(""));
    }

    #[test]
    fn test_non_boolean_or_false_flag_stops() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        for flag in [0u8, 1, 2] {
            let chain = ChainNode::new(
                None,
                vec![
                    Box::new(handler_fn("first", move |_response, _request, context| match flag {
                        0 => context.set(NEXT_KEY, "true"),
                        1 => context.set(NEXT_KEY, 1i32),
                        _ => context.set_next(false),
                    })) as Box<dyn Handler>,
                    recorder("second", &sink, false),
                ],
            );
            serve(&chain);
        }

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_three_handlers_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = ChainNode::new(
            None,
            vec![
                recorder("a", &log, true),
                recorder("b", &log, true),
                recorder("c", &log, true),
            ],
        );

        serve(&chain);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(chain.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_downstream_sees_upstream_values() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let chain = ChainNode::new(
            None,
            vec![
                Box::new(handler_fn("auth", |_response, _request, context| {
                    context.set("user", "alice".to_string());
                    context.set_next(true);
                })) as Box<dyn Handler>,
                Box::new(handler_fn("read", move |_response, _request, context| {
                    *sink.lock().unwrap() = context.get_as::<String>("user").cloned();
                })),
            ],
        );

        serve(&chain);

        assert_eq!(seen.lock().unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_context_does_not_leak_between_requests() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let chain = ChainNode::new(
            None,
            vec![Box::new(handler_fn("visit", move |_response, _request, context| {
                sink.lock().unwrap().push(context.contains("visited"));
                context.set("visited", true);
            })) as Box<dyn Handler>],
        );

        serve(&chain);
        serve(&chain);

        assert_eq!(*seen.lock().unwrap(), vec![false, false]);
    }

    /// Handler reading `hits`, recording it and storing `hits + 1`
    fn hit_counter(seen: &Arc<Mutex<Vec<u32>>>) -> Box<dyn Handler> {
        let seen = Arc::clone(seen);
        Box::new(handler_fn("hits", move |_response, _request, context| {
            let hits = context.get_as::<u32>("hits").copied().unwrap_or(0);
            seen.lock().unwrap().push(hits);
            context.set("hits", hits + 1);
        }))
    }

    #[test]
    fn test_preseeded_context_persists_across_requests() {
        let mut initial = ContextMap::new();
        initial.set("hits", 0u32);
        let shared = initial.into_shared();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let chain = ChainNode::new(Some(Arc::clone(&shared)), vec![hit_counter(&seen)]);

        serve(&chain);
        serve(&chain);
        serve(&chain);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(shared.lock().unwrap().get_as::<u32>("hits"), Some(&3));
        assert!(Arc::ptr_eq(chain.context().unwrap(), &shared));
    }

    #[test]
    fn test_preseeded_context_is_shared_between_chains() {
        let shared = ContextMap::new().into_shared();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = ChainNode::new(Some(Arc::clone(&shared)), vec![hit_counter(&seen)]);
        let second = ChainNode::new(Some(Arc::clone(&shared)), vec![hit_counter(&seen)]);

        serve(&first);
        serve(&second);
        serve(&first);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_head_holds_initial_context() {
        let chain = ChainNode::new(
            Some(ContextMap::new().into_shared()),
            vec![
                Box::new(write_hello) as Box<dyn Handler>,
                Box::new(write_world),
            ],
        );

        assert!(chain.context().is_some());
        assert!(chain.next().unwrap().context().is_none());
    }

    #[test]
    fn test_handle_with_context_exposes_map() {
        let chain = ChainNode::new(
            None,
            vec![
                Box::new(handler_fn("first", |_response, _request, context| {
                    context.set("first", 1u32);
                    context.set_next(true);
                })) as Box<dyn Handler>,
                Box::new(handler_fn("second", |_response, _request, context| {
                    context.set("second", 2u32);
                })),
            ],
        );
        let mut context = ContextMap::new();
        let mut response = ResponseWriter::new();

        chain.handle_with_context(&mut response, &request(), &mut context);

        assert_eq!(context.get_as::<u32>("first"), Some(&1));
        assert_eq!(context.get_as::<u32>("second"), Some(&2));
    }

    #[test]
    fn test_flag_stays_set_until_cleared() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stop_log = Arc::clone(&log);
        let chain = ChainNode::new(
            None,
            vec![
                recorder("a", &log, true),
                recorder("b", &log, false),
                Box::new(handler_fn("gate", move |_response, _request, context| {
                    stop_log.lock().unwrap().push("gate");
                    context.set_next(false);
                })),
                recorder("d", &log, true),
            ],
        );

        serve(&chain);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "gate"]);
    }

    #[test]
    fn test_run_node_reports_state() {
        let chain = ChainNode::new(
            None,
            vec![
                Box::new(respond_ok_and_continue) as Box<dyn Handler>,
                Box::new(write_world),
            ],
        );
        let mut response = ResponseWriter::new();
        let mut context = ContextMap::new();

        assert_eq!(
            chain.run_node(&mut response, &request(), &mut context),
            NodeState::Continued
        );
        // The last node stops even with the flag still set.
        let last = chain.next().unwrap();
        assert_eq!(
            last.run_node(&mut response, &request(), &mut context),
            NodeState::Stopped
        );
        assert!(context.should_next());
    }

    #[test]
    fn test_empty_chain_is_inert() {
        let chain = ChainNode::new(None, Vec::new());

        assert!(chain.handler().is_none());
        assert!(chain.next().is_none());
        assert!(chain.context().is_none());
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);

        let response = serve(&chain);
        assert!(!response.is_committed());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_new_boxed_empty_is_none() {
        assert!(ChainNode::new_boxed(None, Vec::new()).is_none());

        let head = ChainNode::new_boxed(None, vec![Box::new(write_hello) as Box<dyn Handler>]);
        assert_eq!(head.map(|node| node.len()), Some(1));
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let handlers = (0..100_000).map(|_| {
            Box::new(handler_fn("pass", |_response, _request, context| {
                context.set_next(true);
            })) as Box<dyn Handler>
        });
        let chain = ChainNode::new(None, handlers);

        let response = serve(&chain);

        assert_eq!(chain.len(), 100_000);
        assert!(!response.is_committed());
    }

    #[traced_test]
    #[test]
    fn test_stop_is_logged() {
        let chain = ChainNode::new(None, vec![Box::new(respond_not_found) as Box<dyn Handler>]);

        serve(&chain);

        assert!(logs_contain("Chain stopped at node 0"));
    }
}
