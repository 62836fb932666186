//! Handler units wrapped by chain nodes

use axum::body::Bytes;
use axum::http::Request;
use std::fmt;

use crate::context::ContextMap;
use crate::response::ResponseWriter;

/// Request data seen by handlers, with the body already buffered
pub type ChainRequest = Request<Bytes>;

/// A unit of request handling at one position of a chain
///
/// Handlers may write to the response, read or mutate the context map, and
/// set the continuation flag to let the next node run. Failures are the
/// handler's own business; a panic unwinds through the chain untouched.
pub trait Handler: Send + Sync {
    /// Handle the request with the context shared by the current traversal
    fn handle(
        &self,
        response: &mut ResponseWriter,
        request: &ChainRequest,
        context: &mut ContextMap,
    );

    /// Optional handler name for debugging
    fn name(&self) -> &'static str {
        "Handler"
    }
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, &ChainRequest, &mut ContextMap) + Send + Sync,
{
    fn handle(
        &self,
        response: &mut ResponseWriter,
        request: &ChainRequest,
        context: &mut ContextMap,
    ) {
        self(response, request, context)
    }
}

/// Function handler carrying a name for logs and introspection
pub struct NamedHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> Handler for NamedHandler<F>
where
    F: Fn(&mut ResponseWriter, &ChainRequest, &mut ContextMap) + Send + Sync,
{
    fn handle(
        &self,
        response: &mut ResponseWriter,
        request: &ChainRequest,
        context: &mut ContextMap,
    ) {
        (self.f)(response, request, context)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for NamedHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedHandler").field("name", &self.name).finish()
    }
}

/// Wrap a closure into a named handler
pub fn handler_fn<F>(name: &'static str, f: F) -> NamedHandler<F>
where
    F: Fn(&mut ResponseWriter, &ChainRequest, &mut ContextMap) + Send + Sync,
{
    NamedHandler { name, f }
}
