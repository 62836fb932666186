//! Host server integration
//!
//! Registers a chain as a request handler with axum: the request body is
//! buffered up to the configured limit, the chain runs synchronously on the
//! request task, and whatever the handlers wrote becomes the response.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Router;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower::Service;
use tracing::{debug, warn};

use crate::chain::{ChainNode, ChainRequest};
use crate::config::ChainConfig;
use crate::errors::{ChainError, ChainResult};
use crate::response::ResponseWriter;

/// Type alias for boxed future returned by the service
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A built chain exposed as a tower service
#[derive(Clone)]
pub struct ChainService {
    chain: Arc<ChainNode>,
    config: Arc<ChainConfig>,
}

impl ChainService {
    /// Serve `chain` with the default configuration
    pub fn new(chain: ChainNode) -> Self {
        Self::from_arc(Arc::new(chain))
    }

    /// Serve a chain that is already shared
    pub fn from_arc(chain: Arc<ChainNode>) -> Self {
        Self {
            chain,
            config: Arc::new(ChainConfig::default()),
        }
    }

    /// Serve `chain` with a validated configuration
    pub fn with_config(chain: ChainNode, config: ChainConfig) -> ChainResult<Self> {
        config.validate()?;
        Ok(Self {
            chain: Arc::new(chain),
            config: Arc::new(config),
        })
    }

    /// The chain being served
    pub fn chain(&self) -> &ChainNode {
        &self.chain
    }

    /// The active configuration
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Register the chain as the fallback handler of a new router
    pub fn into_router(self) -> Router {
        Router::new().fallback_service(self)
    }

    /// Buffer the request body, run the chain and convert the result
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let limit = self.config.max_body_size;

        let bytes = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                let error = if err.is::<LengthLimitError>() {
                    ChainError::PayloadTooLarge { limit }
                } else {
                    ChainError::body_read(err.to_string())
                };
                warn!("Request rejected before entering chain: {}", error);
                return error.into_response();
            }
        };

        let request = Request::from_parts(parts, bytes);
        self.dispatch(&request).into_response()
    }

    /// Run the chain against a buffered request
    pub fn dispatch(&self, request: &ChainRequest) -> ResponseWriter {
        let mut response = ResponseWriter::new();

        if self.config.trace_traversal {
            debug!(
                "{} {} entering chain {:?}",
                request.method(),
                request.uri().path(),
                self.chain.names()
            );
        }

        self.chain.handle(&mut response, request);

        if self.config.trace_traversal {
            debug!(
                "{} {} left chain with status {}",
                request.method(),
                request.uri().path(),
                response.status().as_u16()
            );
        }

        response
    }
}

impl Service<Request<Body>> for ChainService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.serve(request).await) })
    }
}
