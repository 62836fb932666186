//! # elif-chain
//!
//! Linked middleware chain for the elif.rs web framework.
//!
//! A chain is built once from an ordered list of handlers and reused for
//! every request. Each request gets its own [`ContextMap`]; a handler lets the
//! next one run by setting the continuation flag:
//!
//! ```
//! use elif_chain::{ChainBuilder, ResponseWriter};
//! use axum::body::Bytes;
//! use axum::http::{Request, StatusCode};
//!
//! let chain = ChainBuilder::new()
//!     .add_fn(|response, _request, context| {
//!         response.write_header(StatusCode::OK);
//!         context.set_next(true);
//!     })
//!     .add_fn(|response, _request, _context| response.write_str("hello"))
//!     .build();
//!
//! let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
//! let mut response = ResponseWriter::new();
//! chain.handle(&mut response, &request);
//!
//! assert_eq!(response.body_str(), Some("hello"));
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod errors;
pub mod response;
pub mod service;

pub use chain::{
    handler_fn, ChainBuilder, ChainNode, ChainRequest, Handler, NamedHandler, NodeState,
};
pub use config::{ChainConfig, ChainDefaults};
pub use context::{ContextMap, ContextValue, SharedContext, NEXT_KEY};
pub use errors::{ChainError, ChainResult};
pub use response::ResponseWriter;
pub use service::ChainService;
