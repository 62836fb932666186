//! # Chain
//!
//! Chain-of-responsibility over a shared context map. Each node wraps one
//! handler and forwards to the next node when the handler sets the
//! continuation flag (`"next"`) to `true`.

pub mod builder;
pub mod handler;
pub mod node;

pub use builder::*;
pub use handler::*;
pub use node::*;
