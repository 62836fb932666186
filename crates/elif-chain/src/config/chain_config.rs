//! Host integration configuration
//!
//! The chain itself has nothing to configure; these settings govern how
//! [`ChainService`](crate::service::ChainService) feeds requests into it.

use super::defaults::ChainDefaults;
use crate::errors::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};

/// Settings for serving a chain behind the host HTTP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Maximum request body size buffered before the chain runs, in bytes
    pub max_body_size: usize,
    /// Log each request entering and leaving the chain at debug level
    pub trace_traversal: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_body_size: ChainDefaults::MAX_BODY_SIZE,
            trace_traversal: ChainDefaults::TRACE_TRAVERSAL,
        }
    }
}

impl ChainConfig {
    /// Set the maximum buffered body size
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Disable request tracing around the chain
    pub fn without_tracing(mut self) -> Self {
        self.trace_traversal = false;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> ChainResult<()> {
        if self.max_body_size == 0 {
            return Err(ChainError::config(
                "Maximum body size must be greater than 0",
            ));
        }

        Ok(())
    }
}
