pub mod chain_config;
pub mod defaults;

pub use chain_config::*;
pub use defaults::*;
