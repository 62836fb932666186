//! Default configuration values

pub struct ChainDefaults;

impl ChainDefaults {
    pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16MB
    pub const TRACE_TRAVERSAL: bool = true;
}
