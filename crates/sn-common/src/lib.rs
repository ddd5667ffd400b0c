//! Runtime plumbing shared by every Sonora binary.

pub mod lifecycle;
pub mod logging;

pub use lifecycle::shutdown_signal;
pub use logging::init_logging;

/// Header carrying the per-request correlation id, both on HTTP and on internal RPC.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
