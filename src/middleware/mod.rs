//! Middleware for observability.
//!
//! Authentication lives in `auth::middleware`; this module only carries
//! request logging with latency tracking.

pub mod logging;

pub use logging::request_logging;
