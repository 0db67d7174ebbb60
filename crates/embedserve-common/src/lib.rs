//! Common utilities shared across embedserve crates
//!
//! Environment bootstrap, tracing setup and the correlation ID type used to
//! tie log lines to HTTP requests.

pub mod correlation;
pub mod init;

pub use correlation::CorrelationId;
pub use init::{LogFormat, TracingInitError, init_tracing, initialize_environment};
