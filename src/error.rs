//! Error types for the DNS forwarder
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == DNS Error Enum ==
/// Unified error type for the forwarder.
///
/// Every upstream failure is recovered by the resolver as a SERVFAIL reply;
/// only configuration and bind errors are fatal.
#[derive(Error, Debug)]
pub enum DnsError {
    /// No reply from upstream within the timeout window
    #[error("Upstream timeout after {timeout:?} resolving {domain}")]
    UpstreamTimeout { domain: String, timeout: Duration },

    /// Upstream replied with something that is not a matching DNS response
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Queried name cannot be encoded
    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    /// DNS wire encode/decode error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::error::ProtoError),

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

// == Result Type Alias ==
/// Convenience Result type for the forwarder.
pub type Result<T> = std::result::Result<T, DnsError>;
