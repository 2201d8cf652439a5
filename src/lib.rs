//! DNS Cache Forwarder - A caching DNS forwarder
//!
//! Answers UDP queries from an in-memory TTL cache and forwards misses to a
//! single upstream resolver.

pub mod cache;
pub mod config;
pub mod error;
pub mod query_log;
pub mod resolver;
pub mod server;
pub mod upstream;

pub use cache::{CacheStore, SharedCache};
pub use config::Config;
pub use error::{DnsError, Result};
pub use query_log::{QueryLog, QueryLogWriter, QuerySource};
pub use resolver::Resolver;
pub use server::DnsServer;
pub use upstream::{UdpUpstream, Upstream};
