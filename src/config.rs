//! Configuration Module
//!
//! Loads forwarder settings from environment variables.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::{DnsError, Result};

/// Forwarder configuration parameters.
///
/// All values can be configured via environment variables; anything missing
/// or unparseable falls back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream resolver IP address
    pub upstream_dns: String,
    /// Upstream resolver port
    pub upstream_port: u16,
    /// Address the UDP listener binds to
    pub listen_address: String,
    /// Port the UDP listener binds to
    pub dns_port: u16,
    /// TTL in seconds applied to every cached answer
    pub cache_ttl: u64,
    /// Append-only query log file
    pub log_file: PathBuf,
    /// Seconds to wait for an upstream reply
    pub upstream_timeout: u64,
    /// Extra upstream attempts after the first one times out or fails
    pub upstream_retries: u32,
    /// Cache capacity bound, 0 for unbounded
    pub max_entries: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_DNS` - Upstream resolver IP (default: 8.8.8.8)
    /// - `UPSTREAM_PORT` - Upstream resolver port (default: 53)
    /// - `LISTEN_ADDRESS` - Listener bind address (default: 0.0.0.0)
    /// - `DNS_PORT` - Listener port (default: 53)
    /// - `CACHE_TTL` - Cache TTL in seconds (default: 300)
    /// - `LOG_FILE` - Query log path (default: dns_log.txt)
    /// - `UPSTREAM_TIMEOUT` - Upstream wait in seconds (default: 5)
    /// - `UPSTREAM_RETRIES` - Extra upstream attempts (default: 0)
    /// - `MAX_ENTRIES` - Cache capacity bound (default: 0, unbounded)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upstream_dns: env::var("UPSTREAM_DNS").unwrap_or(defaults.upstream_dns),
            upstream_port: parse_var("UPSTREAM_PORT").unwrap_or(defaults.upstream_port),
            listen_address: env::var("LISTEN_ADDRESS").unwrap_or(defaults.listen_address),
            dns_port: parse_var("DNS_PORT").unwrap_or(defaults.dns_port),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            log_file: env::var("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            upstream_timeout: parse_var("UPSTREAM_TIMEOUT").unwrap_or(defaults.upstream_timeout),
            upstream_retries: parse_var("UPSTREAM_RETRIES").unwrap_or(defaults.upstream_retries),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
        }
    }

    /// Socket address of the upstream resolver.
    pub fn upstream_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.upstream_dns, self.upstream_port)
    }

    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.listen_address, self.dns_port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_dns: "8.8.8.8".to_string(),
            upstream_port: 53,
            listen_address: "0.0.0.0".to_string(),
            dns_port: 53,
            cache_ttl: DEFAULT_CACHE_TTL,
            log_file: PathBuf::from("dns_log.txt"),
            upstream_timeout: 5,
            upstream_retries: 0,
            max_entries: 0,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn socket_addr(ip: &str, port: u16) -> Result<SocketAddr> {
    let ip = IpAddr::from_str(ip.trim())
        .map_err(|e| DnsError::Config(format!("invalid IP address '{}': {}", ip, e)))?;
    Ok(SocketAddr::new(ip, port))
}
