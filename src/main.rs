//! DNS Cache Forwarder - A caching DNS forwarder
//!
//! Answers UDP queries from an in-memory TTL cache and forwards misses to a
//! single upstream resolver.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dns_cache_forwarder::{CacheStore, Config, DnsServer, QueryLog, Resolver, UdpUpstream};

/// Main entry point for the DNS forwarder.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache store, upstream client and query log writer
/// 4. Bind the UDP listener on the configured address
/// 5. Serve until SIGINT/SIGTERM, then drain in-flight queries
/// 6. Flush the query log and report cache statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dns_cache_forwarder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DNS Cache Forwarder");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}:{}, listen={}:{}, cache_ttl={}s, max_entries={}, log_file={}",
        config.upstream_dns,
        config.upstream_port,
        config.listen_address,
        config.dns_port,
        config.cache_ttl,
        config.max_entries,
        config.log_file.display()
    );

    let upstream = UdpUpstream::from_config(&config).context("invalid upstream configuration")?;
    let listen_addr = config
        .listen_addr()
        .context("invalid listen configuration")?;

    let cache = CacheStore::new(config.max_entries, config.cache_ttl).into_shared();
    let (query_log, log_writer) = QueryLog::spawn(&config.log_file);
    let resolver = Resolver::new(cache.clone(), Arc::new(upstream), query_log);

    let server = DnsServer::bind(listen_addr, resolver)
        .await
        .with_context(|| format!("failed to bind UDP listener on {}", listen_addr))?;

    println!("DNS server is running on UDP port {}...", config.dns_port);

    // The server owns the last query log handle, so the writer drains after this
    server.run_until(shutdown_signal()).await?;
    log_writer.finish().await;

    let stats = cache.lock().await.stats();
    info!(
        hit_rate = stats.hit_rate(),
        "Final cache stats: {}",
        serde_json::to_string(&stats).unwrap_or_default()
    );
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    println!("Stopping DNS server...");
}
