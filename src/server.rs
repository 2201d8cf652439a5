//! UDP Listener
//!
//! Receives query datagrams, resolves each one on its own task and sends the
//! encoded reply back to the requester.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hickory_proto::op::Message;
use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::resolver::Resolver;

/// Receive buffer size; large enough for EDNS-padded queries.
const MAX_DATAGRAM_SIZE: usize = 4096;

// == DNS Server ==
pub struct DnsServer {
    socket: Arc<UdpSocket>,
    resolver: Arc<Resolver>,
}

impl DnsServer {
    /// Binds the listening socket. Failing here is fatal for the process.
    pub async fn bind(addr: SocketAddr, resolver: Resolver) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            resolver: Arc::new(resolver),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    // == Run ==
    /// Serves queries until `shutdown` completes.
    ///
    /// After shutdown no new datagrams are read, but every query already
    /// dispatched runs to completion (at worst until its upstream timeout)
    /// before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        tokio::pin!(shutdown);

        info!("DNS listener ready on {}", self.local_addr()?);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!("Query task failed: {}", e);
                    }
                }

                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        debug!(%peer, bytes = len, "Datagram received");
                        tasks.spawn(handle_datagram(
                            self.socket.clone(),
                            self.resolver.clone(),
                            buf[..len].to_vec(),
                            peer,
                        ));
                    }
                    // ICMP errors from earlier replies surface here; keep serving
                    Err(e) => warn!("Failed to receive datagram: {}", e),
                },
            }
        }

        info!(in_flight = tasks.len(), "Listener stopped, draining in-flight queries");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Query task failed: {}", e);
            }
        }

        Ok(())
    }
}

async fn handle_datagram(
    socket: Arc<UdpSocket>,
    resolver: Arc<Resolver>,
    datagram: Vec<u8>,
    peer: SocketAddr,
) {
    let request = match Message::from_vec(&datagram) {
        Ok(request) => request,
        Err(e) => {
            warn!(%peer, "Dropping undecodable datagram: {}", e);
            return;
        }
    };

    let reply = resolver.resolve(&request).await;

    let bytes = match reply.to_vec() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%peer, id = reply.id(), "Failed to encode reply: {}", e);
            return;
        }
    };

    if let Err(e) = socket.send_to(&bytes, peer).await {
        warn!(%peer, "Failed to send reply: {}", e);
    }
}
