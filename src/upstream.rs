//! Upstream Resolver Client
//!
//! Forwards cache misses to a single upstream resolver over UDP.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::config::Config;
use crate::error::{DnsError, Result};

/// Largest reply accepted from upstream; no EDNS0 is advertised.
const MAX_UDP_RESPONSE_SIZE: usize = 512;

// == Upstream Trait ==
/// Source of answers for names the cache cannot serve.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Resolves `domain` and returns the full upstream response.
    async fn query(&self, domain: &str) -> Result<Message>;
}

// == UDP Upstream ==
/// Single-server UDP client. Every attempt binds a fresh ephemeral socket.
#[derive(Debug, Clone)]
pub struct UdpUpstream {
    server_addr: SocketAddr,
    timeout: Duration,
    retries: u32,
}

impl UdpUpstream {
    /// Creates a single-shot client for `server_addr`.
    pub fn new(server_addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            server_addr,
            timeout,
            retries: 0,
        }
    }

    /// Allows `retries` extra attempts after a failed one.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.upstream_addr()?, config.upstream_timeout())
            .with_retries(config.upstream_retries))
    }

    /// One send/receive round trip on its own socket.
    async fn exchange(&self, domain: &str, id: u16, request: &[u8]) -> Result<Message> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        // Connected sockets drop datagrams from any other peer
        socket.connect(self.server_addr).await?;
        socket.send(request).await?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| DnsError::UpstreamTimeout {
                domain: domain.to_string(),
                timeout: self.timeout,
            })??;

        debug!(
            server = %self.server_addr,
            bytes_received = len,
            "Upstream response received"
        );

        parse_response(&buf[..len], id)
    }
}

#[async_trait]
impl Upstream for UdpUpstream {
    async fn query(&self, domain: &str) -> Result<Message> {
        let (id, request) = build_query(domain)?;

        let mut attempt = 0;
        loop {
            match self.exchange(domain, id, &request).await {
                Ok(answer) => return Ok(answer),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!(domain, attempt, error = %e, "Retrying upstream query");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// == Wire Helpers ==
/// Encodes a recursive A/IN query for `domain` under a random id.
///
/// The name goes out byte-for-byte as given: no case folding, no IDNA.
pub fn build_query(domain: &str) -> Result<(u16, Vec<u8>)> {
    let name = Name::from_ascii(domain)
        .map_err(|e| DnsError::InvalidName(format!("'{}': {}", domain, e)))?;

    let id = fastrand::u16(..);
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, RecordType::A));

    Ok((id, message.to_vec()?))
}

/// Decodes an upstream datagram, insisting it answers query `id`.
pub fn parse_response(bytes: &[u8], id: u16) -> Result<Message> {
    let message =
        Message::from_vec(bytes).map_err(|e| DnsError::MalformedResponse(e.to_string()))?;

    if message.message_type() != MessageType::Response {
        return Err(DnsError::MalformedResponse(
            "datagram is not a response".to_string(),
        ));
    }
    if message.id() != id {
        return Err(DnsError::MalformedResponse(format!(
            "response id {} does not match query id {}",
            message.id(),
            id
        )));
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::ResponseCode;
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{RData, Record};
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn reply_to(query: &Message) -> Message {
        let mut reply = Message::new();
        reply
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .set_recursion_available(true)
            .set_response_code(ResponseCode::NoError)
            .add_queries(query.queries().to_vec());
        let name = query.queries()[0].name().clone();
        reply.add_answer(Record::from_rdata(
            name,
            60,
            RData::A(A(Ipv4Addr::new(93, 184, 216, 34))),
        ));
        reply
    }

    /// Answers every query after silently dropping the first `skip` datagrams.
    async fn spawn_mock(skip: usize) -> (SocketAddr, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < skip {
                    continue;
                }
                let query = Message::from_vec(&buf[..len]).unwrap();
                let bytes = reply_to(&query).to_vec().unwrap();
                let _ = socket.send_to(&bytes, peer).await;
            }
        });

        (addr, seen)
    }

    #[test]
    fn test_build_query_sets_recursion_and_question() {
        let (id, bytes) = build_query("example.com.").unwrap();
        let message = Message::from_vec(&bytes).unwrap();

        assert_eq!(message.id(), id);
        assert!(message.recursion_desired());
        assert_eq!(message.queries().len(), 1);
        assert_eq!(message.queries()[0].query_type(), RecordType::A);
        assert_eq!(message.queries()[0].name().to_ascii(), "example.com.");
    }

    #[test]
    fn test_build_query_keeps_name_as_given() {
        for domain in ["Example.COM.", "xn--bcher-kva.Example."] {
            let (_, bytes) = build_query(domain).unwrap();
            let message = Message::from_vec(&bytes).unwrap();
            assert_eq!(message.queries()[0].name().to_ascii(), domain);
        }
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        let result = parse_response(&[0xde, 0xad], 1);
        assert!(matches!(result, Err(DnsError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_response_rejects_id_mismatch() {
        let (_, bytes) = build_query("example.com.").unwrap();
        let query = Message::from_vec(&bytes).unwrap();
        let reply = reply_to(&query).to_vec().unwrap();

        let result = parse_response(&reply, query.id().wrapping_add(1));
        assert!(matches!(result, Err(DnsError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_query_returns_upstream_answer() {
        let (addr, seen) = spawn_mock(0).await;
        let upstream = UdpUpstream::new(addr, Duration::from_secs(2));

        let answer = upstream.query("example.com.").await.unwrap();

        assert_eq!(answer.answers().len(), 1);
        assert_eq!(answer.response_code(), ResponseCode::NoError);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_times_out_on_silent_upstream() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream = UdpUpstream::new(silent.local_addr().unwrap(), Duration::from_millis(200));

        let result = upstream.query("example.com.").await;
        match result {
            Err(err @ DnsError::UpstreamTimeout { .. }) => {
                assert!(err.to_string().contains("200ms"), "got: {}", err);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_shot_by_default() {
        let (addr, seen) = spawn_mock(1).await;
        let upstream = UdpUpstream::new(addr, Duration::from_millis(200));

        assert!(upstream.query("example.com.").await.is_err());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_dropped_datagram() {
        let (addr, seen) = spawn_mock(1).await;
        let upstream = UdpUpstream::new(addr, Duration::from_millis(200)).with_retries(1);

        let answer = upstream.query("example.com.").await.unwrap();

        assert_eq!(answer.answers().len(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_sending() {
        let upstream = UdpUpstream::new("127.0.0.1:9".parse().unwrap(), Duration::from_millis(50));
        let label = "a".repeat(64);

        let result = upstream.query(&format!("{}.com.", label)).await;
        assert!(matches!(result, Err(DnsError::InvalidName(_))));
    }
}
