//! Resolution Coordinator
//!
//! Decides per query between the cache and the upstream resolver and builds
//! the reply the listener sends back.

use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use tracing::{info, warn};

use crate::cache::SharedCache;
use crate::query_log::{QueryLog, QuerySource};
use crate::upstream::Upstream;

// == Resolver ==
/// Cache-then-forward resolution. Holds no per-query state; everything that
/// outlives a query lives in the shared cache.
pub struct Resolver {
    cache: SharedCache,
    upstream: Arc<dyn Upstream>,
    query_log: QueryLog,
}

impl Resolver {
    pub fn new(cache: SharedCache, upstream: Arc<dyn Upstream>, query_log: QueryLog) -> Self {
        Self {
            cache,
            upstream,
            query_log,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Resolve ==
    /// Answers `request`, always producing a reply.
    ///
    /// The cache key is the first question's name exactly as received. A
    /// fresh cached answer is returned without contacting upstream; otherwise
    /// the upstream answer is cached and returned. Upstream failures become a
    /// SERVFAIL reply and are never cached.
    pub async fn resolve(&self, request: &Message) -> Message {
        let Some(question) = request.queries().first() else {
            warn!(id = request.id(), "Query without a question section");
            return error_reply(request, ResponseCode::FormErr);
        };
        // Raw ASCII form: Display would lowercase-decode punycode labels
        let domain = question.name().to_ascii();
        info!("Received query for {}", domain);

        let cached = self.cache.lock().await.lookup(&domain);
        if let Some(answer) = cached {
            self.query_log.record(&domain, QuerySource::Cache);
            return direct_reply(request, answer);
        }

        match self.upstream.query(&domain).await {
            Ok(answer) => {
                self.query_log.record(&domain, QuerySource::Upstream);
                self.cache.lock().await.insert(domain, answer.clone());
                direct_reply(request, answer)
            }
            Err(e) => {
                warn!(domain = %domain, "Upstream resolution failed: {}", e);
                error_reply(request, ResponseCode::ServFail)
            }
        }
    }
}

// == Reply Builders ==
/// Returns a resolved answer as the reply to `request`.
///
/// Only the id is rewritten so the client can match it to its query.
pub fn direct_reply(request: &Message, mut answer: Message) -> Message {
    answer.set_id(request.id());
    answer
}

/// Builds a reply to `request` that carries only its question and `code`.
pub fn error_reply(request: &Message, code: ResponseCode) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(code)
        .add_queries(request.queries().to_vec());
    reply
}
