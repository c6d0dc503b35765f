// src/dedup.rs
//! Inbound message deduplication. Origin channels retry undelivered webhook
//! acknowledgments aggressively, so every provider message id is marked with
//! an atomic create-if-absent before any processing happens. At-most-once
//! within the TTL window only; after expiry a resend is treated as new.

use std::sync::Arc;
use std::time::Duration;

use crate::store::KeyValueStore;

const SEEN_PREFIX: &str = "seen_msg:";

pub struct InboundDedup {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl InboundDedup {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Marks the id as seen and reports whether it already was. The marker's
    /// existence alone carries the information; no value is stored.
    pub async fn is_duplicate(&self, message_id: &str) -> bool {
        let key = format!("{SEEN_PREFIX}{message_id}");
        let created = self.store.set_if_absent(&key, "1", self.ttl).await;
        if !created {
            tracing::info!(message_id, "duplicate inbound message ignored");
        }
        !created
    }
}
