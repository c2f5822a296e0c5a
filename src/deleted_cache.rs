//! Anti-replay cache of recently deleted event ids (I6, §4.4).
//!
//! An id stays in the set for exactly `TOO_OLD` seconds after deletion; a
//! rebroadcast attempt of that id during the window is refused by admission
//! rejector 4. Membership is additionally checked against the caller's
//! clock (§9), so a `FakeClock`-driven test can observe expiry without
//! waiting on the real background timer.

use nostr::{EventId, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct DeletedCache {
    ids: Mutex<HashMap<EventId, Timestamp>>,
}

impl DeletedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` was inserted and is still within `ttl_secs` of `now`.
    pub async fn contains(&self, id: &EventId, now: Timestamp, ttl_secs: u64) -> bool {
        match self.ids.lock().await.get(id) {
            Some(inserted_at) => now.as_u64().saturating_sub(inserted_at.as_u64()) < ttl_secs,
            None => false,
        }
    }

    /// Insert `id` (recorded at `inserted_at`) and schedule its removal
    /// after `ttl`. The expiry timer is a detached task per entry, matching
    /// the per-entry-timer shape in §4.4.
    pub fn insert_with_expiry(
        self: &Arc<Self>,
        id: EventId,
        inserted_at: Timestamp,
        ttl: Duration,
        token: CancellationToken,
    ) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.ids.lock().await.insert(id, inserted_at);
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    cache.ids.lock().await.remove(&id);
                }
            }
        });
    }
}
