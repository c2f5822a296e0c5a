//! The store interface the core depends on (§6). Deliberately minimal:
//! query, save, delete, plus the two bootstrap-time convenience queries the
//! registry needs. The host supplies the implementation.

use async_trait::async_trait;
use nostr::{Event, EventId, Filter, Kind};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query(&self, filter: Filter) -> anyhow::Result<Vec<Event>>;
    async fn save(&self, event: Event) -> anyhow::Result<()>;
    async fn delete(&self, id: EventId) -> anyhow::Result<()>;

    /// All `CreateGroup` events, used to discover every group at bootstrap.
    async fn query_by_kind(&self, kind: Kind) -> anyhow::Result<Vec<Event>> {
        self.query(Filter::new().kind(kind)).await
    }

    /// A group's moderation log in ascending `created_at` order (§4.2).
    async fn query_moderation_log(&self, group_id: &str) -> anyhow::Result<Vec<Event>> {
        let mut events = self
            .query(Filter::new().custom_tag(nostr::SingleLetterTag::lowercase(nostr::Alphabet::H), group_id))
            .await?;
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    /// The most recent `limit` accepted event ids for a group, used to seed
    /// `ref_window` at bootstrap (§4.2).
    async fn recent_event_ids(&self, group_id: &str, limit: usize) -> anyhow::Result<Vec<EventId>> {
        let mut events = self
            .query(
                Filter::new()
                    .custom_tag(nostr::SingleLetterTag::lowercase(nostr::Alphabet::H), group_id)
                    .limit(limit),
            )
            .await?;
        events.sort_by_key(|e| e.created_at);
        Ok(events.into_iter().map(|e| e.id).collect())
    }
}
