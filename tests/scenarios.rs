//! End-to-end scenarios against the admission pipeline and query handlers.

use async_trait::async_trait;
use groups_relay_core::host::{AllowAction, DefaultAllowAction, RelayHost};
use groups_relay_core::kind::{
    KIND_GROUP_ADD_USER_9000, KIND_GROUP_CREATE_9007, KIND_GROUP_EDIT_METADATA_9002,
};
use groups_relay_core::clock::SystemClock;
use groups_relay_core::pipeline::{admit, AdmissionContext};
use groups_relay_core::{EventStore, Registry};
use nostr::{Event, EventBuilder, EventId, Filter, Keys, Kind, Tag, TagKind, Timestamp};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

struct InMemoryStore {
    events: Mutex<Vec<Event>>,
}

impl InMemoryStore {
    fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn query(&self, filter: Filter) -> anyhow::Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.match_event(e))
            .cloned()
            .collect())
    }
    async fn save(&self, event: Event) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
    async fn delete(&self, id: EventId) -> anyhow::Result<()> {
        self.events.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }
}

struct RecordingHost {
    broadcast: Mutex<Vec<Event>>,
}

impl RecordingHost {
    fn new() -> Self {
        Self { broadcast: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl RelayHost for RecordingHost {
    async fn broadcast_event(&self, event: Event) {
        self.broadcast.lock().unwrap().push(event);
    }
    async fn add_event(&self, _event: Event) -> anyhow::Result<bool> {
        Ok(true)
    }
    fn authenticated_pubkey(&self) -> Option<nostr::PublicKey> {
        None
    }
}

struct Harness {
    registry: Registry,
    store: InMemoryStore,
    host: RecordingHost,
    deleted_cache: Arc<groups_relay_core::deleted_cache::DeletedCache>,
    invite_store: groups_relay_core::invite::InviteStore,
    relay: Keys,
    allow_action: Box<dyn AllowAction>,
}

impl Harness {
    fn new() -> Self {
        let relay = Keys::generate();
        let settings = groups_relay_core::GroupEngineSettings {
            domain: "test.relay".into(),
            secret_key: relay.secret_key().to_secret_hex(),
            default_roles: vec!["admin".into(), "member".into()],
            group_creator_default_role: "admin".into(),
            allow_private_groups: true,
            ref_window_size: 50,
            too_old_secs: 60,
        };
        Harness {
            registry: Registry::new(relay.public_key(), &settings),
            store: InMemoryStore::new(),
            host: RecordingHost::new(),
            deleted_cache: Arc::new(groups_relay_core::deleted_cache::DeletedCache::new()),
            invite_store: groups_relay_core::invite::InviteStore::new(),
            relay,
            allow_action: Box::new(DefaultAllowAction),
        }
    }

    async fn admit(&self, event: &Event) -> groups_relay_core::error::Result<()> {
        let ctx = AdmissionContext {
            event,
            registry: &self.registry,
            store: &self.store,
            host: &self.host,
            allow_action: self.allow_action.as_ref(),
            deleted_cache: &self.deleted_cache,
            invite_store: &self.invite_store,
            clock: &SystemClock,
            relay_pubkey: self.relay.public_key(),
            relay_keys: self.relay.clone(),
            allow_private_groups: true,
            too_old_secs: 60,
            shutdown: CancellationToken::new(),
        };
        admit(&ctx).await
    }
}

#[tokio::test]
async fn s1_open_group_lifecycle() {
    let harness = Harness::new();
    let user1 = Keys::generate();
    let user2 = Keys::generate();

    let create = EventBuilder::new(KIND_GROUP_CREATE_9007, "")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&create).await.unwrap();

    let group = harness.registry.get("a").unwrap();
    assert!(group.is_member(&user1.public_key()));
    drop(group);

    let put_user = EventBuilder::new(KIND_GROUP_ADD_USER_9000, "")
        .tags(vec![
            Tag::custom(TagKind::h(), ["a"]),
            Tag::custom(TagKind::p(), [user2.public_key().to_hex()]),
        ])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&put_user).await.unwrap();

    let group = harness.registry.get("a").unwrap();
    assert!(group.is_member(&user2.public_key()));

    let content = EventBuilder::new(Kind::Custom(9), "hello")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user2)
        .unwrap();
    harness.admit(&content).await.unwrap();

    let stored = harness.store.query(Filter::new().kind(Kind::Custom(9))).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn s2_non_member_rejection() {
    let harness = Harness::new();
    let user1 = Keys::generate();
    let user3 = Keys::generate();

    let create = EventBuilder::new(KIND_GROUP_CREATE_9007, "")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&create).await.unwrap();

    let content = EventBuilder::new(Kind::Custom(9), "hi")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user3)
        .unwrap();
    let err = harness.admit(&content).await.unwrap_err();
    assert_eq!(err.reason(), "unknown member");
}

#[tokio::test]
async fn s3_stale_moderation_event_rejected() {
    let harness = Harness::new();
    let user1 = Keys::generate();

    let create = EventBuilder::new(KIND_GROUP_CREATE_9007, "")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&create).await.unwrap();

    let stale_time = Timestamp::from(Timestamp::now().as_u64() - 120);
    let edit = EventBuilder::new(KIND_GROUP_EDIT_METADATA_9002, "")
        .tags(vec![
            Tag::custom(TagKind::h(), ["a"]),
            Tag::custom(TagKind::Custom("name".into()), ["new"]),
        ])
        .custom_created_at(stale_time)
        .sign_with_keys(&user1)
        .unwrap();
    let err = harness.admit(&edit).await.unwrap_err();
    assert_eq!(err.reason(), "moderation action is too old");
}

#[tokio::test]
async fn s5_previous_tag_prefix_check() {
    let harness = Harness::new();
    let user1 = Keys::generate();

    let create = EventBuilder::new(KIND_GROUP_CREATE_9007, "")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&create).await.unwrap();

    let seeded_id = create.id;
    let prefix = &seeded_id.to_hex()[..8];

    let good = EventBuilder::new(Kind::Custom(9), "ok")
        .tags(vec![
            Tag::custom(TagKind::h(), ["a"]),
            Tag::custom(TagKind::Custom("previous".into()), [prefix.to_string()]),
        ])
        .sign_with_keys(&user1)
        .unwrap();
    assert!(harness.admit(&good).await.is_ok());

    let bad = EventBuilder::new(Kind::Custom(9), "no")
        .tags(vec![
            Tag::custom(TagKind::h(), ["a"]),
            Tag::custom(TagKind::Custom("previous".into()), ["zzzzzzzz"]),
        ])
        .sign_with_keys(&user1)
        .unwrap();
    let err = harness.admit(&bad).await.unwrap_err();
    assert!(err.reason().contains("zzzzzzzz"));
}

#[tokio::test]
async fn s6_delete_cascade_and_replay_guard() {
    let harness = Harness::new();
    let user1 = Keys::generate();

    let create = EventBuilder::new(KIND_GROUP_CREATE_9007, "")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&create).await.unwrap();

    let content = EventBuilder::new(Kind::Custom(9), "delete me")
        .tags(vec![Tag::custom(TagKind::h(), ["a"])])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&content).await.unwrap();
    let target_id = content.id;

    let delete = EventBuilder::new(groups_relay_core::kind::KIND_GROUP_DELETE_EVENT_9005, "")
        .tags(vec![
            Tag::custom(TagKind::h(), ["a"]),
            Tag::custom(TagKind::e(), [target_id.to_hex()]),
        ])
        .sign_with_keys(&user1)
        .unwrap();
    harness.admit(&delete).await.unwrap();

    let remaining = harness.store.query(Filter::new().id(target_id)).await.unwrap();
    assert!(remaining.is_empty());
    assert!(harness.deleted_cache.contains(&target_id).await);
}
