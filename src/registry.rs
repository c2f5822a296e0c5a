//! Group Registry: the concurrent `id -> Group` map and startup replay (§4.2).

use crate::action::Action;
use crate::config::GroupEngineSettings;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::kind::KIND_GROUP_CREATE_9007;
use crate::role::{full_admin_role, member_role, Role};
use crate::store::EventStore;
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use nostr::PublicKey;
use std::sync::Arc;
use tracing::info;

/// Concurrent mapping from group id to its state. Lock-free reads across
/// groups; writes within a group are serialized by that group's own lock.
pub struct Registry {
    groups: DashMap<String, Arc<Group>>,
    relay_pubkey: PublicKey,
    default_roles: Vec<Role>,
    creator_default_role: String,
    ref_window_size: usize,
}

impl Registry {
    pub fn new(relay_pubkey: PublicKey, settings: &GroupEngineSettings) -> Self {
        let default_roles = settings
            .default_roles
            .iter()
            .map(|name| {
                if name == "admin" {
                    full_admin_role()
                } else {
                    member_role()
                }
            })
            .collect();

        Registry {
            groups: DashMap::new(),
            relay_pubkey,
            default_roles,
            creator_default_role: settings.group_creator_default_role.clone(),
            ref_window_size: settings.ref_window_size,
        }
    }

    pub fn get(&self, id: &str) -> Option<Ref<'_, String, Arc<Group>>> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    pub fn remove(&self, id: &str) {
        self.groups.remove(id);
    }

    pub fn insert_new(&self, id: &str, creator: PublicKey, when: nostr::Timestamp) -> Result<Arc<Group>> {
        if self.groups.contains_key(id) {
            return Err(Error::duplicate(format!("group '{id}' already exists")));
        }
        let group = Arc::new(Group::new(
            id,
            creator,
            self.relay_pubkey,
            &self.creator_default_role,
            self.default_roles.clone(),
            self.ref_window_size,
            when,
        ));
        self.groups.insert(id.to_string(), group.clone());
        Ok(group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Replay every `CreateGroup` event and its subsequent moderation log
    /// from `store`, in ascending `created_at` order, per group (§4.2). A
    /// group whose most recent action is `DeleteGroup` is left unregistered.
    pub async fn bootstrap(
        relay_pubkey: PublicKey,
        settings: &GroupEngineSettings,
        store: &dyn EventStore,
    ) -> Result<Self> {
        let registry = Registry::new(relay_pubkey, settings);

        let creates = store
            .query_by_kind(KIND_GROUP_CREATE_9007)
            .await
            .map_err(|e| Error::replay(format!("failed to load CreateGroup events: {e}")))?;

        for create_event in creates {
            let Some(group_id) = create_event
                .tags
                .find(nostr::TagKind::h())
                .and_then(|t| t.content())
                .map(str::to_string)
            else {
                return Err(Error::replay(format!(
                    "CreateGroup event {} missing h tag",
                    create_event.id
                )));
            };

            registry.insert_new(&group_id, create_event.pubkey, create_event.created_at)?;

            let moderation_log = store
                .query_moderation_log(&group_id)
                .await
                .map_err(|e| Error::replay(format!("failed to load moderation log for '{group_id}': {e}")))?;

            let mut deleted = false;
            for event in moderation_log {
                let Some(action) = Action::decode(&event).map_err(|e| {
                    Error::replay(format!(
                        "malformed moderation event {} in group '{group_id}': {}",
                        event.id,
                        e.reason()
                    ))
                })?
                else {
                    continue;
                };

                if matches!(action, Action::DeleteGroup { .. }) {
                    deleted = true;
                } else {
                    deleted = false;
                }

                if let Some(group) = registry.get(&group_id) {
                    action.apply(&group, &relay_pubkey).map_err(|e| {
                        Error::replay(format!(
                            "replay of {} against group '{group_id}' failed: {}",
                            event.id,
                            e.reason()
                        ))
                    })?;
                }
            }

            if deleted {
                registry.remove(&group_id);
                continue;
            }

            if let Some(group) = registry.get(&group_id) {
                let recent_ids = store
                    .recent_event_ids(&group_id, registry.ref_window_size)
                    .await
                    .map_err(|e| Error::replay(format!("failed to load ref window for '{group_id}': {e}")))?;
                for id in recent_ids {
                    group.push_ref_window(id);
                }
            }
        }

        info!(groups = registry.len(), "group registry bootstrapped");
        Ok(registry)
    }
}
