//! Content-event query handling: delegate to the store, then gate results
//! from private groups by membership (§4.6).

use crate::registry::Registry;
use nostr::{Event, PublicKey};
use std::cell::RefCell;
use std::collections::HashMap;

/// Per-subscription membership memo, avoiding a lock acquisition per result
/// for groups already checked during this query.
#[derive(Default)]
pub struct MembershipMemo {
    cache: RefCell<HashMap<(String, PublicKey), bool>>,
}

impl MembershipMemo {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_member(&self, registry: &Registry, group_id: &str, subscriber: &PublicKey) -> bool {
        if let Some(hit) = self.cache.borrow().get(&(group_id.to_string(), *subscriber)) {
            return *hit;
        }
        let is_member = registry
            .get(group_id)
            .map(|group| group.is_member(subscriber))
            .unwrap_or(false);
        self.cache
            .borrow_mut()
            .insert((group_id.to_string(), *subscriber), is_member);
        is_member
    }
}

/// Suppress results from private groups unless the subscriber is a member.
/// Events with no `h` tag (not group-scoped) always pass through.
pub fn filter_by_group_privacy(
    events: Vec<Event>,
    registry: &Registry,
    subscriber: Option<PublicKey>,
    memo: &MembershipMemo,
) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| {
            let Some(group_id) = event.tags.find(nostr::TagKind::h()).and_then(|t| t.content()) else {
                return true;
            };
            let Some(group) = registry.get(group_id) else {
                return true;
            };
            if !group.is_private() {
                return true;
            }
            match subscriber {
                Some(pubkey) => memo.is_member(registry, group_id, &pubkey),
                None => false,
            }
        })
        .collect()
}
