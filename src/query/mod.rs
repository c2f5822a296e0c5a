//! Query handlers: four view-event synthesizers plus the normal-event
//! privacy gate (§4.6). Each handler only responds if its kind is present
//! in the filter.

pub mod normal;
pub mod views;

use crate::kind::{
    KIND_GROUP_ADMINS_39001, KIND_GROUP_MEMBERS_39002, KIND_GROUP_METADATA_39000,
    KIND_GROUP_ROLES_39003,
};
use crate::registry::Registry;
use nostr::{Filter, Keys, PublicKey};

/// Resolve the group ids a metadata-range query targets: the explicit `d`
/// values if given, else every public, non-closed group.
fn target_group_ids(filter: &Filter, registry: &Registry, all_ids: &[String]) -> Vec<String> {
    let d_values: Vec<String> = filter
        .generic_tags
        .get(&nostr::SingleLetterTag::lowercase(nostr::Alphabet::D))
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default();

    if !d_values.is_empty() {
        return d_values;
    }

    all_ids
        .iter()
        .filter(|id| {
            registry
                .get(id)
                .map(|g| !g.is_private() && !g.is_closed())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// True if `subscriber` may see one of `group`'s view events: any public
/// group, the relay itself, or a private group the subscriber is a member of.
fn may_view_private_lists(group: &crate::group::Group, relay_keys: &Keys, subscriber: Option<PublicKey>) -> bool {
    if !group.is_private() || subscriber == Some(relay_keys.public_key()) {
        return true;
    }
    matches!(subscriber, Some(pk) if group.is_member(&pk))
}

pub fn handle_metadata_view(
    filter: &Filter,
    registry: &Registry,
    all_ids: &[String],
    relay_keys: &Keys,
    subscriber: Option<PublicKey>,
) -> Vec<nostr::Event> {
    if !filter.kinds.as_ref().is_some_and(|kinds| kinds.contains(&KIND_GROUP_METADATA_39000)) {
        return Vec::new();
    }
    target_group_ids(filter, registry, all_ids)
        .into_iter()
        .filter_map(|id| {
            let group = registry.get(&id)?;
            if !may_view_private_lists(&group, relay_keys, subscriber) {
                return None;
            }
            let unsigned = views::metadata_event(&group, relay_keys);
            unsigned.sign_with_keys(relay_keys).ok()
        })
        .collect()
}

pub fn handle_admins_view(
    filter: &Filter,
    registry: &Registry,
    all_ids: &[String],
    relay_keys: &Keys,
    subscriber: Option<PublicKey>,
) -> Vec<nostr::Event> {
    if !filter.kinds.as_ref().is_some_and(|kinds| kinds.contains(&KIND_GROUP_ADMINS_39001)) {
        return Vec::new();
    }
    target_group_ids(filter, registry, all_ids)
        .into_iter()
        .filter_map(|id| {
            let group = registry.get(&id)?;
            if !may_view_private_lists(&group, relay_keys, subscriber) {
                return None;
            }
            views::admins_event(&group, relay_keys).sign_with_keys(relay_keys).ok()
        })
        .collect()
}

pub fn handle_members_view(
    filter: &Filter,
    registry: &Registry,
    all_ids: &[String],
    relay_keys: &Keys,
    subscriber: Option<PublicKey>,
) -> Vec<nostr::Event> {
    if !filter.kinds.as_ref().is_some_and(|kinds| kinds.contains(&KIND_GROUP_MEMBERS_39002)) {
        return Vec::new();
    }
    target_group_ids(filter, registry, all_ids)
        .into_iter()
        .filter_map(|id| {
            let group = registry.get(&id)?;
            if !may_view_private_lists(&group, relay_keys, subscriber) {
                return None;
            }
            views::members_event(&group, relay_keys).sign_with_keys(relay_keys).ok()
        })
        .collect()
}

pub fn handle_roles_view(
    filter: &Filter,
    registry: &Registry,
    all_ids: &[String],
    relay_keys: &Keys,
    subscriber: Option<PublicKey>,
) -> Vec<nostr::Event> {
    if !filter.kinds.as_ref().is_some_and(|kinds| kinds.contains(&KIND_GROUP_ROLES_39003)) {
        return Vec::new();
    }
    target_group_ids(filter, registry, all_ids)
        .into_iter()
        .filter_map(|id| {
            let group = registry.get(&id)?;
            if !may_view_private_lists(&group, relay_keys, subscriber) {
                return None;
            }
            views::roles_event(&group, relay_keys).sign_with_keys(relay_keys).ok()
        })
        .collect()
}
