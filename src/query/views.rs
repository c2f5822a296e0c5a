//! Synthesis of the four replaceable view events (§4.6).
//!
//! Every synthesized event is signed by the relay key and stamped with the
//! corresponding `last_*_update` timestamp, so it is stable across refetches
//! between updates.

use crate::group::{Group, GroupSnapshot};
use crate::kind::{
    KIND_GROUP_ADMINS_39001, KIND_GROUP_MEMBERS_39002, KIND_GROUP_METADATA_39000,
    KIND_GROUP_ROLES_39003,
};
use nostr::{EventBuilder, Keys, Tag, TagKind, UnsignedEvent};

fn status_tags(snapshot: &GroupSnapshot) -> Vec<Tag> {
    let mut tags = vec![
        Tag::custom(
            TagKind::Custom(if snapshot.private { "private" } else { "public" }.into()),
            Vec::<String>::new(),
        ),
        Tag::custom(
            TagKind::Custom(if snapshot.closed { "closed" } else { "open" }.into()),
            Vec::<String>::new(),
        ),
    ];
    if snapshot.broadcast {
        tags.push(Tag::custom(TagKind::Custom("broadcast".into()), Vec::<String>::new()));
    }
    tags
}

pub fn metadata_event(group: &Group, relay_keys: &Keys) -> UnsignedEvent {
    let snapshot = group.snapshot();
    let mut tags = vec![Tag::identifier(group.id.clone())];
    if let Some(name) = &snapshot.name {
        tags.push(Tag::custom(TagKind::Custom("name".into()), [name.clone()]));
    }
    if let Some(picture) = &snapshot.picture {
        tags.push(Tag::custom(TagKind::Custom("picture".into()), [picture.clone()]));
    }
    tags.extend(status_tags(&snapshot));
    tags.extend(snapshot.unknown_metadata_tags.iter().cloned());

    EventBuilder::new(KIND_GROUP_METADATA_39000, snapshot.about.clone().unwrap_or_default())
        .tags(tags)
        .custom_created_at(snapshot.last_metadata_update)
        .build(relay_keys.public_key())
}

pub fn admins_event(group: &Group, relay_keys: &Keys) -> UnsignedEvent {
    let snapshot = group.snapshot();
    let mut tags = vec![Tag::identifier(group.id.clone())];
    for (pubkey, role_names) in &snapshot.members {
        if role_names.is_empty() {
            continue;
        }
        let permissions: Vec<String> = snapshot
            .roles
            .iter()
            .filter(|r| role_names.contains(&r.name))
            .flat_map(|r| r.permissions.iter().map(|p| p.to_string()))
            .collect();
        let mut values = vec![pubkey.to_hex()];
        values.extend(role_names.iter().cloned());
        values.extend(permissions);
        tags.push(Tag::custom(TagKind::p(), values));
    }

    EventBuilder::new(KIND_GROUP_ADMINS_39001, "")
        .tags(tags)
        .custom_created_at(snapshot.last_admins_update)
        .build(relay_keys.public_key())
}

pub fn members_event(group: &Group, relay_keys: &Keys) -> UnsignedEvent {
    let snapshot = group.snapshot();
    let mut tags = vec![Tag::identifier(group.id.clone())];
    for pubkey in snapshot.members.keys() {
        tags.push(Tag::custom(TagKind::p(), [pubkey.to_hex()]));
    }

    EventBuilder::new(KIND_GROUP_MEMBERS_39002, "")
        .tags(tags)
        .custom_created_at(snapshot.last_members_update)
        .build(relay_keys.public_key())
}

pub fn roles_event(group: &Group, relay_keys: &Keys) -> UnsignedEvent {
    let snapshot = group.snapshot();
    let mut tags = vec![Tag::identifier(group.id.clone())];
    for role in &snapshot.roles {
        let mut values = vec![role.name.clone()];
        values.extend(role.permissions.iter().map(|p| p.to_string()));
        tags.push(Tag::custom(TagKind::Custom("role".into()), values));
    }

    EventBuilder::new(KIND_GROUP_ROLES_39003, "")
        .tags(tags)
        .custom_created_at(snapshot.last_members_update)
        .build(relay_keys.public_key())
}

pub fn all_view_events(group: &Group, relay_keys: &Keys) -> Vec<UnsignedEvent> {
    vec![
        metadata_event(group, relay_keys),
        admins_event(group, relay_keys),
        members_event(group, relay_keys),
        roles_event(group, relay_keys),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{full_admin_role, member_role};
    use nostr::Timestamp;

    #[test]
    fn metadata_event_carries_status_tags() {
        let relay = Keys::generate();
        let creator = Keys::generate();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        let event = metadata_event(&group, &relay);
        assert!(event.tags.find(TagKind::Custom("public".into())).is_some());
        assert!(event.tags.find(TagKind::Custom("open".into())).is_some());
    }

    #[test]
    fn admins_event_only_lists_members_with_roles() {
        let relay = Keys::generate();
        let creator = Keys::generate();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        group.put_user(Keys::generate().public_key(), vec![], Timestamp::now());
        let event = admins_event(&group, &relay);
        let p_tags: Vec<_> = event.tags.filter(TagKind::p()).collect();
        assert_eq!(p_tags.len(), 2);
    }
}
