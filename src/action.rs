//! Action Codec: decode a signed moderation event into a typed [`Action`]
//! and apply it to a [`Group`] (§4.1).

use crate::error::{Error, Result};
use crate::group::Group;
use crate::kind::*;
use nostr::{Event, PublicKey, Tag, TagKind, Timestamp};
use std::collections::HashSet;
use strum::Display;

/// A decoded moderation action, carrying the issuing event's timestamp.
#[derive(Debug, Clone, Display)]
pub enum Action {
    CreateGroup {
        creator: PublicKey,
        when: Timestamp,
    },
    DeleteGroup {
        when: Timestamp,
    },
    PutUser {
        targets: Vec<(PublicKey, Vec<String>)>,
        when: Timestamp,
    },
    RemoveUser {
        targets: Vec<PublicKey>,
        when: Timestamp,
    },
    EditMetadata {
        name: Option<String>,
        about: Option<String>,
        picture: Option<String>,
        private: Option<bool>,
        closed: Option<bool>,
        broadcast: Option<bool>,
        unknown_tags: Vec<Tag>,
        when: Timestamp,
    },
    DeleteEvent {
        targets: Vec<String>,
        when: Timestamp,
    },
}

fn p_tag_members(event: &Event) -> Result<Vec<(PublicKey, Vec<String>)>> {
    let mut out = Vec::new();
    for tag in event.tags.filter(TagKind::p()) {
        let content = tag.content().ok_or_else(|| Error::notice("p tag missing value"))?;
        let pubkey = PublicKey::parse(content)
            .map_err(|_| Error::notice(format!("p tag '{content}' is not a valid public key")))?;
        let roles: Vec<String> = tag.as_slice().iter().skip(2).map(|s| s.to_string()).collect();
        out.push((pubkey, roles));
    }
    if out.is_empty() {
        return Err(Error::notice("action requires at least one p tag"));
    }
    Ok(out)
}

fn tag_value<'a>(event: &'a Event, kind: TagKind<'a>) -> Option<&'a str> {
    event.tags.find(kind).and_then(|t| t.content())
}

impl Action {
    /// Decode `event` into an `Action` if its kind is a recognized
    /// moderation kind. Returns `Ok(None)` for unrelated kinds.
    pub fn decode(event: &Event) -> Result<Option<Action>> {
        let when = event.created_at;
        match event.kind {
            k if k == KIND_GROUP_CREATE_9007 => Ok(Some(Action::CreateGroup {
                creator: event.pubkey,
                when,
            })),
            k if k == KIND_GROUP_DELETE_9008 => Ok(Some(Action::DeleteGroup { when })),
            k if k == KIND_GROUP_ADD_USER_9000 || k == KIND_GROUP_SET_ROLES_9006 => {
                Ok(Some(Action::PutUser {
                    targets: p_tag_members(event)?,
                    when,
                }))
            }
            k if k == KIND_GROUP_REMOVE_USER_9001 => {
                let targets: Vec<PublicKey> = p_tag_members(event)?
                    .into_iter()
                    .map(|(pk, _)| pk)
                    .collect();
                Ok(Some(Action::RemoveUser { targets, when }))
            }
            k if k == KIND_GROUP_EDIT_METADATA_9002 => {
                let public = event.tags.find(TagKind::Custom("public".into())).is_some();
                let private_tag = event.tags.find(TagKind::Custom("private".into())).is_some();
                if public && private_tag {
                    return Err(Error::notice("contradiction: both public and private tags present"));
                }
                let open = event.tags.find(TagKind::Custom("open".into())).is_some();
                let closed_tag = event.tags.find(TagKind::Custom("closed".into())).is_some();
                if open && closed_tag {
                    return Err(Error::notice("contradiction: both open and closed tags present"));
                }

                let name = tag_value(event, TagKind::Custom("name".into())).map(str::to_string);
                let about = tag_value(event, TagKind::Custom("about".into())).map(str::to_string);
                let picture = tag_value(event, TagKind::Custom("picture".into())).map(str::to_string);
                let broadcast = event
                    .tags
                    .find(TagKind::Custom("broadcast".into()))
                    .map(|_| true);

                let private = if private_tag {
                    Some(true)
                } else if public {
                    Some(false)
                } else {
                    None
                };
                let closed = if closed_tag {
                    Some(true)
                } else if open {
                    Some(false)
                } else {
                    None
                };

                if name.is_none()
                    && about.is_none()
                    && picture.is_none()
                    && private.is_none()
                    && closed.is_none()
                    && broadcast.is_none()
                {
                    return Err(Error::notice("edit-metadata event carries no recognized fields"));
                }

                let known: HashSet<&str> = HashSet::from([
                    "name", "about", "picture", "public", "private", "open", "closed",
                    "broadcast", "h",
                ]);
                let unknown_tags: Vec<Tag> = event
                    .tags
                    .iter()
                    .filter(|t| !known.contains(t.kind().as_str()))
                    .cloned()
                    .collect();

                Ok(Some(Action::EditMetadata {
                    name,
                    about,
                    picture,
                    private,
                    closed,
                    broadcast,
                    unknown_tags,
                    when,
                }))
            }
            k if k == KIND_GROUP_DELETE_EVENT_9005 => {
                let targets: Vec<String> = event
                    .tags
                    .filter(TagKind::e())
                    .filter_map(|t| t.content())
                    .map(str::to_string)
                    .collect();
                if targets.is_empty() {
                    return Err(Error::notice("delete-event requires at least one e tag"));
                }
                for id in &targets {
                    if id.len() != 64 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                        return Err(Error::notice(format!("e tag '{id}' is not a valid 32-byte hex id")));
                    }
                }
                Ok(Some(Action::DeleteEvent { targets, when }))
            }
            _ => Ok(None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateGroup { .. } => "create-group",
            Action::DeleteGroup { .. } => "delete-group",
            Action::PutUser { .. } => "put-user",
            Action::RemoveUser { .. } => "remove-user",
            Action::EditMetadata { .. } => "edit-metadata",
            Action::DeleteEvent { .. } => "delete-event",
        }
    }

    /// Mutate `group` according to this action (§4.1's "Application semantics").
    /// `CreateGroup` and `DeleteEvent` are no-ops here: group creation/removal
    /// and store deletion are the pipeline's responsibility, not the codec's.
    pub fn apply(&self, group: &Group, relay_pubkey: &PublicKey) -> Result<()> {
        match self {
            Action::CreateGroup { .. } => Ok(()),
            Action::DeleteGroup { when } => {
                group.clear_for_delete(*when);
                Ok(())
            }
            Action::PutUser { targets, when } => {
                for (pubkey, roles) in targets {
                    group.put_user(*pubkey, roles.clone(), *when);
                }
                group.validate_has_admin()
            }
            Action::RemoveUser { targets, when } => {
                if group.would_strip_last_admin(targets) {
                    return Err(Error::notice("action would leave the group without an admin"));
                }
                group.remove_users(targets, relay_pubkey, *when);
                Ok(())
            }
            Action::EditMetadata {
                name,
                about,
                picture,
                private,
                closed,
                broadcast,
                unknown_tags,
                when,
            } => {
                group.set_metadata(
                    name.clone(),
                    about.clone(),
                    picture.clone(),
                    *private,
                    *closed,
                    *broadcast,
                    unknown_tags.clone(),
                    *when,
                );
                Ok(())
            }
            Action::DeleteEvent { .. } => Ok(()),
        }
    }
}
