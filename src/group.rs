//! Group state: membership, role catalog, metadata, and the reference window (§3).

use crate::error::{Error, Result};
use crate::role::{union_permissions, Permission, Role};
use nostr::{EventId, PublicKey, Tag, Timestamp};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Ring buffer of the last N accepted event ids for a group (I5). Writes
/// happen only under the owning [`Group`]'s write lock, so the buffer itself
/// needs no further synchronization.
#[derive(Debug, Clone)]
pub struct RefWindow {
    slots: Vec<Option<EventId>>,
    next: usize,
}

impl RefWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            next: 0,
        }
    }

    pub fn push(&mut self, id: EventId) {
        let len = self.slots.len();
        self.slots[self.next % len] = Some(id);
        self.next += 1;
    }

    /// True if `prefix` is a prefix of the hex form of some id currently held.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.slots.iter().flatten().any(|id| id.to_hex().starts_with(prefix))
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    name: Option<String>,
    about: Option<String>,
    picture: Option<String>,
    private: bool,
    closed: bool,
    broadcast: bool,
    members: HashMap<PublicKey, HashSet<String>>,
    roles: Vec<Role>,
    join_requests: HashSet<PublicKey>,
    unknown_metadata_tags: Vec<Tag>,
    last_metadata_update: Timestamp,
    last_admins_update: Timestamp,
    last_members_update: Timestamp,
    ref_window: RefWindow,
}

/// A single group's full mutable state, guarded by one read/write lock (§3).
/// `id` is immutable for the group's lifetime and kept outside the lock.
#[derive(Debug)]
pub struct Group {
    pub id: String,
    state: RwLock<GroupState>,
}

impl Group {
    pub fn new(
        id: impl Into<String>,
        creator: PublicKey,
        relay_pubkey: PublicKey,
        creator_default_role: &str,
        roles: Vec<Role>,
        ref_window_size: usize,
        when: Timestamp,
    ) -> Self {
        let mut members: HashMap<PublicKey, HashSet<String>> = HashMap::new();
        members.insert(creator, HashSet::from([creator_default_role.to_string()]));
        members.insert(relay_pubkey, HashSet::from(["admin".to_string()]));

        Group {
            id: id.into(),
            state: RwLock::new(GroupState {
                name: None,
                about: None,
                picture: None,
                private: false,
                closed: false,
                broadcast: false,
                members,
                roles,
                join_requests: HashSet::new(),
                unknown_metadata_tags: Vec::new(),
                last_metadata_update: when,
                last_admins_update: when,
                last_members_update: when,
                ref_window: RefWindow::new(ref_window_size),
            }),
        }
    }

    pub fn is_member(&self, pubkey: &PublicKey) -> bool {
        self.state.read().members.contains_key(pubkey)
    }

    pub fn is_private(&self) -> bool {
        self.state.read().private
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    pub fn is_broadcast_only(&self) -> bool {
        self.state.read().broadcast
    }

    /// The permission union a member holds, resolved against the role catalog (I4).
    pub fn permissions_of(&self, pubkey: &PublicKey) -> HashSet<Permission> {
        let state = self.state.read();
        let Some(role_names) = state.members.get(pubkey) else {
            return HashSet::new();
        };
        let roles: Vec<&Role> = state
            .roles
            .iter()
            .filter(|r| role_names.contains(&r.name))
            .collect();
        union_permissions(roles)
    }

    pub fn has_permission(&self, pubkey: &PublicKey, permission: Permission) -> bool {
        self.permissions_of(pubkey).contains(&permission)
    }

    /// I7: would removing/clearing the given set of pubkeys leave the group
    /// with no member holding `edit-group-status`?
    pub fn would_strip_last_admin(&self, removed: &[PublicKey]) -> bool {
        let state = self.state.read();
        let remaining_has_admin = state.members.iter().any(|(pk, role_names)| {
            if removed.contains(pk) {
                return false;
            }
            state
                .roles
                .iter()
                .any(|r| role_names.contains(&r.name) && r.has(Permission::EditGroupStatus))
        });
        !remaining_has_admin
    }

    pub fn contains_ref_prefix(&self, prefix: &str) -> bool {
        self.state.read().ref_window.contains_prefix(prefix)
    }

    pub fn push_ref_window(&self, id: EventId) {
        self.state.write().ref_window.push(id);
    }

    pub fn join_requested(&self, pubkey: &PublicKey) -> bool {
        self.state.read().join_requests.contains(pubkey)
    }

    pub fn record_join_request(&self, pubkey: PublicKey) {
        self.state.write().join_requests.insert(pubkey);
    }

    // -- mutation entry points used by `crate::action::Action::apply` --

    pub fn set_metadata(
        &self,
        name: Option<String>,
        about: Option<String>,
        picture: Option<String>,
        private: Option<bool>,
        closed: Option<bool>,
        broadcast: Option<bool>,
        unknown_tags: Vec<Tag>,
        when: Timestamp,
    ) {
        let mut state = self.state.write();
        if let Some(name) = name {
            state.name = Some(name);
        }
        if let Some(about) = about {
            state.about = Some(about);
        }
        if let Some(picture) = picture {
            state.picture = Some(picture);
        }
        if let Some(private) = private {
            state.private = private;
        }
        if let Some(closed) = closed {
            state.closed = closed;
        }
        if let Some(broadcast) = broadcast {
            state.broadcast = broadcast;
        }
        state.unknown_metadata_tags = unknown_tags;
        state.last_metadata_update = when;
    }

    pub fn put_user(&self, target: PublicKey, role_names: Vec<String>, when: Timestamp) {
        let mut state = self.state.write();
        state.join_requests.remove(&target);
        state.members.insert(target, role_names.into_iter().collect());
        state.last_admins_update = when;
        state.last_members_update = when;
    }

    pub fn remove_users(&self, targets: &[PublicKey], relay_pubkey: &PublicKey, when: Timestamp) {
        let mut state = self.state.write();
        for target in targets {
            if target == relay_pubkey {
                continue;
            }
            state.members.remove(target);
        }
        state.last_members_update = when;
        state.last_admins_update = when;
    }

    pub fn clear_for_delete(&self, when: Timestamp) {
        let mut state = self.state.write();
        state.members.clear();
        state.join_requests.clear();
        state.private = true;
        state.closed = true;
        state.name = None;
        state.about = None;
        state.picture = None;
        state.last_metadata_update = when;
        state.last_admins_update = when;
        state.last_members_update = when;
    }

    // -- read accessors for query/view synthesis (§4.6) --

    pub fn snapshot(&self) -> GroupSnapshot {
        let state = self.state.read();
        GroupSnapshot {
            name: state.name.clone(),
            about: state.about.clone(),
            picture: state.picture.clone(),
            private: state.private,
            closed: state.closed,
            broadcast: state.broadcast,
            members: state.members.clone(),
            roles: state.roles.clone(),
            unknown_metadata_tags: state.unknown_metadata_tags.clone(),
            last_metadata_update: state.last_metadata_update,
            last_admins_update: state.last_admins_update,
            last_members_update: state.last_members_update,
        }
    }

    pub fn validate_has_admin(&self) -> Result<()> {
        let state = self.state.read();
        let has_admin = state.members.iter().any(|(_, role_names)| {
            state
                .roles
                .iter()
                .any(|r| role_names.contains(&r.name) && r.has(Permission::EditGroupStatus))
        });
        if has_admin {
            Ok(())
        } else {
            Err(Error::notice("action would leave the group without an admin"))
        }
    }
}

/// A consistent, lock-free-to-read copy of a group's state for view synthesis.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub name: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
    pub private: bool,
    pub closed: bool,
    pub broadcast: bool,
    pub members: HashMap<PublicKey, HashSet<String>>,
    pub roles: Vec<Role>,
    pub unknown_metadata_tags: Vec<Tag>,
    pub last_metadata_update: Timestamp,
    pub last_admins_update: Timestamp,
    pub last_members_update: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{full_admin_role, member_role};
    use nostr::Keys;

    fn keys() -> (Keys, Keys) {
        (Keys::generate(), Keys::generate())
    }

    #[test]
    fn creator_and_relay_are_members() {
        let (creator, relay) = keys();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        assert!(group.is_member(&creator.public_key()));
        assert!(group.is_member(&relay.public_key()));
        assert!(group.has_permission(&relay.public_key(), Permission::EditGroupStatus));
    }

    #[test]
    fn removing_relay_pubkey_is_a_no_op() {
        let (creator, relay) = keys();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        group.remove_users(&[relay.public_key()], &relay.public_key(), Timestamp::now());
        assert!(group.is_member(&relay.public_key()));
    }

    #[test]
    fn ref_window_wraps_and_matches_prefixes() {
        let mut window = RefWindow::new(2);
        let a = EventId::all_zeros();
        window.push(a);
        assert!(window.contains_prefix(&a.to_hex()[..8]));
    }

    #[test]
    fn last_admin_guard_detects_full_strip() {
        let (creator, relay) = keys();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        assert!(group.would_strip_last_admin(&[creator.public_key(), relay.public_key()]));
        assert!(!group.would_strip_last_admin(&[creator.public_key()]));
    }

    #[test]
    fn join_request_is_recorded_for_manual_admin_review() {
        let (creator, relay) = keys();
        let requester = Keys::generate();
        let group = Group::new(
            "g1",
            creator.public_key(),
            relay.public_key(),
            "admin",
            vec![full_admin_role(), member_role()],
            50,
            Timestamp::now(),
        );
        assert!(!group.join_requested(&requester.public_key()));
        group.record_join_request(requester.public_key());
        assert!(group.join_requested(&requester.public_key()));
        assert!(!group.is_member(&requester.public_key()));
    }
}
