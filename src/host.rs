//! The relay host interface the core depends on (§6): broadcasting derived
//! events, delegating to the framework's own admission path for events the
//! core itself synthesizes, and resolving a subscription's authenticated
//! pubkey.

use crate::action::Action;
use crate::group::Group;
use crate::role::Role;
use async_trait::async_trait;
use nostr::{Event, PublicKey};

#[async_trait]
pub trait RelayHost: Send + Sync {
    /// Fan a relay-signed, core-synthesized event out to live subscribers.
    async fn broadcast_event(&self, event: Event);

    /// Run a core-synthesized event (a view regeneration, a derived
    /// `PutUser`/`RemoveUser`) through the framework's own admission path.
    /// Returns whether the event was also broadcast by the framework, so
    /// the core does not double-broadcast.
    async fn add_event(&self, event: Event) -> anyhow::Result<bool>;

    /// The authenticated pubkey for the current connection/subscription, if any.
    fn authenticated_pubkey(&self) -> Option<PublicKey>;
}

/// Host-supplied predicate consulted by admission rejector 5 (§4.3): given
/// the group, one role the author holds, and the decoded action, may that
/// role perform it? The core accepts if *any* held role returns true.
pub trait AllowAction: Send + Sync {
    fn allow(&self, group: &Group, role: &Role, action: &Action) -> bool;
}

impl<F> AllowAction for F
where
    F: Fn(&Group, &Role, &Action) -> bool + Send + Sync,
{
    fn allow(&self, group: &Group, role: &Role, action: &Action) -> bool {
        (self)(group, role, action)
    }
}

/// The conventional default: a role may act if it holds the permission
/// matching the action's kind. Groups with no finer-grained policy can use
/// this directly as their `AllowAction`.
pub struct DefaultAllowAction;

impl AllowAction for DefaultAllowAction {
    fn allow(&self, _group: &Group, role: &Role, action: &Action) -> bool {
        use crate::role::Permission;
        match action {
            Action::CreateGroup { .. } => true,
            Action::DeleteGroup { .. } => role.has(Permission::DeleteGroup),
            Action::PutUser { .. } => role.has(Permission::AddUser),
            Action::RemoveUser { .. } => role.has(Permission::RemoveUser),
            Action::EditMetadata { private, .. } => {
                if private.is_some() {
                    role.has(Permission::EditGroupStatus)
                } else {
                    role.has(Permission::EditMetadata)
                }
            }
            Action::DeleteEvent { .. } => role.has(Permission::DeleteEvent),
        }
    }
}
