//! Invite codes gating joins of closed groups (§3, §10).
//!
//! Codes may be reusable or single-use; a single-use code is consumed
//! (marked redeemed) on first successful join and refused thereafter even
//! before its optional expiration.

use nostr::{PublicKey, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Invite {
    pub code: String,
    pub group_id: String,
    pub creator: PublicKey,
    pub created_at: Timestamp,
    pub expiration: Option<Timestamp>,
    pub reusable: bool,
    pub redeemed_by: Option<(PublicKey, Timestamp)>,
}

impl Invite {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration.is_some_and(|exp| now >= exp)
    }

    pub fn is_usable(&self, now: Timestamp) -> bool {
        if self.is_expired(now) {
            return false;
        }
        self.reusable || self.redeemed_by.is_none()
    }
}

/// Per-group invite code storage, keyed by code value. One instance is
/// shared across groups, scoped by `group_id` on each entry.
#[derive(Debug, Default)]
pub struct InviteStore {
    invites: RwLock<HashMap<String, Invite>>,
}

impl InviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        code: String,
        group_id: String,
        creator: PublicKey,
        created_at: Timestamp,
        expiration: Option<Timestamp>,
        reusable: bool,
    ) {
        self.invites.write().insert(
            code.clone(),
            Invite {
                code,
                group_id,
                creator,
                created_at,
                expiration,
                reusable,
                redeemed_by: None,
            },
        );
    }

    /// Validate `code` against `group_id` and, if usable, mark it redeemed.
    pub fn try_redeem(&self, group_id: &str, code: &str, redeemer: PublicKey, now: Timestamp) -> bool {
        let mut invites = self.invites.write();
        let Some(invite) = invites.get_mut(code) else {
            return false;
        };
        if invite.group_id != group_id || !invite.is_usable(now) {
            return false;
        }
        invite.redeemed_by = Some((redeemer, now));
        true
    }

    pub fn reap_expired(&self, now: Timestamp) -> usize {
        let mut invites = self.invites.write();
        let before = invites.len();
        invites.retain(|_, invite| !invite.is_expired(now));
        before - invites.len()
    }
}

/// Spawn the 5-minute invite-code reaper (§4.4). Cancels cleanly via `token`.
pub fn spawn_reaper(store: Arc<InviteStore>, token: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(5 * 60));
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("invite reaper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let removed = store.reap_expired(Timestamp::now());
                    if removed > 0 {
                        debug!(removed, "reaped expired invite codes");
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::Keys;

    #[test]
    fn single_use_invite_is_consumed_on_first_redemption() {
        let store = InviteStore::new();
        let creator = Keys::generate().public_key();
        let redeemer = Keys::generate().public_key();
        let now = Timestamp::now();
        store.create("abc".into(), "g1".into(), creator, now, None, false);

        assert!(store.try_redeem("g1", "abc", redeemer, now));
        assert!(!store.try_redeem("g1", "abc", redeemer, now));
    }

    #[test]
    fn reusable_invite_survives_multiple_redemptions() {
        let store = InviteStore::new();
        let creator = Keys::generate().public_key();
        let now = Timestamp::now();
        store.create("abc".into(), "g1".into(), creator, now, None, true);

        assert!(store.try_redeem("g1", "abc", Keys::generate().public_key(), now));
        assert!(store.try_redeem("g1", "abc", Keys::generate().public_key(), now));
    }

    #[test]
    fn expired_invite_is_refused_even_if_reusable() {
        let store = InviteStore::new();
        let creator = Keys::generate().public_key();
        let now = Timestamp::now();
        let expiration = Timestamp::from(now.as_u64() - 1);
        store.create("abc".into(), "g1".into(), creator, now, Some(expiration), true);

        assert!(!store.try_redeem("g1", "abc", Keys::generate().public_key(), now));
    }

    #[test]
    fn reaper_removes_only_expired_entries() {
        let store = InviteStore::new();
        let creator = Keys::generate().public_key();
        let now = Timestamp::now();
        let expired = Timestamp::from(now.as_u64() - 1);
        store.create("expired".into(), "g1".into(), creator, now, Some(expired), false);
        store.create("alive".into(), "g1".into(), creator, now, None, false);

        assert_eq!(store.reap_expired(now), 1);
        assert!(store.try_redeem("g1", "alive", Keys::generate().public_key(), now));
    }
}
