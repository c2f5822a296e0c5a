//! Admission Pipeline: the ordered rejector chain and post-save effect
//! chain every incoming signed event traverses (§4.3).

pub mod effects;
pub mod rejectors;

use crate::clock::Clock;
use crate::deleted_cache::DeletedCache;
use crate::error::Result;
use crate::host::{AllowAction, RelayHost};
use crate::invite::InviteStore;
use crate::registry::Registry;
use crate::store::EventStore;
use nostr::{Event, Keys, PublicKey, TagKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AdmissionContext<'a> {
    pub event: &'a Event,
    pub registry: &'a Registry,
    pub store: &'a dyn EventStore,
    pub host: &'a dyn RelayHost,
    pub allow_action: &'a dyn AllowAction,
    pub deleted_cache: &'a Arc<DeletedCache>,
    pub invite_store: &'a InviteStore,
    pub clock: &'a dyn Clock,
    pub relay_pubkey: PublicKey,
    pub relay_keys: Keys,
    pub allow_private_groups: bool,
    pub too_old_secs: u64,
    pub shutdown: CancellationToken,
}

impl<'a> AdmissionContext<'a> {
    pub fn group_id(&self) -> Option<&str> {
        self.event.tags.find(TagKind::h()).and_then(|t| t.content())
    }
}

/// Run the six ordered rejectors; the first rejection wins (§4.3).
pub async fn run_rejectors(ctx: &AdmissionContext<'_>) -> Result<()> {
    rejectors::require_group_tag_and_existence(ctx).await?;
    rejectors::moderation_event_recency(ctx)?;
    rejectors::write_eligibility(ctx)?;
    rejectors::anti_replay_delete_cache(ctx).await?;
    rejectors::moderation_permission_check(ctx)?;
    rejectors::previous_reference_check(ctx)?;
    Ok(())
}

/// Run the four ordered post-save effects. A single effect's failure is
/// logged and does not unwind the accepted event, except step 1's registry
/// creation failure, which is propagated (§4.3, §4.7).
pub async fn run_effects(ctx: &AdmissionContext<'_>) -> Result<()> {
    effects::apply_moderation_action(ctx).await?;
    effects::broadcast_derived_views(ctx).await;
    effects::react_to_join_or_leave(ctx).await;
    effects::extend_ref_window(ctx);
    Ok(())
}

/// Admit `event`: run the rejector chain, and if accepted, save it and run
/// the effect chain. Returns the rejection error without saving when the
/// rejector chain fails.
pub async fn admit(ctx: &AdmissionContext<'_>) -> Result<()> {
    run_rejectors(ctx).await?;
    ctx.store
        .save(ctx.event.clone())
        .await
        .map_err(|e| crate::error::Error::system(format!("failed to save event: {e}")))?;
    run_effects(ctx).await
}
