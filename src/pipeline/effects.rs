//! The four ordered post-save effects (§4.3). A single effect's failure is
//! logged and the chain continues, except registry-creation failure inside
//! "apply moderation action", which is fatal to that event.

use crate::action::Action;
use crate::error::Result;
use crate::kind::{
    KIND_GROUP_ADD_USER_9000, KIND_GROUP_CREATE_9007, KIND_GROUP_EDIT_METADATA_9002,
    KIND_GROUP_REMOVE_USER_9001, KIND_GROUP_USER_JOIN_REQUEST_9021,
    KIND_GROUP_USER_LEAVE_REQUEST_9022,
};
use crate::pipeline::AdmissionContext;
use crate::query::views;
use nostr::{EventId, Tag, TagKind};
use std::time::Duration;
use tracing::error;

/// Effect 1: decode and apply the moderation action, creating or removing
/// the registry entry as needed; for `DeleteEvent`, delete the referenced
/// events from the store and seed the anti-replay cache.
pub async fn apply_moderation_action(ctx: &AdmissionContext<'_>) -> Result<()> {
    let Some(action) = Action::decode(ctx.event)? else {
        return Ok(());
    };

    if let Action::CreateGroup { creator, when } = &action {
        let Some(group_id) = ctx.group_id() else {
            return Err(crate::error::Error::notice("missing group (h) tag"));
        };
        ctx.registry.insert_new(group_id, *creator, *when)?;
        return Ok(());
    }

    let Some(group_id) = ctx.group_id() else {
        return Ok(());
    };
    let Some(group) = ctx.registry.get(group_id) else {
        return Ok(());
    };
    action.apply(&group, &ctx.relay_pubkey)?;
    drop(group);

    if matches!(action, Action::DeleteGroup { .. }) {
        ctx.registry.remove(group_id);
        return Ok(());
    }

    if let Action::DeleteEvent { targets, .. } = &action {
        for hex_id in targets {
            let Ok(id) = EventId::from_hex(hex_id) else { continue };
            if let Err(e) = ctx.store.delete(id).await {
                error!(error = %e, id = %hex_id, "failed to delete event from store");
                continue;
            }
            ctx.deleted_cache.insert_with_expiry(
                id,
                ctx.clock.now(),
                Duration::from_secs(ctx.too_old_secs),
                ctx.shutdown.clone(),
            );
        }
    }

    Ok(())
}

/// Effect 2: regenerate and broadcast the view events the action kind maps to.
pub async fn broadcast_derived_views(ctx: &AdmissionContext<'_>) {
    let Some(group_id) = ctx.group_id() else { return };
    let Some(group) = ctx.registry.get(group_id) else { return };

    let generators: Vec<fn(&crate::group::Group, &nostr::Keys) -> nostr::UnsignedEvent> =
        if ctx.event.kind == KIND_GROUP_CREATE_9007 {
            vec![views::metadata_event, views::admins_event, views::members_event, views::roles_event]
        } else if ctx.event.kind == KIND_GROUP_EDIT_METADATA_9002 {
            vec![views::metadata_event]
        } else if ctx.event.kind == KIND_GROUP_ADD_USER_9000 {
            vec![views::admins_event, views::members_event]
        } else if ctx.event.kind == KIND_GROUP_REMOVE_USER_9001 {
            vec![views::members_event]
        } else {
            Vec::new()
        };

    for generate in generators {
        let unsigned = generate(&group, &ctx.relay_keys);
        match unsigned.sign_with_keys(&ctx.relay_keys) {
            Ok(signed) => {
                if let Err(e) = ctx.store.save(signed.clone()).await {
                    error!(error = %e, "failed to save derived view event");
                    continue;
                }
                ctx.host.broadcast_event(signed).await;
            }
            Err(e) => error!(error = %e, "failed to sign derived view event"),
        }
    }
}

/// Effect 3: turn a join/leave request into a `PutUser`/`RemoveUser`, signed
/// and saved by the relay, then broadcast.
pub async fn react_to_join_or_leave(ctx: &AdmissionContext<'_>) {
    let Some(group_id) = ctx.group_id() else { return };
    let Some(group) = ctx.registry.get(group_id) else { return };

    if ctx.event.kind == KIND_GROUP_USER_JOIN_REQUEST_9021 {
        let previously_removed = ctx
            .store
            .query_moderation_log(group_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .any(|e| {
                e.kind == KIND_GROUP_REMOVE_USER_9001
                    && e.tags
                        .filter(TagKind::p())
                        .filter_map(|t| t.content())
                        .any(|p| p == ctx.event.pubkey.to_hex())
            });
        if previously_removed {
            return;
        }

        // Rejector 3 already gates closed-group joins on a redeemed invite
        // code before this effect runs, so a join reaching here is always
        // admissible: issue the PutUser unconditionally (§4.3 effect 3).
        let builder = nostr::EventBuilder::new(KIND_GROUP_ADD_USER_9000, "").tags(vec![
            Tag::custom(TagKind::h(), [group_id.to_string()]),
            Tag::custom(TagKind::p(), [ctx.event.pubkey.to_hex()]),
        ]);
        match builder.sign_with_keys(&ctx.relay_keys) {
            Ok(signed) => {
                if let Err(e) = ctx.store.save(signed.clone()).await {
                    error!(error = %e, "failed to save synthesized put-user event");
                    return;
                }
                ctx.host.broadcast_event(signed).await;
            }
            Err(e) => error!(error = %e, "failed to sign synthesized put-user event"),
        }
        return;
    }

    if ctx.event.kind == KIND_GROUP_USER_LEAVE_REQUEST_9022 && group.is_member(&ctx.event.pubkey) {
        let builder = nostr::EventBuilder::new(KIND_GROUP_REMOVE_USER_9001, "").tags(vec![
            Tag::custom(TagKind::h(), [group_id.to_string()]),
            Tag::custom(TagKind::p(), [ctx.event.pubkey.to_hex()]),
        ]);
        match builder.sign_with_keys(&ctx.relay_keys) {
            Ok(signed) => {
                if let Err(e) = ctx.store.save(signed.clone()).await {
                    error!(error = %e, "failed to save synthesized remove-user event");
                    return;
                }
                ctx.host.broadcast_event(signed).await;
            }
            Err(e) => error!(error = %e, "failed to sign synthesized remove-user event"),
        }
    }
}

/// Effect 4: append the accepted event's id to the group's reference window.
pub fn extend_ref_window(ctx: &AdmissionContext<'_>) {
    let Some(group_id) = ctx.group_id() else { return };
    let Some(group) = ctx.registry.get(group_id) else { return };
    group.push_ref_window(ctx.event.id);
}
