//! The six ordered pre-save rejectors (§4.3). First rejection wins.

use crate::action::Action;
use crate::error::{Error, Result};
use crate::kind::{is_moderation_kind, KIND_GROUP_CREATE_9007, KIND_GROUP_USER_JOIN_REQUEST_9021};
use crate::pipeline::AdmissionContext;
use nostr::TagKind;
use std::collections::HashSet;

pub async fn require_group_tag_and_existence(ctx: &AdmissionContext<'_>) -> Result<()> {
    let Some(group_id) = ctx.group_id() else {
        return Err(Error::notice("missing group (h) tag"));
    };
    let exists = ctx.registry.contains(group_id);
    if ctx.event.kind == KIND_GROUP_CREATE_9007 {
        return Ok(());
    }
    if !exists {
        return Err(Error::notice(format!("group '{group_id}' doesn't exist")));
    }
    Ok(())
}

pub fn moderation_event_recency(ctx: &AdmissionContext<'_>) -> Result<()> {
    if !is_moderation_kind(&ctx.event.kind) {
        return Ok(());
    }
    let now = ctx.clock.now().as_u64();
    if ctx.event.created_at.as_u64() + ctx.too_old_secs <= now {
        return Err(Error::notice("moderation action is too old"));
    }
    Ok(())
}

pub fn write_eligibility(ctx: &AdmissionContext<'_>) -> Result<()> {
    let group_id = ctx.group_id();

    if ctx.event.kind == KIND_GROUP_USER_JOIN_REQUEST_9021 {
        let Some(group_id) = group_id else {
            return Err(Error::notice("missing group (h) tag"));
        };
        let Some(group) = ctx.registry.get(group_id) else {
            return Err(Error::notice(format!("group '{group_id}' doesn't exist")));
        };
        if group.is_member(&ctx.event.pubkey) {
            return Err(Error::duplicate("already a member"));
        }
        if group.is_closed() {
            let code = ctx.event.tags.find(TagKind::Custom("code".into())).and_then(|t| t.content());
            match code {
                None => return Err(Error::notice("group is closed, invite code required")),
                Some(code) => {
                    if !ctx
                        .invite_store
                        .try_redeem(group_id, code, ctx.event.pubkey, ctx.event.created_at)
                    {
                        return Err(Error::notice("invalid invite code"));
                    }
                }
            }
        }
        return Ok(());
    }

    if ctx.event.kind == KIND_GROUP_CREATE_9007 {
        let Some(group_id) = group_id else {
            return Err(Error::notice("missing group (h) tag"));
        };
        if ctx.registry.contains(group_id) {
            return Err(Error::duplicate(format!("group '{group_id}' already exists")));
        }
        return Ok(());
    }

    if ctx.event.pubkey == ctx.relay_pubkey {
        return Ok(());
    }

    if let Some(group_id) = group_id {
        if let Some(group) = ctx.registry.get(group_id) {
            if !group.is_member(&ctx.event.pubkey) {
                return Err(Error::notice("unknown member"));
            }
        }
    }
    Ok(())
}

pub async fn anti_replay_delete_cache(ctx: &AdmissionContext<'_>) -> Result<()> {
    if ctx
        .deleted_cache
        .contains(&ctx.event.id, ctx.clock.now(), ctx.too_old_secs)
        .await
    {
        return Err(Error::deleted("this was deleted"));
    }
    Ok(())
}

pub fn moderation_permission_check(ctx: &AdmissionContext<'_>) -> Result<()> {
    let Some(action) = Action::decode(ctx.event)? else {
        return Ok(());
    };
    if matches!(action, Action::CreateGroup { .. }) {
        return Ok(());
    }
    if !ctx.allow_private_groups {
        if let Action::EditMetadata { private: Some(true), .. } = &action {
            return Err(Error::restricted("private groups are disabled"));
        }
    }
    if ctx.event.pubkey == ctx.relay_pubkey {
        return Ok(());
    }
    let Some(group_id) = ctx.group_id() else {
        return Err(Error::notice("missing group (h) tag"));
    };
    let Some(group) = ctx.registry.get(group_id) else {
        return Err(Error::notice(format!("group '{group_id}' doesn't exist")));
    };

    let snapshot = group.snapshot();
    let role_names: HashSet<String> = snapshot
        .members
        .get(&ctx.event.pubkey)
        .cloned()
        .unwrap_or_default();
    let held_roles: Vec<&crate::role::Role> = snapshot
        .roles
        .iter()
        .filter(|r| role_names.contains(&r.name))
        .collect();

    if held_roles.is_empty() {
        return Err(Error::restricted("insufficient permissions"));
    }

    let allowed = held_roles.iter().any(|role| ctx.allow_action.allow(&group, role, &action));
    if allowed {
        Ok(())
    } else {
        Err(Error::restricted("insufficient permissions"))
    }
}

pub fn previous_reference_check(ctx: &AdmissionContext<'_>) -> Result<()> {
    let Some(previous) = ctx.event.tags.find(TagKind::Custom("previous".into())) else {
        return Ok(());
    };
    let Some(group_id) = ctx.group_id() else {
        return Err(Error::notice("missing group (h) tag"));
    };
    let Some(group) = ctx.registry.get(group_id) else {
        return Err(Error::notice(format!("group '{group_id}' doesn't exist")));
    };
    for prefix in previous.as_slice().iter().skip(1) {
        if prefix.len() > 64 || !group.contains_ref_prefix(prefix) {
            return Err(Error::notice(format!(
                "previous-tag prefix '{prefix}' not found in reference window"
            )));
        }
    }
    Ok(())
}
