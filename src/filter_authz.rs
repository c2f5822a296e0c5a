//! Filter authorization: reject subscription filters before they reach the
//! store (§4.5).

use crate::error::{Error, Result};
use crate::kind::is_metadata_view_kind;
use crate::registry::Registry;
use nostr::{Alphabet, Filter, PublicKey, SingleLetterTag};

pub fn authorize_filter(filter: &Filter, registry: &Registry, subscriber: Option<PublicKey>) -> Result<()> {
    let kinds: Vec<_> = filter.kinds.iter().flatten().collect();
    let metadata_kinds = kinds.iter().any(|k| is_metadata_view_kind(k));
    let other_kinds = kinds.iter().any(|k| !is_metadata_view_kind(k));

    if metadata_kinds && other_kinds {
        return Err(Error::notice("invalid query: cannot mix metadata-view kinds with other kinds"));
    }

    if metadata_kinds {
        return Ok(());
    }

    let h_values: Vec<String> = filter
        .generic_tags
        .get(&SingleLetterTag::lowercase(Alphabet::H))
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default();

    if !h_values.is_empty() {
        for group_id in &h_values {
            let Some(group) = registry.get(group_id) else {
                continue;
            };
            if !group.is_private() {
                continue;
            }
            match subscriber {
                None => return Err(Error::auth_required("subscription must be authenticated")),
                Some(pubkey) if !group.is_member(&pubkey) => {
                    return Err(Error::restricted("not a member"));
                }
                Some(_) => {}
            }
        }
        return Ok(());
    }

    let has_e = filter
        .generic_tags
        .get(&SingleLetterTag::lowercase(Alphabet::E))
        .is_some_and(|s| !s.is_empty());
    let has_a = filter
        .generic_tags
        .get(&SingleLetterTag::lowercase(Alphabet::A))
        .is_some_and(|s| !s.is_empty());
    let has_ids = filter.ids.as_ref().is_some_and(|ids| !ids.is_empty());

    if has_e || has_a || has_ids {
        Ok(())
    } else {
        Err(Error::notice("invalid query"))
    }
}
