// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use crate::errors::{Error, Result};
use crate::replset::ReplicaSetConfig;

/// Checks that `next` may replace `current` on the primary `local_id`.
///
/// Versions are not looked at here; ordering against the committed and pending configs
/// is the coordinator's business. With `strict`, the voter sets of the two configs may
/// differ by at most one member, so that any majority of `next` overlaps a majority of
/// `current`.
pub(crate) fn check_proposal(
    local_id: u64,
    current: &ReplicaSetConfig,
    next: &ReplicaSetConfig,
    strict: bool,
) -> Result<()> {
    next.validate()?;

    if next.name() != current.name() {
        return Err(Error::ConfigInvalid(format!(
            "cannot change replica set name from {} to {}",
            current.name(),
            next.name()
        )));
    }

    match next.member(local_id) {
        Some(m) if m.is_voting() && m.is_data_bearing() => {}
        _ => {
            return Err(Error::ConfigInvalid(format!(
                "primary {} must remain a voting data bearing member",
                local_id
            )))
        }
    }

    for m in next.members() {
        if let Some(old) = current.member(m.id()) {
            if old.is_arbiter() != m.is_arbiter() {
                return Err(Error::ConfigInvalid(format!(
                    "member {} cannot change between arbiter and data bearing",
                    m.id()
                )));
            }
        }
    }

    if strict {
        let changed = next
            .voters()
            .symmetric_difference(&current.voters())
            .count();
        if changed > 1 {
            return Err(Error::ConfigInvalid(format!(
                "only one voting member may be added or removed per reconfig, {} changed",
                changed
            )));
        }
    }

    Ok(())
}
