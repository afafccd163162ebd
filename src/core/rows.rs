//! Row merge engine - reconciles incoming row patches against a voucher's
//! stored row list.
//!
//! Rows are matched by identifier, never by position: the client may submit
//! row patches in any order and may omit rows it does not change. The merge
//! is computed in full before any write happens, because the caller persists
//! the result as a whole-array replacement.

use crate::entities::{VoucherRow, VoucherRowPatch};
use crate::errors::{Error, Result};
use serde::Deserialize;
use tracing::debug;

/// What to do with a row patch whose identifier matches no stored row.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedRowPolicy {
    /// Drop the patch silently (the historical behavior).
    #[default]
    Ignore,
    /// Materialize the patch as a new row appended after the existing ones.
    Append,
    /// Fail the whole update with a validation error naming the unknown ids.
    Reject,
}

/// Merges `patches` into `existing`, returning the replacement row list.
///
/// For each patch whose identifier matches an existing row, present patch
/// fields overwrite that row's values and absent fields keep them; rows with
/// no matching patch pass through unchanged. The output preserves the order
/// of `existing`; appended rows (under [`UnmatchedRowPolicy::Append`]) come
/// last, in patch order. Patches apply in patch order, so a later patch for
/// the same identifier layers on top of an earlier one - including on top of
/// a row it appended itself.
///
/// # Errors
/// [`Error::Validation`] under [`UnmatchedRowPolicy::Reject`] when any patch
/// targets an unknown row identifier.
pub fn merge_rows(
    existing: &[VoucherRow],
    patches: &[VoucherRowPatch],
    policy: UnmatchedRowPolicy,
) -> Result<Vec<VoucherRow>> {
    let mut merged = existing.to_vec();
    let mut unknown_ids: Vec<String> = Vec::new();

    for patch in patches {
        if let Some(row) = merged.iter_mut().find(|row| row.id == patch.id) {
            patch.apply_to(row);
            continue;
        }
        match policy {
            UnmatchedRowPolicy::Append => merged.push(patch.materialize()),
            UnmatchedRowPolicy::Ignore | UnmatchedRowPolicy::Reject => {
                unknown_ids.push(patch.id.clone());
            }
        }
    }

    match policy {
        UnmatchedRowPolicy::Ignore if !unknown_ids.is_empty() => {
            debug!(
                ids = ?unknown_ids,
                "dropping row patches with no matching stored row"
            );
        }
        UnmatchedRowPolicy::Reject if !unknown_ids.is_empty() => {
            return Err(Error::Validation {
                message: format!(
                    "row patch targets unknown row id(s): {}",
                    unknown_ids.join(", ")
                ),
            });
        }
        _ => {}
    }

    Ok(merged)
}
