//! Voucher business logic - create, list, update, and delete against the
//! yearly collections.
//!
//! All operations resolve their target collection through the registry; the
//! partition year is derived from the voucher's business date at creation
//! time and supplied explicitly by the caller thereafter. Moving a voucher
//! across years is not supported.

use crate::core::rows::{UnmatchedRowPolicy, merge_rows};
use crate::entities::{Voucher, VoucherKind, VoucherPatch};
use crate::errors::{Error, Result};
use crate::registry::CollectionRegistry;
use crate::store::VoucherFilter;
use chrono::Utc;
use tracing::info;

/// Cap on the result of [`list_recent_vouchers`].
pub const RECENT_VOUCHERS_LIMIT: i64 = 100;

/// Returns the most recent vouchers of one year's collection, newest first
/// by business date, capped at [`RECENT_VOUCHERS_LIMIT`].
pub async fn list_recent_vouchers(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    year: i32,
) -> Result<Vec<Voucher>> {
    registry
        .resolve(kind, year)
        .find(&VoucherFilter::newest_first(RECENT_VOUCHERS_LIMIT))
        .await
}

/// Creates a voucher in the yearly collection its `date` selects.
///
/// The partition year is the calendar year of `draft.date` in the process
/// local timezone. Any caller-supplied identifier is discarded (the store
/// assigns identifiers), and both timestamps are stamped here.
pub async fn create_voucher(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    mut draft: Voucher,
) -> Result<Voucher> {
    draft.id = None;
    let now = Utc::now();
    draft.created_at = now;
    draft.updated_at = now;

    let year = draft.partition_year();
    let handle = registry.resolve(kind, year);
    let stored = handle.insert(draft).await?;
    info!(
        %kind,
        year,
        collection = handle.name(),
        id = stored.id.as_deref().unwrap_or_default(),
        "created voucher"
    );
    Ok(stored)
}

/// Applies a partial update to one voucher.
///
/// When the patch carries row patches, the stored document is loaded first
/// and the merge engine computes the full replacement row list; scalars and
/// the merged array are then persisted in a single write. Without row
/// patches this is a plain field-level update. Concurrent updates to the
/// same voucher are last-write-wins at the whole-array level.
///
/// # Errors
/// [`Error::NotFound`] when no voucher has this identifier;
/// [`Error::Validation`] from the merge engine under the reject policy.
pub async fn update_voucher(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    year: i32,
    id: &str,
    patch: &VoucherPatch,
    policy: UnmatchedRowPolicy,
) -> Result<Voucher> {
    let handle = registry.resolve(kind, year);

    let merged_rows = match &patch.voucher_rows {
        Some(row_patches) => {
            let current = handle
                .find_by_id(id)
                .await?
                .ok_or_else(|| Error::NotFound {
                    collection: handle.name().to_string(),
                    id: id.to_string(),
                })?;
            Some(merge_rows(&current.voucher_rows, row_patches, policy)?)
        }
        None => None,
    };

    handle
        .update(id, &patch.fields, merged_rows)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: handle.name().to_string(),
            id: id.to_string(),
        })
}

/// Deletes one voucher, returning the removed document.
///
/// The identifier may arrive through either of two channels - a query-shaped
/// source or a body-shaped source - and the first non-empty one wins; both
/// channels must stay supported for caller compatibility.
///
/// # Errors
/// [`Error::Validation`] when neither channel carries an identifier;
/// [`Error::NotFound`] when no voucher has the identifier.
pub async fn delete_voucher(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    year: i32,
    query_id: Option<&str>,
    body_id: Option<&str>,
) -> Result<Voucher> {
    let id = [query_id, body_id]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty())
        .ok_or_else(|| Error::Validation {
            message: "delete requires a voucher id in the query or the request body".to_string(),
        })?;

    let handle = registry.resolve(kind, year);
    let deleted = handle.delete(id).await?.ok_or_else(|| Error::NotFound {
        collection: handle.name().to_string(),
        id: id.to_string(),
    })?;
    info!(%kind, year, collection = handle.name(), id, "deleted voucher");
    Ok(deleted)
}
