//! Cross-year voucher aggregation.
//!
//! The set of yearly collections is always discovered live from the store's
//! collection catalog - there is no persisted manifest to go stale. Queries
//! fan out across the discovered years in bounded batches: full concurrency
//! within a batch, a barrier between batches, so at most one batch's worth of
//! year-queries is in flight at any instant.
//!
//! A year that fails to query contributes nothing to the merged list but is
//! recorded in [`AggregateResult::failed_years`] (and logged), so partial
//! data is never silently passed off as complete. Callers that would rather
//! fail than work with partial data set [`AggregationOptions::strict`].

use crate::entities::{Voucher, VoucherKind, VoucherWithSourceYear};
use crate::errors::{Error, Result};
use crate::registry::{CollectionHandle, CollectionRegistry};
use crate::store::VoucherFilter;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default cap on simultaneously running year-queries.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Tuning knobs for a cross-year aggregation call.
#[derive(Clone, Debug)]
pub struct AggregationOptions {
    /// Maximum year-queries in flight at once (batch size)
    pub concurrency_limit: usize,
    /// Optional per-year query deadline; a year that exceeds it counts as
    /// failed rather than stalling the whole aggregation
    pub per_year_timeout: Option<Duration>,
    /// Fail with [`Error::PartialAggregation`] instead of returning a
    /// partial result when any year fails
    pub strict: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_year_timeout: None,
            strict: false,
        }
    }
}

/// Outcome of a cross-year aggregation: the merged voucher list plus the
/// years (if any) that failed to contribute.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// Vouchers from every year that answered, each tagged with its source
    /// year. No ordering is imposed across years.
    pub vouchers: Vec<VoucherWithSourceYear>,
    /// Years whose query failed, with the error that sank each one
    pub failed_years: Vec<(i32, Error)>,
}

impl AggregateResult {
    /// Whether at least one year failed to contribute.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed_years.is_empty()
    }
}

/// Discovers which partition years currently exist for `kind` by
/// introspecting the store's collection catalog.
///
/// Only names matching the kind's exact `{prefix}_{YYYY}` pattern count, so
/// foreign collections in the same database can never produce a false
/// positive, and the returned set is deduplicated by construction.
///
/// # Errors
/// [`Error::StorageUnavailable`] when the catalog cannot be listed.
pub async fn list_partition_years(
    registry: &CollectionRegistry,
    kind: VoucherKind,
) -> Result<BTreeSet<i32>> {
    let names = registry.store().list_collection_names().await?;
    Ok(names
        .iter()
        .filter_map(|name| kind.year_from_collection(name))
        .collect())
}

/// Queries `filter` against every year in `years` and merges the results,
/// tagging each voucher with the year it came from.
///
/// Years are processed in ascending order, chunked into batches of
/// `options.concurrency_limit`; a batch must fully complete - stragglers
/// included - before the next one starts. An empty `years` set yields an
/// empty result, never an error.
///
/// # Errors
/// [`Error::PartialAggregation`] in strict mode when any year fails;
/// otherwise per-year failures are reported via the result, not as errors.
pub async fn query_across_years(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    years: &BTreeSet<i32>,
    filter: &VoucherFilter,
    options: &AggregationOptions,
) -> Result<AggregateResult> {
    let batch_size = options.concurrency_limit.max(1);
    let years: Vec<i32> = years.iter().copied().collect();
    let mut result = AggregateResult::default();

    for batch in years.chunks(batch_size) {
        let queries = batch.iter().map(|&year| {
            let handle = registry.resolve(kind, year);
            let filter = filter.clone();
            let timeout = options.per_year_timeout;
            async move { (year, query_one_year(&handle, &filter, timeout).await) }
        });

        for (year, outcome) in join_all(queries).await {
            match outcome {
                Ok(vouchers) => {
                    result
                        .vouchers
                        .extend(vouchers.into_iter().map(|voucher| VoucherWithSourceYear {
                            voucher,
                            source_year: year,
                        }));
                }
                Err(error) => {
                    warn!(%kind, year, %error, "year query failed during aggregation");
                    result.failed_years.push((year, error));
                }
            }
        }
    }

    if options.strict && result.is_partial() {
        return Err(Error::PartialAggregation {
            failed_years: result
                .failed_years
                .iter()
                .map(|(year, error)| (*year, error.to_string()))
                .collect(),
        });
    }
    Ok(result)
}

async fn query_one_year(
    handle: &Arc<CollectionHandle>,
    filter: &VoucherFilter,
    timeout: Option<Duration>,
) -> Result<Vec<Voucher>> {
    match timeout {
        Some(deadline) => tokio::time::timeout(deadline, handle.find(filter))
            .await
            .unwrap_or_else(|_| {
                Err(Error::StorageUnavailable {
                    message: format!(
                        "query of '{}' timed out after {deadline:?}",
                        handle.name()
                    ),
                })
            }),
        None => handle.find(filter).await,
    }
}

/// Returns every voucher of `kind` created today, in the process-local
/// calendar: discovery of all existing years composed with a
/// `[local midnight, next local midnight)` window on `createdAt`.
///
/// The local day boundary is deliberate - "today" means the operator's
/// today, not the UTC day. A voucher created at 23:59:59.999 local time is
/// included; one created at 00:00:00.000 the next local day is not.
///
/// # Errors
/// Same as [`query_across_years`]; zero existing years is an empty result,
/// never an error.
pub async fn todays_vouchers(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    options: &AggregationOptions,
) -> Result<AggregateResult> {
    let years = list_partition_years(registry, kind).await?;
    let (start, end) = local_day_bounds(Local::now());
    let filter = VoucherFilter::created_within(start, end);
    query_across_years(registry, kind, &years, &filter, options).await
}

/// The UTC instants bounding `now`'s local calendar day: `[midnight, next
/// midnight)`.
#[must_use]
pub fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = now.date_naive();
    (local_midnight(day), local_midnight(day + Days::new(1)))
}

fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    // A DST jump can skip local midnight entirely; fall back to the UTC
    // instant of the same wall-clock time.
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&midnight), |dt| dt.with_timezone(&Utc))
}
