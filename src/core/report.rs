//! Summary reporting over the cross-year aggregator.
//!
//! Produces structured totals only; formatting them for any particular
//! surface is the caller's concern. Approval totals follow the row approval
//! rule: a row counts once its voucher is approved or it is approved itself.

use crate::core::aggregate::{AggregationOptions, list_partition_years, query_across_years};
use crate::entities::VoucherKind;
use crate::errors::Result;
use crate::registry::CollectionRegistry;
use crate::store::VoucherFilter;
use std::collections::BTreeMap;

/// Cross-year totals for one voucher kind.
#[derive(Debug, Clone)]
pub struct KindSummary {
    /// The kind summarized
    pub kind: VoucherKind,
    /// Vouchers counted across all years that answered
    pub voucher_count: usize,
    /// Sum of `amount_bdt` over every row
    pub total_amount: f64,
    /// Sum of `amount_bdt` over effectively approved rows only
    pub approved_amount: f64,
    /// Per-year breakdown, ascending by year
    pub years: Vec<YearBreakdown>,
    /// Years that failed to contribute (the summary is partial when
    /// non-empty), with the failure description
    pub failed_years: Vec<(i32, String)>,
}

/// One year's slice of a [`KindSummary`].
#[derive(Debug, Clone, Default)]
pub struct YearBreakdown {
    /// Partition year
    pub year: i32,
    /// Vouchers in this year's collection
    pub voucher_count: usize,
    /// Sum of `amount_bdt` over every row
    pub total_amount: f64,
    /// Sum of `amount_bdt` over effectively approved rows only
    pub approved_amount: f64,
}

/// Builds cross-year totals for `kind` over every partition year that
/// currently exists.
///
/// # Errors
/// [`crate::errors::Error::StorageUnavailable`] when discovery fails;
/// aggregation errors per [`query_across_years`] (strict mode applies).
pub async fn kind_summary(
    registry: &CollectionRegistry,
    kind: VoucherKind,
    options: &AggregationOptions,
) -> Result<KindSummary> {
    let years = list_partition_years(registry, kind).await?;
    let aggregate =
        query_across_years(registry, kind, &years, &VoucherFilter::default(), options).await?;

    let mut breakdowns: BTreeMap<i32, YearBreakdown> = BTreeMap::new();
    for tagged in &aggregate.vouchers {
        let entry = breakdowns
            .entry(tagged.source_year)
            .or_insert_with(|| YearBreakdown {
                year: tagged.source_year,
                ..YearBreakdown::default()
            });
        entry.voucher_count += 1;
        entry.total_amount += tagged.voucher.row_total();
        entry.approved_amount += tagged.voucher.approved_row_total();
    }

    let years: Vec<YearBreakdown> = breakdowns.into_values().collect();
    Ok(KindSummary {
        kind,
        voucher_count: years.iter().map(|y| y.voucher_count).sum(),
        total_amount: years.iter().map(|y| y.total_amount).sum(),
        approved_amount: years.iter().map(|y| y.approved_amount).sum(),
        years,
        failed_years: aggregate
            .failed_years
            .iter()
            .map(|(year, error)| (*year, error.to_string()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::voucher::create_voucher;
    use crate::test_utils::{sample_row, sample_voucher, setup_registry};

    #[tokio::test]
    async fn test_summary_totals_follow_the_approval_rule() -> Result<()> {
        let registry = setup_registry();

        // 2023: approved voucher, both rows blanket-approved.
        let mut approved = sample_voucher(2023);
        approved.status = true;
        approved.voucher_rows = vec![sample_row("", 100.0, false), sample_row("", 50.0, false)];
        create_voucher(&registry, VoucherKind::Payment, approved).await?;

        // 2024: pending voucher, only one row approved on its own.
        let mut pending = sample_voucher(2024);
        pending.status = false;
        pending.voucher_rows = vec![sample_row("", 30.0, true), sample_row("", 20.0, false)];
        create_voucher(&registry, VoucherKind::Payment, pending).await?;

        let summary = kind_summary(
            &registry,
            VoucherKind::Payment,
            &AggregationOptions::default(),
        )
        .await?;

        assert_eq!(summary.voucher_count, 2);
        assert_eq!(summary.total_amount, 200.0);
        assert_eq!(summary.approved_amount, 180.0);
        assert!(summary.failed_years.is_empty());

        assert_eq!(summary.years.len(), 2);
        assert_eq!(summary.years[0].year, 2023);
        assert_eq!(summary.years[0].approved_amount, 150.0);
        assert_eq!(summary.years[1].year, 2024);
        assert_eq!(summary.years[1].approved_amount, 30.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_of_nothing_is_all_zeroes() -> Result<()> {
        let registry = setup_registry();

        let summary = kind_summary(
            &registry,
            VoucherKind::Received,
            &AggregationOptions::default(),
        )
        .await?;

        assert_eq!(summary.voucher_count, 0);
        assert_eq!(summary.total_amount, 0.0);
        assert!(summary.years.is_empty());
        Ok(())
    }
}
