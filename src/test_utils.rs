//! Shared test utilities for `voucherbook`.
//!
//! This module provides common helper functions for setting up test
//! registries and sample vouchers with sensible defaults, plus instrumented
//! store wrappers for the concurrency and failure-injection tests.

#![allow(clippy::unwrap_used)]

use crate::entities::{Voucher, VoucherFieldPatch, VoucherRow};
use crate::errors::{Error, Result};
use crate::registry::CollectionRegistry;
use crate::store::{MemoryStore, VoucherFilter, VoucherStore};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Creates a registry over a fresh in-memory store. This is the standard
/// setup for all integration-style tests; a fresh registry per test is also
/// the registry reset mechanism.
pub fn setup_registry() -> CollectionRegistry {
    CollectionRegistry::new(Arc::new(MemoryStore::new()))
}

/// Initializes tracing for a test, once; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an unsaved voucher with sensible defaults, dated mid-June of
/// `year` so the partition year is unambiguous in every timezone. Both
/// timestamps default to the business date; tests override `created_at`
/// where the creation window matters.
#[must_use]
pub fn sample_voucher(year: i32) -> Voucher {
    let date = Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).unwrap();
    Voucher {
        id: None,
        date,
        group: "General".to_string(),
        company: "Evergreen Trading".to_string(),
        project: "Head Office".to_string(),
        transaction_type: "cash".to_string(),
        accounting_period: format!("{year}-H1"),
        currency: "USD".to_string(),
        last_voucher: String::new(),
        counterparty: "Acme Supplies".to_string(),
        cash_balance: 0.0,
        status: false,
        voucher_rows: Vec::new(),
        created_at: date,
        updated_at: date,
    }
}

/// Creates a voucher row with the given identifier, local-currency amount,
/// and approval flag; everything else gets a plausible default.
#[must_use]
pub fn sample_row(id: &str, amount_bdt: f64, status: bool) -> VoucherRow {
    VoucherRow {
        id: id.to_string(),
        expense_head: "Office Supplies".to_string(),
        cost_center: "HO".to_string(),
        reference: String::new(),
        amount_fcy: amount_bdt / 110.0,
        conversion_rate: 110.0,
        amount_bdt,
        narration: "sample row".to_string(),
        cheque_no: String::new(),
        paid_to: "Acme Supplies".to_string(),
        status,
    }
}

/// Store wrapper that gauges how many `find` calls are in flight at once and
/// delays each one, so tests can observe the fan-out's concurrency bound.
#[derive(Debug, Default)]
pub struct TrackingStore {
    inner: MemoryStore,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TrackingStore {
    /// Wraps a fresh in-memory store, delaying every `find` by `delay`.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// The highest number of `find` calls that were ever in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoucherStore for TrackingStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        self.inner.list_collection_names().await
    }

    async fn find(&self, collection: &str, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.find(collection, filter).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.inner.find_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, voucher: Voucher) -> Result<Voucher> {
        self.inner.insert(collection, voucher).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>> {
        self.inner.update(collection, id, fields, rows).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.inner.delete(collection, id).await
    }
}

/// Store wrapper that fails every `find` against one collection, for the
/// partial-failure tests. All other operations (including seeding the doomed
/// collection) pass through.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing_collection: String,
}

impl FailingStore {
    /// Wraps a fresh in-memory store; `find` against `collection` will fail.
    #[must_use]
    pub fn failing_for(collection: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_collection: collection.to_string(),
        }
    }
}

#[async_trait]
impl VoucherStore for FailingStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        self.inner.list_collection_names().await
    }

    async fn find(&self, collection: &str, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        if collection == self.failing_collection {
            return Err(Error::StorageUnavailable {
                message: format!("injected failure for '{collection}'"),
            });
        }
        self.inner.find(collection, filter).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.inner.find_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, voucher: Voucher) -> Result<Voucher> {
        self.inner.insert(collection, voucher).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>> {
        self.inner.update(collection, id, fields, rows).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.inner.delete(collection, id).await
    }
}
