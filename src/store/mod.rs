//! Document store boundary.
//!
//! [`VoucherStore`] is the seam between the voucher core and the document
//! database: collection-catalog introspection plus per-collection find,
//! insert, update, and delete. Two implementations ship with the crate -
//! [`MongoStore`] against MongoDB for production use and [`MemoryStore`] as
//! the in-process backend used by the test suite and local experiments.
//!
//! Assumed store semantics: collections are created lazily on first write,
//! reads on a connection observe that connection's prior writes, and there
//! are no multi-document transactions.

use crate::entities::{Voucher, VoucherFieldPatch, VoucherRow};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// In-process store implementation backed by a map, for tests and local runs
pub mod memory;
/// MongoDB-backed store implementation
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Query shape understood by every store implementation.
#[derive(Clone, Debug, Default)]
pub struct VoucherFilter {
    /// Half-open `[start, end)` window applied to `createdAt`
    pub created_within: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Sort by business `date`, newest first
    pub newest_first: bool,
    /// Cap on the number of returned documents
    pub limit: Option<i64>,
}

impl VoucherFilter {
    /// Filter selecting vouchers created within `[start, end)`.
    #[must_use]
    pub fn created_within(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            created_within: Some((start, end)),
            ..Self::default()
        }
    }

    /// Filter selecting the most recent `limit` vouchers by business date.
    #[must_use]
    pub fn newest_first(limit: i64) -> Self {
        Self {
            newest_first: true,
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// The document-store operations the voucher subsystem consumes.
///
/// All operations address a physical collection by name; callers obtain names
/// through the collection registry rather than constructing them ad hoc.
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Lists every collection name currently present in the database,
    /// partition collections and foreign collections alike. Callers filter.
    async fn list_collection_names(&self) -> Result<Vec<String>>;

    /// Runs `filter` against one collection. A collection that does not exist
    /// yet yields an empty result, not an error.
    async fn find(&self, collection: &str, filter: &VoucherFilter) -> Result<Vec<Voucher>>;

    /// Looks a voucher up by its identifier.
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Voucher>>;

    /// Inserts one voucher document, implicitly creating the collection on
    /// first use. Assigns the document identifier and any missing row
    /// identifiers; returns the document as stored.
    async fn insert(&self, collection: &str, voucher: Voucher) -> Result<Voucher>;

    /// Applies scalar field changes and, when `rows` is given, replaces the
    /// whole embedded row array - both in a single write. Missing row
    /// identifiers in the replacement list are assigned. Refreshes
    /// `updatedAt`. Returns the updated document, or `None` when no document
    /// has this identifier.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>>;

    /// Deletes a voucher by identifier, returning the removed document or
    /// `None` when no document has this identifier.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Voucher>>;
}
