//! Collection registry - resolves a voucher kind and partition year to a
//! cached handle on the correct yearly collection.
//!
//! The registry is an explicit, dependency-injected instance rather than
//! module-level global state; tests construct a fresh registry (and store)
//! per test, which doubles as the reset mechanism. The handle cache is
//! append-only and keyed by `(kind, year)`, so resolving the same pair any
//! number of times - including concurrently from multiple requests - yields
//! one shared handle and never a second binding to the same physical
//! collection.

use crate::entities::{Voucher, VoucherFieldPatch, VoucherKind, VoucherRow};
use crate::errors::Result;
use crate::store::{VoucherFilter, VoucherStore};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Process-lifetime cache of collection handles, keyed by kind and year.
pub struct CollectionRegistry {
    store: Arc<dyn VoucherStore>,
    handles: RwLock<HashMap<(VoucherKind, i32), Arc<CollectionHandle>>>,
}

impl CollectionRegistry {
    /// Creates a registry over the given store with an empty handle cache.
    #[must_use]
    pub fn new(store: Arc<dyn VoucherStore>) -> Self {
        Self {
            store,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves the handle for `(kind, year)`, creating and caching it on
    /// first use.
    ///
    /// Repeat calls return the same shared handle. The underlying physical
    /// collection is created lazily by the store on first write; the registry
    /// performs no I/O and applies no range validation to `year` - an
    /// implausible year simply names an implausible collection.
    ///
    /// Double-checked locking makes concurrent first-time resolutions of the
    /// same key safe: losers of the race adopt the winner's handle instead of
    /// creating a second one.
    #[must_use]
    pub fn resolve(&self, kind: VoucherKind, year: i32) -> Arc<CollectionHandle> {
        if let Some(handle) = self
            .handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, year))
        {
            return Arc::clone(handle);
        }

        let mut handles = self
            .handles
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = handles.entry((kind, year)).or_insert_with(|| {
            let name = kind.collection_name(year);
            debug!(%kind, year, collection = %name, "registering collection handle");
            Arc::new(CollectionHandle {
                store: Arc::clone(&self.store),
                kind,
                year,
                name,
            })
        });
        Arc::clone(handle)
    }

    /// The store this registry resolves handles against.
    #[must_use]
    pub fn store(&self) -> Arc<dyn VoucherStore> {
        Arc::clone(&self.store)
    }

    /// Number of handles currently cached.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A resolved binding to one physical yearly collection.
///
/// All voucher I/O goes through a handle, so every caller addresses a
/// collection by its registry-derived name rather than a hand-built string.
pub struct CollectionHandle {
    store: Arc<dyn VoucherStore>,
    kind: VoucherKind,
    year: i32,
    name: String,
}

impl CollectionHandle {
    /// The voucher kind this collection holds.
    #[must_use]
    pub const fn kind(&self) -> VoucherKind {
        self.kind
    }

    /// The partition year this collection holds.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// The physical collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs a query against this collection.
    pub async fn find(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        self.store.find(&self.name, filter).await
    }

    /// Looks up one voucher by identifier.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Voucher>> {
        self.store.find_by_id(&self.name, id).await
    }

    /// Inserts one voucher into this collection.
    pub async fn insert(&self, voucher: Voucher) -> Result<Voucher> {
        self.store.insert(&self.name, voucher).await
    }

    /// Applies a scalar-and-rows update to one voucher in this collection.
    pub async fn update(
        &self,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>> {
        self.store.update(&self.name, id, fields, rows).await
    }

    /// Deletes one voucher from this collection.
    pub async fn delete(&self, id: &str) -> Result<Option<Voucher>> {
        self.store.delete(&self.name, id).await
    }
}
