//! In-process [`VoucherStore`] backed by a plain map.
//!
//! Fills the role the in-memory `SQLite` database fills in a relational
//! setup: a real store implementation the test suite can run against without
//! any external service. Collections spring into existence on first insert,
//! mirroring the lazy-creation semantics of the production store.

use crate::entities::{Voucher, VoucherFieldPatch, VoucherRow};
use crate::errors::Result;
use crate::store::{VoucherFilter, VoucherStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Map-backed store: collection name to its list of documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Voucher>>>,
}

impl MemoryStore {
    /// Creates an empty store with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn assign_row_ids(rows: &mut [VoucherRow]) {
        for row in rows {
            if row.id.is_empty() {
                row.id = Self::next_id();
            }
        }
    }
}

#[async_trait]
impl VoucherStore for MemoryStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections.keys().cloned().collect())
    }

    async fn find(&self, collection: &str, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut matches: Vec<Voucher> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        filter
                            .created_within
                            .is_none_or(|(start, end)| doc.created_at >= start && doc.created_at < end)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if filter.newest_first {
            matches.sort_by(|a, b| b.date.cmp(&a.date));
        }
        if let Some(limit) = filter.limit {
            matches.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(matches)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id.as_deref() == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, mut voucher: Voucher) -> Result<Voucher> {
        if voucher.id.is_none() {
            voucher.id = Some(Self::next_id());
        }
        Self::assign_row_ids(&mut voucher.voucher_rows);

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(collection.to_string())
            .or_default()
            .push(voucher.clone());
        Ok(voucher)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id.as_deref() == Some(id)))
        else {
            return Ok(None);
        };

        fields.apply_to(doc);
        if let Some(mut rows) = rows {
            Self::assign_row_ids(&mut rows);
            doc.voucher_rows = rows;
        }
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = docs.iter().position(|doc| doc.id.as_deref() == Some(id)) else {
            return Ok(None);
        };
        Ok(Some(docs.remove(index)))
    }
}
