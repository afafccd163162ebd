//! MongoDB-backed [`VoucherStore`].
//!
//! Documents are stored with camelCase field names and string identifiers:
//! `_id` values are ObjectId hex strings rather than raw ObjectIds, so
//! identifiers stay plain strings everywhere in the crate and row-merge
//! matching never has to reconcile identifier representations.

use crate::entities::{Voucher, VoucherFieldPatch, VoucherRow};
use crate::errors::{Error, Result};
use crate::store::{VoucherFilter, VoucherStore};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Client, Database};
use tracing::info;

/// Store implementation over a single MongoDB database.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects to MongoDB and binds to `database`.
    ///
    /// # Errors
    /// Returns [`Error::StorageUnavailable`] when the URI cannot be parsed or
    /// the client cannot be constructed.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        info!(database, "connected to MongoDB");
        Ok(Self {
            db: client.database(database),
        })
    }

    /// Wraps an existing database handle (e.g. one shared with other
    /// subsystems of the application).
    #[must_use]
    pub fn with_database(db: Database) -> Self {
        Self { db }
    }

    fn next_id() -> String {
        ObjectId::new().to_hex()
    }

    fn assign_row_ids(rows: &mut [VoucherRow]) {
        for row in rows {
            if row.id.is_empty() {
                row.id = Self::next_id();
            }
        }
    }

    /// Builds the `$set` document for an update: present scalar fields, the
    /// optional whole-array row replacement, and the `updatedAt` refresh.
    fn set_document(fields: &VoucherFieldPatch, rows: Option<&[VoucherRow]>) -> Result<Document> {
        let mut set = Document::new();
        if let Some(v) = fields.date {
            set.insert("date", Bson::DateTime(bson::DateTime::from_chrono(v)));
        }
        if let Some(v) = &fields.group {
            set.insert("group", v.as_str());
        }
        if let Some(v) = &fields.company {
            set.insert("company", v.as_str());
        }
        if let Some(v) = &fields.project {
            set.insert("project", v.as_str());
        }
        if let Some(v) = &fields.transaction_type {
            set.insert("transactionType", v.as_str());
        }
        if let Some(v) = &fields.accounting_period {
            set.insert("accountingPeriod", v.as_str());
        }
        if let Some(v) = &fields.currency {
            set.insert("currency", v.as_str());
        }
        if let Some(v) = &fields.last_voucher {
            set.insert("lastVoucher", v.as_str());
        }
        if let Some(v) = &fields.counterparty {
            set.insert("counterparty", v.as_str());
        }
        if let Some(v) = fields.cash_balance {
            set.insert("cashBalance", v);
        }
        if let Some(v) = fields.status {
            set.insert("status", v);
        }
        if let Some(rows) = rows {
            let rows = bson::to_bson(rows).map_err(|e| Error::StorageUnavailable {
                message: format!("failed to encode voucher rows: {e}"),
            })?;
            set.insert("voucherRows", rows);
        }
        set.insert(
            "updatedAt",
            Bson::DateTime(bson::DateTime::from_chrono(Utc::now())),
        );
        Ok(set)
    }
}

#[async_trait]
impl VoucherStore for MongoStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        self.db.list_collection_names(None).await.map_err(Into::into)
    }

    async fn find(&self, collection: &str, filter: &VoucherFilter) -> Result<Vec<Voucher>> {
        let mut query = Document::new();
        if let Some((start, end)) = filter.created_within {
            query.insert(
                "createdAt",
                doc! {
                    "$gte": Bson::DateTime(bson::DateTime::from_chrono(start)),
                    "$lt": Bson::DateTime(bson::DateTime::from_chrono(end)),
                },
            );
        }

        let mut options = FindOptions::default();
        if filter.newest_first {
            options.sort = Some(doc! { "date": -1 });
        }
        options.limit = filter.limit;

        let cursor = self
            .db
            .collection::<Voucher>(collection)
            .find(query, options)
            .await?;
        cursor.try_collect().await.map_err(Into::into)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.db
            .collection::<Voucher>(collection)
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, collection: &str, mut voucher: Voucher) -> Result<Voucher> {
        if voucher.id.is_none() {
            voucher.id = Some(Self::next_id());
        }
        Self::assign_row_ids(&mut voucher.voucher_rows);

        self.db
            .collection::<Voucher>(collection)
            .insert_one(&voucher, None)
            .await?;
        Ok(voucher)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &VoucherFieldPatch,
        rows: Option<Vec<VoucherRow>>,
    ) -> Result<Option<Voucher>> {
        let rows = rows.map(|mut rows| {
            Self::assign_row_ids(&mut rows);
            rows
        });
        let set = Self::set_document(fields, rows.as_deref())?;

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.db
            .collection::<Voucher>(collection)
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Voucher>> {
        self.db
            .collection::<Voucher>(collection)
            .find_one_and_delete(doc! { "_id": id }, None)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_set_document_includes_only_present_fields() {
        let fields = VoucherFieldPatch {
            company: Some("Acme".to_string()),
            status: Some(true),
            ..VoucherFieldPatch::default()
        };

        let set = MongoStore::set_document(&fields, None).unwrap();
        assert_eq!(set.get_str("company").unwrap(), "Acme");
        assert!(set.get_bool("status").unwrap());
        assert!(set.contains_key("updatedAt"));
        assert!(!set.contains_key("project"));
        assert!(!set.contains_key("voucherRows"));
    }

    #[test]
    fn test_set_document_replaces_whole_row_array() {
        let rows = vec![
            VoucherRow {
                id: "a".to_string(),
                amount_bdt: 10.0,
                ..VoucherRow::default()
            },
            VoucherRow {
                id: "b".to_string(),
                amount_bdt: 20.0,
                ..VoucherRow::default()
            },
        ];

        let set = MongoStore::set_document(&VoucherFieldPatch::default(), Some(&rows)).unwrap();
        let stored = set.get_array("voucherRows").unwrap();
        assert_eq!(stored.len(), 2);
        let first = stored[0].as_document().unwrap();
        assert_eq!(first.get_str("_id").unwrap(), "a");
        assert_eq!(first.get_f64("amountBDT").unwrap(), 10.0);
    }

    #[test]
    fn test_wire_shape_uses_camel_case_and_string_ids() {
        let voucher = Voucher {
            id: Some(MongoStore::next_id()),
            ..crate::test_utils::sample_voucher(2024)
        };

        let doc = bson::to_document(&voucher).unwrap();
        assert!(doc.get_str("_id").is_ok());
        assert!(doc.contains_key("transactionType"));
        assert!(doc.contains_key("cashBalance"));
        assert!(doc.contains_key("createdAt"));
        assert!(matches!(doc.get("date"), Some(Bson::DateTime(_))));
    }
}
