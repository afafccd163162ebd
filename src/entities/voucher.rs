//! Voucher entity - Payment and received voucher documents with embedded rows.
//!
//! Both voucher kinds share one document shape; the kind only decides which
//! family of yearly collections a document lives in and the semantic direction
//! of the money flow. Wire field names are camelCase to match the stored
//! document shape.

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two voucher kinds. Structurally identical documents, semantically
/// distinct direction of money flow, stored in separate collection families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    /// Money paid out (`paidFrom` counterpart)
    Payment,
    /// Money received (`receivedFrom` counterpart)
    Received,
}

impl VoucherKind {
    /// Both kinds, in a fixed order. Useful for iterating all collection
    /// families (e.g. the smoke binary).
    pub const ALL: [Self; 2] = [Self::Payment, Self::Received];

    /// Collection-name prefix for this kind's yearly collections.
    #[must_use]
    pub const fn collection_prefix(self) -> &'static str {
        match self {
            Self::Payment => "vouchers",
            Self::Received => "received_vouchers",
        }
    }

    /// Physical collection name for this kind and partition year, e.g.
    /// `vouchers_2024`. The mapping is deterministic; no range validation is
    /// applied to `year`.
    #[must_use]
    pub fn collection_name(self, year: i32) -> String {
        format!("{}_{year}", self.collection_prefix())
    }

    /// Parses the partition year back out of a physical collection name.
    ///
    /// Returns `None` unless the name is exactly `{prefix}_{YYYY}` with four
    /// ASCII digits, so foreign collections in the same database are never
    /// mistaken for a partition.
    #[must_use]
    pub fn year_from_collection(self, collection_name: &str) -> Option<i32> {
        let rest = collection_name.strip_prefix(self.collection_prefix())?;
        let digits = rest.strip_prefix('_')?;
        if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    }
}

impl FromStr for VoucherKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payment" => Ok(Self::Payment),
            "received" => Ok(Self::Received),
            _ => Err(Error::InvalidKind {
                kind: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for VoucherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Received => write!(f, "received"),
        }
    }
}

/// One accounting transaction document: header fields plus embedded line rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Store-generated identifier, unique within its physical collection.
    /// `None` until the document has been inserted.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Business date of the transaction; its calendar year is the partition
    /// key that selects the physical collection at creation time.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    /// Owning account group
    pub group: String,
    /// Company the voucher belongs to
    pub company: String,
    /// Project the voucher belongs to
    pub project: String,
    /// Transaction type label (e.g. cash, bank)
    pub transaction_type: String,
    /// Accounting period label
    pub accounting_period: String,
    /// Currency code of the foreign amounts
    pub currency: String,
    /// Free-text reference to the preceding voucher
    pub last_voucher: String,
    /// Counterpart name: paid-from for payment vouchers, received-from for
    /// received vouchers.
    pub counterparty: String,
    /// Cash running balance after this voucher
    pub cash_balance: f64,
    /// Voucher-level approval flag; see [`VoucherRow::is_effectively_approved`]
    pub status: bool,
    /// Embedded line rows, owned by this document
    #[serde(default)]
    pub voucher_rows: Vec<VoucherRow>,
    /// Set once at insert time; "today" queries filter on this field.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// Calendar year of `date` in the process-local timezone. Decides which
    /// yearly collection the voucher is created in; never stored as a
    /// separate field.
    #[must_use]
    pub fn partition_year(&self) -> i32 {
        self.date.with_timezone(&Local).year()
    }

    /// Sum of `amount_bdt` over all rows.
    #[must_use]
    pub fn row_total(&self) -> f64 {
        self.voucher_rows.iter().map(|r| r.amount_bdt).sum()
    }

    /// Sum of `amount_bdt` over effectively approved rows only.
    ///
    /// A row counts as approved when the voucher is approved OR the row
    /// itself is approved. The OR is a business rule: voucher-level approval
    /// blankets every row, and a row can also be approved ahead of its
    /// voucher.
    #[must_use]
    pub fn approved_row_total(&self) -> f64 {
        self.voucher_rows
            .iter()
            .filter(|r| r.is_effectively_approved(self.status))
            .map(|r| r.amount_bdt)
            .sum()
    }
}

/// One line item within a voucher, individually identified and individually
/// approvable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRow {
    /// Row identifier, unique within the parent's row list and immutable once
    /// assigned. The store assigns it on write when empty.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Expense head the row is booked under
    pub expense_head: String,
    /// Cost center the row is booked under
    pub cost_center: String,
    /// External reference
    pub reference: String,
    /// Amount in foreign currency
    #[serde(rename = "amountFCY")]
    pub amount_fcy: f64,
    /// Foreign-to-local conversion rate
    pub conversion_rate: f64,
    /// Amount in local currency
    #[serde(rename = "amountBDT")]
    pub amount_bdt: f64,
    /// Free-text narration
    pub narration: String,
    /// Cheque or RTGS reference
    pub cheque_no: String,
    /// Name the row amount was paid to
    pub paid_to: String,
    /// Row-level approval flag, independent of the parent voucher's
    pub status: bool,
}

impl VoucherRow {
    /// Whether this row counts as approved given the parent voucher's status:
    /// parent approval OR row approval.
    #[must_use]
    pub const fn is_effectively_approved(&self, voucher_status: bool) -> bool {
        voucher_status || self.status
    }
}

/// A voucher retrieved during cross-year aggregation, tagged with the yearly
/// collection it came from. The tag is a read-time annotation and is never
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VoucherWithSourceYear {
    /// The voucher document as stored
    #[serde(flatten)]
    pub voucher: Voucher,
    /// Partition year of the collection this voucher was read from
    pub source_year: i32,
}

/// Partial update for a voucher's scalar header fields. Fields left `None`
/// keep their stored values.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherFieldPatch {
    /// New business date (moving a voucher across partition years this way is
    /// unsupported; the document stays in its collection)
    pub date: Option<DateTime<Utc>>,
    /// New account group
    pub group: Option<String>,
    /// New company
    pub company: Option<String>,
    /// New project
    pub project: Option<String>,
    /// New transaction type label
    pub transaction_type: Option<String>,
    /// New accounting period label
    pub accounting_period: Option<String>,
    /// New currency code
    pub currency: Option<String>,
    /// New last-voucher reference
    pub last_voucher: Option<String>,
    /// New counterpart name
    pub counterparty: Option<String>,
    /// New cash running balance
    pub cash_balance: Option<f64>,
    /// New voucher-level approval flag
    pub status: Option<bool>,
}

impl VoucherFieldPatch {
    /// Shallow-merges this patch over `voucher`: present fields win, absent
    /// fields keep the voucher's value. Rows and timestamps are untouched.
    pub fn apply_to(&self, voucher: &mut Voucher) {
        if let Some(v) = self.date {
            voucher.date = v;
        }
        if let Some(v) = &self.group {
            voucher.group.clone_from(v);
        }
        if let Some(v) = &self.company {
            voucher.company.clone_from(v);
        }
        if let Some(v) = &self.project {
            voucher.project.clone_from(v);
        }
        if let Some(v) = &self.transaction_type {
            voucher.transaction_type.clone_from(v);
        }
        if let Some(v) = &self.accounting_period {
            voucher.accounting_period.clone_from(v);
        }
        if let Some(v) = &self.currency {
            voucher.currency.clone_from(v);
        }
        if let Some(v) = &self.last_voucher {
            voucher.last_voucher.clone_from(v);
        }
        if let Some(v) = &self.counterparty {
            voucher.counterparty.clone_from(v);
        }
        if let Some(v) = self.cash_balance {
            voucher.cash_balance = v;
        }
        if let Some(v) = self.status {
            voucher.status = v;
        }
    }
}

/// Full update payload for a voucher: scalar field changes plus optional
/// row-level patches to be merged against the stored row list.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherPatch {
    /// Scalar header field changes
    #[serde(flatten)]
    pub fields: VoucherFieldPatch,
    /// Row patches, matched against stored rows by identifier. `None` leaves
    /// the row list untouched; `Some` triggers the merge engine.
    pub voucher_rows: Option<Vec<VoucherRowPatch>>,
}

/// Partial update for a single voucher row, matched by `id`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRowPatch {
    /// Identifier of the stored row this patch targets
    #[serde(rename = "_id", default)]
    pub id: String,
    /// New expense head
    pub expense_head: Option<String>,
    /// New cost center
    pub cost_center: Option<String>,
    /// New external reference
    pub reference: Option<String>,
    /// New foreign-currency amount
    #[serde(rename = "amountFCY")]
    pub amount_fcy: Option<f64>,
    /// New conversion rate
    pub conversion_rate: Option<f64>,
    /// New local-currency amount
    #[serde(rename = "amountBDT")]
    pub amount_bdt: Option<f64>,
    /// New narration
    pub narration: Option<String>,
    /// New cheque/RTGS reference
    pub cheque_no: Option<String>,
    /// New paid-to name
    pub paid_to: Option<String>,
    /// New row-level approval flag
    pub status: Option<bool>,
}

impl VoucherRowPatch {
    /// Shallow-merges this patch over `row`: present fields win, absent
    /// fields keep the row's value. The row identifier is never changed.
    pub fn apply_to(&self, row: &mut VoucherRow) {
        if let Some(v) = &self.expense_head {
            row.expense_head.clone_from(v);
        }
        if let Some(v) = &self.cost_center {
            row.cost_center.clone_from(v);
        }
        if let Some(v) = &self.reference {
            row.reference.clone_from(v);
        }
        if let Some(v) = self.amount_fcy {
            row.amount_fcy = v;
        }
        if let Some(v) = self.conversion_rate {
            row.conversion_rate = v;
        }
        if let Some(v) = self.amount_bdt {
            row.amount_bdt = v;
        }
        if let Some(v) = &self.narration {
            row.narration.clone_from(v);
        }
        if let Some(v) = &self.cheque_no {
            row.cheque_no.clone_from(v);
        }
        if let Some(v) = &self.paid_to {
            row.paid_to.clone_from(v);
        }
        if let Some(v) = self.status {
            row.status = v;
        }
    }

    /// Materializes this patch as a brand-new row (used by the append
    /// policy): defaults for absent fields, the patch's own identifier kept.
    #[must_use]
    pub fn materialize(&self) -> VoucherRow {
        let mut row = VoucherRow {
            id: self.id.clone(),
            ..VoucherRow::default()
        };
        self.apply_to(&mut row);
        row
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::sample_voucher;

    #[test]
    fn test_kind_parses_known_strings() {
        assert_eq!("payment".parse::<VoucherKind>().unwrap(), VoucherKind::Payment);
        assert_eq!("received".parse::<VoucherKind>().unwrap(), VoucherKind::Received);
        assert_eq!("Payment".parse::<VoucherKind>().unwrap(), VoucherKind::Payment);
        assert_eq!(" RECEIVED ".parse::<VoucherKind>().unwrap(), VoucherKind::Received);
    }

    #[test]
    fn test_kind_rejects_unknown_strings() {
        let err = "journal".parse::<VoucherKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidKind { kind } if kind == "journal"));
    }

    #[test]
    fn test_collection_name_is_deterministic() {
        assert_eq!(VoucherKind::Payment.collection_name(2024), "vouchers_2024");
        assert_eq!(
            VoucherKind::Received.collection_name(2024),
            "received_vouchers_2024"
        );
    }

    #[test]
    fn test_year_from_collection_accepts_exact_pattern() {
        assert_eq!(
            VoucherKind::Payment.year_from_collection("vouchers_2024"),
            Some(2024)
        );
        assert_eq!(
            VoucherKind::Received.year_from_collection("received_vouchers_1999"),
            Some(1999)
        );
    }

    #[test]
    fn test_year_from_collection_rejects_foreign_names() {
        let payment = VoucherKind::Payment;
        assert_eq!(payment.year_from_collection("vouchers"), None);
        assert_eq!(payment.year_from_collection("vouchers_"), None);
        assert_eq!(payment.year_from_collection("vouchers_20x4"), None);
        assert_eq!(payment.year_from_collection("vouchers_024"), None);
        assert_eq!(payment.year_from_collection("vouchers_20244"), None);
        assert_eq!(payment.year_from_collection("vouchers_backup_2024"), None);
        assert_eq!(payment.year_from_collection("employees"), None);
        // A received collection is not a payment partition and vice versa.
        assert_eq!(payment.year_from_collection("received_vouchers_2024"), None);
        assert_eq!(
            VoucherKind::Received.year_from_collection("vouchers_2024"),
            None
        );
    }

    #[test]
    fn test_effective_approval_is_parent_or_row() {
        let row_pending = VoucherRow::default();
        let row_approved = VoucherRow {
            status: true,
            ..VoucherRow::default()
        };

        // Approved parent blankets a pending row.
        assert!(row_pending.is_effectively_approved(true));
        // A row approved ahead of its pending parent still counts.
        assert!(row_approved.is_effectively_approved(false));
        assert!(row_approved.is_effectively_approved(true));
        assert!(!row_pending.is_effectively_approved(false));
    }

    #[test]
    fn test_approved_row_total_uses_or_rule() {
        let mut voucher = sample_voucher(2024);
        voucher.status = false;
        voucher.voucher_rows = vec![
            VoucherRow {
                id: "a".to_string(),
                amount_bdt: 10.0,
                status: true,
                ..VoucherRow::default()
            },
            VoucherRow {
                id: "b".to_string(),
                amount_bdt: 20.0,
                status: false,
                ..VoucherRow::default()
            },
        ];

        assert_eq!(voucher.approved_row_total(), 10.0);
        assert_eq!(voucher.row_total(), 30.0);

        // Approving the voucher blankets every row.
        voucher.status = true;
        assert_eq!(voucher.approved_row_total(), 30.0);
    }

    #[test]
    fn test_row_patch_materialize_keeps_id_and_defaults() {
        let patch = VoucherRowPatch {
            id: "new-row".to_string(),
            amount_bdt: Some(42.0),
            narration: Some("appended".to_string()),
            ..VoucherRowPatch::default()
        };

        let row = patch.materialize();
        assert_eq!(row.id, "new-row");
        assert_eq!(row.amount_bdt, 42.0);
        assert_eq!(row.narration, "appended");
        assert_eq!(row.expense_head, "");
        assert!(!row.status);
    }
}
