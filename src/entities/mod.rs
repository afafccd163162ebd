//! Entity module - Data shapes for voucher documents and their partial forms.
//! These types define the stored document shape (camelCase wire names) and the
//! patch shapes accepted by the update operations.

pub mod voucher;

pub use voucher::{
    Voucher, VoucherFieldPatch, VoucherKind, VoucherPatch, VoucherRow, VoucherRowPatch,
    VoucherWithSourceYear,
};
