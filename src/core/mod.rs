//! Core business logic - framework-agnostic voucher operations.
//!
//! Everything here works against a [`crate::registry::CollectionRegistry`]
//! and returns structured data; translating results and errors into a
//! delivery format (HTTP or otherwise) is the caller's concern.

/// Cross-year aggregation - partition discovery and bounded fan-out
pub mod aggregate;
/// Structured cross-year summaries
pub mod report;
/// Row merge engine for embedded voucher rows
pub mod rows;
/// Create/list/update/delete operations on vouchers
pub mod voucher;
