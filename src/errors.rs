//! Unified error types and result handling for `voucherbook`.
//!
//! Every fallible operation in the crate returns [`Result`], and callers can
//! match on [`Error`] variants to translate failures at their own boundary
//! (e.g. not-found vs. validation vs. storage outage).

use thiserror::Error;

/// Unified error type for all voucher operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An external caller supplied a voucher kind string that is neither
    /// payment nor received.
    #[error("unknown voucher kind: '{kind}'")]
    InvalidKind {
        /// The unrecognized kind string as received
        kind: String,
    },

    /// The document store (connection, catalog, or a single operation) failed.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Driver-level description of the failure
        message: String,
    },

    /// The target voucher of an update or delete does not exist.
    #[error("voucher '{id}' not found in collection '{collection}'")]
    NotFound {
        /// Physical collection that was searched
        collection: String,
        /// Identifier that was looked up
        id: String,
    },

    /// A malformed request payload (e.g. a delete without an identifier, or a
    /// row patch naming an unknown row under the reject policy).
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of what was malformed
        message: String,
    },

    /// One or more years failed during a strict-mode cross-year aggregation.
    /// Carries every failed year with its error message so callers can decide
    /// whether the partial data would have been acceptable.
    #[error("aggregation incomplete: {} year(s) failed", failed_years.len())]
    PartialAggregation {
        /// Pairs of (partition year, failure description)
        failed_years: Vec<(i32, String)>,
    },

    /// Configuration could not be read or parsed.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// I/O error outside the document store (e.g. reading the config file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mongodb::error::Error> for Error {
    fn from(value: mongodb::error::Error) -> Self {
        Error::StorageUnavailable {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
