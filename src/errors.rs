//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Validation failures
//! carry the offending values so callers can report them without re-deriving them.

use thiserror::Error;

/// All errors produced by sheet, contributor, item and reconciler operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// The storage layer failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A name was empty or whitespace-only
    #[error("{entity} name cannot be empty")]
    EmptyName {
        /// What was being named ("Sheet", "Contributor", "Item")
        entity: &'static str,
    },

    /// An amount was zero, negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// No payer was selected for an item
    #[error("A payer must be selected")]
    MissingPayer,

    /// No consumer was checked for an item
    #[error("At least one consumer must be selected")]
    NoConsumers,

    /// Custom-split percentages do not add up to 100
    #[error("total percentage must be 100%, current: {total:.2}%")]
    PercentageMismatch {
        /// Sum of the entered percentages
        total: f64,
    },

    /// Another contributor in the sheet already has this name (case-insensitive)
    #[error("Contributor '{name}' already exists in this sheet")]
    DuplicateContributorName {
        /// The conflicting name
        name: String,
    },

    /// A name the balance engine reserves for contributor ids it cannot resolve
    #[error("Contributor name '{name}' is reserved")]
    ReservedContributorName {
        /// The rejected name
        name: String,
    },

    /// A contributor is still referenced by items and cannot be deleted
    #[error(
        "Contributor '{name}' is still used as payer on {payer_count} item(s) and consumer on {consumer_count} item(s)"
    )]
    ContributorInUse {
        /// Contributor name
        name: String,
        /// Number of items paid by this contributor
        payer_count: u64,
        /// Number of consumer-weight rows referencing this contributor
        consumer_count: u64,
    },

    /// Sheet lookup failed
    #[error("Sheet not found: {id}")]
    SheetNotFound {
        /// Requested sheet id
        id: i64,
    },

    /// Contributor lookup failed (or the contributor belongs to another sheet)
    #[error("Contributor not found: {id}")]
    ContributorNotFound {
        /// Requested contributor id
        id: i64,
    },

    /// Item lookup failed
    #[error("Item not found: {id}")]
    ItemNotFound {
        /// Requested item id
        id: i64,
    },

    /// Custom split cannot be enabled before a positive total is entered
    #[error("Please enter the total amount before custom splitting")]
    EqualSplitRequiresAmount,

    /// Row shares cannot be edited while equal split is active
    #[error("Shares cannot be edited while equal split is enabled")]
    EqualSplitActive,

    /// A reconciler row index was outside the candidate list
    #[error("Row {index} out of range ({len} rows)")]
    RowOutOfRange {
        /// Requested row
        index: usize,
        /// Number of rows
        len: usize,
    },

    /// A share was entered on an unchecked row
    #[error("Row {index} is not checked")]
    RowNotChecked {
        /// Requested row
        index: usize,
    },

    /// A single consumer's share was larger than the item total
    #[error("Share {share:.2} exceeds the total amount {total:.2}")]
    ShareExceedsTotal {
        /// The entered share, as an amount
        share: f64,
        /// Item total
        total: f64,
    },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable failure
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
