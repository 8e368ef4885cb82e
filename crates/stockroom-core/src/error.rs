//! # Error Types
//!
//! Business error taxonomy for the stock ledger.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Expected business outcomes                     │
//! │  │   ├── NotFound            (404)                                     │
//! │  │   ├── Validation          (400)                                     │
//! │  │   ├── DuplicateCode       (409)                                     │
//! │  │   └── InsufficientStock   (400)                                     │
//! │  └── ValidationError  - Field-level rule failures                      │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  ├── DbError          - Storage failures (500)                         │
//! │  └── InventoryError   - CoreError | DbError, returned by services      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → InventoryError → external layer   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business errors are surfaced verbatim and never retried. Only storage
//! failures are candidates for retry, and that decision lives in stockroom-db.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Entity Kind
// =============================================================================

/// The kind of record a lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Supplier,
    Category,
    Product,
    StockMovement,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Supplier => "Supplier",
            EntityKind::Category => "Category",
            EntityKind::Product => "Product",
            EntityKind::StockMovement => "Stock movement",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Error Code
// =============================================================================

/// Machine-readable error codes handed to the external layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InsufficientStock,
    DuplicateProductCode,
    ValidationError,
    StorageFailure,
}

impl ErrorCode {
    /// Suggested HTTP status for this failure class.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NotFound => 404,
            ErrorCode::InsufficientStock => 400,
            ErrorCode::DuplicateProductCode => 409,
            ErrorCode::ValidationError => 400,
            ErrorCode::StorageFailure => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and expected lookup failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    ///
    /// ## When This Occurs
    /// - Applying a movement to an unknown product id
    /// - Looking up a supplier or category that was never created
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// A product with the same code already exists.
    #[error("Product with code {code} already exists")]
    DuplicateCode { code: String },

    /// Applying the movement would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// OUT movement (qty: 30)
    ///      │
    ///      ▼
    /// Check balance: available=25
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Widget", available: 25, requested: 30 }
    ///      │
    ///      ▼
    /// Nothing written, stock stays at 25
    /// ```
    #[error("Insufficient stock for {product}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error.
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::DuplicateCode { .. } => ErrorCode::DuplicateProductCode,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the external layer can point
/// at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Value must be strictly greater than another field.
    #[error("{field} must be greater than {other}")]
    MustExceed { field: String, other: String },

    /// Invalid format (e.g., email without `@`).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", .allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::MustExceed { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
