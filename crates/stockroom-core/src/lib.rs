//! # stockroom-core: Pure Domain Logic for the Stock Ledger
//!
//! This crate holds everything about inventory that can be decided without
//! touching storage: entity shapes, money arithmetic, validation rules,
//! stock classification and the business error taxonomy.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stockroom Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            External API layer (not part of this workspace)      │   │
//! │  │   maps InventoryError::http_status() onto responses              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stockroom-db                                 │   │
//! │  │   Catalog ── LedgerEngine ── Aggregator ── Repositories         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ stockroom-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  report   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ LowStock  │  │   rules   │  │   │
//! │  │   │ Movement  │  │           │  │ Summary   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Supplier, Category, Product, StockMovement) and
//!   their creation requests
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`report`] - Derived read-side views (alerts, summary, monthly totals)
//! - [`error`] - Business error taxonomy
//! - [`validation`] - Field-level invariants checked before persistence
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::{MovementType, StockStatus};
//!
//! // OUT movements subtract, everything else adds
//! assert_eq!(MovementType::Out.signed_delta(30), -30);
//! assert_eq!(MovementType::Adjustment.signed_delta(4), 4);
//!
//! // Low stock wins when both thresholds are hit
//! assert_eq!(StockStatus::classify(10, 10, 10), StockStatus::LowStock);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, EntityKind, ErrorCode, ValidationError};
pub use money::Money;
pub use report::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Creator tag recorded on movements when the caller does not supply one.
pub const DEFAULT_CREATED_BY: &str = "system";

/// Creator tag recorded on movements produced by a stock adjustment request.
pub const API_CREATED_BY: &str = "api_user";

/// Default reorder threshold for new products.
pub const DEFAULT_MINIMUM_STOCK: i64 = 10;

/// Default capacity for new products.
pub const DEFAULT_MAXIMUM_STOCK: i64 = 1000;

/// Largest page a listing will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
