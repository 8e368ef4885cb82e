//! # stockroom-db: Storage, Ledger and Reports
//!
//! SQLite persistence for the stock ledger, and the services built on it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  External API layer / seed binary                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────────┐  ┌────────────┐               │   │
//! │  │   │ Catalog  │  │ LedgerEngine │  │ Aggregator │   services    │   │
//! │  │   └────┬─────┘  └──────┬───────┘  └─────┬──────┘               │   │
//! │  │        │   StoragePolicy (timeouts, retry with backoff)        │   │
//! │  │        ▼               ▼                ▼                       │   │
//! │  │   ┌─────────────────────────────────────────────┐              │   │
//! │  │   │  Repositories (supplier, category, product, │              │   │
//! │  │   │  movement, analytics)                       │              │   │
//! │  │   └──────────────────────┬──────────────────────┘              │   │
//! │  │                          │                                      │   │
//! │  │   Database (pool.rs) ────┴──── Migrations (embedded)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Layered file/env configuration and logging setup
//! - [`policy`] - Operation timeouts and transient-error retry
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and the service-level `InventoryError`
//! - [`repository`] - SQL per table
//! - [`catalog`] - Validated catalog writes and the code uniqueness guard
//! - [`ledger`] - Atomic movement application
//! - [`aggregator`] - Reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_core::{Money, NewMovement, NewProduct};
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockroom.db")).await?;
//!
//! let widget = db
//!     .catalog()
//!     .create_product(&NewProduct::new("Widget", "SKU-1", Money::from_cents(250)))
//!     .await?;
//!
//! db.ledger().apply_movement(&NewMovement::receipt(widget.id, 20)).await?;
//! let summary = db.aggregator().stock_summary().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod policy;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregator::Aggregator;
pub use catalog::Catalog;
pub use config::StockroomConfig;
pub use error::{DbError, DbResult, InventoryError, InventoryResult};
pub use ledger::{LedgerEngine, MovementOutcome};
pub use policy::StoragePolicy;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AnalyticsRepository, CategoryRepository, MovementRepository, ProductRepository,
    SupplierRepository,
};
