//! # Repository Module
//!
//! SQL for every table lives here, one repository per concern.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Catalog / LedgerEngine / Aggregator  (validation, transactions,       │
//! │       │                                timeouts, retries)               │
//! │       ▼                                                                 │
//! │  SupplierRepository   suppliers                                        │
//! │  CategoryRepository   categories                                       │
//! │  ProductRepository    products (+ CAS balance update, summary listing) │
//! │  MovementRepository   stock_movements (append-only)                    │
//! │  AnalyticsRepository  read-only aggregates across all four             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories return plain [`DbResult`](crate::error::DbResult) and never
//! apply business rules. Functions taking a `&mut SqliteConnection` run on a
//! caller-owned transaction.

pub mod analytics;
pub mod category;
pub mod movement;
pub mod product;
pub mod supplier;

pub use analytics::AnalyticsRepository;
pub use category::CategoryRepository;
pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use supplier::SupplierRepository;
