//! # Domain Types
//!
//! Entities of the stock ledger and the requests that create them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Supplier     │   │    Category     │   │      Product        │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id             │◄──┼── weak refs ────┼───│  supplier_id?       │   │
//! │  │  name           │   │  id             │◄──│  category_id?       │   │
//! │  │  email?         │   │  name (≤50)     │   │  code (unique)      │   │
//! │  └─────────────────┘   └─────────────────┘   │  current_stock ≥ 0  │   │
//! │                                               │  min < max          │   │
//! │                                               └──────────┬──────────┘   │
//! │                                                          │ 1..N         │
//! │                                               ┌──────────▼──────────┐   │
//! │                                               │   StockMovement     │   │
//! │                                               │  (append-only)      │   │
//! │                                               │  IN | OUT | ADJ     │   │
//! │                                               └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Request vs Record
//! Every entity has a `New*` request type (what a caller submits, validated by
//! [`crate::validation`]) and a record type (what the store returns, with the
//! generated id and timestamps).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_CREATED_BY, DEFAULT_MAXIMUM_STOCK, DEFAULT_MINIMUM_STOCK};

// =============================================================================
// Supplier
// =============================================================================

/// A supplier that products are sourced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewSupplier {
    pub fn new(name: impl Into<String>) -> Self {
        NewSupplier {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            description: None,
        }
    }
}

// =============================================================================
// Stock Status
// =============================================================================

/// Derived classification of a product's balance against its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Low Stock")]
    LowStock,
    Normal,
    Overstock,
}

impl StockStatus {
    /// Classifies a balance.
    ///
    /// The low-stock check runs first, so a product sitting on both
    /// thresholds at once reports `LowStock`.
    pub fn classify(current_stock: i64, minimum_stock: i64, maximum_stock: i64) -> Self {
        if current_stock <= minimum_stock {
            StockStatus::LowStock
        } else if current_stock >= maximum_stock {
            StockStatus::Overstock
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::LowStock => "Low Stock",
            StockStatus::Normal => "Normal",
            StockStatus::Overstock => "Overstock",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `current_stock` is the running balance; after creation only the ledger
/// engine writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Business identifier, unique across all products.
    pub code: String,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    /// At or above capacity.
    pub fn is_overstock(&self) -> bool {
        self.current_stock >= self.maximum_stock
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.current_stock, self.minimum_stock, self.maximum_stock)
    }

    /// Value of the stock on hand (unit price × current stock).
    pub fn stock_value(&self) -> Money {
        self.unit_price().multiply_quantity(self.current_stock)
    }

    /// Units missing to reach the reorder threshold, zero when not short.
    pub fn shortage(&self) -> i64 {
        (self.minimum_stock - self.current_stock).max(0)
    }
}

/// Request to create a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub unit_price_cents: i64,
    /// Opening balance. Every later change goes through a movement.
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub description: Option<String>,
    pub is_active: bool,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, code: impl Into<String>, unit_price: Money) -> Self {
        NewProduct {
            name: name.into(),
            code: code.into(),
            unit_price_cents: unit_price.cents(),
            ..Default::default()
        }
    }

    /// Sets opening, minimum and maximum stock in one go.
    pub fn with_stock_levels(mut self, current: i64, minimum: i64, maximum: i64) -> Self {
        self.current_stock = current;
        self.minimum_stock = minimum;
        self.maximum_stock = maximum;
        self
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn from_supplier(mut self, supplier_id: i64) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl Default for NewProduct {
    fn default() -> Self {
        NewProduct {
            name: String::new(),
            code: String::new(),
            category_id: None,
            supplier_id: None,
            unit_price_cents: 0,
            current_stock: 0,
            minimum_stock: DEFAULT_MINIMUM_STOCK,
            maximum_stock: DEFAULT_MAXIMUM_STOCK,
            description: None,
            is_active: true,
        }
    }
}

/// Partial update of a product's catalog fields.
///
/// There is deliberately no stock field here: balances only move through
/// the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub minimum_stock: Option<i64>,
    pub maximum_stock: Option<i64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Produces the candidate product state after applying this update, so
    /// the same validation rules as creation can run against it.
    pub fn merge(&self, current: &Product) -> NewProduct {
        NewProduct {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            code: self.code.clone().unwrap_or_else(|| current.code.clone()),
            category_id: self.category_id.or(current.category_id),
            supplier_id: self.supplier_id.or(current.supplier_id),
            unit_price_cents: self.unit_price_cents.unwrap_or(current.unit_price_cents),
            current_stock: current.current_stock,
            minimum_stock: self.minimum_stock.unwrap_or(current.minimum_stock),
            maximum_stock: self.maximum_stock.unwrap_or(current.maximum_stock),
            description: self
                .description
                .clone()
                .or_else(|| current.description.clone()),
            is_active: self.is_active.unwrap_or(current.is_active),
        }
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Kind of stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Goods received.
    In,
    /// Goods issued.
    Out,
    /// Correction. Strictly additive: a positive quantity raises stock, and
    /// net decreases go through `Out`.
    Adjustment,
}

impl MovementType {
    pub const ALL: [MovementType; 3] = [MovementType::In, MovementType::Out, MovementType::Adjustment];

    /// Signed change a movement of `quantity` applies to the balance.
    pub const fn signed_delta(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In | MovementType::Adjustment => quantity,
            MovementType::Out => -quantity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            _ => Err(ValidationError::NotAllowed {
                field: "movement_type".to_string(),
                allowed: MovementType::ALL
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    /// Unit price at the time of the movement (frozen).
    pub unit_price_cents: Option<i64>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed effect this entry had on the balance.
    pub fn stock_change(&self) -> i64 {
        self.movement_type.signed_delta(self.quantity)
    }
}

/// Request to apply a movement through the ledger engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl NewMovement {
    pub fn new(product_id: i64, movement_type: MovementType, quantity: i64) -> Self {
        NewMovement {
            product_id,
            movement_type,
            quantity,
            unit_price_cents: None,
            reference_number: None,
            notes: None,
            created_by: DEFAULT_CREATED_BY.to_string(),
        }
    }

    pub fn receipt(product_id: i64, quantity: i64) -> Self {
        Self::new(product_id, MovementType::In, quantity)
    }

    pub fn issue(product_id: i64, quantity: i64) -> Self {
        Self::new(product_id, MovementType::Out, quantity)
    }

    pub fn adjustment(product_id: i64, quantity: i64) -> Self {
        Self::new(product_id, MovementType::Adjustment, quantity)
    }

    pub fn with_unit_price(mut self, price: Money) -> Self {
        self.unit_price_cents = Some(price.cents());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn created_by(mut self, who: impl Into<String>) -> Self {
        self.created_by = who.into();
        self
    }

    /// Signed change this request would apply.
    pub fn signed_delta(&self) -> i64 {
        self.movement_type.signed_delta(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
