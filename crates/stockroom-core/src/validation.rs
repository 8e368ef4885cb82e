//! # Validation Module
//!
//! Field-level rules checked before anything reaches storage.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: External API layer                                           │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, length limits                                    │
//! │  └── Numeric rules (quantity > 0, max > min, ...)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE(products.code)                                             │
//! │  └── CHECK constraints mirroring the numeric rules                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is pure. The first failing rule wins.
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::validate_movement;
//! use stockroom_core::NewMovement;
//!
//! assert!(validate_movement(&NewMovement::receipt(1, 20)).is_ok());
//! assert!(validate_movement(&NewMovement::issue(1, 0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewCategory, NewMovement, NewProduct, NewSupplier};
use crate::report::PageRequest;
use crate::MAX_PAGE_SIZE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const SUPPLIER_NAME_MAX: usize = 100;
pub const CONTACT_MAX: usize = 100;
pub const EMAIL_MAX: usize = 100;
pub const PHONE_MAX: usize = 20;
pub const CATEGORY_NAME_MAX: usize = 50;
pub const PRODUCT_NAME_MAX: usize = 100;
pub const PRODUCT_CODE_MAX: usize = 50;
pub const REFERENCE_MAX: usize = 50;
pub const CREATED_BY_MAX: usize = 50;

/// Upper bound for any stock level or movement quantity.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000_000;

/// Upper bound for a unit price, in cents.
///
/// Together with [`MAX_STOCK_LEVEL`] this keeps one product's valuation
/// (price × stock) at or below 10^17 cents.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

pub const MIN_REPORT_YEAR: i32 = 2000;
pub const MAX_REPORT_YEAR: i32 = 9999;

// =============================================================================
// Field Helpers
// =============================================================================

/// Non-empty after trimming and at most `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    check_length(field, value, max)
}

/// Length limit for an optional field; `None` always passes.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) => check_length(field, v.trim(), max),
        None => Ok(()),
    }
}

fn check_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

pub fn require_positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Inclusive range check for a numeric field.
pub fn require_in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Minimal email sanity check: must contain `@`.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    check_length("email", email.trim(), EMAIL_MAX)?;

    if !email.contains('@') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must contain @".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

pub fn validate_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    require_text("supplier_name", &supplier.name, SUPPLIER_NAME_MAX)?;
    optional_text(
        "contact_person",
        supplier.contact_person.as_deref(),
        CONTACT_MAX,
    )?;
    if let Some(email) = supplier.email.as_deref() {
        validate_email(email)?;
    }
    optional_text("phone", supplier.phone.as_deref(), PHONE_MAX)?;
    Ok(())
}

pub fn validate_category(category: &NewCategory) -> ValidationResult<()> {
    require_text("category_name", &category.name, CATEGORY_NAME_MAX)
}

/// Validates a product create request, or the merged state of an update.
///
/// ## Rules
/// - name and code required, within length limits
/// - unit price > 0, at most [`MAX_UNIT_PRICE_CENTS`]
/// - current and minimum stock ≥ 0
/// - maximum stock strictly greater than minimum stock
/// - every stock level at most [`MAX_STOCK_LEVEL`]
pub fn validate_product(product: &NewProduct) -> ValidationResult<()> {
    require_text("product_name", &product.name, PRODUCT_NAME_MAX)?;
    require_text("product_code", &product.code, PRODUCT_CODE_MAX)?;
    require_positive("unit_price", product.unit_price_cents)?;
    require_in_range("unit_price", product.unit_price_cents, 1, MAX_UNIT_PRICE_CENTS)?;
    require_non_negative("current_stock", product.current_stock)?;
    require_in_range("current_stock", product.current_stock, 0, MAX_STOCK_LEVEL)?;
    require_non_negative("minimum_stock", product.minimum_stock)?;
    require_in_range("minimum_stock", product.minimum_stock, 0, MAX_STOCK_LEVEL)?;

    if product.maximum_stock <= product.minimum_stock {
        return Err(ValidationError::MustExceed {
            field: "maximum_stock".to_string(),
            other: "minimum_stock".to_string(),
        });
    }
    require_in_range("maximum_stock", product.maximum_stock, 1, MAX_STOCK_LEVEL)?;

    Ok(())
}

/// Validates a movement request.
///
/// The movement type itself is already a closed enum here; parsing an
/// unknown type string fails in `MovementType::from_str`.
pub fn validate_movement(movement: &NewMovement) -> ValidationResult<()> {
    require_positive("product_id", movement.product_id)?;
    require_positive("quantity", movement.quantity)?;
    require_in_range("quantity", movement.quantity, 1, MAX_STOCK_LEVEL)?;

    if let Some(price) = movement.unit_price_cents {
        require_positive("unit_price", price)?;
        require_in_range("unit_price", price, 1, MAX_UNIT_PRICE_CENTS)?;
    }

    optional_text(
        "reference_number",
        movement.reference_number.as_deref(),
        REFERENCE_MAX,
    )?;
    require_text("created_by", &movement.created_by, CREATED_BY_MAX)?;
    Ok(())
}

pub fn validate_page(request: &PageRequest) -> ValidationResult<()> {
    if request.page < 1 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        });
    }
    if request.size < 1 || request.size > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "size".to_string(),
            min: 1,
            max: i64::from(MAX_PAGE_SIZE),
        });
    }
    Ok(())
}

pub fn validate_report_period(year: i32, month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    if !(MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: i64::from(MIN_REPORT_YEAR),
            max: i64::from(MAX_REPORT_YEAR),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
