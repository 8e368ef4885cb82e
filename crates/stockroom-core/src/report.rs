//! # Report Types
//!
//! Read-side views computed by the aggregator. None of these are stored;
//! every call recomputes them from products and the movement ledger.
//!
//! ```text
//! products ──┬──► LowStockAlert        (active, current ≤ min)
//!            ├──► StockSummary         (counts + total valuation)
//!            └──► ProductSummary       (paged, filtered, with StockStatus)
//!
//! stock_movements ──┬──► MonthlyMovementTotals  (per product, one month)
//!                   └──► MovementRecord         (paged history)
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{StockMovement, StockStatus};
use crate::validation;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Pagination
// =============================================================================

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const fn new(page: u32, size: u32) -> Self {
        PageRequest { page, size }
    }

    /// Everything up to the maximum page size, for small listings.
    pub const fn first_max() -> Self {
        PageRequest {
            page: 1,
            size: MAX_PAGE_SIZE,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    /// Number of pages needed for `total` rows.
    pub fn pages(&self) -> i64 {
        if self.size == 0 {
            return 0;
        }
        let size = i64::from(self.size);
        (self.total + size - 1) / size
    }
}

// =============================================================================
// Low Stock Alert
// =============================================================================

/// An active product at or below its reorder threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LowStockAlert {
    pub product_id: i64,
    pub product_name: String,
    pub product_code: String,
    pub category_name: Option<String>,
    pub supplier_name: Option<String>,
    pub current_stock: i64,
    pub minimum_stock: i64,
    /// `minimum_stock - current_stock`
    pub shortage: i64,
    pub unit_price_cents: i64,
    /// `shortage × unit_price`
    pub required_investment_cents: i64,
}

impl LowStockAlert {
    pub fn required_investment(&self) -> Money {
        Money::from_cents(self.required_investment_cents)
    }
}

// =============================================================================
// Stock Summary
// =============================================================================

/// Inventory-wide counts and valuation.
///
/// Low-stock and overstock counts only consider active products; the total
/// value covers every product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockSummary {
    pub total_products: i64,
    pub active_products: i64,
    pub low_stock_products: i64,
    pub overstock_products: i64,
    pub total_stock_value_cents: i64,
    pub category_count: i64,
    pub supplier_count: i64,
}

impl StockSummary {
    pub fn total_stock_value(&self) -> Money {
        Money::from_cents(self.total_stock_value_cents)
    }
}

// =============================================================================
// Monthly Report
// =============================================================================

/// Calendar month a movement report covers, as a half-open UTC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportPeriod {
    /// Validates the year and month and computes `[start, end)`.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        validation::validate_report_period(year, month)?;

        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let start = month_start(year, month)?;
        let end = month_start(next_year, next_month)?;

        Ok(ReportPeriod {
            year,
            month,
            start,
            end,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First instant of the month (inclusive).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant of the following month (exclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>, ValidationError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: format!("{year}-{month:02} is not a calendar month"),
        })
}

/// Per-product movement totals for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MonthlyMovementTotals {
    pub product_id: i64,
    pub product_name: String,
    pub product_code: String,
    pub category_name: Option<String>,
    pub total_in: i64,
    pub total_out: i64,
    pub total_adjustments: i64,
    pub movement_count: i64,
}

impl MonthlyMovementTotals {
    /// Net effect of the month on the balance.
    pub fn net_change(&self) -> i64 {
        self.total_in - self.total_out + self.total_adjustments
    }
}

/// Monthly report with its period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub period: ReportPeriod,
    pub products: Vec<MonthlyMovementTotals>,
}

impl MonthlyReport {
    pub fn total_products(&self) -> usize {
        self.products.len()
    }
}

// =============================================================================
// Product Summary
// =============================================================================

/// Filters for the paged product summary. All are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub low_stock_only: bool,
}

impl ProductFilter {
    pub fn category(category_id: i64) -> Self {
        ProductFilter {
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    pub fn supplier(supplier_id: i64) -> Self {
        ProductFilter {
            supplier_id: Some(supplier_id),
            ..Default::default()
        }
    }

    pub fn low_stock() -> Self {
        ProductFilter {
            low_stock_only: true,
            ..Default::default()
        }
    }
}

/// One row of the product summary listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: i64,
    pub product_name: String,
    pub product_code: String,
    pub category_name: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub unit_price_cents: i64,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub maximum_stock: i64,
    pub stock_value_cents: i64,
    pub stock_status: StockStatus,
}

impl ProductSummary {
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.stock_value_cents)
    }
}

// =============================================================================
// Movement History
// =============================================================================

/// A ledger entry joined with the product it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MovementRecord {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub movement: StockMovement,
    pub product_name: String,
    pub product_code: String,
}

impl MovementRecord {
    pub fn stock_change(&self) -> i64 {
        self.movement.stock_change()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 25).offset(), 50);
        assert_eq!(PageRequest::default().limit(), 10);
    }

    #[test]
    fn test_page_count() {
        let page: Page<i32> = Page::new(vec![], 21, PageRequest::new(1, 10));
        assert_eq!(page.pages(), 3);
        let page: Page<i32> = Page::new(vec![], 0, PageRequest::new(1, 10));
        assert_eq!(page.pages(), 0);
    }

    #[test]
    fn test_period_bounds() {
        let period = ReportPeriod::new(2024, 3).unwrap();
        assert_eq!(period.start().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(period.end().to_rfc3339(), "2024-04-01T00:00:00+00:00");
        assert_eq!(period.label(), "2024-03");
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let period = ReportPeriod::new(2023, 12).unwrap();
        assert_eq!(period.end().to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let last_second = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert!(period.contains(last_second));
        assert!(!period.contains(period.end()));
    }

    #[test]
    fn test_period_rejects_bad_month() {
        let err = ReportPeriod::new(2024, 13).unwrap_err();
        assert_eq!(err.field(), "month");
        assert!(ReportPeriod::new(2024, 0).is_err());
    }

    #[test]
    fn test_net_change() {
        let totals = MonthlyMovementTotals {
            product_id: 1,
            product_name: "Widget".into(),
            product_code: "W-1".into(),
            category_name: None,
            total_in: 20,
            total_out: 7,
            total_adjustments: 2,
            movement_count: 3,
        };
        assert_eq!(totals.net_change(), 15);
    }
}
