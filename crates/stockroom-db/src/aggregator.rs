//! # Aggregator
//!
//! Read-side reports over products and the movement ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Aggregator                                      │
//! │                                                                         │
//! │  low_stock_alerts()        active, current ≤ min, by shortage desc     │
//! │  stock_summary()           counts, valuation, categories, suppliers    │
//! │  monthly_report(y, m)      per-product IN/OUT/ADJ totals in a month    │
//! │  product_summary(f, page)  filtered listing with StockStatus           │
//! │  movement_history(p, page) newest-first ledger with product names      │
//! │                                                                         │
//! │  Stateless. Recomputed on every call. Runs alongside ledger writes     │
//! │  without snapshot isolation across separate calls.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::error::{InventoryError, InventoryResult};
use crate::pool::Database;
use stockroom_core::validation;
use stockroom_core::{
    CoreError, EntityKind, LowStockAlert, MonthlyReport, MovementRecord, Page, PageRequest,
    ProductFilter, ProductSummary, ReportPeriod, StockSummary,
};

/// Report computations.
#[derive(Debug, Clone)]
pub struct Aggregator {
    db: Database,
}

impl Aggregator {
    pub fn new(db: Database) -> Self {
        Aggregator { db }
    }

    pub async fn low_stock_alerts(&self) -> InventoryResult<Vec<LowStockAlert>> {
        self.db
            .policy()
            .timed("low_stock_alerts", async {
                Ok::<_, InventoryError>(self.db.analytics().low_stock_alerts().await?)
            })
            .await
    }

    pub async fn stock_summary(&self) -> InventoryResult<StockSummary> {
        self.db
            .policy()
            .timed("stock_summary", async {
                Ok::<_, InventoryError>(self.db.analytics().stock_summary().await?)
            })
            .await
    }

    /// Movement totals per product for one calendar month (UTC).
    ///
    /// Only products with at least one movement in the month appear,
    /// busiest first.
    pub async fn monthly_report(&self, year: i32, month: u32) -> InventoryResult<MonthlyReport> {
        let period = ReportPeriod::new(year, month)?;
        debug!(period = %period.label(), "Building monthly movement report");

        let products = self
            .db
            .policy()
            .timed("monthly_report", async {
                Ok::<_, InventoryError>(
                    self.db
                        .analytics()
                        .monthly_totals(period.start(), period.end())
                        .await?,
                )
            })
            .await?;

        Ok(MonthlyReport { period, products })
    }

    /// Paged listing of active products, ordered by name.
    pub async fn product_summary(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> InventoryResult<Page<ProductSummary>> {
        validation::validate_page(&page)?;

        self.db
            .policy()
            .timed("product_summary", async {
                let repo = self.db.products();
                let items = repo.list_summary(filter, page).await?;
                let total = repo.count_summary(filter).await?;
                Ok::<_, InventoryError>(Page::new(items, total, page))
            })
            .await
    }

    /// Paged ledger, newest first, optionally for one product.
    pub async fn movement_history(
        &self,
        product_id: Option<i64>,
        page: PageRequest,
    ) -> InventoryResult<Page<MovementRecord>> {
        validation::validate_page(&page)?;

        self.db
            .policy()
            .timed("movement_history", async {
                if let Some(id) = product_id {
                    if self.db.products().get_by_id(id).await?.is_none() {
                        return Err(InventoryError::from(CoreError::not_found(
                            EntityKind::Product,
                            id,
                        )));
                    }
                }

                let items = self.db.analytics().movement_history(product_id, page).await?;
                let total = self.db.movements().count(product_id).await?;
                Ok::<_, InventoryError>(Page::new(items, total, page))
            })
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use chrono::{TimeZone, Utc};
    use stockroom_core::{ErrorCode, Money, NewCategory, NewMovement, NewProduct, StockStatus};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn product(db: &Database, code: &str, cur: i64, min: i64, max: i64) -> i64 {
        db.catalog()
            .create_product(
                &NewProduct::new(format!("Item {code}"), code, Money::from_cents(250))
                    .with_stock_levels(cur, min, max),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_low_stock_alert_shortage_and_investment() {
        let db = db().await;
        let low = product(&db, "SKU-LOW", 2, 10, 100).await;
        product(&db, "SKU-OK", 50, 10, 100).await;
        db.catalog()
            .create_product(
                &NewProduct::new("Retired", "SKU-OLD", Money::from_cents(100))
                    .with_stock_levels(0, 10, 100)
                    .inactive(),
            )
            .await
            .unwrap();

        let alerts = db.aggregator().low_stock_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].product_id, low);
        assert_eq!(alerts[0].shortage, 8);
        assert_eq!(alerts[0].required_investment(), Money::from_cents(2000));
    }

    #[tokio::test]
    async fn test_stock_summary_counts() {
        let db = db().await;
        product(&db, "SKU-1", 5, 10, 100).await;
        product(&db, "SKU-2", 50, 10, 30).await;

        let aggregator = db.aggregator();
        let summary = aggregator.stock_summary().await.unwrap();
        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.active_products, 2);
        assert_eq!(summary.low_stock_products, 1);
        assert_eq!(summary.overstock_products, 1);
        assert_eq!(summary.total_stock_value(), Money::from_cents(55 * 250));

        // Reads do not change anything
        assert_eq!(aggregator.stock_summary().await.unwrap(), summary);
    }

    #[tokio::test]
    async fn test_valuation_at_largest_accepted_product() {
        use stockroom_core::validation::{MAX_STOCK_LEVEL, MAX_UNIT_PRICE_CENTS};

        let db = db().await;
        let largest = db
            .catalog()
            .create_product(
                &NewProduct::new("Bullion", "BIG-1", Money::from_cents(MAX_UNIT_PRICE_CENTS))
                    .with_stock_levels(MAX_STOCK_LEVEL, 10, MAX_STOCK_LEVEL),
            )
            .await
            .unwrap();
        product(&db, "SKU-1", 4, 1, 100).await;

        let expected = MAX_UNIT_PRICE_CENTS * MAX_STOCK_LEVEL;
        assert_eq!(largest.stock_value(), Money::from_cents(expected));

        let summary = db.aggregator().stock_summary().await.unwrap();
        assert_eq!(summary.total_stock_value(), Money::from_cents(expected + 4 * 250));
        assert_eq!(summary.overstock_products, 1);

        let listing = db
            .aggregator()
            .product_summary(&ProductFilter::default(), PageRequest::default())
            .await
            .unwrap();
        let bullion = listing
            .items
            .iter()
            .find(|p| p.product_id == largest.id)
            .unwrap();
        assert_eq!(bullion.stock_value_cents, expected);

        // One unit over the cap never reaches storage
        let err = db
            .catalog()
            .create_product(
                &NewProduct::new("Too Much", "BIG-2", Money::from_cents(MAX_UNIT_PRICE_CENTS + 1))
                    .with_stock_levels(1, 0, 10),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_inventory_valuation_saturates_across_many_large_products() {
        use stockroom_core::validation::{MAX_STOCK_LEVEL, MAX_UNIT_PRICE_CENTS};

        let db = db().await;
        for i in 0..100 {
            db.catalog()
                .create_product(
                    &NewProduct::new(
                        format!("Bullion {i}"),
                        format!("BIG-{i}"),
                        Money::from_cents(MAX_UNIT_PRICE_CENTS),
                    )
                    .with_stock_levels(MAX_STOCK_LEVEL, 10, MAX_STOCK_LEVEL),
                )
                .await
                .unwrap();
        }

        let summary = db.aggregator().stock_summary().await.unwrap();
        assert_eq!(summary.total_products, 100);
        assert_eq!(summary.total_stock_value(), Money::from_cents(i64::MAX));
    }

    #[tokio::test]
    async fn test_monthly_report_only_lists_moved_products() {
        let db = db().await;
        let moved = product(&db, "SKU-1", 5, 1, 100).await;
        product(&db, "SKU-2", 5, 1, 100).await;

        let ledger = db.ledger();
        let ids = [
            ledger.apply_movement(&NewMovement::receipt(moved, 10)).await.unwrap(),
            ledger.apply_movement(&NewMovement::issue(moved, 4)).await.unwrap(),
            ledger.apply_movement(&NewMovement::adjustment(moved, 2)).await.unwrap(),
        ];

        let in_march = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        for id in ids {
            sqlx::query("UPDATE stock_movements SET created_at = ?1 WHERE id = ?2")
                .bind(in_march)
                .bind(id)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let report = db.aggregator().monthly_report(2024, 3).await.unwrap();
        assert_eq!(report.period.label(), "2024-03");
        assert_eq!(report.total_products(), 1);

        let totals = &report.products[0];
        assert_eq!(totals.product_id, moved);
        assert_eq!(totals.total_in, 10);
        assert_eq!(totals.total_out, 4);
        assert_eq!(totals.total_adjustments, 2);
        assert_eq!(totals.movement_count, 3);

        let empty = db.aggregator().monthly_report(2024, 4).await.unwrap();
        assert!(empty.products.is_empty());

        let err = db.aggregator().monthly_report(2024, 13).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_product_summary_filters_and_pages() {
        let db = db().await;
        let tools = db
            .catalog()
            .create_category(&NewCategory::new("Tools"))
            .await
            .unwrap();
        db.catalog()
            .create_product(
                &NewProduct::new("Hammer", "T-1", Money::from_cents(900))
                    .with_stock_levels(3, 10, 100)
                    .in_category(tools.id),
            )
            .await
            .unwrap();
        product(&db, "SKU-2", 50, 10, 30).await;
        product(&db, "SKU-3", 20, 10, 100).await;

        let aggregator = db.aggregator();

        let all = aggregator
            .product_summary(&ProductFilter::default(), PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 2);
        assert_eq!(all.pages(), 2);

        let in_tools = aggregator
            .product_summary(&ProductFilter::category(tools.id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(in_tools.total, 1);
        let hammer = &in_tools.items[0];
        assert_eq!(hammer.category_name.as_deref(), Some("Tools"));
        assert_eq!(hammer.stock_status, StockStatus::LowStock);
        assert_eq!(hammer.stock_value(), Money::from_cents(2700));

        let low = aggregator
            .product_summary(&ProductFilter::low_stock(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(low.total, 1);

        let err = aggregator
            .product_summary(&ProductFilter::default(), PageRequest::new(1, 0))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn test_movement_history_newest_first() {
        let db = db().await;
        let id = product(&db, "SKU-1", 5, 1, 100).await;
        let other = product(&db, "SKU-2", 5, 1, 100).await;

        let ledger = db.ledger();
        let first = ledger.apply_movement(&NewMovement::receipt(id, 1)).await.unwrap();
        let second = ledger.apply_movement(&NewMovement::issue(id, 2)).await.unwrap();
        ledger.apply_movement(&NewMovement::receipt(other, 1)).await.unwrap();

        let history = db
            .aggregator()
            .movement_history(Some(id), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total, 2);
        assert_eq!(history.items[0].movement.id, second);
        assert_eq!(history.items[0].stock_change(), -2);
        assert_eq!(history.items[1].movement.id, first);
        assert_eq!(history.items[1].product_code, "SKU-1");

        let everything = db
            .aggregator()
            .movement_history(None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(everything.total, 3);

        let err = db
            .aggregator()
            .movement_history(Some(999), PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
