//! # Analytics Repository
//!
//! Read-only aggregate queries behind the [`Aggregator`](crate::Aggregator).
//! Nothing here writes; every figure is recomputed from products and the
//! ledger on each call.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{
    LowStockAlert, MonthlyMovementTotals, MovementRecord, PageRequest, StockSummary,
};

/// Repository for aggregate report queries.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Active products at or below their reorder threshold.
    ///
    /// Largest shortage first, ties by name.
    pub async fn low_stock_alerts(&self) -> DbResult<Vec<LowStockAlert>> {
        let alerts = sqlx::query_as::<_, LowStockAlert>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.code AS product_code,
                c.name AS category_name,
                s.name AS supplier_name,
                p.current_stock,
                p.minimum_stock,
                p.minimum_stock - p.current_stock AS shortage,
                p.unit_price_cents,
                (p.minimum_stock - p.current_stock) * p.unit_price_cents AS required_investment_cents
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.is_active = 1
              AND p.current_stock <= p.minimum_stock
            ORDER BY shortage DESC, p.name, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = alerts.len(), "Computed low stock alerts");
        Ok(alerts)
    }

    /// Inventory-wide counts and valuation.
    ///
    /// Per-product values always fit in `i64`; their total saturates
    /// instead of tripping SQLite's integer overflow on `SUM`.
    pub async fn stock_summary(&self) -> DbResult<StockSummary> {
        let mut summary = sqlx::query_as::<_, StockSummary>(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0) AS active_products,
                COALESCE(SUM(CASE WHEN is_active = 1 AND current_stock <= minimum_stock
                                  THEN 1 ELSE 0 END), 0) AS low_stock_products,
                COALESCE(SUM(CASE WHEN is_active = 1 AND current_stock >= maximum_stock
                                  THEN 1 ELSE 0 END), 0) AS overstock_products,
                0 AS total_stock_value_cents,
                (SELECT COUNT(DISTINCT category_id) FROM products WHERE is_active = 1)
                    AS category_count,
                (SELECT COUNT(*) FROM suppliers) AS supplier_count
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let values: Vec<i64> =
            sqlx::query_scalar("SELECT current_stock * unit_price_cents FROM products")
                .fetch_all(&self.pool)
                .await?;
        summary.total_stock_value_cents = values.into_iter().fold(0i64, i64::saturating_add);

        Ok(summary)
    }

    /// Per-product movement totals for `[start, end)`.
    ///
    /// Products without movements in the window do not appear.
    pub async fn monthly_totals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<MonthlyMovementTotals>> {
        let totals = sqlx::query_as::<_, MonthlyMovementTotals>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.code AS product_code,
                c.name AS category_name,
                SUM(CASE WHEN sm.movement_type = 'IN' THEN sm.quantity ELSE 0 END) AS total_in,
                SUM(CASE WHEN sm.movement_type = 'OUT' THEN sm.quantity ELSE 0 END) AS total_out,
                SUM(CASE WHEN sm.movement_type = 'ADJUSTMENT' THEN sm.quantity ELSE 0 END)
                    AS total_adjustments,
                COUNT(*) AS movement_count
            FROM stock_movements sm
            JOIN products p ON p.id = sm.product_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE sm.created_at >= ?1 AND sm.created_at < ?2
            GROUP BY p.id, p.name, p.code, c.name
            ORDER BY movement_count DESC, p.name, p.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(products = totals.len(), %start, "Computed monthly movement totals");
        Ok(totals)
    }

    /// Ledger entries joined with their product, newest first.
    pub async fn movement_history(
        &self,
        product_id: Option<i64>,
        page: PageRequest,
    ) -> DbResult<Vec<MovementRecord>> {
        let records = sqlx::query_as::<_, MovementRecord>(
            r#"
            SELECT
                sm.id,
                sm.product_id,
                sm.movement_type,
                sm.quantity,
                sm.unit_price_cents,
                sm.reference_number,
                sm.notes,
                sm.created_by,
                sm.created_at,
                p.name AS product_name,
                p.code AS product_code
            FROM stock_movements sm
            JOIN products p ON p.id = sm.product_id
            WHERE (?1 IS NULL OR sm.product_id = ?1)
            ORDER BY sm.created_at DESC, sm.id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(product_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
