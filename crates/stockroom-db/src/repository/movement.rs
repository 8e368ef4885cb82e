//! # Movement Repository
//!
//! The append-only ledger table. There is no update or delete: a wrong
//! entry is corrected by a new movement.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{NewMovement, StockMovement};

/// Repository for stock movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement on the connection of an open transaction.
    ///
    /// Only the ledger engine calls this, paired with the balance update in
    /// the same transaction.
    pub async fn insert_in_tx(
        conn: &mut SqliteConnection,
        movement: &NewMovement,
        at: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(
            product_id = movement.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "Appending stock movement"
        );

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_movements (
                product_id, movement_type, quantity, unit_price_cents,
                reference_number, notes, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id
            "#,
        )
        .bind(movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.unit_price_cents)
        .bind(&movement.reference_number)
        .bind(&movement.notes)
        .bind(&movement.created_by)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT
                id, product_id, movement_type, quantity, unit_price_cents,
                reference_number, notes, created_by, created_at
            FROM stock_movements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Counts movements, optionally for one product.
    pub async fn count(&self, product_id: Option<i64>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_movements WHERE (?1 IS NULL OR product_id = ?1)",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_for_product(&self, product_id: i64) -> DbResult<i64> {
        self.count(Some(product_id)).await
    }

    /// Sum of signed deltas recorded for a product.
    ///
    /// Opening stock plus this equals `current_stock`.
    pub async fn net_change_for_product(&self, product_id: i64) -> DbResult<i64> {
        let net: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN movement_type = 'OUT' THEN -quantity ELSE quantity END), 0)
            FROM stock_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net)
    }
}
