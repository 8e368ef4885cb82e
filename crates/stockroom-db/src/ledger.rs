//! # Ledger Engine
//!
//! Applies stock movements. This is the only code path that changes
//! `products.current_stock` after a product is created.
//!
//! ## Apply Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    apply_movement(movement)                             │
//! │                                                                         │
//! │  validate_movement ──── fails ──► Validation (nothing written)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────────────── BEGIN ─────────────────────────────────┐    │
//! │  │ SELECT product ──── missing ──► NotFound                       │    │
//! │  │      │                                                          │    │
//! │  │      ▼                                                          │    │
//! │  │ new = current + delta     (IN +q, OUT -q, ADJUSTMENT +q)       │    │
//! │  │      │                                                          │    │
//! │  │      ├── overflow or new > MAX_STOCK_LEVEL ──► Validation      │    │
//! │  │      ├── new < 0 ──► InsufficientStock (rollback)              │    │
//! │  │      ▼                                                          │    │
//! │  │ INSERT stock_movements                                         │    │
//! │  │      │                                                          │    │
//! │  │      ▼                                                          │    │
//! │  │ UPDATE products SET current_stock = new                        │    │
//! │  │   WHERE id = ? AND current_stock = current                     │    │
//! │  │      │                                                          │    │
//! │  │      ├── 0 rows ──► ROLLBACK, start over (bounded)             │    │
//! │  │      ▼                                                          │    │
//! │  └───────────────────────── COMMIT ───────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  movement id                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error inside the transaction drops it, and sqlx rolls back on drop:
//! the movement row and the balance change land together or not at all.
//! The whole apply runs under the storage policy's operation timeout, and
//! transient lock errors are retried with exponential backoff.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DbError, InventoryError, InventoryResult};
use crate::pool::Database;
use crate::repository::{MovementRepository, ProductRepository};
use stockroom_core::validation;
use stockroom_core::{
    CoreError, EntityKind, MovementType, NewMovement, StockMovement, ValidationError,
    API_CREATED_BY,
};

/// Balance before and after an applied movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovementOutcome {
    pub movement_id: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
}

impl MovementOutcome {
    pub fn stock_change(&self) -> i64 {
        self.new_stock - self.previous_stock
    }
}

/// Result of one transactional attempt.
enum Attempt {
    Applied(MovementOutcome),
    /// The balance moved between our read and our write.
    Conflict,
}

/// Applies movements atomically against the product balance.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    db: Database,
}

impl LedgerEngine {
    pub fn new(db: Database) -> Self {
        LedgerEngine { db }
    }

    /// Applies a movement and returns the new movement id.
    pub async fn apply_movement(&self, movement: &NewMovement) -> InventoryResult<i64> {
        Ok(self.apply_with_outcome(movement).await?.movement_id)
    }

    /// Applies a movement and reports the balance before and after.
    pub async fn apply_with_outcome(
        &self,
        movement: &NewMovement,
    ) -> InventoryResult<MovementOutcome> {
        validation::validate_movement(movement)?;

        self.db
            .policy()
            .timed("apply_movement", self.apply_with_retries(movement))
            .await
    }

    /// Signed stock change as a movement: positive receives, negative
    /// issues `|quantity|`.
    ///
    /// The movement freezes the product's current unit price and is
    /// attributed to the API caller.
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        quantity: i64,
        reference_number: Option<String>,
        notes: Option<String>,
    ) -> InventoryResult<MovementOutcome> {
        if quantity == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }
        validation::require_in_range(
            "quantity",
            quantity,
            -validation::MAX_STOCK_LEVEL,
            validation::MAX_STOCK_LEVEL,
        )?;

        let product = self
            .db
            .policy()
            .timed("adjust_stock", async {
                Ok::<_, InventoryError>(self.db.products().get_by_id(product_id).await?)
            })
            .await?
            .ok_or(CoreError::not_found(EntityKind::Product, product_id))?;

        let movement_type = if quantity > 0 {
            MovementType::In
        } else {
            MovementType::Out
        };

        let movement = NewMovement {
            product_id,
            movement_type,
            quantity: quantity.abs(),
            unit_price_cents: Some(product.unit_price_cents),
            reference_number,
            notes,
            created_by: API_CREATED_BY.to_string(),
        };

        self.apply_with_outcome(&movement).await
    }

    /// Fetches a recorded movement.
    pub async fn get_movement(&self, id: i64) -> InventoryResult<StockMovement> {
        let found = self
            .db
            .policy()
            .timed("get_movement", async {
                Ok::<_, InventoryError>(self.db.movements().get_by_id(id).await?)
            })
            .await?;

        found.ok_or_else(|| CoreError::not_found(EntityKind::StockMovement, id).into())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn apply_with_retries(&self, movement: &NewMovement) -> InventoryResult<MovementOutcome> {
        let policy = self.db.policy();
        let attempts = policy.max_write_retries + 1;

        for attempt in 1..=attempts {
            let result = policy
                .retry_transient("apply_movement", || self.try_apply(movement))
                .await?;

            match result {
                Attempt::Applied(outcome) => {
                    info!(
                        product_id = movement.product_id,
                        movement_id = outcome.movement_id,
                        movement_type = %movement.movement_type,
                        delta = movement.signed_delta(),
                        new_stock = outcome.new_stock,
                        "Stock movement applied"
                    );
                    return Ok(outcome);
                }
                Attempt::Conflict => {
                    warn!(
                        product_id = movement.product_id,
                        attempt,
                        "Balance changed concurrently, retrying movement"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(DbError::WriteConflict {
            product_id: movement.product_id,
            attempts,
        }
        .into())
    }

    async fn try_apply(&self, movement: &NewMovement) -> InventoryResult<Attempt> {
        let mut tx = self.db.pool().begin().await?;

        let product = ProductRepository::fetch_in_tx(&mut *tx, movement.product_id)
            .await?
            .ok_or(CoreError::not_found(EntityKind::Product, movement.product_id))?;

        let delta = movement.signed_delta();
        let previous_stock = product.current_stock;
        let new_stock = previous_stock
            .checked_add(delta)
            .filter(|stock| *stock <= validation::MAX_STOCK_LEVEL)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: (validation::MAX_STOCK_LEVEL - previous_stock).max(0),
            })?;

        if new_stock < 0 {
            warn!(
                product_id = product.id,
                available = previous_stock,
                requested = delta.abs(),
                "Rejected movement: insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: previous_stock,
                requested: delta.abs(),
            }
            .into());
        }

        let now = Utc::now();
        let movement_id = MovementRepository::insert_in_tx(&mut *tx, movement, now).await?;

        let swapped = ProductRepository::compare_and_set_stock(
            &mut *tx,
            product.id,
            previous_stock,
            new_stock,
            now,
        )
        .await?;

        if !swapped {
            debug!(product_id = product.id, "Compare-and-swap lost, rolling back");
            tx.rollback().await?;
            return Ok(Attempt::Conflict);
        }

        tx.commit().await?;

        Ok(Attempt::Applied(MovementOutcome {
            movement_id,
            previous_stock,
            new_stock,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use stockroom_core::{ErrorCode, Money, NewProduct};

    async fn setup(stock: i64) -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .catalog()
            .create_product(
                &NewProduct::new("Widget", "SKU-1", Money::from_cents(250))
                    .with_stock_levels(stock, 10, 100),
            )
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_outcome_reports_both_balances() {
        let (db, id) = setup(5).await;

        let outcome = db
            .ledger()
            .apply_with_outcome(&NewMovement::receipt(id, 20))
            .await
            .unwrap();

        assert_eq!(outcome.previous_stock, 5);
        assert_eq!(outcome.new_stock, 25);
        assert_eq!(outcome.stock_change(), 20);
    }

    #[tokio::test]
    async fn test_adjust_stock_signs() {
        let (db, id) = setup(5).await;
        let ledger = db.ledger();

        let up = ledger.adjust_stock(id, 7, Some("PO-1".into()), None).await.unwrap();
        assert_eq!(up.new_stock, 12);

        let down = ledger.adjust_stock(id, -2, None, Some("damaged".into())).await.unwrap();
        assert_eq!(down.new_stock, 10);

        let recorded = ledger.get_movement(down.movement_id).await.unwrap();
        assert_eq!(recorded.movement_type, MovementType::Out);
        assert_eq!(recorded.quantity, 2);
        assert_eq!(recorded.unit_price_cents, Some(250));
        assert_eq!(recorded.created_by, API_CREATED_BY);
        assert_eq!(recorded.stock_change(), -2);

        let err = ledger.adjust_stock(id, 0, None, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_adjust_stock_cannot_go_negative() {
        let (db, id) = setup(3).await;

        let err = db.ledger().adjust_stock(id, -4, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Core(CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_adjustment_is_additive() {
        let (db, id) = setup(5).await;

        let outcome = db
            .ledger()
            .apply_with_outcome(&NewMovement::adjustment(id, 3))
            .await
            .unwrap();
        assert_eq!(outcome.new_stock, 8);
    }

    #[tokio::test]
    async fn test_receive_then_overdraw() {
        let (db, id) = setup(5).await;
        let ledger = db.ledger();

        ledger.apply_movement(&NewMovement::receipt(id, 20)).await.unwrap();
        let product = db.catalog().get_product(id).await.unwrap();
        assert_eq!(product.current_stock, 25);
        assert_eq!(product.stock_status(), stockroom_core::StockStatus::Normal);

        let err = ledger
            .apply_movement(&NewMovement::issue(id, 30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Core(CoreError::InsufficientStock {
                available: 25,
                requested: 30,
                ..
            })
        ));
        assert_eq!(err.http_status(), 400);

        let product = db.catalog().get_product(id).await.unwrap();
        assert_eq!(product.current_stock, 25);
        assert_eq!(db.movements().count_for_product(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_movement_writes_nothing() {
        let (db, id) = setup(5).await;

        let err = db
            .ledger()
            .apply_movement(&NewMovement::receipt(id, 0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_balance_write_rolls_back_movement() {
        let (db, id) = setup(5).await;

        sqlx::query(
            "CREATE TRIGGER fail_balance BEFORE UPDATE OF current_stock ON products \
             BEGIN SELECT RAISE(ABORT, 'simulated failure'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .ledger()
            .apply_movement(&NewMovement::receipt(id, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Db(_)));

        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 0);
        assert_eq!(db.catalog().get_product(id).await.unwrap().current_stock, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queued_issues_stop_at_zero_stock() {
        let (db, id) = setup(5).await;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = db.ledger();
                tokio::spawn(async move { ledger.apply_movement(&NewMovement::issue(id, 1)).await })
            })
            .collect();

        let mut applied = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(InventoryError::Core(CoreError::InsufficientStock { .. })) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(applied, 5);
        assert_eq!(rejected, 5);
        assert_eq!(db.catalog().get_product(id).await.unwrap().current_stock, 0);
        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_balance_equals_opening_plus_ledger() {
        let (db, id) = setup(12).await;
        let ledger = db.ledger();

        ledger.apply_movement(&NewMovement::receipt(id, 40)).await.unwrap();
        ledger.apply_movement(&NewMovement::issue(id, 17)).await.unwrap();
        ledger.apply_movement(&NewMovement::adjustment(id, 3)).await.unwrap();
        let _ = ledger.apply_movement(&NewMovement::issue(id, 500)).await;

        let net = db.movements().net_change_for_product(id).await.unwrap();
        let current = db.catalog().get_product(id).await.unwrap().current_stock;
        assert_eq!(12 + net, current);
        assert_eq!(current, 38);
    }

    #[tokio::test]
    async fn test_huge_quantities_are_rejected_not_panicking() {
        let (db, id) = setup(5).await;
        let ledger = db.ledger();

        let err = ledger
            .apply_movement(&NewMovement::receipt(id, i64::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        for quantity in [i64::MIN, i64::MAX] {
            let err = ledger.adjust_stock(id, quantity, None, None).await.unwrap_err();
            assert!(matches!(
                err,
                InventoryError::Core(CoreError::Validation(ValidationError::OutOfRange {
                    ref field,
                    ..
                })) if field == "quantity"
            ));
        }

        assert_eq!(db.catalog().get_product(id).await.unwrap().current_stock, 5);
        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_receipt_cannot_push_stock_past_cap() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let near_cap = validation::MAX_STOCK_LEVEL - 5;
        let id = db
            .catalog()
            .create_product(
                &NewProduct::new("Pallet", "SKU-CAP", Money::from_cents(100)).with_stock_levels(
                    near_cap,
                    10,
                    validation::MAX_STOCK_LEVEL,
                ),
            )
            .await
            .unwrap()
            .id;

        let err = db
            .ledger()
            .apply_movement(&NewMovement::receipt(id, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Validation(ValidationError::OutOfRange { min: 1, max: 5, .. }))
        ));
        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 0);

        let outcome = db
            .ledger()
            .apply_with_outcome(&NewMovement::receipt(id, 5))
            .await
            .unwrap();
        assert_eq!(outcome.new_stock, validation::MAX_STOCK_LEVEL);
    }

    #[tokio::test]
    async fn test_lost_compare_and_swap_surfaces_write_conflict() {
        let db = Database::new(DbConfig::in_memory().max_write_retries(2))
            .await
            .unwrap();
        let id = db
            .catalog()
            .create_product(
                &NewProduct::new("Widget", "SKU-1", Money::from_cents(250))
                    .with_stock_levels(5, 10, 100),
            )
            .await
            .unwrap()
            .id;

        // Moves the balance after the engine read it, inside the same transaction
        sqlx::query(
            "CREATE TRIGGER shift_balance AFTER INSERT ON stock_movements \
             BEGIN UPDATE products SET current_stock = current_stock + 1 \
             WHERE id = NEW.product_id; END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .ledger()
            .apply_movement(&NewMovement::receipt(id, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Db(DbError::WriteConflict {
                product_id,
                attempts: 3
            }) if product_id == id
        ));
        assert!(!err.is_business());

        assert_eq!(db.movements().count(Some(id)).await.unwrap(), 0);
        assert_eq!(db.catalog().get_product(id).await.unwrap().current_stock, 5);
    }

    #[tokio::test]
    async fn test_missing_product_and_movement() {
        let (db, _) = setup(5).await;

        let err = db
            .ledger()
            .apply_movement(&NewMovement::receipt(404, 1))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Product with ID 404 not found");

        let err = db.ledger().get_movement(1).await.unwrap_err();
        assert_eq!(err.to_string(), "Stock movement with ID 1 not found");
    }
}
