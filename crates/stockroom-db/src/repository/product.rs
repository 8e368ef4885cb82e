//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Column Ownership                             │
//! │                                                                         │
//! │  Catalog (insert / update_catalog)                                     │
//! │    name, code, category_id, supplier_id, unit_price_cents,             │
//! │    minimum_stock, maximum_stock, description, is_active                │
//! │    + opening current_stock on insert only                              │
//! │                                                                         │
//! │  LedgerEngine (compare_and_set_stock, inside its transaction)          │
//! │    current_stock                                                       │
//! │                                                                         │
//! │    UPDATE products SET current_stock = :new                            │
//! │    WHERE id = :id AND current_stock = :expected                        │
//! │                                                                         │
//! │    0 rows → another writer got there first → caller retries           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{
    NewProduct, PageRequest, Product, ProductFilter, ProductSummary, StockStatus,
};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_code("SKU-1").await?;
/// let taken = repo.code_exists("SKU-1", None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::UniqueViolation)` - code already exists
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(code = %product.code, "Inserting product");

        let now = Utc::now();

        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?11
            )
            RETURNING
                id, name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.code)
        .bind(product.category_id)
        .bind(product.supplier_id)
        .bind(product.unit_price_cents)
        .bind(product.current_stock)
        .bind(product.minimum_stock)
        .bind(product.maximum_stock)
        .bind(&product.description)
        .bind(product.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            FROM products
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Returns true if another product already uses `code`.
    ///
    /// `exclude_id` skips the record being updated.
    pub async fn code_exists(&self, code: &str, exclude_id: Option<i64>) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM products
            WHERE code = ?1 AND (?2 IS NULL OR id <> ?2)
            LIMIT 1
            "#,
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Writes catalog fields. `current_stock` is never touched here.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Updated record
    /// * `Ok(None)` - No product with that id
    pub async fn update_catalog(&self, id: i64, product: &NewProduct) -> DbResult<Option<Product>> {
        debug!(id, "Updating product catalog fields");

        let now = Utc::now();

        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = ?2,
                code = ?3,
                category_id = ?4,
                supplier_id = ?5,
                unit_price_cents = ?6,
                minimum_stock = ?7,
                maximum_stock = ?8,
                description = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?1
            RETURNING
                id, name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(product.category_id)
        .bind(product.supplier_id)
        .bind(product.unit_price_cents)
        .bind(product.minimum_stock)
        .bind(product.maximum_stock)
        .bind(&product.description)
        .bind(product.is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Counts all products, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transactional (ledger only)
    // =========================================================================

    /// Reads a product on the connection of an open transaction.
    pub async fn fetch_in_tx(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, code, category_id, supplier_id, unit_price_cents,
                current_stock, minimum_stock, maximum_stock, description,
                is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Compare-and-swap on the balance.
    ///
    /// Returns false when the stored balance no longer equals `expected`.
    pub async fn compare_and_set_stock(
        conn: &mut SqliteConnection,
        id: i64,
        expected: i64,
        new_stock: i64,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET current_stock = ?3, updated_at = ?4
            WHERE id = ?1 AND current_stock = ?2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_stock)
        .bind(at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Summary Listing
    // =========================================================================

    /// Lists active products with category and supplier details.
    ///
    /// Ordered by name. `stock_status` is derived from the thresholds.
    pub async fn list_summary(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> DbResult<Vec<ProductSummary>> {
        let rows = sqlx::query_as::<_, ProductSummaryRow>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.code AS product_code,
                c.name AS category_name,
                s.name AS supplier_name,
                s.contact_person AS supplier_contact,
                p.unit_price_cents,
                p.current_stock,
                p.minimum_stock,
                p.maximum_stock,
                p.current_stock * p.unit_price_cents AS stock_value_cents
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.is_active = 1
              AND (?1 IS NULL OR p.category_id = ?1)
              AND (?2 IS NULL OR p.supplier_id = ?2)
              AND (?3 = 0 OR p.current_stock <= p.minimum_stock)
            ORDER BY p.name, p.id
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.low_stock_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductSummary::from).collect())
    }

    /// Total rows `list_summary` would return without paging.
    pub async fn count_summary(&self, filter: &ProductFilter) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM products p
            WHERE p.is_active = 1
              AND (?1 IS NULL OR p.category_id = ?1)
              AND (?2 IS NULL OR p.supplier_id = ?2)
              AND (?3 = 0 OR p.current_stock <= p.minimum_stock)
            "#,
        )
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.low_stock_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Raw summary row before the stock status is derived.
#[derive(Debug, sqlx::FromRow)]
struct ProductSummaryRow {
    product_id: i64,
    product_name: String,
    product_code: String,
    category_name: Option<String>,
    supplier_name: Option<String>,
    supplier_contact: Option<String>,
    unit_price_cents: i64,
    current_stock: i64,
    minimum_stock: i64,
    maximum_stock: i64,
    stock_value_cents: i64,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        ProductSummary {
            stock_status: StockStatus::classify(
                row.current_stock,
                row.minimum_stock,
                row.maximum_stock,
            ),
            product_id: row.product_id,
            product_name: row.product_name,
            product_code: row.product_code,
            category_name: row.category_name,
            supplier_name: row.supplier_name,
            supplier_contact: row.supplier_contact,
            unit_price_cents: row.unit_price_cents,
            current_stock: row.current_stock,
            minimum_stock: row.minimum_stock,
            maximum_stock: row.maximum_stock,
            stock_value_cents: row.stock_value_cents,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
