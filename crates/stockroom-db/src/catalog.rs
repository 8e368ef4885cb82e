//! # Catalog
//!
//! Validated writes for suppliers, categories and products, including the
//! product-code uniqueness guard.
//!
//! ## Product Create Flow
//! ```text
//! NewProduct
//!     │
//!     ▼
//! validate_product ──── fails ──► CoreError::Validation
//!     │
//!     ▼
//! category / supplier exist? ──── no ──► CoreError::NotFound
//!     │
//!     ▼
//! ensure_code_available ──── taken ──► CoreError::DuplicateCode
//!     │
//!     ▼
//! INSERT ──── UNIQUE(code) fires (lost race) ──► CoreError::DuplicateCode
//!     │
//!     ▼
//! Product
//! ```
//!
//! The pre-check gives a clean error on the common path; the `UNIQUE`
//! constraint on `products.code` is what actually guarantees uniqueness.

use tracing::{info, warn};

use crate::error::{DbError, InventoryError, InventoryResult};
use crate::pool::Database;
use stockroom_core::validation;
use stockroom_core::{
    Category, CoreError, EntityKind, NewCategory, NewProduct, NewSupplier, Page, PageRequest,
    Product, ProductUpdate, Supplier,
};

/// Validated catalog operations.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn create_supplier(&self, supplier: &NewSupplier) -> InventoryResult<Supplier> {
        validation::validate_supplier(supplier)?;

        let created = self
            .db
            .policy()
            .timed("create_supplier", async {
                Ok::<_, InventoryError>(self.db.suppliers().insert(supplier).await?)
            })
            .await?;

        info!(supplier_id = created.id, name = %created.name, "Supplier created");
        Ok(created)
    }

    pub async fn get_supplier(&self, id: i64) -> InventoryResult<Supplier> {
        let found = self
            .db
            .policy()
            .timed("get_supplier", async {
                Ok::<_, InventoryError>(self.db.suppliers().get_by_id(id).await?)
            })
            .await?;

        found.ok_or_else(|| CoreError::not_found(EntityKind::Supplier, id).into())
    }

    /// Lists suppliers ordered by name.
    pub async fn list_suppliers(&self, page: PageRequest) -> InventoryResult<Page<Supplier>> {
        validation::validate_page(&page)?;

        self.db
            .policy()
            .timed("list_suppliers", async {
                let repo = self.db.suppliers();
                let items = repo.list(page).await?;
                let total = repo.count().await?;
                Ok::<_, InventoryError>(Page::new(items, total, page))
            })
            .await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, category: &NewCategory) -> InventoryResult<Category> {
        validation::validate_category(category)?;

        let created = self
            .db
            .policy()
            .timed("create_category", async {
                Ok::<_, InventoryError>(self.db.categories().insert(category).await?)
            })
            .await?;

        info!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn get_category(&self, id: i64) -> InventoryResult<Category> {
        let found = self
            .db
            .policy()
            .timed("get_category", async {
                Ok::<_, InventoryError>(self.db.categories().get_by_id(id).await?)
            })
            .await?;

        found.ok_or_else(|| CoreError::not_found(EntityKind::Category, id).into())
    }

    pub async fn list_categories(&self) -> InventoryResult<Vec<Category>> {
        self.db
            .policy()
            .timed("list_categories", async {
                Ok::<_, InventoryError>(self.db.categories().list_all().await?)
            })
            .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product after validation and the uniqueness guard.
    pub async fn create_product(&self, product: &NewProduct) -> InventoryResult<Product> {
        let product = normalized(product);
        validation::validate_product(&product)?;

        let created = self
            .db
            .policy()
            .timed("create_product", async {
                self.ensure_references(&product).await?;
                self.ensure_code_available(&product.code, None).await?;

                self.db
                    .products()
                    .insert(&product)
                    .await
                    .map_err(|e| duplicate_code_or(e, &product.code))
            })
            .await?;

        info!(
            product_id = created.id,
            code = %created.code,
            opening_stock = created.current_stock,
            "Product created"
        );
        Ok(created)
    }

    /// Applies a partial update to catalog fields.
    ///
    /// The merged result is validated with the same rules as creation. The
    /// balance is never changed here.
    pub async fn update_product(&self, id: i64, update: &ProductUpdate) -> InventoryResult<Product> {
        self.db
            .policy()
            .timed("update_product", async {
                let current = self
                    .db
                    .products()
                    .get_by_id(id)
                    .await?
                    .ok_or(CoreError::not_found(EntityKind::Product, id))?;

                let merged = normalized(&update.merge(&current));
                validation::validate_product(&merged)?;
                self.ensure_references(&merged).await?;
                self.ensure_code_available(&merged.code, Some(id)).await?;

                let updated = self
                    .db
                    .products()
                    .update_catalog(id, &merged)
                    .await
                    .map_err(|e| duplicate_code_or(e, &merged.code))?
                    .ok_or(CoreError::not_found(EntityKind::Product, id))?;

                info!(product_id = id, "Product updated");
                Ok::<_, InventoryError>(updated)
            })
            .await
    }

    pub async fn get_product(&self, id: i64) -> InventoryResult<Product> {
        let found = self
            .db
            .policy()
            .timed("get_product", async {
                Ok::<_, InventoryError>(self.db.products().get_by_id(id).await?)
            })
            .await?;

        found.ok_or_else(|| CoreError::not_found(EntityKind::Product, id).into())
    }

    pub async fn find_product_by_code(&self, code: &str) -> InventoryResult<Option<Product>> {
        self.db
            .policy()
            .timed("find_product_by_code", async {
                Ok::<_, InventoryError>(self.db.products().get_by_code(code.trim()).await?)
            })
            .await
    }

    /// Uniqueness guard: fails with `DuplicateCode` if any other product
    /// (ignoring `exclude_id`) already uses `code`.
    pub async fn ensure_code_available(
        &self,
        code: &str,
        exclude_id: Option<i64>,
    ) -> InventoryResult<()> {
        if self.db.products().code_exists(code, exclude_id).await? {
            warn!(code, "Rejected duplicate product code");
            return Err(CoreError::DuplicateCode {
                code: code.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_references(&self, product: &NewProduct) -> InventoryResult<()> {
        if let Some(category_id) = product.category_id {
            if !self.db.categories().exists(category_id).await? {
                return Err(CoreError::not_found(EntityKind::Category, category_id).into());
            }
        }
        if let Some(supplier_id) = product.supplier_id {
            if !self.db.suppliers().exists(supplier_id).await? {
                return Err(CoreError::not_found(EntityKind::Supplier, supplier_id).into());
            }
        }
        Ok(())
    }
}

/// Trims the identifying text fields so " SKU-1" and "SKU-1" collide.
fn normalized(product: &NewProduct) -> NewProduct {
    NewProduct {
        name: product.name.trim().to_string(),
        code: product.code.trim().to_string(),
        ..product.clone()
    }
}

/// Maps a UNIQUE violation raised by the store to `DuplicateCode`.
fn duplicate_code_or(err: DbError, code: &str) -> InventoryError {
    if err.is_unique_violation() {
        warn!(code, "Product code collided at the storage constraint");
        CoreError::DuplicateCode {
            code: code.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use stockroom_core::{ErrorCode, Money, ValidationError};

    async fn catalog() -> Catalog {
        Database::new(DbConfig::in_memory()).await.unwrap().catalog()
    }

    fn widget(code: &str) -> NewProduct {
        NewProduct::new("Widget", code, Money::from_cents(250)).with_stock_levels(5, 10, 100)
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let catalog = catalog().await;
        catalog.create_product(&widget("SKU-1")).await.unwrap();

        let err = catalog.create_product(&widget("SKU-1")).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Core(CoreError::DuplicateCode { ref code }) if code == "SKU-1"
        ));
        assert_eq!(err.http_status(), 409);

        // Whitespace does not sneak past the guard
        let err = catalog.create_product(&widget("  SKU-1 ")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateProductCode);
    }

    #[tokio::test]
    async fn test_storage_constraint_maps_to_duplicate() {
        let err = duplicate_code_or(DbError::duplicate("products.code", "SKU-1"), "SKU-1");
        assert_eq!(err.code(), ErrorCode::DuplicateProductCode);

        let err = duplicate_code_or(DbError::PoolExhausted, "SKU-1");
        assert_eq!(err.code(), ErrorCode::StorageFailure);
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected_before_storage() {
        let catalog = catalog().await;
        let err = catalog
            .create_product(&widget("SKU-1").with_stock_levels(5, 10, 10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::Core(CoreError::Validation(ValidationError::MustExceed { .. }))
        ));
        assert!(catalog.find_product_by_code("SKU-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let catalog = catalog().await;
        let err = catalog
            .create_product(&widget("SKU-1").in_category(77))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Core(CoreError::NotFound {
                entity: EntityKind::Category,
                id: 77
            })
        ));
    }

    #[tokio::test]
    async fn test_update_product_guards_code_and_keeps_stock() {
        let catalog = catalog().await;
        let first = catalog.create_product(&widget("SKU-1")).await.unwrap();
        let second = catalog.create_product(&widget("SKU-2")).await.unwrap();

        // Re-saving its own code is fine
        let same = ProductUpdate {
            code: Some("SKU-1".into()),
            unit_price_cents: Some(400),
            ..Default::default()
        };
        let updated = catalog.update_product(first.id, &same).await.unwrap();
        assert_eq!(updated.unit_price_cents, 400);
        assert_eq!(updated.current_stock, 5);

        // Taking another product's code is not
        let steal = ProductUpdate {
            code: Some("SKU-1".into()),
            ..Default::default()
        };
        let err = catalog.update_product(second.id, &steal).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateProductCode);

        let err = catalog.update_product(999, &same).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_supplier_and_category_lifecycle() {
        let catalog = catalog().await;
        let supplier = catalog.create_supplier(&NewSupplier::new("Acme")).await.unwrap();
        let category = catalog.create_category(&NewCategory::new("Tools")).await.unwrap();

        assert_eq!(catalog.get_supplier(supplier.id).await.unwrap().name, "Acme");
        assert_eq!(catalog.get_category(category.id).await.unwrap().name, "Tools");
        assert_eq!(catalog.list_categories().await.unwrap().len(), 1);

        let page = catalog.list_suppliers(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let err = catalog.get_supplier(99).await.unwrap_err();
        assert_eq!(err.to_string(), "Supplier with ID 99 not found");

        let err = catalog
            .create_supplier(&NewSupplier {
                name: "Bad".into(),
                email: Some("nobody".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
