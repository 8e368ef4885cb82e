//! # Supplier Repository
//!
//! Database operations for suppliers. Suppliers are only ever referenced
//! weakly by products, so there is no delete here.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{NewSupplier, PageRequest, Supplier};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts a supplier and returns the stored record.
    ///
    /// The caller validates first; see `Catalog::create_supplier`.
    pub async fn insert(&self, supplier: &NewSupplier) -> DbResult<Supplier> {
        debug!(name = %supplier.name, "Inserting supplier");

        let now = Utc::now();

        let created = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (
                name, contact_person, email, phone, address, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING id, name, contact_person, email, phone, address, created_at, updated_at
            "#,
        )
        .bind(supplier.name.trim())
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Gets a supplier by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_person, email, phone, address, created_at, updated_at
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Lists suppliers ordered by name.
    pub async fn list(&self, page: PageRequest) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_person, email, phone, address, created_at, updated_at
            FROM suppliers
            ORDER BY name, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_list_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suppliers();

        let zed = repo.insert(&NewSupplier::new("Zed Supply")).await.unwrap();
        let mut acme = NewSupplier::new("Acme");
        acme.email = Some("sales@acme.test".into());
        let acme = repo.insert(&acme).await.unwrap();

        assert!(acme.id > 0);
        assert_eq!(repo.get_by_id(zed.id).await.unwrap().unwrap().name, "Zed Supply");
        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.exists(acme.id).await.unwrap());

        let listed = repo.list(PageRequest::default()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Zed Supply"]);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
