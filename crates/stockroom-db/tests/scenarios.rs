//! End-to-end inventory scenarios through the public API.

use std::path::PathBuf;
use std::time::Duration;

use stockroom_core::{
    CoreError, ErrorCode, Money, NewCategory, NewMovement, NewProduct, NewSupplier, PageRequest,
    ProductFilter, StockStatus,
};
use stockroom_db::{Database, DbConfig, InventoryError, StockroomConfig};

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Unique throwaway database file per test.
fn temp_db_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "stockroom-{}-{}-{}.db",
        name,
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    path
}

#[tokio::test]
async fn receive_and_issue_against_thresholds() {
    let db = memory_db().await;
    let widget = db
        .catalog()
        .create_product(
            &NewProduct::new("Widget", "SKU-1", Money::from_cents(250))
                .with_stock_levels(5, 10, 100),
        )
        .await
        .unwrap();
    assert_eq!(widget.stock_status(), StockStatus::LowStock);

    db.ledger()
        .apply_movement(&NewMovement::receipt(widget.id, 20))
        .await
        .unwrap();
    let widget = db.catalog().get_product(widget.id).await.unwrap();
    assert_eq!(widget.current_stock, 25);
    assert_eq!(widget.stock_status(), StockStatus::Normal);

    let err = db
        .ledger()
        .apply_movement(&NewMovement::issue(widget.id, 30))
        .await
        .unwrap_err();
    assert!(err.is_business());
    assert_eq!(
        err.to_string(),
        "Insufficient stock for Widget. Available: 25, Requested: 30"
    );

    let widget = db.catalog().get_product(widget.id).await.unwrap();
    assert_eq!(widget.current_stock, 25);
    assert_eq!(widget.stock_value(), Money::from_cents(25 * 250));
}

#[tokio::test]
async fn second_product_with_same_code_is_rejected() {
    let db = memory_db().await;
    let catalog = db.catalog();

    catalog
        .create_product(&NewProduct::new("First", "SKU-1", Money::from_cents(100)))
        .await
        .unwrap();

    let err = catalog
        .create_product(&NewProduct::new("Second", "SKU-1", Money::from_cents(100)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateProductCode);
    assert!(matches!(
        err.as_core(),
        Some(CoreError::DuplicateCode { code }) if code == "SKU-1"
    ));

    assert_eq!(db.products().count().await.unwrap(), 1);
}

#[tokio::test]
async fn reports_reflect_catalog_and_ledger() {
    let db = memory_db().await;
    let catalog = db.catalog();

    let supplier = catalog
        .create_supplier(&NewSupplier {
            name: "Acme".into(),
            contact_person: Some("Wile".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let category = catalog
        .create_category(&NewCategory::new("Hardware"))
        .await
        .unwrap();

    let low = catalog
        .create_product(
            &NewProduct::new("Bolt", "B-1", Money::from_cents(40))
                .with_stock_levels(5, 10, 100)
                .in_category(category.id)
                .from_supplier(supplier.id),
        )
        .await
        .unwrap();
    catalog
        .create_product(
            &NewProduct::new("Nut", "N-1", Money::from_cents(10)).with_stock_levels(50, 10, 30),
        )
        .await
        .unwrap();

    let aggregator = db.aggregator();

    let summary = aggregator.stock_summary().await.unwrap();
    assert_eq!(summary.low_stock_products, 1);
    assert_eq!(summary.overstock_products, 1);
    assert_eq!(summary.category_count, 1);
    assert_eq!(summary.supplier_count, 1);
    assert_eq!(summary.total_stock_value(), Money::from_cents(5 * 40 + 50 * 10));

    let alerts = aggregator.low_stock_alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].shortage, 5);
    assert_eq!(alerts[0].supplier_name.as_deref(), Some("Acme"));
    assert_eq!(alerts[0].required_investment(), Money::from_cents(200));

    let by_supplier = aggregator
        .product_summary(&ProductFilter::supplier(supplier.id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_supplier.total, 1);
    assert_eq!(by_supplier.items[0].supplier_contact.as_deref(), Some("Wile"));

    // Receiving above the threshold clears the alert
    db.ledger()
        .apply_movement(&NewMovement::receipt(low.id, 10))
        .await
        .unwrap();
    assert!(aggregator.low_stock_alerts().await.unwrap().is_empty());
    assert_eq!(aggregator.stock_summary().await.unwrap().low_stock_products, 0);
}

#[tokio::test]
async fn file_database_survives_reopen() {
    let path = temp_db_path("reopen");

    let product_id = {
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let product = db
            .catalog()
            .create_product(
                &NewProduct::new("Widget", "SKU-1", Money::from_cents(250))
                    .with_stock_levels(5, 1, 100),
            )
            .await
            .unwrap();
        db.ledger()
            .apply_movement(&NewMovement::receipt(product.id, 7))
            .await
            .unwrap();
        db.close().await;
        product.id
    };

    let db = Database::new(DbConfig::new(&path)).await.unwrap();
    assert!(db.health_check().await);
    assert_eq!(db.catalog().get_product(product_id).await.unwrap().current_stock, 12);

    let history = db
        .aggregator()
        .movement_history(Some(product_id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total, 1);

    db.close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issues_on_shared_file_never_oversell() {
    let path = temp_db_path("contention");
    let config = DbConfig::new(&path)
        .max_connections(5)
        .max_write_retries(20)
        .operation_timeout(Duration::from_secs(30));
    let db = Database::new(config).await.unwrap();

    let product = db
        .catalog()
        .create_product(
            &NewProduct::new("Widget", "SKU-1", Money::from_cents(250))
                .with_stock_levels(20, 5, 100),
        )
        .await
        .unwrap();

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let ledger = db.ledger();
            let id = product.id;
            tokio::spawn(async move { ledger.apply_movement(&NewMovement::issue(id, 1)).await })
        })
        .collect();

    let mut applied = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(InventoryError::Core(CoreError::InsufficientStock { .. })) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(applied, 20);
    assert_eq!(insufficient, 20);
    assert_eq!(db.catalog().get_product(product.id).await.unwrap().current_stock, 0);
    assert_eq!(db.movements().count(Some(product.id)).await.unwrap(), 20);
    assert_eq!(db.movements().net_change_for_product(product.id).await.unwrap(), -20);

    db.close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn config_file_drives_database_settings() {
    let path = temp_db_path("config");
    let toml = format!(
        r#"
        [database]
        path = "{}"
        max_connections = 2

        [ledger]
        max_write_retries = 3
        "#,
        path.display()
    );

    let config = StockroomConfig::from_toml(&toml).unwrap();
    config.validate().unwrap();

    let db_config = config.db_config();
    assert_eq!(db_config.max_write_retries, 3);

    let db = Database::new(db_config).await.unwrap();
    assert_eq!(db.policy().max_write_retries, 3);
    db.close().await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn storage_errors_are_not_business_errors() {
    let db = memory_db().await;
    db.close().await;

    let err = db.catalog().get_product(1).await.unwrap_err();
    assert!(matches!(err, InventoryError::Db(_)));
    assert!(!err.is_business());
    assert_eq!(err.http_status(), 500);
}
