//! # Seed Data Generator
//!
//! Populates the database with suppliers, categories, products and a
//! movement history for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p stockroom-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p stockroom-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! Every stock change goes through the ledger, so the seeded balances always
//! equal opening stock plus the recorded movements.

use std::env;
use std::path::PathBuf;

use stockroom_core::{Money, NewCategory, NewMovement, NewProduct, NewSupplier};
use stockroom_db::{Database, StockroomConfig};

/// Categories and the product names generated under them.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "ELE",
        "Electronics",
        &[
            "USB Cable",
            "Wireless Mouse",
            "Keyboard",
            "Monitor Stand",
            "Webcam",
            "Headset",
            "Power Bank",
            "Charger",
        ],
    ),
    (
        "OFF",
        "Office Supplies",
        &[
            "Printer Paper",
            "Stapler",
            "Ballpoint Pens",
            "Sticky Notes",
            "Binder",
            "Envelopes",
            "Desk Organizer",
            "Whiteboard Marker",
        ],
    ),
    (
        "TLS",
        "Tools",
        &[
            "Screwdriver Set",
            "Hammer",
            "Tape Measure",
            "Utility Knife",
            "Wrench",
            "Pliers",
            "Level",
            "Drill Bits",
        ],
    ),
    (
        "CLN",
        "Cleaning",
        &[
            "Glass Cleaner",
            "Paper Towels",
            "Trash Bags",
            "Disinfectant Wipes",
            "Mop Head",
            "Hand Soap",
            "Sponges",
            "Bleach",
        ],
    ),
];

/// Suppliers as (name, contact, email).
const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("Northwind Traders", "Ana Trujillo", "orders@northwind.example"),
    ("Contoso Wholesale", "Sam Patel", "sales@contoso.example"),
    ("Fabrikam Supply", "Lee Wong", "supply@fabrikam.example"),
];

/// Size variants as (label, price addon in cents).
const SIZES: &[(&str, i64)] = &[
    ("Basic", 0),
    ("Standard", 250),
    ("Pro", 900),
    ("Bulk", 1500),
    ("Mini", -50),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: from config)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = StockroomConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    config.logging.init_tracing();

    println!("Stockroom Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database.path.display());
    println!("Products: {}", count);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();
    let ledger = db.ledger();

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, contact, email) in SUPPLIERS {
        let supplier = catalog
            .create_supplier(&NewSupplier {
                name: name.to_string(),
                contact_person: Some(contact.to_string()),
                email: Some(email.to_string()),
                ..Default::default()
            })
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ Created {} suppliers", supplier_ids.len());

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut movements = 0;

    'outer: for (category_idx, (prefix, category_name, names)) in CATEGORIES.iter().enumerate() {
        let category = catalog.create_category(&NewCategory::new(*category_name)).await?;

        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                let product = generate_product(prefix, name, size, *price_addon, seed)
                    .in_category(category.id)
                    .from_supplier(supplier_ids[seed % supplier_ids.len()]);

                let created = match catalog.create_product(&product).await {
                    Ok(created) => created,
                    Err(e) => {
                        eprintln!("Failed to insert {}: {}", product.code, e);
                        continue;
                    }
                };
                generated += 1;

                for movement in generate_history(created.id, created.unit_price_cents, seed) {
                    match ledger.apply_movement(&movement).await {
                        Ok(_) => movements += 1,
                        // Issues larger than the balance are expected to bounce
                        Err(e) if e.is_business() => {}
                        Err(e) => return Err(e.into()),
                    }
                }

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} movements in {:?}",
        generated, movements, elapsed
    );

    let summary = db.aggregator().stock_summary().await?;
    println!();
    println!("Inventory summary:");
    println!("  Active products:  {}", summary.active_products);
    println!("  Low stock:        {}", summary.low_stock_products);
    println!("  Overstock:        {}", summary.overstock_products);
    println!("  Stock value:      {}", summary.total_stock_value());

    let alerts = db.aggregator().low_stock_alerts().await?;
    println!("  Low stock alerts: {}", alerts.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a product with deterministic pseudo-random levels.
fn generate_product(prefix: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    let code = format!("{}-{:04}", prefix, seed);

    // $1.99 - $9.99 plus the size addon
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let price = Money::from_cents((base_price + price_addon).max(99));

    let minimum = 5 + (seed % 4) as i64 * 5;
    let maximum = minimum * 10;
    let opening = (seed % 40) as i64;

    NewProduct::new(format!("{} {}", name, size), code, price).with_stock_levels(
        opening,
        minimum,
        maximum,
    )
}

/// A receipt, an issue and occasionally a count correction.
fn generate_history(product_id: i64, unit_price_cents: i64, seed: usize) -> Vec<NewMovement> {
    let price = Money::from_cents(unit_price_cents);
    let mut history = vec![
        NewMovement::receipt(product_id, 10 + (seed % 30) as i64)
            .with_unit_price(price)
            .with_reference(format!("PO-{:05}", seed))
            .created_by("seed"),
        NewMovement::issue(product_id, 1 + (seed % 25) as i64)
            .with_unit_price(price)
            .with_reference(format!("SO-{:05}", seed))
            .created_by("seed"),
    ];

    if seed % 7 == 0 {
        history.push(
            NewMovement::adjustment(product_id, 2)
                .with_notes("Cycle count correction")
                .created_by("seed"),
        );
    }

    history
}
