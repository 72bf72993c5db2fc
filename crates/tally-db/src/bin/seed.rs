//! # Seed Data Generator
//!
//! Populates a development database with payment methods and stocked products.
//!
//! ## Usage
//! ```bash
//! # 25 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --products 60
//! ```
//!
//! ## Generated Data
//! - Payment methods: Cash, M-Pesa, Credit
//! - Products cycling through a small shop catalogue, each with a price
//!   between 0.50 and 50.00 and 20-119 units in stock

use chrono::Utc;
use std::env;
use tally_db::{Database, DbConfig};
use tally_core::{new_id, PaymentMethod, Product, ProductStatus};

/// (name, description)
const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("Cash", "Notes and coins in the till drawer"),
    ("M-Pesa", "Mobile money, reference number recorded"),
    ("Credit", "Customer pays later; balance tracked as a debt"),
];

/// (name, base price in cents)
const CATALOGUE: &[(&str, i64)] = &[
    ("Maize Flour 2kg", 1_850),
    ("Sugar 1kg", 1_600),
    ("Cooking Oil 1L", 3_200),
    ("Rice 1kg", 1_450),
    ("Bread 400g", 650),
    ("Fresh Milk 500ml", 600),
    ("Tea Leaves 250g", 1_100),
    ("Salt 1kg", 350),
    ("Bar Soap", 1_250),
    ("Toothpaste 100ml", 1_500),
    ("Matches (10 pack)", 150),
    ("Eggs (tray)", 4_200),
    ("Washing Powder 500g", 2_100),
    ("Soda 500ml", 700),
    ("Drinking Water 1L", 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 25;
    let mut db_path = String::from("./tally.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N> Number of products to generate (default: 25)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.payment_methods().list_all().await?;
    if existing.is_empty() {
        for (name, description) in PAYMENT_METHODS {
            db.payment_methods()
                .insert(&PaymentMethod {
                    id: new_id(),
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    is_active: true,
                })
                .await?;
        }
        println!("✓ Created {} payment methods", PAYMENT_METHODS.len());
    } else {
        println!("⚠ {} payment methods already present, skipping", existing.len());
    }

    let products = db.products().count().await?;
    if products > 0 {
        println!("⚠ Database already has {} products", products);
        println!("  Skipping product seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0;
    for seed in 0..count {
        let product = generate_product(seed);
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        generated += 1;
    }

    println!("✓ Generated {} products", generated);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds the `seed`-th product, cycling through the catalogue.
fn generate_product(seed: usize) -> Product {
    let now = Utc::now();
    let (base_name, base_price) = CATALOGUE[seed % CATALOGUE.len()];
    let batch = seed / CATALOGUE.len();

    let name = if batch == 0 {
        base_name.to_string()
    } else {
        format!("{} #{}", base_name, batch + 1)
    };

    // Later batches get a slightly different price so the list is not uniform
    let selling_price_cents = (base_price + (batch as i64) * 50).clamp(50, 5_000);
    let buying_price_cents = selling_price_cents * (70 + (seed % 15) as i64) / 100;

    Product {
        id: new_id(),
        name,
        selling_price_cents,
        buying_price_cents: Some(buying_price_cents),
        current_stock: 20 + (seed * 37 % 100) as i64,
        reorder_level: 10,
        status: ProductStatus::Active,
        created_at: now,
        updated_at: now,
    }
}
