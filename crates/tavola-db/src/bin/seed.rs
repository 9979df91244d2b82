//! # Seed Data Generator
//!
//! Populates a development database with a menu and a few dining tables.
//!
//! ## Usage
//! ```bash
//! # Menu + 10 tables (default)
//! cargo run -p tavola-db --bin seed
//!
//! # More tables, custom database and QR base URL
//! cargo run -p tavola-db --bin seed -- --tables 25 --db ./data/tavola.db --qr-base https://order.example.com
//! ```

use chrono::Utc;
use std::env;
use tavola_core::{Money, Table, TableStatus};
use tavola_db::repository::{menu, table};
use tavola_db::{Database, DbConfig};
use uuid::Uuid;

/// (category, dish, price) as printed on the menu.
const MENU: &[(&str, &str, &str)] = &[
    ("starters", "Bruschetta", "6.50"),
    ("starters", "Arancini", "7.00"),
    ("starters", "Minestrone", "4.00"),
    ("mains", "Risotto ai Funghi", "9.50"),
    ("mains", "Spaghetti Carbonara", "11.00"),
    ("mains", "Margherita Pizza", "8.50"),
    ("mains", "Saltimbocca", "15.75"),
    ("desserts", "Tiramisu", "5.50"),
    ("desserts", "Panna Cotta", "5.00"),
    ("drinks", "Espresso", "1.80"),
    ("drinks", "Sparkling Water", "2.20"),
    ("drinks", "House Red (glass)", "4.50"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut tables: usize = 10;
    let mut db_path = String::from("./tavola_dev.db");
    let mut qr_base = String::from("http://localhost:8080");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tables" | "-t" => {
                if i + 1 < args.len() {
                    tables = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--qr-base" | "-q" => {
                if i + 1 < args.len() {
                    qr_base = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tavola POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tables <N>     Number of dining tables (default: 10)");
                println!("  -d, --db <PATH>      Database file path (default: ./tavola_dev.db)");
                println!("  -q, --qr-base <URL>  Base URL encoded in table QR codes");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tavola POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Tables:   {}", tables);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.menu().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} menu items", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    for (category, name, price) in MENU {
        let price: Money = price.parse()?;
        let item = menu::new_item(name, price.cents(), Some(*category));
        db.menu().insert(&item).await?;
        println!("  + {:<22} {:>6}  ({})", name, price, category);
    }
    println!("✓ Inserted {} menu items", MENU.len());

    let mut tx = db.begin().await?;
    for _ in 0..tables {
        let number = table::next_number(&mut tx).await?;
        let now = Utc::now();
        let row = Table {
            id: Uuid::new_v4().to_string(),
            number,
            name: Table::display_name(number),
            qr_text: Table::qr_text_for(&qr_base, number),
            qr_image_url: None,
            status: TableStatus::Available,
            created_at: now,
            updated_at: now,
        };
        table::insert(&mut tx, &row).await?;
    }
    tx.commit().await?;
    println!("✓ Created {} tables", tables);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
