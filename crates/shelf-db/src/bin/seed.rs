//! # Seed Data Generator
//!
//! Populates a database with people and shelved copies for development.
//!
//! ## Usage
//! ```bash
//! # 200 titles, up to 3 copies each, 50 borrowers (defaults)
//! cargo run -p shelf-db --bin seed
//!
//! # Custom amounts
//! cargo run -p shelf-db --bin seed -- --titles 1000 --people 300
//!
//! # Specify database path
//! cargo run -p shelf-db --bin seed -- --db ./data/shelf.db
//! ```
//!
//! ## Generated Data
//! - One admin (`admin`) and one desk clerk with `manage_holds`
//! - Borrowers with `borrow`, every fifth one limited to 2 books / 14 days
//! - ISBN-13s in the English-language group (978-0) with valid check digits

use chrono::Utc;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use shelf_core::isbn::check_digit13;
use shelf_core::{BookCopy, Capability, CapabilitySet, Isbn, Limits, Person};
use shelf_db::{copies, persons, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut titles: u32 = 200;
    let mut people: u32 = 50;
    let mut db_path = String::from("./shelf_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--titles" | "-t" => {
                if i + 1 < args.len() {
                    titles = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--people" | "-p" => {
                if i + 1 < args.len() {
                    people = args[i + 1].parse().unwrap_or(50);
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
                println!("Shelf Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --titles <N>   Number of distinct ISBNs (default: 200)");
                println!("  -p, --people <N>   Number of borrowers (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./shelf_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, titles, people, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let mut conn = db.acquire().await?;

    let existing = persons::count(&mut conn).await?;
    if existing > 0 {
        warn!(existing, "Database already has people; skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Staff
    persons::insert(&mut conn, &person("Admin", &[Capability::Admin], Limits::default()), None).await?;
    persons::insert(
        &mut conn,
        &person("Desk Clerk", &[Capability::Borrow, Capability::ManageHolds], Limits::default()),
        None,
    )
    .await?;

    // Borrowers
    for n in 0..people {
        let limits = if n % 5 == 0 {
            Limits { books: Some(2), days: Some(14) }
        } else {
            Limits::default()
        };
        let borrower = person(&format!("Borrower {:04}", n), &[Capability::Borrow], limits);
        persons::insert(&mut conn, &borrower, None).await?;
    }

    // Copies
    let mut shelved = 0u32;
    for n in 0..titles {
        let isbn = generate_isbn(n)?;
        for _ in 0..(1 + n % 3) {
            let copy = BookCopy {
                id: copies::generate_copy_id(),
                isbn: isbn.clone(),
                created_at: Utc::now(),
            };
            copies::insert(&mut conn, &copy).await?;
            shelved += 1;
        }

        if (n + 1) % 100 == 0 {
            info!(titles = n + 1, copies = shelved, "Progress");
        }
    }

    info!(
        people = people + 2,
        titles,
        copies = shelved,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    Ok(())
}

/// Tracing setup: `RUST_LOG` wins, otherwise info with debug for shelf crates.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shelf_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn person(name: &str, caps: &[Capability], limits: Limits) -> Person {
    Person {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: None,
        permissions: caps.iter().copied().collect::<CapabilitySet>(),
        limits,
        created_at: Utc::now(),
    }
}

/// 978-0-RRR-PPPPP-C with a 3-digit registrant in 200..=699.
fn generate_isbn(n: u32) -> Result<Isbn, shelf_core::IsbnError> {
    let registrant = 200 + (n / 100_000) % 500;
    let publication = n % 100_000;
    let body = format!("9780{:03}{:05}", registrant, publication);

    let digits: Vec<u8> = body.bytes().map(|b| b - b'0').collect();
    let check = check_digit13(&digits);

    Isbn::parse(&format!("{}{}", body, check))
}
