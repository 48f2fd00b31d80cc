//! # Repository Module
//!
//! SQL for every table, grouped per record type.
//!
//! ## Connection-Scoped Functions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Services Call Repositories                       │
//! │                                                                         │
//! │  CirculationLedger::open_checkout                                      │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       ▼                                                                 │
//! │  checkouts::find_open_by_copy(&mut tx, ..)   ┐                         │
//! │  persons::get(&mut tx, ..)                   │ one transaction,        │
//! │  checkouts::insert_if_copy_free(&mut tx, ..) │ one snapshot            │
//! │  holds::resolve(&mut tx, ..)                 ┘                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()  ── BUSY/LOCKED here becomes DbError::Conflict            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes `&mut SqliteConnection`, so the same call works on a
//! pooled connection or inside a transaction. Mutations that must not race
//! are written as conditional statements (`INSERT .. WHERE NOT EXISTS`,
//! `UPDATE .. WHERE completed = 0`) and report whether they took effect.
//!
//! ## Available Repositories
//!
//! - [`copies`] - Physical copies per ISBN
//! - [`checkouts`] - Loans, open and closed
//! - [`holds`] - Reservation queue
//! - [`fines`] - Assessed penalties
//! - [`persons`] - People, capabilities, limits, password hashes

pub mod checkouts;
pub mod copies;
pub mod fines;
pub mod holds;
pub mod persons;
