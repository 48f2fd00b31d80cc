//! Shared fixtures for service tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use shelf_core::{BookCopy, Capability, Isbn, Limits, ManualClock, Person};
use shelf_db::{copies, persons, Database, DbConfig};

use crate::accounts::Accounts;
use crate::holds::HoldQueue;
use crate::ledger::CirculationLedger;

pub(crate) const ISBN_A: &str = "9780553213508";
pub(crate) const ISBN_B: &str = "0306406152";

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub(crate) struct Fixture {
    pub db: Database,
    pub clock: ManualClock,
}

impl Fixture {
    /// In-memory store with the clock frozen at [`t0`].
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::with_db(db, ManualClock::new(t0()))
    }

    pub fn with_db(db: Database, clock: ManualClock) -> Self {
        Fixture { db, clock }
    }

    pub async fn person(&self, id: &str, caps: &[Capability], limits: Limits) -> Person {
        let person = Person {
            id: id.to_string(),
            name: format!("Person {}", id),
            email: None,
            permissions: caps.iter().copied().collect(),
            limits,
            created_at: t0(),
        };
        let mut conn = self.db.acquire().await.unwrap();
        persons::insert(&mut conn, &person, None).await.unwrap();
        person
    }

    pub async fn copy(&self, id: &str, isbn: &str) -> BookCopy {
        let copy = BookCopy {
            id: id.to_string(),
            isbn: Isbn::parse(isbn).unwrap(),
            created_at: t0(),
        };
        let mut conn = self.db.acquire().await.unwrap();
        copies::insert(&mut conn, &copy).await.unwrap();
        copy
    }

    pub fn ledger(&self) -> CirculationLedger {
        CirculationLedger::new(self.db.clone(), Arc::new(self.clock.clone()))
    }

    pub fn holds(&self) -> HoldQueue {
        HoldQueue::new(self.db.clone(), Arc::new(self.clock.clone()))
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.db.clone(), Arc::new(self.clock.clone()))
    }
}
