//! Pre-built Test Fixtures
//!
//! The reference data used across the suites: employee E1 with a base rate
//! of 80 and rate records of 100 from 2024-01-01 and 150 from 2024-06-01,
//! clients C1 and C2, and three accounts with different capabilities.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{CapabilitySet, ClientId, EmployeeId, PeriodBounds, Role, Session};
use domain_ledger::{
    Client, ClientPort, Employee, EmployeePort, InMemoryLedgerStore, LedgerConfig, LedgerPorts,
    LedgerService, RateHistoryRecord, UserAccount, UserPort,
};

/// Calendar dates used by the fixtures
pub struct DateFixtures;

impl DateFixtures {
    pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
    }

    /// First rate record for E1
    pub fn rate_start() -> NaiveDate {
        Self::ymd(2024, 1, 1)
    }

    /// Second rate record for E1
    pub fn rate_change() -> NaiveDate {
        Self::ymd(2024, 6, 1)
    }

    pub fn february_2024() -> PeriodBounds {
        PeriodBounds::new(Some(Self::ymd(2024, 2, 1)), Some(Self::ymd(2024, 2, 29)))
    }
}

pub struct LedgerFixtures;

impl LedgerFixtures {
    pub fn e1_id() -> EmployeeId {
        EmployeeId::parse("E1").expect("fixture id")
    }

    pub fn c1_id() -> ClientId {
        ClientId::parse("C1").expect("fixture id")
    }

    pub fn c2_id() -> ClientId {
        ClientId::parse("C2").expect("fixture id")
    }

    /// E1 with a base rate of 80
    pub fn e1() -> Employee {
        Employee::new(Self::e1_id(), "Ann Smith", dec!(80))
    }

    /// E1's rate history: 100 from 2024-01-01, 150 from 2024-06-01
    pub fn e1_history() -> Vec<RateHistoryRecord> {
        vec![
            RateHistoryRecord::new(Self::e1_id(), dec!(100), DateFixtures::rate_start()),
            RateHistoryRecord::new(Self::e1_id(), dec!(150), DateFixtures::rate_change()),
        ]
    }

    pub fn c1() -> Client {
        Client::new(Self::c1_id(), "Acme Holdings")
    }

    pub fn c2() -> Client {
        Client::new(Self::c2_id(), "Beta Trading").with_notes("Transfers only")
    }

    /// Administrator with every capability
    pub fn admin_account() -> UserAccount {
        UserAccount::new("admin", Role::Admin, CapabilitySet::all())
    }

    /// Normal user who may create, edit and delete, but not manage users
    pub fn editor_account() -> UserAccount {
        UserAccount::new("editor", Role::Normal, CapabilitySet::all())
    }

    /// Normal user who may only view
    pub fn clerk_account() -> UserAccount {
        UserAccount::new("clerk", Role::Normal, CapabilitySet::read_only())
    }

    pub fn admin_session() -> Session {
        Self::admin_account().session()
    }

    pub fn clerk_session() -> Session {
        Self::clerk_account().session()
    }
}

/// An in-memory store holding E1 with its history, C1, C2 and the three accounts
pub async fn seeded_store() -> Arc<InMemoryLedgerStore> {
    let store = Arc::new(InMemoryLedgerStore::new());

    store.insert_employee(&LedgerFixtures::e1()).await.expect("seed employee");
    for record in LedgerFixtures::e1_history() {
        store.append_rate(&record).await.expect("seed rate history");
    }
    for client in [LedgerFixtures::c1(), LedgerFixtures::c2()] {
        store.insert_client(&client).await.expect("seed client");
    }
    for account in [
        LedgerFixtures::admin_account(),
        LedgerFixtures::editor_account(),
        LedgerFixtures::clerk_account(),
    ] {
        store.insert_user(&account).await.expect("seed account");
    }

    store
}

/// A service over [`seeded_store`], with the store kept for inspection
pub async fn seeded_service() -> (Arc<InMemoryLedgerStore>, LedgerService) {
    let store = seeded_store().await;
    let service = LedgerService::new(LedgerPorts::from_store(store.clone()), LedgerConfig::default());
    (store, service)
}
