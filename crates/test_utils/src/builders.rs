//! Test Data Builders
//!
//! Builders for ledger entries, entry drafts and import rows. Defaults
//! describe a one-hour Normal entry by E1 for C1 on 2024-03-01 at 100.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, EmployeeId};
use domain_ledger::{EntryDraft, EntryKind, EntryType, RowDraft, TimesheetEntry, CLOSE_OFF_MARKER};

use crate::fixtures::{DateFixtures, LedgerFixtures};

/// Builds a valued [`TimesheetEntry`]
pub struct TestEntryBuilder {
    date: NaiveDate,
    client_id: ClientId,
    description: String,
    time_spent: String,
    charge_out: Decimal,
    kind: EntryKind,
    imported_date: Option<NaiveDate>,
}

impl Default for TestEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEntryBuilder {
    pub fn new() -> Self {
        Self {
            date: DateFixtures::ymd(2024, 3, 1),
            client_id: LedgerFixtures::c1_id(),
            description: "Consultation".to_string(),
            time_spent: "1".to_string(),
            charge_out: dec!(100),
            kind: EntryKind::Normal {
                employee_id: Some(LedgerFixtures::e1_id()),
            },
            imported_date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn for_client(mut self, client_id: &str) -> Self {
        self.client_id = ClientId::parse(client_id).expect("builder client id");
        self
    }

    pub fn by_employee(mut self, employee_id: &str) -> Self {
        self.kind = EntryKind::Normal {
            employee_id: Some(EmployeeId::parse(employee_id).expect("builder employee id")),
        };
        self
    }

    pub fn charge(mut self, charge_out: Decimal) -> Self {
        self.charge_out = charge_out;
        self
    }

    pub fn time(mut self, time_spent: impl Into<String>) -> Self {
        self.time_spent = time_spent.into();
        self
    }

    /// Close-off carrying the default marker; the charge is stored as given
    pub fn close_off(mut self) -> Self {
        self.kind = EntryKind::CloseOff {
            reference: CLOSE_OFF_MARKER.to_string(),
        };
        self.time_spent = String::new();
        self
    }

    /// Transfer into the built client from `from`
    pub fn transfer_from(mut self, from: &str) -> Self {
        self.kind = EntryKind::Transfer {
            counterparty: from.to_string(),
            from_client: Some(ClientId::parse(from).expect("builder client id")),
            to_client: None,
        };
        self.time_spent = String::new();
        self
    }

    pub fn imported_on(mut self, date: NaiveDate) -> Self {
        self.imported_date = Some(date);
        self
    }

    pub fn build(self) -> TimesheetEntry {
        TimesheetEntry {
            date: self.date,
            client_id: self.client_id,
            description: self.description,
            time_spent: self.time_spent,
            charge_out: self.charge_out,
            kind: self.kind,
            imported_date: self.imported_date,
        }
    }
}

/// Drafts as a form would submit them
pub struct TestDraftBuilder;

impl TestDraftBuilder {
    /// Normal entry by E1 for C1 with no charge, so it is valued from the rate
    pub fn normal(date: NaiveDate, time_spent: &str) -> EntryDraft {
        EntryDraft::new(date, "C1", EntryType::Normal)
            .with_linked_id("E1")
            .with_time(time_spent)
            .with_description("Consultation")
    }

    pub fn close_off(date: NaiveDate, charge_out: Decimal) -> EntryDraft {
        EntryDraft::new(date, "C1", EntryType::CloseOff).with_charge(charge_out)
    }

    pub fn transfer(date: NaiveDate, from: &str, to: &str, charge_out: Decimal) -> EntryDraft {
        EntryDraft::new(date, to, EntryType::Transfer)
            .with_linked_id(from)
            .with_transfer(Some(from), Some(to))
            .with_charge(charge_out)
    }
}

/// Builds an import row from header/value pairs
#[derive(Default)]
pub struct TestRowBuilder {
    pairs: Vec<(String, String)>,
}

impl TestRowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A valid Normal row: date, client C1, employee E1, one and a quarter hours
    pub fn valid_normal() -> Self {
        Self::new()
            .cell("Date", "05.03.2024")
            .cell("Client ID", "C1")
            .cell("Employee ID", "E1")
            .cell("Time Spent", "1¼")
            .cell("Description", "Imported work")
    }

    pub fn cell(mut self, header: &str, value: &str) -> Self {
        self.pairs.push((header.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> RowDraft {
        RowDraft::from_pairs(self.pairs.iter().map(|(h, v)| (h.as_str(), v.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder_defaults() {
        let entry = TestEntryBuilder::new().build();
        assert_eq!(entry.linked_id(), "E1");
        assert_eq!(entry.charge_out, dec!(100));
    }

    #[test]
    fn test_row_builder_uses_header_aliases() {
        let row = TestRowBuilder::valid_normal().build();
        assert_eq!(row.client_id.as_deref(), Some("C1"));
        assert_eq!(row.linked_reference(), Some("E1"));
    }
}
