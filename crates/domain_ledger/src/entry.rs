//! Timesheet entries
//!
//! An entry is one signed line in the ledger. Its [`EntryKind`] carries only
//! the fields that make sense for that kind of line:
//!
//! - **Normal**: billable time by an employee; the charge is usually derived
//!   from the employee's rate
//! - **Close-off**: a settlement that reduces the client's balance, never positive
//! - **Transfer**: a balance moved between clients, either sign
//!
//! Callers submit an [`EntryDraft`], the flat shape forms and imports produce.
//! Valuation turns a draft into a [`TimesheetEntry`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientId, EmployeeId, EntryId};

use crate::error::LedgerError;

/// Linked id recorded on Close-off entries when the caller gives none
pub const CLOSE_OFF_MARKER: &str = "C/O";

/// Entry type as persisted and exchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryType {
    #[default]
    Normal,
    #[serde(rename = "Close-off")]
    CloseOff,
    Transfer,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Normal => "Normal",
            EntryType::CloseOff => "Close-off",
            EntryType::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "" | "normal" => Ok(EntryType::Normal),
            "closeoff" => Ok(EntryType::CloseOff),
            "transfer" => Ok(EntryType::Transfer),
            _ => Err(LedgerError::validation(format!("Unknown entry type: {}", s.trim()))),
        }
    }
}

/// What kind of ledger line an entry is, with the fields only that kind carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all_fields = "camelCase")]
pub enum EntryKind {
    Normal {
        /// Absent only when the charge was supplied rather than derived
        employee_id: Option<EmployeeId>,
    },
    #[serde(rename = "Close-off")]
    CloseOff {
        reference: String,
    },
    Transfer {
        counterparty: String,
        from_client: Option<ClientId>,
        to_client: Option<ClientId>,
    },
}

impl EntryKind {
    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryKind::Normal { .. } => EntryType::Normal,
            EntryKind::CloseOff { .. } => EntryType::CloseOff,
            EntryKind::Transfer { .. } => EntryType::Transfer,
        }
    }
}

/// A valued ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetEntry {
    pub date: NaiveDate,
    pub client_id: ClientId,
    pub description: String,
    /// Time as recorded, normally a quarter-hour token
    pub time_spent: String,
    /// Signed charge; Close-off entries are never positive
    pub charge_out: Decimal,
    pub kind: EntryKind,
    /// Run date of the import that created the entry
    pub imported_date: Option<NaiveDate>,
}

impl TimesheetEntry {
    pub fn entry_type(&self) -> EntryType {
        self.kind.entry_type()
    }

    /// The linked id stored with the entry: the employee for Normal lines,
    /// the settlement reference for Close-off, the counterparty for Transfer
    pub fn linked_id(&self) -> &str {
        match &self.kind {
            EntryKind::Normal { employee_id } => employee_id.as_ref().map_or("", EmployeeId::as_str),
            EntryKind::CloseOff { reference } => reference,
            EntryKind::Transfer { counterparty, .. } => counterparty,
        }
    }

    pub fn transfer_from(&self) -> Option<&ClientId> {
        match &self.kind {
            EntryKind::Transfer { from_client, .. } => from_client.as_ref(),
            _ => None,
        }
    }

    pub fn transfer_to(&self) -> Option<&ClientId> {
        match &self.kind {
            EntryKind::Transfer { to_client, .. } => to_client.as_ref(),
            _ => None,
        }
    }

    /// Snapshot used on audit facts
    pub fn audit_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "date": self.date,
            "clientId": self.client_id,
            "description": self.description,
            "linkedId": self.linked_id(),
            "timeSpent": self.time_spent,
            "chargeOut": self.charge_out,
            "entryType": self.entry_type(),
        })
    }
}

/// A persisted entry with its store-assigned identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub id: EntryId,
    /// Monotonic insertion order; breaks ties between entries on the same date
    pub sequence: i64,
    #[serde(flatten)]
    pub entry: TimesheetEntry,
}

/// A candidate entry as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub client_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub linked_id: String,
    #[serde(default)]
    pub time_spent: String,
    #[serde(default)]
    pub charge_out: Option<Decimal>,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default)]
    pub transfer_from_client_id: Option<String>,
    #[serde(default)]
    pub transfer_to_client_id: Option<String>,
}

impl EntryDraft {
    pub fn new(date: NaiveDate, client_id: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            date,
            client_id: client_id.into(),
            entry_type,
            ..Default::default()
        }
    }

    pub fn with_linked_id(mut self, linked_id: impl Into<String>) -> Self {
        self.linked_id = linked_id.into();
        self
    }

    pub fn with_time(mut self, time_spent: impl Into<String>) -> Self {
        self.time_spent = time_spent.into();
        self
    }

    pub fn with_charge(mut self, charge_out: Decimal) -> Self {
        self.charge_out = Some(charge_out);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_transfer(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.transfer_from_client_id = from.map(str::to_string);
        self.transfer_to_client_id = to.map(str::to_string);
        self
    }

    /// A charge of zero counts as no charge supplied
    pub fn supplied_charge(&self) -> Option<Decimal> {
        self.charge_out.filter(|c| !c.is_zero())
    }

    /// True when valuation must derive the charge from the employee's rate
    pub fn needs_rate(&self) -> bool {
        self.entry_type == EntryType::Normal && self.supplied_charge().is_none()
    }

    /// Builds the entry kind for this draft.
    ///
    /// Normal entries valued from a rate need an employee id in `linked_id`;
    /// with a supplied charge it may be left blank. Close-off entries without
    /// a linked id fall back to `close_off_marker`.
    pub fn kind(&self, close_off_marker: &str) -> Result<EntryKind, LedgerError> {
        let linked = self.linked_id.trim();
        match self.entry_type {
            EntryType::Normal if linked.is_empty() && !self.needs_rate() => {
                Ok(EntryKind::Normal { employee_id: None })
            }
            EntryType::Normal => {
                let employee_id =
                    EmployeeId::parse(linked).map_err(|_| LedgerError::MissingEmployeeId)?;
                Ok(EntryKind::Normal { employee_id: Some(employee_id) })
            }
            EntryType::CloseOff => Ok(EntryKind::CloseOff {
                reference: if linked.is_empty() {
                    close_off_marker.to_string()
                } else {
                    linked.to_string()
                },
            }),
            EntryType::Transfer => Ok(EntryKind::Transfer {
                counterparty: linked.to_string(),
                from_client: optional_client(self.transfer_from_client_id.as_deref()),
                to_client: optional_client(self.transfer_to_client_id.as_deref()),
            }),
        }
    }
}

fn optional_client(raw: Option<&str>) -> Option<ClientId> {
    raw.and_then(|r| ClientId::parse(r).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entry_type_parse_is_lenient() {
        assert_eq!("Close-off".parse::<EntryType>().unwrap(), EntryType::CloseOff);
        assert_eq!("close off".parse::<EntryType>().unwrap(), EntryType::CloseOff);
        assert_eq!("TRANSFER".parse::<EntryType>().unwrap(), EntryType::Transfer);
        assert_eq!("".parse::<EntryType>().unwrap(), EntryType::Normal);
        assert!("Refund".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_entry_type_serde_names() {
        assert_eq!(serde_json::to_string(&EntryType::CloseOff).unwrap(), "\"Close-off\"");
        let parsed: EntryType = serde_json::from_str("\"Transfer\"").unwrap();
        assert_eq!(parsed, EntryType::Transfer);
    }

    #[test]
    fn test_zero_charge_counts_as_absent() {
        let draft = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::Normal).with_charge(dec!(0));
        assert!(draft.supplied_charge().is_none());
        assert!(draft.needs_rate());
    }

    #[test]
    fn test_kind_for_each_type() {
        let normal = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::Normal).with_linked_id("E1");
        assert_eq!(
            normal.kind(CLOSE_OFF_MARKER).unwrap(),
            EntryKind::Normal { employee_id: Some(EmployeeId::parse("E1").unwrap()) }
        );

        let missing = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::Normal);
        assert!(matches!(missing.kind(CLOSE_OFF_MARKER), Err(LedgerError::MissingEmployeeId)));

        let charged = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::Normal).with_charge(dec!(200));
        assert_eq!(charged.kind(CLOSE_OFF_MARKER).unwrap(), EntryKind::Normal { employee_id: None });

        let close_off = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::CloseOff);
        assert_eq!(
            close_off.kind(CLOSE_OFF_MARKER).unwrap(),
            EntryKind::CloseOff { reference: "C/O".to_string() }
        );

        let transfer = EntryDraft::new(date(2024, 3, 1), "C1", EntryType::Transfer)
            .with_linked_id("C2")
            .with_transfer(Some("C2"), Some(" "));
        match transfer.kind(CLOSE_OFF_MARKER).unwrap() {
            EntryKind::Transfer { counterparty, from_client, to_client } => {
                assert_eq!(counterparty, "C2");
                assert_eq!(from_client.unwrap().as_str(), "C2");
                assert!(to_client.is_none());
            }
            other => panic!("expected transfer, got {:?}", other),
        }
    }

    #[test]
    fn test_linked_id_and_snapshot() {
        let entry = TimesheetEntry {
            date: date(2024, 2, 10),
            client_id: ClientId::parse("C1").unwrap(),
            description: "Advice".to_string(),
            time_spent: "1¼".to_string(),
            charge_out: dec!(125),
            kind: EntryKind::Normal { employee_id: Some(EmployeeId::parse("E1").unwrap()) },
            imported_date: None,
        };
        assert_eq!(entry.linked_id(), "E1");

        let snapshot = entry.audit_snapshot();
        assert_eq!(snapshot["linkedId"], "E1");
        assert_eq!(snapshot["entryType"], "Normal");
        assert_eq!(snapshot["date"], "2024-02-10");
    }
}
