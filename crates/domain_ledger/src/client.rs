//! Clients billed through the ledger

use serde::{Deserialize, Serialize};

use core_kernel::ClientId;

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: ClientId,
    pub client_name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Client {
    pub fn new(client_id: ClientId, client_name: impl Into<String>) -> Self {
        Self {
            client_id,
            client_name: client_name.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.client_name.trim().is_empty() {
            return Err(LedgerError::validation("Client name must not be empty"));
        }
        Ok(())
    }
}

/// Changes to an existing client; the key itself is fixed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    pub client_name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One row of a client import, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientImportRow {
    #[serde(default, alias = "Client ID", alias = "ID")]
    pub client_id: Option<String>,
    #[serde(default, alias = "Client Name", alias = "Name")]
    pub client_name: Option<String>,
    #[serde(default, alias = "Notes")]
    pub notes: Option<String>,
}

impl ClientImportRow {
    /// Returns the client this row describes, or `None` if a required field is blank
    pub fn to_client(&self) -> Option<Client> {
        let client_id = ClientId::parse(self.client_id.as_deref()?).ok()?;
        let name = self.client_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }

        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Some(Client {
            client_id,
            client_name: name.to_string(),
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_row_requires_id_and_name() {
        let row = ClientImportRow {
            client_id: Some("C1".to_string()),
            client_name: Some("Acme".to_string()),
            notes: Some("  ".to_string()),
        };
        let client = row.to_client().unwrap();
        assert_eq!(client.client_id.as_str(), "C1");
        assert!(client.notes.is_none());

        let missing_name = ClientImportRow {
            client_name: None,
            ..row.clone()
        };
        assert!(missing_name.to_client().is_none());

        let blank_id = ClientImportRow {
            client_id: Some(" ".to_string()),
            ..row
        };
        assert!(blank_id.to_client().is_none());
    }

    #[test]
    fn test_import_row_accepts_spreadsheet_headers() {
        let row: ClientImportRow =
            serde_json::from_str(r#"{"Client ID": "C2", "Client Name": "Beta", "Notes": "vip"}"#).unwrap();
        assert_eq!(row.to_client().unwrap().notes.as_deref(), Some("vip"));
    }
}
