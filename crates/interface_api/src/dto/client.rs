//! Client DTOs

use serde::Deserialize;
use validator::Validate;

use domain_ledger::{Client, ClientImportRow, ClientUpdate};

use super::{client_key, non_blank};
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 50))]
    pub client_id: String,
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    pub notes: Option<String>,
}

impl CreateClientRequest {
    pub fn into_client(self) -> Result<Client, ApiError> {
        let client = Client::new(client_key(&self.client_id)?, self.client_name);
        Ok(match non_blank(self.notes) {
            Some(notes) => client.with_notes(notes),
            None => client,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    pub notes: Option<String>,
}

impl From<UpdateClientRequest> for ClientUpdate {
    fn from(request: UpdateClientRequest) -> Self {
        ClientUpdate {
            client_name: request.client_name,
            notes: non_blank(request.notes),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportClientsRequest {
    pub rows: Vec<ClientImportRow>,
}
