//! Timesheet, balance and report DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::PeriodBounds;
use domain_ledger::{BalanceScope, EntryDraft, EntryType, RowDraft, TimesheetQuery};

use super::{client_key, non_blank};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetListParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: Option<String>,
    pub linked_id: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 1000))]
    pub page_size: Option<u32>,
}

impl TimesheetListParams {
    pub fn into_query(self) -> Result<TimesheetQuery, ApiError> {
        Ok(TimesheetQuery {
            start_date: self.start_date,
            end_date: self.end_date,
            client_id: non_blank(self.client_id).map(|id| client_key(&id)).transpose()?,
            linked_id: non_blank(self.linked_id),
            page: self.page,
            page_size: self.page_size,
        })
    }
}

/// Balance scope as query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: Option<String>,
    pub linked_id: Option<String>,
}

impl ScopeParams {
    pub fn into_scope(self) -> Result<BalanceScope, ApiError> {
        Ok(BalanceScope {
            start_date: self.start_date,
            end_date: self.end_date,
            client_id: non_blank(self.client_id).map(|id| client_key(&id)).transpose()?,
            linked_id: non_blank(self.linked_id),
        })
    }
}

/// Optional report or listing window
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PeriodParams {
    pub fn bounds(&self) -> PeriodBounds {
        PeriodBounds::new(self.start_date, self.end_date)
    }
}

/// A timesheet entry as entered on the form
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetRequest {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 50))]
    pub client_id: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
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

impl From<TimesheetRequest> for EntryDraft {
    fn from(request: TimesheetRequest) -> Self {
        EntryDraft {
            date: request.date,
            client_id: request.client_id,
            description: request.description,
            linked_id: request.linked_id,
            time_spent: request.time_spent,
            charge_out: request.charge_out,
            entry_type: request.entry_type,
            transfer_from_client_id: non_blank(request.transfer_from_client_id),
            transfer_to_client_id: non_blank(request.transfer_to_client_id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportTimesheetsRequest {
    pub rows: Vec<RowDraft>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RateParams {
    /// Defaults to today in the firm timezone
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub employee_id: String,
    pub date: NaiveDate,
    pub hourly_rate: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResponse {
    pub charge_out: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_dropped() {
        let params = TimesheetListParams {
            client_id: Some("  ".to_string()),
            linked_id: Some("E1".to_string()),
            ..Default::default()
        };
        let query = params.into_query().unwrap();
        assert!(query.client_id.is_none());
        assert_eq!(query.linked_id.as_deref(), Some("E1"));
    }

    #[test]
    fn test_page_size_is_bounded() {
        let params = TimesheetListParams {
            page_size: Some(5000),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_request_defaults_to_normal() {
        let request: TimesheetRequest = serde_json::from_value(serde_json::json!({
            "date": "2024-03-01",
            "clientId": "C1",
            "linkedId": "E1",
            "timeSpent": "1¼"
        }))
        .unwrap();
        let draft = EntryDraft::from(request);
        assert_eq!(draft.entry_type, EntryType::Normal);
        assert!(draft.needs_rate());
    }
}
