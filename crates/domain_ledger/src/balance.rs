//! Balance aggregation
//!
//! A balance splits into what was carried forward from before the period and
//! what was charged within it:
//!
//! ```text
//! displayed = carry_forward + period_total
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use core_kernel::{ClientId, PeriodBounds};

use crate::error::LedgerResult;
use crate::ports::{EntryFilter, TimesheetPort};

/// Which entries a balance covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceScope {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: Option<ClientId>,
    pub linked_id: Option<String>,
}

impl BalanceScope {
    pub fn bounds(&self) -> PeriodBounds {
        PeriodBounds::new(self.start_date, self.end_date)
    }

    fn subject_filter(&self) -> EntryFilter {
        EntryFilter {
            client_id: self.client_id.clone(),
            linked_id: self.linked_id.clone(),
            ..Default::default()
        }
    }

    /// Entries charged within the period
    pub fn period_filter(&self) -> EntryFilter {
        self.subject_filter().within(self.bounds())
    }

    /// Entries carried into the period; `None` when the period has no start
    pub fn carry_forward_filter(&self) -> Option<EntryFilter> {
        self.start_date.map(|start| self.subject_filter().dated_before(start))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(rename = "carryForwardBalance")]
    pub carry_forward: Decimal,
    #[serde(rename = "currentPeriodTotal")]
    pub period_total: Decimal,
    #[serde(rename = "displayedBalance")]
    pub displayed: Decimal,
}

impl Balance {
    pub fn new(carry_forward: Decimal, period_total: Decimal) -> Self {
        Self {
            carry_forward,
            period_total,
            displayed: carry_forward + period_total,
        }
    }
}

/// Reads balances from the stored ledger
#[derive(Clone)]
pub struct BalanceAggregator {
    timesheets: Arc<dyn TimesheetPort>,
}

impl BalanceAggregator {
    pub fn new(timesheets: Arc<dyn TimesheetPort>) -> Self {
        Self { timesheets }
    }

    pub async fn balance(&self, scope: &BalanceScope) -> LedgerResult<Balance> {
        let carry_forward = match scope.carry_forward_filter() {
            Some(filter) => self.timesheets.sum_charges(&filter).await?,
            None => Decimal::ZERO,
        };
        let period_total = self.timesheets.sum_charges(&scope.period_filter()).await?;

        let balance = Balance::new(carry_forward, period_total);
        debug!(
            client_id = ?scope.client_id,
            linked_id = ?scope.linked_id,
            carry_forward = %balance.carry_forward,
            period_total = %balance.period_total,
            "Computed balance"
        );
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryKind, TimesheetEntry};
    use crate::ports::mock::InMemoryLedgerStore;
    use core_kernel::EmployeeId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn charge(client: &str, on: NaiveDate, amount: Decimal) -> TimesheetEntry {
        TimesheetEntry {
            date: on,
            client_id: ClientId::parse(client).unwrap(),
            description: String::new(),
            time_spent: "1".to_string(),
            charge_out: amount,
            kind: EntryKind::Normal { employee_id: Some(EmployeeId::parse("E1").unwrap()) },
            imported_date: None,
        }
    }

    fn february_c1() -> BalanceScope {
        BalanceScope {
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 2, 29)),
            client_id: Some(ClientId::parse("C1").unwrap()),
            linked_id: None,
        }
    }

    #[test]
    fn test_balance_field_names() {
        let json = serde_json::to_value(Balance::new(dec!(-100), dec!(350))).unwrap();
        assert_eq!(json["carryForwardBalance"], "-100");
        assert_eq!(json["currentPeriodTotal"], "350");
        assert_eq!(json["displayedBalance"], "250");
    }

    async fn store_with(entries: &[TimesheetEntry]) -> Arc<InMemoryLedgerStore> {
        let store = Arc::new(InMemoryLedgerStore::new());
        for entry in entries {
            store.insert_entry(entry).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_no_start_date_means_no_carry_forward() {
        let store = store_with(&[charge("C1", date(2020, 1, 1), dec!(10)), charge("C1", date(2024, 2, 2), dec!(5))]).await;
        let scope = BalanceScope {
            end_date: Some(date(2024, 2, 29)),
            ..Default::default()
        };
        let balance = BalanceAggregator::new(store).balance(&scope).await.unwrap();
        assert_eq!(balance, Balance::new(dec!(0), dec!(15)));
    }

    #[tokio::test]
    async fn test_february_balance_for_c1() {
        let store = store_with(&[
            charge("C1", date(2024, 1, 15), dec!(-100)),
            charge("C1", date(2024, 2, 3), dec!(300)),
            charge("C1", date(2024, 2, 29), dec!(50)),
            charge("C2", date(2024, 2, 3), dec!(1000)),
            charge("C1", date(2024, 3, 1), dec!(7)),
        ])
        .await;

        let balance = BalanceAggregator::new(store).balance(&february_c1()).await.unwrap();
        assert_eq!(balance.carry_forward, dec!(-100));
        assert_eq!(balance.period_total, dec!(350));
        assert_eq!(balance.displayed, dec!(250));
    }

    proptest! {
        #[test]
        fn displayed_is_carry_plus_period(
            charges in prop::collection::vec((0i64..120, -50_000i64..50_000), 0..40),
            start in prop::option::of(0i64..120),
            span in prop::option::of(0i64..60),
        ) {
            let base = date(2024, 1, 1);
            let start_day = start.unwrap_or(0);
            let end_day = span.map(|s| start_day + s);

            let mut expected_carry = Decimal::ZERO;
            let mut expected_period = Decimal::ZERO;
            let mut entries = Vec::new();
            for (day, minor) in &charges {
                let amount = Decimal::new(*minor, 2);
                if start.is_some() && *day < start_day {
                    expected_carry += amount;
                } else if *day >= start_day && end_day.map_or(true, |end| *day <= end) {
                    expected_period += amount;
                }
                entries.push(charge("C1", base + chrono::Duration::days(*day), amount));
            }
            let scope = BalanceScope {
                start_date: start.map(|d| base + chrono::Duration::days(d)),
                end_date: end_day.map(|d| base + chrono::Duration::days(d)),
                ..Default::default()
            };

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let balance = runtime.block_on(async {
                let store = store_with(&entries).await;
                BalanceAggregator::new(store).balance(&scope).await.unwrap()
            });

            prop_assert_eq!(balance.carry_forward, expected_carry);
            prop_assert_eq!(balance.period_total, expected_period);
            prop_assert_eq!(balance.displayed, balance.carry_forward + balance.period_total);
        }
    }
}
