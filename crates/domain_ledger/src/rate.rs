//! Effective-dated rate resolution

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use core_kernel::{in_force_on, EmployeeId};

use crate::employee::RateHistoryRecord;
use crate::error::LedgerResult;
use crate::ports::EmployeePort;

/// Picks the rate that applied to an employee on a given date
pub fn rate_on(history: &[RateHistoryRecord], current_rate: Decimal, date: NaiveDate) -> Decimal {
    in_force_on(history, date).map_or(current_rate, |r| r.hourly_rate)
}

/// Resolves hourly rates against stored rate history
#[derive(Clone)]
pub struct RateResolver {
    employees: Arc<dyn EmployeePort>,
}

impl RateResolver {
    pub fn new(employees: Arc<dyn EmployeePort>) -> Self {
        Self { employees }
    }

    /// The rate in force for `employee_id` on `date`.
    ///
    /// Falls back to the employee's current rate when no history record is
    /// dated on or before `date`. An unknown employee resolves to zero, which
    /// callers treat as "no rate available".
    pub async fn resolve(&self, employee_id: &EmployeeId, date: NaiveDate) -> LedgerResult<Decimal> {
        let Some(employee) = self.employees.get_employee(employee_id).await? else {
            debug!(employee_id = %employee_id, %date, "Rate lookup for unknown employee");
            return Ok(Decimal::ZERO);
        };

        let history = self.employees.rate_history(employee_id).await?;
        let rate = rate_on(&history, employee.hourly_rate, date);
        debug!(employee_id = %employee_id, %date, %rate, "Resolved rate");
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::Employee;
    use crate::ports::mock::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn resolver_with_e1() -> RateResolver {
        let store = Arc::new(InMemoryLedgerStore::new());
        let e1 = EmployeeId::parse("E1").unwrap();
        store.insert_employee(&Employee::new(e1.clone(), "Ann", dec!(80))).await.unwrap();
        for (on, rate) in [(date(2024, 1, 1), dec!(100)), (date(2024, 6, 1), dec!(150))] {
            store
                .append_rate(&RateHistoryRecord::new(e1.clone(), rate, on))
                .await
                .unwrap();
        }
        RateResolver::new(store)
    }

    #[tokio::test]
    async fn test_history_then_current_rate() {
        let resolver = resolver_with_e1().await;
        let e1 = EmployeeId::parse("E1").unwrap();

        assert_eq!(resolver.resolve(&e1, date(2024, 3, 1)).await.unwrap(), dec!(100));
        assert_eq!(resolver.resolve(&e1, date(2023, 1, 1)).await.unwrap(), dec!(80));
        assert_eq!(resolver.resolve(&e1, date(2024, 7, 1)).await.unwrap(), dec!(150));
        assert_eq!(resolver.resolve(&e1, date(2024, 6, 1)).await.unwrap(), dec!(150));
    }

    #[tokio::test]
    async fn test_unknown_employee_resolves_to_zero() {
        let resolver = resolver_with_e1().await;
        let ghost = EmployeeId::parse("E404").unwrap();
        assert_eq!(resolver.resolve(&ghost, date(2024, 3, 1)).await.unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_same_day_records_take_latest_appended() {
        let e1 = EmployeeId::parse("E1").unwrap();
        let history = vec![
            RateHistoryRecord::new(e1.clone(), dec!(100), date(2024, 1, 1)),
            RateHistoryRecord::new(e1, dec!(110), date(2024, 1, 1)),
        ];
        assert_eq!(rate_on(&history, dec!(80), date(2024, 1, 1)), dec!(110));
    }
}
