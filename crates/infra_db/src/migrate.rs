//! Startup data migrations
//!
//! Older clients stored timesheet dates day-first (`5.3.2024`, `05/03/2024`).
//! Range filters compare dates as ISO text, so those rows are rewritten once
//! at startup before the server accepts requests.

use serde::Serialize;
use tracing::{info, warn};

use domain_ledger::migrate_legacy_date;

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// Counts reported by [`migrate_legacy_dates`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateMigrationSummary {
    pub migrated: u64,
    /// Rows that look day-first but name no real calendar day
    pub skipped: u64,
}

/// Rewrites every day-first timesheet date to `YYYY-MM-DD` in one transaction
pub async fn migrate_legacy_dates(pool: &DatabasePool) -> Result<DateMigrationSummary, DatabaseError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        r#"SELECT "id", "date" FROM "Timesheets" WHERE "date" LIKE '%.%.%' OR "date" LIKE '%/%/%'"#,
    )
    .fetch_all(pool)
    .await?;

    let mut summary = DateMigrationSummary::default();
    if rows.is_empty() {
        return Ok(summary);
    }

    let mut tx = pool.begin().await?;
    for (id, stored) in rows {
        match migrate_legacy_date(&stored) {
            Some(date) => {
                sqlx::query(r#"UPDATE "Timesheets" SET "date" = $1 WHERE "id" = $2"#)
                    .bind(date.to_string())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                summary.migrated += 1;
            }
            None => {
                warn!(id, date = %stored, "Leaving unparseable legacy date in place");
                summary.skipped += 1;
            }
        }
    }
    tx.commit().await?;

    info!(migrated = summary.migrated, skipped = summary.skipped, "Migrated legacy timesheet dates");
    Ok(summary)
}
