use crate::error::AppError;
use crate::models::history::{HistoryView, MonthlySummary};
use crate::models::report::StoredReport;
use crate::models::stats::StatPoint;
use crate::services::report::{list_history, list_month, list_recent, list_stat_points};
use crate::state::AppState;
use crate::validation;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use std::collections::BTreeMap;

const RECENT_DAYS: i64 = 7;

/// Start of the always-detailed window: today's UTC midnight minus seven days.
pub fn recent_cutoff(now: DateTime<Utc>) -> NaiveDateTime {
    now.date_naive().and_time(NaiveTime::MIN) - Duration::days(RECENT_DAYS)
}

/// Groups points by `YYYY-MM`, newest month first.
pub fn summarize_months(points: &[StatPoint]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    for point in points {
        let month_key = point.battle_timestamp.format("%Y-%m").to_string();
        let summary = months
            .entry(month_key.clone())
            .or_insert_with(|| MonthlySummary {
                month_key,
                count: 0,
                total_coins: 0,
                total_cells: 0,
                total_shards: 0,
            });
        summary.count += 1;
        summary.total_coins = summary.total_coins.saturating_add(point.coins);
        summary.total_cells = summary.total_cells.saturating_add(point.cells);
        summary.total_shards = summary.total_shards.saturating_add(point.shards);
    }
    months.into_values().rev().collect()
}

pub fn build_history_view(state: &AppState, owner_id: i64) -> Result<HistoryView, AppError> {
    let cutoff = recent_cutoff(state.clock.now());
    let recent = list_recent(&state.db, owner_id, cutoff)?;
    let older = list_stat_points(&state.db, owner_id, None, cutoff)?;
    Ok(HistoryView {
        recent,
        monthly_summaries: summarize_months(&older),
    })
}

/// Detailed records of one older month. The recent window is excluded since the
/// history view already lists it in full.
pub fn reports_by_month(
    state: &AppState,
    owner_id: i64,
    month_key: &str,
) -> Result<Vec<StoredReport>, AppError> {
    let month_key = validation::validate_month_key(month_key)?;
    let cutoff = recent_cutoff(state.clock.now());
    list_month(&state.db, owner_id, &month_key, cutoff)
}

pub fn history_page(
    state: &AppState,
    owner_id: i64,
    skip: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<StoredReport>, AppError> {
    let (skip, limit) = validation::clamp_pagination(skip, limit);
    let cutoff = recent_cutoff(state.clock.now());
    list_history(&state.db, owner_id, cutoff, skip, limit)
}

pub fn recent_reports(state: &AppState, owner_id: i64) -> Result<Vec<StoredReport>, AppError> {
    list_recent(&state.db, owner_id, recent_cutoff(state.clock.now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn point(y: i32, m: u32, d: u32, coins: i64) -> StatPoint {
        StatPoint {
            battle_timestamp: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            coins,
            cells: 1,
            shards: 2,
        }
    }

    #[test]
    fn test_recent_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 11, 21, 18, 45, 0).unwrap();
        assert_eq!(recent_cutoff(now).to_string(), "2025-11-14 00:00:00");
    }

    #[test]
    fn test_summarize_months_newest_first() {
        let points = vec![
            point(2025, 9, 3, 10),
            point(2025, 10, 1, 5),
            point(2025, 10, 31, 7),
            point(2024, 12, 25, 1),
        ];
        let months = summarize_months(&points);
        let keys: Vec<&str> = months.iter().map(|m| m.month_key.as_str()).collect();
        assert_eq!(keys, vec!["2025-10", "2025-09", "2024-12"]);
        assert_eq!(months[0].count, 2);
        assert_eq!(months[0].total_coins, 12);
        assert_eq!(months[0].total_cells, 2);
        assert_eq!(months[0].total_shards, 4);
        assert!(summarize_months(&[]).is_empty());
    }
}
