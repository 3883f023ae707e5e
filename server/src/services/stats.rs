use crate::error::AppError;
use crate::models::stats::*;
use crate::services::cache::{stats_key, StatsSnapshot};
use crate::services::report::list_stat_points;
use crate::state::AppState;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;

const DAILY_DAYS: i64 = 7;
const WEEK_DAYS: i64 = 7;
const WEEKLY_BUCKETS: i64 = 8;
const WEEKLY_FETCH_DAYS: i64 = 63;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    coins: i64,
    cells: i64,
}

impl Totals {
    fn add(&mut self, point: &StatPoint) {
        self.coins = self.coins.saturating_add(point.coins);
        self.cells = self.cells.saturating_add(point.cells);
    }
}

pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

pub fn growth_pct(current: i64, previous: i64) -> f64 {
    if previous <= 0 {
        return 0.0;
    }
    let pct = (current as f64 - previous as f64) / previous as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Seven entries, oldest first, ending at `yesterday`. Days without records are zero.
pub fn daily_stats(points: &[StatPoint], yesterday: NaiveDate) -> Vec<DailyStat> {
    let first = yesterday - Duration::days(DAILY_DAYS);
    let mut by_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    for point in points {
        let day = point.battle_timestamp.date();
        if day >= first && day <= yesterday {
            by_day.entry(day).or_default().add(point);
        }
    }

    (0..DAILY_DAYS)
        .map(|i| {
            let day = yesterday - Duration::days(DAILY_DAYS - 1 - i);
            let current = by_day.get(&day).copied().unwrap_or_default();
            let previous = by_day
                .get(&(day - Duration::days(1)))
                .copied()
                .unwrap_or_default();
            DailyStat {
                date: day.format("%Y-%m-%d").to_string(),
                total_coins: current.coins,
                total_cells: current.cells,
                coin_growth_pct: growth_pct(current.coins, previous.coins),
                cell_growth_pct: growth_pct(current.cells, previous.cells),
            }
        })
        .collect()
}

/// Eight rolling 7-day buckets, oldest first. Bucket 0 is `[yesterday-6d, yesterday]`
/// and each entry is keyed by its start date.
pub fn weekly_stats(points: &[StatPoint], yesterday: NaiveDate) -> Vec<WeeklyStat> {
    // One extra bucket so the oldest displayed week has something to compare against.
    let mut buckets = vec![Totals::default(); (WEEKLY_BUCKETS + 1) as usize];
    for point in points {
        let days_back = (yesterday - point.battle_timestamp.date()).num_days();
        if days_back < 0 {
            continue;
        }
        let index = days_back / WEEK_DAYS;
        if let Some(bucket) = buckets.get_mut(index as usize) {
            bucket.add(point);
        }
    }

    (0..WEEKLY_BUCKETS)
        .rev()
        .map(|index| {
            let current = buckets[index as usize];
            let previous = buckets[(index + 1) as usize];
            let start = yesterday - Duration::days(index * WEEK_DAYS + WEEK_DAYS - 1);
            WeeklyStat {
                week_start_date: start.format("%Y-%m-%d").to_string(),
                total_coins: current.coins,
                total_cells: current.cells,
                coin_growth_pct: growth_pct(current.coins, previous.coins),
                cell_growth_pct: growth_pct(current.cells, previous.cells),
            }
        })
        .collect()
}

pub fn get_daily_stats(state: &AppState, owner_id: i64) -> Result<DailyStatsResponse, AppError> {
    let yesterday = yesterday(state.clock.now());
    let key = stats_key(owner_id, "daily", yesterday);
    if let Some(StatsSnapshot::Daily(cached)) = state.cache.get(&key) {
        tracing::debug!(owner_id, "daily stats cache hit");
        return Ok(cached);
    }

    let start = midnight(yesterday - Duration::days(DAILY_DAYS));
    let end = midnight(yesterday + Duration::days(1));
    let points = list_stat_points(&state.db, owner_id, Some(start), end)?;
    let response = DailyStatsResponse {
        daily_stats: daily_stats(&points, yesterday),
    };

    tracing::debug!(owner_id, rows = points.len(), "daily stats computed");
    state.cache.set(key, StatsSnapshot::Daily(response.clone()));
    Ok(response)
}

pub fn get_weekly_stats(state: &AppState, owner_id: i64) -> Result<WeeklyStatsResponse, AppError> {
    let yesterday = yesterday(state.clock.now());
    let key = stats_key(owner_id, "weekly", yesterday);
    if let Some(StatsSnapshot::Weekly(cached)) = state.cache.get(&key) {
        tracing::debug!(owner_id, "weekly stats cache hit");
        return Ok(cached);
    }

    let start = midnight(yesterday - Duration::days(WEEKLY_FETCH_DAYS));
    let end = midnight(yesterday + Duration::days(1));
    let points = list_stat_points(&state.db, owner_id, Some(start), end)?;
    let response = WeeklyStatsResponse {
        weekly_stats: weekly_stats(&points, yesterday),
    };

    tracing::debug!(owner_id, rows = points.len(), "weekly stats computed");
    state.cache.set(key, StatsSnapshot::Weekly(response.clone()));
    Ok(response)
}
