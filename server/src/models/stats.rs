use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStat {
    pub date: String,
    pub total_coins: i64,
    pub total_cells: i64,
    pub coin_growth_pct: f64,
    pub cell_growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStat {
    pub week_start_date: String,
    pub total_coins: i64,
    pub total_cells: i64,
    pub coin_growth_pct: f64,
    pub cell_growth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatsResponse {
    pub daily_stats: Vec<DailyStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStatsResponse {
    pub weekly_stats: Vec<WeeklyStat>,
}

/// The summary columns aggregation needs from one stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct StatPoint {
    pub battle_timestamp: chrono::NaiveDateTime,
    pub coins: i64,
    pub cells: i64,
    pub shards: i64,
}
