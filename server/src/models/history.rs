use crate::models::report::StoredReport;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month_key: String,
    pub count: i64,
    pub total_coins: i64,
    pub total_cells: i64,
    pub total_shards: i64,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub recent: Vec<StoredReport>,
    pub monthly_summaries: Vec<MonthlySummary>,
}
