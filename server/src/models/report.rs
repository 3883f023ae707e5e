use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One parsed report section, kept in the order the game printed it.
pub type SectionMap = IndexMap<String, String>;

#[derive(Debug, Deserialize)]
pub struct ReportSubmission {
    pub report_text: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleRecord {
    pub battle_timestamp: NaiveDateTime,
    pub tier: String,
    pub wave: i64,
    pub game_duration: String,
    pub real_duration: String,
    pub coin_earned: i64,
    pub coins_per_hour: i64,
    pub cells_earned: i64,
    pub reroll_shards_earned: i64,
    pub killer: String,
    pub damage_dealt: String,
    pub damage_taken: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleDetail {
    pub combat: SectionMap,
    pub utility: SectionMap,
    pub enemy: SectionMap,
    pub bot_guardian: SectionMap,
}

/// Output of the text parser: a summary record plus its four detail sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub record: BattleRecord,
    pub detail: BattleDetail,
    /// True when the battle date could not be read and the current time was used.
    pub timestamp_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageEntry {
    pub name: String,
    pub display_value: String,
    pub raw_magnitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredReport {
    #[serde(flatten)]
    pub record: BattleRecord,
    pub detail: BattleDetail,
}

#[derive(Debug, Serialize)]
pub struct FullReport {
    pub record: BattleRecord,
    pub detail: BattleDetail,
    pub top_damages: Vec<DamageEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub deleted: bool,
}
