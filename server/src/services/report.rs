use crate::db::Db;
use crate::error::AppError;
use crate::models::report::*;
use crate::models::stats::StatPoint;
use crate::services::cache::owner_prefix;
use crate::services::number::{looks_numeric, normalize};
use crate::services::parser;
use crate::state::AppState;
use crate::validation;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Storage format for battle timestamps. Lexicographic order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Aggregate or defensive combat lines that are not a damage source.
const NON_SOURCE_COMBAT_KEYS: &[&str] = &[
    "입힌 대미지",
    "받은 대미지",
    "장벽이 받은 대미지",
    "회복 패키지",
    "생명력 흡수",
    "죽음 저항",
    "Damage dealt",
    "Damage Dealt",
    "Damage Taken",
    "Damage Taken Wall",
    "Recovery Packages",
    "Lifesteal",
    "Death Defy",
];

const DAMAGE_LABEL_SUFFIXES: &[&str] = &[" 대미지", " Damage"];

const REPORT_COLUMNS: &str = "r.battle_timestamp, r.tier, r.wave, r.game_duration, r.real_duration,
     r.coin_earned, r.coins_per_hour, r.cells_earned, r.reroll_shards_earned,
     r.killer, r.damage_dealt, r.damage_taken, r.notes,
     COALESCE(d.combat_json, '{}'), COALESCE(d.utility_json, '{}'),
     COALESCE(d.enemy_json, '{}'), COALESCE(d.bot_guardian_json, '{}')";

const REPORT_FROM: &str = "FROM battle_records r
     LEFT JOIN battle_details d
       ON d.owner_id = r.owner_id AND d.battle_timestamp = r.battle_timestamp";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn section_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<SectionMap> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<StoredReport> {
    Ok(StoredReport {
        record: BattleRecord {
            battle_timestamp: timestamp_column(row, 0)?,
            tier: row.get(1)?,
            wave: row.get(2)?,
            game_duration: row.get(3)?,
            real_duration: row.get(4)?,
            coin_earned: row.get(5)?,
            coins_per_hour: row.get(6)?,
            cells_earned: row.get(7)?,
            reroll_shards_earned: row.get(8)?,
            killer: row.get(9)?,
            damage_dealt: row.get(10)?,
            damage_taken: row.get(11)?,
            notes: row.get(12)?,
        },
        detail: BattleDetail {
            combat: section_column(row, 13)?,
            utility: section_column(row, 14)?,
            enemy: section_column(row, 15)?,
            bot_guardian: section_column(row, 16)?,
        },
    })
}

fn query_reports(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<StoredReport>> {
    let sql = format!("SELECT {} {} WHERE {}", REPORT_COLUMNS, REPORT_FROM, filter);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, report_from_row)?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(row?);
    }
    Ok(reports)
}

pub fn save_record(
    db: &Db,
    owner_id: i64,
    record: &BattleRecord,
    detail: &BattleDetail,
) -> Result<BattleRecord, AppError> {
    let ts = format_timestamp(record.battle_timestamp);
    let combat = serde_json::to_string(&detail.combat)?;
    let utility = serde_json::to_string(&detail.utility)?;
    let enemy = serde_json::to_string(&detail.enemy)?;
    let bot_guardian = serde_json::to_string(&detail.bot_guardian)?;

    db.with_tx(|tx| -> Result<(), AppError> {
        tx.execute(
            "INSERT INTO battle_records (owner_id, battle_timestamp, tier, wave, game_duration,
             real_duration, coin_earned, coins_per_hour, cells_earned, reroll_shards_earned,
             killer, damage_dealt, damage_taken, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(owner_id, battle_timestamp) DO UPDATE SET
                tier = excluded.tier,
                wave = excluded.wave,
                game_duration = excluded.game_duration,
                real_duration = excluded.real_duration,
                coin_earned = excluded.coin_earned,
                coins_per_hour = excluded.coins_per_hour,
                cells_earned = excluded.cells_earned,
                reroll_shards_earned = excluded.reroll_shards_earned,
                killer = excluded.killer,
                damage_dealt = excluded.damage_dealt,
                damage_taken = excluded.damage_taken,
                notes = excluded.notes,
                created_at = datetime('now')",
            params![
                owner_id,
                ts,
                record.tier,
                record.wave,
                record.game_duration,
                record.real_duration,
                record.coin_earned,
                record.coins_per_hour,
                record.cells_earned,
                record.reroll_shards_earned,
                record.killer,
                record.damage_dealt,
                record.damage_taken,
                record.notes,
            ],
        )?;
        tx.execute(
            "INSERT INTO battle_details (owner_id, battle_timestamp, combat_json, utility_json,
             enemy_json, bot_guardian_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(owner_id, battle_timestamp) DO UPDATE SET
                combat_json = excluded.combat_json,
                utility_json = excluded.utility_json,
                enemy_json = excluded.enemy_json,
                bot_guardian_json = excluded.bot_guardian_json",
            params![owner_id, ts, combat, utility, enemy, bot_guardian],
        )?;
        Ok(())
    })?;

    Ok(record.clone())
}

pub fn list_recent(
    db: &Db,
    owner_id: i64,
    since: NaiveDateTime,
) -> Result<Vec<StoredReport>, AppError> {
    let since = format_timestamp(since);
    Ok(db.with_conn(|conn| {
        query_reports(
            conn,
            "r.owner_id = ?1 AND r.battle_timestamp >= ?2 ORDER BY r.battle_timestamp DESC",
            params![owner_id, since],
        )
    })?)
}

/// Records strictly before `before`, newest first, paginated.
pub fn list_history(
    db: &Db,
    owner_id: i64,
    before: NaiveDateTime,
    skip: i64,
    limit: i64,
) -> Result<Vec<StoredReport>, AppError> {
    let before = format_timestamp(before);
    Ok(db.with_conn(|conn| {
        query_reports(
            conn,
            "r.owner_id = ?1 AND r.battle_timestamp < ?2
             ORDER BY r.battle_timestamp DESC LIMIT ?3 OFFSET ?4",
            params![owner_id, before, limit, skip],
        )
    })?)
}

pub fn list_month(
    db: &Db,
    owner_id: i64,
    month_key: &str,
    before: NaiveDateTime,
) -> Result<Vec<StoredReport>, AppError> {
    let before = format_timestamp(before);
    Ok(db.with_conn(|conn| {
        query_reports(
            conn,
            "r.owner_id = ?1 AND substr(r.battle_timestamp, 1, 7) = ?2
             AND r.battle_timestamp < ?3 ORDER BY r.battle_timestamp DESC",
            params![owner_id, month_key, before],
        )
    })?)
}

pub fn get_by_timestamp(
    db: &Db,
    owner_id: i64,
    ts: NaiveDateTime,
) -> Result<Option<StoredReport>, AppError> {
    let ts = format_timestamp(ts);
    let sql = format!(
        "SELECT {} {} WHERE r.owner_id = ?1 AND r.battle_timestamp = ?2",
        REPORT_COLUMNS, REPORT_FROM
    );
    Ok(db.with_conn(|conn| {
        conn.query_row(&sql, params![owner_id, ts], report_from_row)
            .optional()
    })?)
}

/// Returns false when nothing matched. The detail row goes with the record.
pub fn delete_record(db: &Db, owner_id: i64, ts: NaiveDateTime) -> Result<bool, AppError> {
    let ts = format_timestamp(ts);
    let removed = db.with_conn(|conn| {
        conn.execute(
            "DELETE FROM battle_records WHERE owner_id = ?1 AND battle_timestamp = ?2",
            params![owner_id, ts],
        )
    })?;
    Ok(removed > 0)
}

pub fn count_records(db: &Db, owner_id: Option<i64>) -> Result<i64, AppError> {
    Ok(db.with_conn(|conn| match owner_id {
        Some(id) => conn.query_row(
            "SELECT COUNT(*) FROM battle_records WHERE owner_id = ?1",
            params![id],
            |row| row.get(0),
        ),
        None => conn.query_row("SELECT COUNT(*) FROM battle_records", [], |row| row.get(0)),
    })?)
}

/// Aggregation inputs for records in `[start, end)`, oldest first.
pub fn list_stat_points(
    db: &Db,
    owner_id: i64,
    start: Option<NaiveDateTime>,
    end: NaiveDateTime,
) -> Result<Vec<StatPoint>, AppError> {
    let start = start.map(format_timestamp).unwrap_or_default();
    let end = format_timestamp(end);
    Ok(db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT battle_timestamp, coin_earned, cells_earned, reroll_shards_earned
             FROM battle_records
             WHERE owner_id = ?1 AND battle_timestamp >= ?2 AND battle_timestamp < ?3
             ORDER BY battle_timestamp",
        )?;
        let rows = stmt.query_map(params![owner_id, start, end], |row| {
            Ok(StatPoint {
                battle_timestamp: timestamp_column(row, 0)?,
                coins: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                cells: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                shards: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            })
        })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    })?)
}

/// Damage sources from the combat section, largest first.
pub fn top_damage_breakdown(detail: &BattleDetail) -> Vec<DamageEntry> {
    let mut entries: Vec<DamageEntry> = detail
        .combat
        .iter()
        .filter(|(key, value)| {
            !NON_SOURCE_COMBAT_KEYS.contains(&key.as_str()) && looks_numeric(value)
        })
        .map(|(key, value)| DamageEntry {
            name: strip_damage_label(key).to_string(),
            display_value: value.clone(),
            raw_magnitude: normalize(value),
        })
        .collect();
    entries.sort_by(|a, b| b.raw_magnitude.total_cmp(&a.raw_magnitude));
    entries
}

fn strip_damage_label(key: &str) -> &str {
    DAMAGE_LABEL_SUFFIXES
        .iter()
        .find_map(|suffix| key.strip_suffix(*suffix))
        .unwrap_or(key)
}

pub fn submit_report(
    state: &AppState,
    owner_id: i64,
    req: ReportSubmission,
) -> Result<BattleRecord, AppError> {
    let text = validation::validate_report_text(&req.report_text)?;
    let mut parsed = parser::parse_report_at(text, state.clock.now().naive_utc());

    if parsed.timestamp_fallback {
        if state.config.reject_undated_reports {
            return Err(AppError::BadRequest(
                "Battle date is missing or unreadable".into(),
            ));
        }
        tracing::warn!(
            owner_id,
            battle_timestamp = %parsed.record.battle_timestamp,
            "battle date unreadable, using current time"
        );
    }
    parsed.record.notes = validation::normalize_notes(req.notes);

    let record = save_record(&state.db, owner_id, &parsed.record, &parsed.detail)?;
    state.cache.invalidate_prefix(&owner_prefix(owner_id));
    tracing::info!(
        owner_id,
        battle_timestamp = %record.battle_timestamp,
        "battle report saved"
    );

    announce_milestone(state);
    Ok(record)
}

fn announce_milestone(state: &AppState) {
    match count_records(&state.db, None) {
        Ok(total) if total > 0 && total % state.config.notify_every == 0 => {
            state
                .notifier
                .notify(format!("Battle report #{} has been saved!", total));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not count reports for milestone"),
    }
}

pub fn get_full_report(
    state: &AppState,
    owner_id: i64,
    ts: NaiveDateTime,
) -> Result<FullReport, AppError> {
    let stored = get_by_timestamp(&state.db, owner_id, ts)?
        .ok_or_else(|| AppError::NotFound("Report not found".into()))?;
    let top_damages = top_damage_breakdown(&stored.detail);
    Ok(FullReport {
        record: stored.record,
        detail: stored.detail,
        top_damages,
    })
}

pub fn delete_report(state: &AppState, owner_id: i64, ts: NaiveDateTime) -> Result<bool, AppError> {
    let deleted = delete_record(&state.db, owner_id, ts)?;
    if deleted {
        state.cache.invalidate_prefix(&owner_prefix(owner_id));
        tracing::info!(owner_id, battle_timestamp = %ts, "battle report deleted");
    }
    Ok(deleted)
}
