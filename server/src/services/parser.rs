use crate::models::report::{BattleDetail, BattleRecord, ParsedReport, SectionMap};
use crate::services::number::normalize_int;
use chrono::{NaiveDate, NaiveDateTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Summary,
    Combat,
    Utility,
    Enemy,
    BotGuardian,
}

const SECTION_HEADERS: &[(&str, Section)] = &[
    ("전투 보고서", Section::Summary),
    ("Battle Report", Section::Summary),
    ("전투", Section::Combat),
    ("Combat", Section::Combat),
    ("유틸리티", Section::Utility),
    ("Utility", Section::Utility),
    ("적", Section::Enemy),
    ("파괴된 적", Section::Enemy),
    ("Enemies Destroyed", Section::Enemy),
    ("봇", Section::BotGuardian),
    ("가디언", Section::BotGuardian),
    ("Bots", Section::BotGuardian),
    ("Guardian", Section::BotGuardian),
];

/// Labels whose values contain spaces, so a last-whitespace split would cut them wrong.
const SUMMARY_COMPOUND_KEYS: &[&str] = &[
    "전투 날짜",
    "게임 시간",
    "실시간",
    "처치자",
    "Battle Date",
    "Game Time",
    "Real Time",
    "Killed By",
];

const DATE_KEYS: &[&str] = &["전투 날짜", "Battle Date"];
const GAME_TIME_KEYS: &[&str] = &["게임 시간", "Game Time"];
const REAL_TIME_KEYS: &[&str] = &["실시간", "Real Time"];
const TIER_KEYS: &[&str] = &["티어", "Tier"];
const WAVE_KEYS: &[&str] = &["웨이브", "Wave"];
const KILLER_KEYS: &[&str] = &["처치자", "Killed By"];
const COIN_KEYS: &[&str] = &["코인 획득", "Coins earned", "Coins Earned"];
const COINS_PER_HOUR_KEYS: &[&str] = &["시간당 코인", "Coins per hour", "Coins Per Hour"];
const CELL_KEYS: &[&str] = &["획득한 셀", "Cells Earned"];
const REROLL_SHARD_KEYS: &[&str] = &["다시 뽑기 파편 획득함", "Reroll Shards Earned"];
const DAMAGE_DEALT_KEYS: &[&str] = &["입힌 대미지", "Damage dealt", "Damage Dealt"];
const DAMAGE_TAKEN_KEYS: &[&str] = &["받은 대미지", "Damage Taken"];

const MONTHS: &[(&str, u32)] = &[
    ("1월", 1),
    ("2월", 2),
    ("3월", 3),
    ("4월", 4),
    ("5월", 5),
    ("6월", 6),
    ("7월", 7),
    ("8월", 8),
    ("9월", 9),
    ("10월", 10),
    ("11월", 11),
    ("12월", 12),
    ("Jan", 1),
    ("Feb", 2),
    ("Mar", 3),
    ("Apr", 4),
    ("May", 5),
    ("Jun", 6),
    ("Jul", 7),
    ("Aug", 8),
    ("Sep", 9),
    ("Oct", 10),
    ("Nov", 11),
    ("Dec", 12),
];

#[derive(Debug, Default)]
struct Sections {
    summary: SectionMap,
    combat: SectionMap,
    utility: SectionMap,
    enemy: SectionMap,
    bot_guardian: SectionMap,
}

impl Sections {
    fn get_mut(&mut self, section: Section) -> &mut SectionMap {
        match section {
            Section::Summary => &mut self.summary,
            Section::Combat => &mut self.combat,
            Section::Utility => &mut self.utility,
            Section::Enemy => &mut self.enemy,
            Section::BotGuardian => &mut self.bot_guardian,
        }
    }
}

/// Parses with an explicit fallback instant for reports without a readable date.
pub fn parse_report_at(text: &str, now: NaiveDateTime) -> ParsedReport {
    let sections = tokenize(text);
    let summary = &sections.summary;

    let parsed_date = first_value(summary, DATE_KEYS).and_then(parse_battle_date);
    let timestamp_fallback = parsed_date.is_none();
    let battle_timestamp =
        parsed_date.unwrap_or_else(|| now.with_nanosecond(0).unwrap_or(now));

    let text_field = |map: &SectionMap, keys: &[&str]| -> String {
        first_value(map, keys).unwrap_or_default().to_string()
    };
    let int_field =
        |keys: &[&str]| -> i64 { first_value(summary, keys).map(normalize_int).unwrap_or(0) };

    let record = BattleRecord {
        battle_timestamp,
        tier: text_field(summary, TIER_KEYS),
        wave: int_field(WAVE_KEYS),
        game_duration: text_field(summary, GAME_TIME_KEYS),
        real_duration: text_field(summary, REAL_TIME_KEYS),
        coin_earned: int_field(COIN_KEYS),
        coins_per_hour: int_field(COINS_PER_HOUR_KEYS),
        cells_earned: int_field(CELL_KEYS),
        reroll_shards_earned: int_field(REROLL_SHARD_KEYS),
        killer: text_field(summary, KILLER_KEYS),
        damage_dealt: text_field(&sections.combat, DAMAGE_DEALT_KEYS),
        damage_taken: text_field(&sections.combat, DAMAGE_TAKEN_KEYS),
        notes: None,
    };

    let Sections {
        combat,
        utility,
        enemy,
        bot_guardian,
        ..
    } = sections;

    ParsedReport {
        record,
        detail: BattleDetail {
            combat,
            utility,
            enemy,
            bot_guardian,
        },
        timestamp_fallback,
    }
}

fn tokenize(text: &str) -> Sections {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut sections = Sections::default();
    let mut current = Section::Summary;

    // Tabs are significant, so only other whitespace is trimmed.
    let lines = normalized
        .lines()
        .map(|l| l.trim_matches(|c: char| c.is_whitespace() && c != '\t'))
        .filter(|l| !l.is_empty());

    for line in lines {
        if let Some(section) = header_section(line) {
            current = section;
            continue;
        }
        match split_key_value(line, current) {
            Some((key, value)) => {
                sections.get_mut(current).insert(key, value);
            }
            None => tracing::debug!(line, "dropping report line without key/value"),
        }
    }
    sections
}

fn header_section(line: &str) -> Option<Section> {
    SECTION_HEADERS
        .iter()
        .find(|(label, _)| *label == line)
        .map(|(_, section)| *section)
}

fn compound_keys(section: Section) -> &'static [&'static str] {
    match section {
        Section::Summary => SUMMARY_COMPOUND_KEYS,
        _ => &[],
    }
}

// Tab split, then a known compound label, then the last whitespace.
fn split_key_value(line: &str, section: Section) -> Option<(String, String)> {
    let (key, value) = if line.contains('\t') {
        let mut fields = line.split('\t');
        let key = fields.next().unwrap_or_default();
        let value = fields.last().unwrap_or_default();
        (key, value)
    } else if let Some(pair) = split_compound_key(line, section) {
        pair
    } else {
        line.rsplit_once(char::is_whitespace)?
    };

    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn split_compound_key(line: &str, section: Section) -> Option<(&str, &str)> {
    compound_keys(section)
        .iter()
        .filter_map(|label| {
            let rest = line.strip_prefix(*label)?;
            (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some((*label, rest))
        })
        .max_by_key(|(label, _)| label.len())
}

fn first_value<'a>(map: &'a SectionMap, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| map.get(*key)).map(String::as_str)
}

/// Reads `"<month> <day>, <year> <hour>:<minute>"`, e.g. `"11월 20, 2025 17:36"`.
pub fn parse_battle_date(text: &str) -> Option<NaiveDateTime> {
    let mut tokens = text.split_whitespace();
    let month_token = tokens.next()?;
    let day_token = tokens.next()?.trim_end_matches(',');
    let year_token = tokens.next()?;
    let time_token = tokens.next()?;

    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_token)
        .map(|(_, number)| *number)?;
    let day: u32 = day_token.parse().ok()?;
    let year: i32 = year_token.parse().ok()?;

    let mut clock = time_token.split(':');
    let hour: u32 = clock.next()?.parse().ok()?;
    let minute: u32 = clock.next()?.parse().ok()?;
    let second: u32 = match clock.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::number::normalize;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    const SAMPLE: &str = "전투 보고서\n\
        전투 날짜\t11월 20, 2025 17:36\n\
        게임 시간\t1d 2h 3m 4s\n\
        실시간\t5h 6m 7s\n\
        티어\t11\n\
        웨이브\t1,234\n\
        처치자\t보스\n\
        코인 획득\t5.42B\n\
        시간당 코인\t1.05B\n\
        획득한 셀\t1,520\n\
        다시 뽑기 파편 획득함\t310\n\
        전투\n\
        입힌 대미지\t1.23q\n\
        받은 대미지\t45.6M\n\
        오브 대미지\t88.1T\n\
        유틸리티\n\
        회복 패키지\t12\n\
        적\n\
        기본\t3,456\n\
        새로운 적\t7\n\
        봇\n\
        화염 봇 대미지\t2.2B\n";

    #[test]
    fn test_tab_separated_sample() {
        let parsed = parse_report_at(SAMPLE, fixed_now());
        let record = &parsed.record;

        assert!(!parsed.timestamp_fallback);
        assert_eq!(
            record.battle_timestamp,
            NaiveDate::from_ymd_opt(2025, 11, 20)
                .unwrap()
                .and_hms_opt(17, 36, 0)
                .unwrap()
        );
        assert_eq!(record.tier, "11");
        assert_eq!(record.wave, 1234);
        assert_eq!(record.game_duration, "1d 2h 3m 4s");
        assert_eq!(record.real_duration, "5h 6m 7s");
        assert_eq!(record.killer, "보스");
        assert_eq!(record.coin_earned, normalize("5.42B").round() as i64);
        assert_eq!(record.coins_per_hour, 1_050_000_000);
        assert_eq!(record.cells_earned, 1520);
        assert_eq!(record.reroll_shards_earned, 310);
        assert_eq!(record.damage_dealt, "1.23q");
        assert_eq!(record.damage_taken, "45.6M");
        assert_eq!(record.notes, None);
    }

    #[test]
    fn test_sections_pass_through_verbatim() {
        let parsed = parse_report_at(SAMPLE, fixed_now());
        let detail = &parsed.detail;

        assert_eq!(detail.combat.len(), 3);
        assert_eq!(detail.combat.get("오브 대미지").map(String::as_str), Some("88.1T"));
        assert_eq!(detail.utility.get("회복 패키지").map(String::as_str), Some("12"));
        // Unknown keys are kept, not validated away.
        assert_eq!(detail.enemy.get("새로운 적").map(String::as_str), Some("7"));
        assert_eq!(
            detail.bot_guardian.get("화염 봇 대미지").map(String::as_str),
            Some("2.2B")
        );
        // Summary keys stay out of the detail sections.
        assert!(!detail.combat.contains_key("코인 획득"));
    }

    #[test]
    fn test_space_separated_scenario() {
        let text = "전투 날짜  11월 20, 2025 17:36\n코인 획득  5.42B\n웨이브  1234\n";
        let parsed = parse_report_at(text, fixed_now());

        assert_eq!(
            parsed.record.battle_timestamp.to_string(),
            "2025-11-20 17:36:00"
        );
        assert_eq!(parsed.record.wave, 1234);
        assert_eq!(parsed.record.coin_earned, 5_420_000_000);
    }

    #[test]
    fn test_compound_key_keeps_spaced_value() {
        let text = "게임 시간 1d 2h 3m\n처치자 Fast Boss\n";
        let parsed = parse_report_at(text, fixed_now());
        assert_eq!(parsed.record.game_duration, "1d 2h 3m");
        assert_eq!(parsed.record.killer, "Fast Boss");
    }

    #[test]
    fn test_last_whitespace_split_in_detail_section() {
        let text = "Combat\nDamage dealt 1.5q\nOrb Damage   3.2T\n";
        let parsed = parse_report_at(text, fixed_now());
        assert_eq!(parsed.record.damage_dealt, "1.5q");
        assert_eq!(
            parsed.detail.combat.get("Orb Damage").map(String::as_str),
            Some("3.2T")
        );
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        let text = "전투 날짜\t언젠가\n웨이브\t10\n";
        let parsed = parse_report_at(text, fixed_now());
        assert!(parsed.timestamp_fallback);
        assert_eq!(parsed.record.battle_timestamp, fixed_now());
        assert_eq!(parsed.record.wave, 10);
    }

    #[test]
    fn test_missing_date_and_garbage_never_panics() {
        let parsed = parse_report_at("\n\n  \nnonsense\n\t\n", fixed_now());
        assert!(parsed.timestamp_fallback);
        assert_eq!(parsed.record.coin_earned, 0);
        assert_eq!(parsed.record.tier, "");
        assert!(parsed.detail.combat.is_empty());
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let text = "전투\n오브 대미지\t1\n오브 대미지\t2\n";
        let parsed = parse_report_at(text, fixed_now());
        assert_eq!(parsed.detail.combat.get("오브 대미지").map(String::as_str), Some("2"));
        assert_eq!(parsed.detail.combat.len(), 1);
    }

    #[test]
    fn test_windows_line_endings_and_empty_values() {
        let text = "전투\r\n오브 대미지\t\r\n가시 대미지\t4k\r\n";
        let parsed = parse_report_at(text, fixed_now());
        assert_eq!(parsed.detail.combat.len(), 1);
        assert_eq!(parsed.detail.combat.get("가시 대미지").map(String::as_str), Some("4k"));
    }

    #[test]
    fn test_parse_battle_date_variants() {
        assert_eq!(
            parse_battle_date("Nov 20, 2025 17:36").map(|d| d.to_string()),
            Some("2025-11-20 17:36:00".to_string())
        );
        assert_eq!(
            parse_battle_date("1월 5, 2024 09:07:30").map(|d| d.to_string()),
            Some("2024-01-05 09:07:30".to_string())
        );
        assert!(parse_battle_date("13월 5, 2024 09:07").is_none());
        assert!(parse_battle_date("2월 30, 2024 09:07").is_none());
        assert!(parse_battle_date("11월 20, 2025").is_none());
    }

    #[test]
    fn test_tab_split_takes_first_and_last_field() {
        let text = "전투\n오브 대미지\t\t88.1T\na\tb\tc\n가시 대미지\t4k\t\n";
        let parsed = parse_report_at(text, fixed_now());
        let combat = &parsed.detail.combat;

        assert_eq!(combat.get("오브 대미지").map(String::as_str), Some("88.1T"));
        assert_eq!(combat.get("a").map(String::as_str), Some("c"));
        // A trailing tab leaves an empty last field, so the line is dropped.
        assert!(!combat.contains_key("가시 대미지"));
        assert_eq!(combat.len(), 2);
    }

    #[test]
    fn test_header_aliases_share_a_section() {
        let text = "봇\n화염 봇 대미지\t2.2B\n번개 봇 대미지\t1B\n\
                    가디언\n가디언 대미지\t9M\n번개 봇 대미지\t3B\n\
                    적\n기본\t10\n\
                    파괴된 적\n보스\t2\n";
        let parsed = parse_report_at(text, fixed_now());
        let bots = &parsed.detail.bot_guardian;

        assert_eq!(bots.get("화염 봇 대미지").map(String::as_str), Some("2.2B"));
        assert_eq!(bots.get("가디언 대미지").map(String::as_str), Some("9M"));
        // Repeated under the second header: last write wins.
        assert_eq!(bots.get("번개 봇 대미지").map(String::as_str), Some("3B"));
        assert_eq!(bots.len(), 3);

        let enemy = &parsed.detail.enemy;
        assert_eq!(enemy.get("기본").map(String::as_str), Some("10"));
        assert_eq!(enemy.get("보스").map(String::as_str), Some("2"));
    }
}
