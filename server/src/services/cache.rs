//! Per-owner cache for computed stats, keyed `"{owner}:{kind}:{yesterday}"`.

use crate::models::stats::{DailyStatsResponse, WeeklyStatsResponse};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsSnapshot {
    Daily(DailyStatsResponse),
    Weekly(WeeklyStatsResponse),
}

pub trait StatsCache: Send + Sync {
    fn get(&self, key: &str) -> Option<StatsSnapshot>;
    fn set(&self, key: String, value: StatsSnapshot);
    fn invalidate_prefix(&self, prefix: &str);
}

pub fn owner_prefix(owner_id: i64) -> String {
    // Trailing separator keeps owner 1 from matching owner 10.
    format!("{owner_id}:")
}

pub fn stats_key(owner_id: i64, kind: &str, yesterday: NaiveDate) -> String {
    format!("{}{kind}:{}", owner_prefix(owner_id), yesterday.format("%Y-%m-%d"))
}

pub struct TtlCache {
    entries: Mutex<HashMap<String, (DateTime<Utc>, StatsSnapshot)>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, (DateTime<Utc>, StatsSnapshot)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsCache for TtlCache {
    fn get(&self, key: &str) -> Option<StatsSnapshot> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some((expires_at, value)) if *expires_at > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: String, value: StatsSnapshot) {
        let now = self.clock.now();
        let mut entries = self.entries();
        // Keys roll over daily, so stale ones are never read again.
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(key, (now + self.ttl, value));
    }

    fn invalidate_prefix(&self, prefix: &str) {
        self.entries().retain(|key, _| !key.starts_with(prefix));
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot::Daily(DailyStatsResponse {
            daily_stats: Vec::new(),
        })
    }

    fn cache_with_clock() -> (TtlCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 11, 21, 12, 0, 0).unwrap(),
        ));
        (TtlCache::new(Duration::minutes(10), clock.clone()), clock)
    }

    #[test]
    fn test_entries_expire() {
        let (cache, clock) = cache_with_clock();
        cache.set("1:daily:2025-11-20".into(), snapshot());
        assert!(cache.get("1:daily:2025-11-20").is_some());

        clock.advance(Duration::minutes(9));
        assert!(cache.get("1:daily:2025-11-20").is_some());

        clock.advance(Duration::minutes(2));
        assert!(cache.get("1:daily:2025-11-20").is_none());
    }

    #[test]
    fn test_invalidate_prefix_is_owner_scoped() {
        let (cache, _) = cache_with_clock();
        let day = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        cache.set(stats_key(1, "daily", day), snapshot());
        cache.set(stats_key(1, "weekly", day), snapshot());
        cache.set(stats_key(10, "daily", day), snapshot());

        cache.invalidate_prefix(&owner_prefix(1));

        assert!(cache.get(&stats_key(1, "daily", day)).is_none());
        assert!(cache.get(&stats_key(1, "weekly", day)).is_none());
        assert!(cache.get(&stats_key(10, "daily", day)).is_some());
    }

    #[test]
    fn test_read_only_owners_do_not_accumulate_past_days() {
        let (cache, clock) = cache_with_clock();
        let start = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        for day in 0..30 {
            let yesterday = start + Duration::days(day);
            for owner in 1..=5 {
                let key = stats_key(owner, "daily", yesterday);
                if cache.get(&key).is_none() {
                    cache.set(key, snapshot());
                }
            }
            clock.advance(Duration::days(1));
        }
        // Only the last day's entries survive.
        assert_eq!(cache.entries().len(), 5);
        assert!(cache
            .entries()
            .keys()
            .all(|key| key.ends_with(&(start + Duration::days(29)).to_string())));
    }

    #[test]
    fn test_stats_key_format() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(stats_key(7, "weekly", day), "7:weekly:2025-01-05");
    }
}
