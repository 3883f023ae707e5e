use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub slack_webhook_url: Option<String>,
    /// Every Nth stored report triggers a notification.
    pub notify_every: i64,
    pub stats_cache_ttl_secs: i64,
    pub token_ttl_minutes: i64,
    /// Reject reports whose battle date cannot be read instead of stamping them with the current time.
    pub reject_undated_reports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: "tower-reports.db".into(),
            host: "0.0.0.0".into(),
            port: 8000,
            slack_webhook_url: None,
            notify_every: 10,
            stats_cache_ttl_secs: 600,
            token_ttl_minutes: 60 * 24 * 7,
            reject_undated_reports: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        Config {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            slack_webhook_url: lookup("SLACK_WEBHOOK_URL").filter(|url| !url.trim().is_empty()),
            notify_every: parse_or(&lookup, "NOTIFY_EVERY", defaults.notify_every).max(1),
            stats_cache_ttl_secs: parse_or(
                &lookup,
                "STATS_CACHE_TTL_SECS",
                defaults.stats_cache_ttl_secs,
            ),
            token_ttl_minutes: parse_or(&lookup, "TOKEN_TTL_MINUTES", defaults.token_ttl_minutes),
            reject_undated_reports: parse_or(
                &lookup,
                "REJECT_UNDATED_REPORTS",
                defaults.reject_undated_reports,
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            default
        }),
        None => default,
    }
}
