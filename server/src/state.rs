use crate::config::Config;
use crate::db::Db;
use crate::services::cache::{Clock, StatsCache, TtlCache};
use crate::services::notify::Notifier;
use std::sync::Arc;

/// Everything a request needs, shared across workers.
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub cache: Arc<dyn StatsCache>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Db, config: Config, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::seconds(config.stats_cache_ttl_secs);
        let cache = Arc::new(TtlCache::new(ttl, clock.clone()));
        AppState {
            db,
            config,
            cache,
            notifier,
            clock,
        }
    }
}
