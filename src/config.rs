use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::constants::{
    DEFAULT_CITY_POOL_SIZE, DEFAULT_FINISHED_SESSION_TTL_SECS, DEFAULT_GEOCODER_TIMEOUT_MS,
    DEFAULT_GEONAMES_BASE_URL, DEFAULT_GEONAMES_USERNAME, DEFAULT_MAP_LIST_PATH, DEFAULT_PORT,
    DEFAULT_SESSION_IDLE_TTL_SECS,
};

/// Server settings read from the environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub map_list_path: PathBuf,
    pub geonames_base_url: String,
    pub geonames_username: String,
    pub geocoder_timeout: Duration,
    pub city_pool_size: u32,
    pub session_idle_ttl: Duration,
    pub finished_session_ttl: Duration,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self {
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            map_list_path: lookup("MAP_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_LIST_PATH)),
            geonames_base_url: lookup("GEONAMES_BASE_URL")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEONAMES_BASE_URL.to_string()),
            geonames_username: lookup("GEONAMES_USERNAME")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEONAMES_USERNAME.to_string()),
            geocoder_timeout: Duration::from_millis(
                lookup("GEOCODER_TIMEOUT_MS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .filter(|ms| *ms > 0)
                    .unwrap_or(DEFAULT_GEOCODER_TIMEOUT_MS),
            ),
            city_pool_size: lookup("CITY_POOL_SIZE")
                .and_then(|value| value.parse::<u32>().ok())
                .filter(|size| *size > 1)
                .unwrap_or(DEFAULT_CITY_POOL_SIZE),
            session_idle_ttl: Duration::from_secs(
                lookup("SESSION_IDLE_TTL_SECS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_SESSION_IDLE_TTL_SECS),
            ),
            finished_session_ttl: Duration::from_secs(
                lookup("FINISHED_SESSION_TTL_SECS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_FINISHED_SESSION_TTL_SECS),
            ),
            static_dir: lookup("STATIC_DIR").map(PathBuf::from),
        };
        config.log_summary();
        config
    }

    fn log_summary(&self) {
        info!(
            port = self.port,
            map_list = %self.map_list_path.display(),
            geonames = %self.geonames_base_url,
            timeout_ms = self.geocoder_timeout.as_millis() as u64,
            pool = self.city_pool_size,
            idle_ttl_secs = self.session_idle_ttl.as_secs(),
            finished_ttl_secs = self.finished_session_ttl.as_secs(),
            "server config"
        );
    }
}
