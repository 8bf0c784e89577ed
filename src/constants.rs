/// Start and end cities must be farther apart than `lat_span / MIN_SEPARATION_DIVISOR`.
pub const MIN_SEPARATION_DIVISOR: f64 = 6.0;
pub const MAX_END_CITY_RESAMPLES: usize = 64;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAP_LIST_PATH: &str = "public/mapList.json";
pub const DEFAULT_GEONAMES_BASE_URL: &str = "http://api.geonames.org";
pub const DEFAULT_GEONAMES_USERNAME: &str = "demo";
pub const DEFAULT_GEOCODER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CITY_POOL_SIZE: u32 = 500;
pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_FINISHED_SESSION_TTL_SECS: u64 = 5 * 60;
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

pub const SEARCH_MAX_ROWS: u32 = 100;
pub const MAX_QUERY_CHARS: usize = 64;

pub const MIN_RADIUS_MODIFIER: f64 = 0.25;
pub const MAX_RADIUS_MODIFIER: f64 = 4.0;

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 800.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 600.0;

pub fn min_city_separation(lat_span: f64) -> f64 {
    lat_span / MIN_SEPARATION_DIVISOR
}
