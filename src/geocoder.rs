use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::SEARCH_MAX_ROWS;
use crate::types::{GeoCity, MapConfig};

#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("geocoder error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeocoderError {
    fn from(err: reqwest::Error) -> Self {
        GeocoderError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GeocoderError {
    fn from(err: serde_json::Error) -> Self {
        GeocoderError::Parse(err.to_string())
    }
}

/// City lookup used by the game. Both calls are scoped to a map so the
/// backend can restrict results to its country and bounding box.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, map: &MapConfig, query: &str) -> Result<Vec<GeoCity>, GeocoderError>;

    /// Pool of cities to draw start and end cities from.
    async fn sample_cities(&self, map: &MapConfig) -> Result<Vec<GeoCity>, GeocoderError>;
}

// --- GeoNames ---

#[derive(Debug, Deserialize)]
struct GeoNamesResponse {
    #[serde(default)]
    geonames: Vec<GeoNamesCity>,
    status: Option<GeoNamesStatus>,
}

#[derive(Debug, Deserialize)]
struct GeoNamesStatus {
    message: String,
    value: u16,
}

#[derive(Debug, Deserialize)]
struct GeoNamesCity {
    name: String,
    lat: Coordinate,
    lng: Coordinate,
}

/// GeoNames sends coordinates as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(raw) => raw.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

pub struct GeoNamesClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    pool_size: u32,
}

impl GeoNamesClient {
    pub fn new(base_url: &str, username: &str, pool_size: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            pool_size,
        }
    }

    async fn fetch(&self, params: Vec<(&str, String)>) -> Result<Vec<GeoCity>, GeocoderError> {
        let url = format!("{}/searchJSON", self.base_url);
        let resp = self.client.get(&url).query(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeocoderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        parse_geonames(&text)
    }
}

fn map_params(map: &MapConfig, username: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("featureClass", "P".to_string()),
        ("north", map.bounds.lat_max.to_string()),
        ("south", map.bounds.lat_min.to_string()),
        ("east", map.bounds.lng_max.to_string()),
        ("west", map.bounds.lng_min.to_string()),
        ("username", username.to_string()),
    ];
    if let Some(country) = &map.country_code {
        params.push(("country", country.clone()));
    }
    if let Some(feature_code) = &map.feature_code {
        params.push(("featureCode", feature_code.clone()));
    }
    params
}

fn parse_geonames(text: &str) -> Result<Vec<GeoCity>, GeocoderError> {
    let parsed: GeoNamesResponse = serde_json::from_str(text)?;
    // GeoNames reports quota and auth failures in the body of a 200.
    if let Some(status) = parsed.status {
        return Err(GeocoderError::Api {
            status: status.value,
            message: status.message,
        });
    }

    let mut cities = Vec::with_capacity(parsed.geonames.len());
    for raw in parsed.geonames {
        match (raw.lat.value(), raw.lng.value()) {
            (Some(lat), Some(lng)) => cities.push(GeoCity {
                name: raw.name,
                lat,
                lng,
            }),
            _ => warn!(name = %raw.name, "skipping geonames row with bad coordinates"),
        }
    }
    Ok(cities)
}

#[async_trait]
impl Geocoder for GeoNamesClient {
    async fn search(&self, map: &MapConfig, query: &str) -> Result<Vec<GeoCity>, GeocoderError> {
        let mut params = map_params(map, &self.username);
        params.push(("q", query.to_string()));
        params.push(("isNameRequired", "true".to_string()));
        params.push(("maxRows", SEARCH_MAX_ROWS.to_string()));
        let cities = self.fetch(params).await?;
        debug!(map = %map.name, query, hits = cities.len(), "geonames search");
        Ok(cities)
    }

    async fn sample_cities(&self, map: &MapConfig) -> Result<Vec<GeoCity>, GeocoderError> {
        let mut params = map_params(map, &self.username);
        params.push(("orderby", "population".to_string()));
        params.push(("maxRows", self.pool_size.to_string()));
        let cities = self.fetch(params).await?;
        debug!(map = %map.name, pool = cities.len(), "geonames city pool");
        Ok(cities)
    }
}

// --- In-memory ---

/// Fixed city list. Names match case-insensitively after trimming; only
/// cities inside the map bounds are visible.
#[derive(Clone, Debug, Default)]
pub struct StaticGeocoder {
    cities: Vec<GeoCity>,
}

impl StaticGeocoder {
    pub fn new(cities: Vec<GeoCity>) -> Self {
        Self { cities }
    }

    pub fn load(path: &Path) -> Result<Self, GeocoderError> {
        let text = fs::read_to_string(path)
            .map_err(|error| GeocoderError::Parse(format!("{}: {error}", path.display())))?;
        let cities: Vec<GeoCity> = serde_json::from_str(&text)?;
        Ok(Self::new(cities))
    }

    fn in_bounds<'a>(&'a self, map: &'a MapConfig) -> impl Iterator<Item = &'a GeoCity> + 'a {
        let bounds = map.bounds;
        self.cities.iter().filter(move |city| {
            city.lat >= bounds.lat_min
                && city.lat <= bounds.lat_max
                && city.lng >= bounds.lng_min
                && city.lng <= bounds.lng_max
        })
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn search(&self, map: &MapConfig, query: &str) -> Result<Vec<GeoCity>, GeocoderError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .in_bounds(map)
            .filter(|city| city.name.trim().to_lowercase() == needle)
            .cloned()
            .collect())
    }

    async fn sample_cities(&self, map: &MapConfig) -> Result<Vec<GeoCity>, GeocoderError> {
        Ok(self.in_bounds(map).cloned().collect())
    }
}
