use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::session::RadiusUpdate;
use crate::types::{GameSnapshot, GeoCity, MapConfig, Viewport};

#[derive(Debug, Deserialize)]
pub struct StartGameRequest {
    pub map: String,
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub query: String,
    pub viewport: Viewport,
}

#[derive(Debug, Deserialize)]
pub struct RadiusRequest {
    pub radius: Option<f64>,
    pub modifier: Option<f64>,
}

impl RadiusRequest {
    /// Exactly one of `radius` and `modifier` must be present.
    pub fn into_update(self) -> Option<RadiusUpdate> {
        match (self.radius, self.modifier) {
            (Some(radius), None) => Some(RadiusUpdate::Absolute(radius)),
            (None, Some(modifier)) => Some(RadiusUpdate::Modifier(modifier)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StartGameResponse {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "startCity")]
    pub start_city: GeoCity,
    #[serde(rename = "endCity")]
    pub end_city: GeoCity,
    pub snapshot: GameSnapshot,
}

#[derive(Clone, Debug, Serialize)]
pub struct MapListResponse {
    pub maps: Vec<MapConfig>,
}

pub fn error_body(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
    })
}
