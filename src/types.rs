use serde::{Deserialize, Serialize};

/// Geographic bounding box of a playable map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    #[serde(rename = "latMin")]
    pub lat_min: f64,
    #[serde(rename = "latMax")]
    pub lat_max: f64,
    #[serde(rename = "lngMin")]
    pub lng_min: f64,
    #[serde(rename = "lngMax")]
    pub lng_max: f64,
}

impl MapBounds {
    pub fn is_valid(&self) -> bool {
        [self.lat_min, self.lat_max, self.lng_min, self.lng_max]
            .iter()
            .all(|value| value.is_finite())
            && self.lat_min < self.lat_max
            && self.lng_min < self.lng_max
    }

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn lng_span(&self) -> f64 {
        self.lng_max - self.lng_min
    }
}

/// One entry of the map list. The bounds are flattened so the JSON file keeps
/// `latMin`/`latMax`/`lngMin`/`lngMax` at the top level of each map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub name: String,
    #[serde(flatten)]
    pub bounds: MapBounds,
    #[serde(rename = "searchRadius")]
    pub search_radius: f64,
    #[serde(
        rename = "countryCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub country_code: Option<String>,
    #[serde(
        rename = "featureCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_code: Option<String>,
}

impl MapConfig {
    /// Reason the map cannot be played on, if any.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is empty");
        }
        if !self.bounds.is_valid() {
            return Err("bounds must satisfy latMin < latMax and lngMin < lngMax");
        }
        if !self.search_radius.is_finite() || self.search_radius <= 0.0 {
            return Err("searchRadius must be positive");
        }
        Ok(())
    }
}

/// Raw geocoder hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCity {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl GeoCity {
    pub fn new(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lng,
        }
    }
}

/// Map-relative position. `x` grows eastward and `y` grows northward, both
/// spanning [0, 1] inside the bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CityPoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub lat: f64,
    pub lng: f64,
}

impl CityPoint {
    /// Two cities are the same point when their projections coincide,
    /// whatever their names.
    pub fn same_point(&self, other: &CityPoint) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// Pixel size of the surface the map is drawn on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuessEvent {
    NoMatch {
        query: String,
    },
    AlreadyHere {
        query: String,
    },
    Moved {
        city: CityPoint,
    },
    TooFar {
        city: CityPoint,
    },
    Won {
        city: CityPoint,
        #[serde(rename = "citiesVisited")]
        cities_visited: usize,
    },
    Ignored,
}

impl GuessEvent {
    pub fn tagline(&self) -> String {
        match self {
            Self::NoMatch { query } => format!("{query} ???"),
            Self::AlreadyHere { query } => format!("Already in {query}"),
            Self::Moved { city } => city.name.clone(),
            Self::TooFar { city } => format!("{} is too far!", city.name),
            Self::Won { .. } => "You win!".to_string(),
            Self::Ignored => "Game over".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoMatch { .. } => "no_match",
            Self::AlreadyHere { .. } => "already_here",
            Self::Moved { .. } => "moved",
            Self::TooFar { .. } => "too_far",
            Self::Won { .. } => "won",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSnapshot {
    #[serde(rename = "mapName")]
    pub map_name: String,
    #[serde(rename = "currentPoint")]
    pub current_point: CityPoint,
    #[serde(rename = "endPoint")]
    pub end_point: CityPoint,
    #[serde(rename = "pastPoints")]
    pub past_points: Vec<CityPoint>,
    #[serde(rename = "farPoints")]
    pub far_points: Vec<CityPoint>,
    #[serde(rename = "searchRadius")]
    pub search_radius: f64,
    #[serde(rename = "baseSearchRadius")]
    pub base_search_radius: f64,
    #[serde(rename = "hasWon")]
    pub has_won: bool,
    #[serde(rename = "guessCount")]
    pub guess_count: u32,
    #[serde(rename = "citiesVisited", skip_serializing_if = "Option::is_none")]
    pub cities_visited: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GuessReport {
    pub event: GuessEvent,
    pub tagline: String,
    pub snapshot: GameSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_config_reads_flat_camel_case_json() {
        let raw = r#"{
  "name": "sweden",
  "latMin": 55.0,
  "latMax": 69.0,
  "lngMin": 11.0,
  "lngMax": 24.0,
  "searchRadius": 40,
  "countryCode": "SE"
}"#;
        let map: MapConfig = serde_json::from_str(raw).expect("map parses");
        assert_eq!(map.name, "sweden");
        assert_eq!(map.bounds.lat_max, 69.0);
        assert_eq!(map.search_radius, 40.0);
        assert_eq!(map.country_code.as_deref(), Some("SE"));
        assert_eq!(map.feature_code, None);
    }

    #[test]
    fn bounds_validity_requires_ordered_finite_edges() {
        let ok = MapBounds {
            lat_min: 0.0,
            lat_max: 10.0,
            lng_min: 0.0,
            lng_max: 10.0,
        };
        assert!(ok.is_valid());
        assert!(!MapBounds { lat_max: 0.0, ..ok }.is_valid());
        assert!(!MapBounds {
            lng_min: f64::NAN,
            ..ok
        }
        .is_valid());
    }

    #[test]
    fn same_point_ignores_names() {
        let a = CityPoint {
            name: "A".to_string(),
            x: 0.5,
            y: 0.5,
            lat: 5.0,
            lng: 5.0,
        };
        let b = CityPoint {
            name: "B".to_string(),
            ..a.clone()
        };
        assert!(a.same_point(&b));
    }

    #[test]
    fn taglines_match_event_kind() {
        let city = CityPoint {
            name: "Lund".to_string(),
            x: 0.1,
            y: 0.1,
            lat: 55.7,
            lng: 13.2,
        };
        assert_eq!(
            GuessEvent::NoMatch {
                query: "Xyz".to_string()
            }
            .tagline(),
            "Xyz ???"
        );
        assert_eq!(
            GuessEvent::AlreadyHere {
                query: "Lund".to_string()
            }
            .tagline(),
            "Already in Lund"
        );
        assert_eq!(
            GuessEvent::TooFar { city: city.clone() }.tagline(),
            "Lund is too far!"
        );
        assert_eq!(GuessEvent::Moved { city }.tagline(), "Lund");
    }

    #[test]
    fn viewport_rejects_zero_and_non_finite() {
        assert!(Viewport::new(800.0, 600.0).is_valid());
        assert!(!Viewport::new(0.0, 600.0).is_valid());
        assert!(!Viewport::new(800.0, f64::INFINITY).is_valid());
    }
}
