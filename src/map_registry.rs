use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::types::MapConfig;

#[derive(Debug, Error)]
pub enum MapRegistryError {
    #[error("failed to read map list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map list: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("map '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },
    #[error("unknown map '{0}'")]
    UnknownMap(String),
}

/// Maps available to play, in file order.
#[derive(Clone, Debug)]
pub struct MapRegistry {
    maps: Vec<MapConfig>,
}

impl MapRegistry {
    pub fn load(path: &Path) -> Result<Self, MapRegistryError> {
        let text = fs::read_to_string(path).map_err(|source| MapRegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&text)?;
        info!(path = %path.display(), maps = registry.maps.len(), "loaded map list");
        Ok(registry)
    }

    pub fn from_json(text: &str) -> Result<Self, MapRegistryError> {
        let maps: Vec<MapConfig> = serde_json::from_str(text)?;
        Self::from_maps(maps)
    }

    pub fn from_maps(maps: Vec<MapConfig>) -> Result<Self, MapRegistryError> {
        let mut seen = HashSet::new();
        for map in &maps {
            validate_map(map)?;
            if !seen.insert(map.name.as_str()) {
                return Err(invalid(map, "duplicate map name"));
            }
        }
        Ok(Self { maps })
    }

    pub fn get(&self, name: &str) -> Result<&MapConfig, MapRegistryError> {
        self.maps
            .iter()
            .find(|map| map.name == name)
            .ok_or_else(|| MapRegistryError::UnknownMap(name.to_string()))
    }

    pub fn maps(&self) -> &[MapConfig] {
        &self.maps
    }
}

fn validate_map(map: &MapConfig) -> Result<(), MapRegistryError> {
    map.check().map_err(|reason| invalid(map, reason))
}

fn invalid(map: &MapConfig, reason: &str) -> MapRegistryError {
    MapRegistryError::Invalid {
        name: map.name.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_LIST: &str = r#"[
  {
    "name": "sweden",
    "latMin": 55.3,
    "latMax": 69.1,
    "lngMin": 10.9,
    "lngMax": 24.2,
    "searchRadius": 40,
    "countryCode": "SE"
  },
  {
    "name": "europe",
    "latMin": 35.0,
    "latMax": 71.0,
    "lngMin": -11.0,
    "lngMax": 40.0,
    "searchRadius": 25
  }
]"#;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("mapList.json")
    }

    #[test]
    fn lookup_by_name() {
        let registry = MapRegistry::from_json(MAP_LIST).expect("valid list");
        assert_eq!(registry.maps().len(), 2);
        let europe = registry.get("europe").expect("europe exists");
        assert_eq!(europe.search_radius, 25.0);
        assert!(matches!(
            registry.get("mars"),
            Err(MapRegistryError::UnknownMap(name)) if name == "mars"
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let raw = r#"[{"name":"bad","latMin":10,"latMax":0,"lngMin":0,"lngMax":10,"searchRadius":5}]"#;
        assert!(matches!(
            MapRegistry::from_json(raw),
            Err(MapRegistryError::Invalid { name, .. }) if name == "bad"
        ));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let raw = r#"[{"name":"flat","latMin":0,"latMax":1,"lngMin":0,"lngMax":1,"searchRadius":0}]"#;
        assert!(matches!(
            MapRegistry::from_json(raw),
            Err(MapRegistryError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_fields_fail_to_parse() {
        let raw = r#"[{"name":"partial","latMin":0,"latMax":1}]"#;
        assert!(matches!(
            MapRegistry::from_json(raw),
            Err(MapRegistryError::Parse(_))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let raw = r#"[
  {"name":"a","latMin":0,"latMax":1,"lngMin":0,"lngMax":1,"searchRadius":5},
  {"name":"a","latMin":0,"latMax":2,"lngMin":0,"lngMax":2,"searchRadius":5}
]"#;
        assert!(matches!(
            MapRegistry::from_json(raw),
            Err(MapRegistryError::Invalid { .. })
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let path = temp_file("map-registry-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, MAP_LIST).expect("write file");

        let registry = MapRegistry::load(&path).expect("file loads");
        assert!(registry.get("sweden").is_ok());

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);

        assert!(matches!(
            MapRegistry::load(&path),
            Err(MapRegistryError::Read { .. })
        ));
    }
}
