use crate::coords::{selection_distance, to_city_point};
use crate::types::{CityPoint, GeoCity, MapConfig};

#[derive(Clone, Debug)]
pub enum ResolveOutcome {
    NoMatch {
        query: String,
    },
    AlreadyHere {
        query: String,
    },
    /// `end_candidate` is set when any eligible hit sits on the end point,
    /// even if it is not the nearest one.
    Selected {
        candidate: CityPoint,
        end_candidate: bool,
    },
}

pub fn resolve(
    query: &str,
    cities: &[GeoCity],
    map: &MapConfig,
    current: &CityPoint,
    end: &CityPoint,
) -> ResolveOutcome {
    if cities.is_empty() {
        return ResolveOutcome::NoMatch {
            query: query.to_string(),
        };
    }

    let mut closest: Option<(CityPoint, f64)> = None;
    let mut end_candidate = false;

    for city in cities.iter().map(|city| to_city_point(&map.bounds, city)) {
        if city.same_point(current) {
            continue;
        }
        if city.same_point(end) {
            end_candidate = true;
        }

        let distance = selection_distance(&city, current);
        let closer = closest
            .as_ref()
            .map(|(_, best)| distance < *best)
            .unwrap_or(true);
        if closer {
            closest = Some((city, distance));
        }
    }

    match closest {
        Some((candidate, _)) => ResolveOutcome::Selected {
            candidate,
            end_candidate,
        },
        None => ResolveOutcome::AlreadyHere {
            query: query.to_string(),
        },
    }
}
