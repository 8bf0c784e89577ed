use rand::Rng;

use crate::constants::{min_city_separation, MAX_END_CITY_RESAMPLES};
use crate::coords::{calculate_distance, within_range};
use crate::types::{GeoCity, MapBounds};

#[derive(Clone, Debug)]
pub struct RoutePick {
    pub start: GeoCity,
    pub end: GeoCity,
    /// False when no draw cleared the minimum separation and the farthest
    /// city was used instead.
    pub separated: bool,
}

/// Picks a random start city and an end city far enough from it. Returns
/// `None` when the pool has fewer than two distinct locations.
pub fn pick_route<R: Rng>(
    pool: &[GeoCity],
    bounds: &MapBounds,
    rng: &mut R,
) -> Option<RoutePick> {
    if pool.is_empty() {
        return None;
    }
    let start = &pool[rng.random_range(0..pool.len())];
    let min_distance = min_city_separation(bounds.lat_span());

    for _ in 0..MAX_END_CITY_RESAMPLES {
        let end = &pool[rng.random_range(0..pool.len())];
        if !within_range(start.lat, start.lng, end.lat, end.lng, min_distance) {
            return Some(RoutePick {
                start: start.clone(),
                end: end.clone(),
                separated: true,
            });
        }
    }

    let end = farthest_from(start, pool)?;
    Some(RoutePick {
        start: start.clone(),
        end: end.clone(),
        separated: false,
    })
}

/// Pool city farthest from `start` by raw distance, first one on ties.
/// `None` when every city sits on `start`.
fn farthest_from<'a>(start: &GeoCity, pool: &'a [GeoCity]) -> Option<&'a GeoCity> {
    let mut farthest: Option<(&GeoCity, f64)> = None;
    for city in pool {
        let distance = calculate_distance(start.lat, start.lng, city.lat, city.lng);
        if farthest.map(|(_, best)| distance > best).unwrap_or(true) {
            farthest = Some((city, distance));
        }
    }
    farthest
        .filter(|(_, distance)| *distance > 0.0)
        .map(|(city, _)| city)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> MapBounds {
        MapBounds {
            lat_min: 0.0,
            lat_max: 12.0,
            lng_min: 0.0,
            lng_max: 12.0,
        }
    }

    fn spread_pool() -> Vec<GeoCity> {
        (0..12)
            .map(|idx| GeoCity::new(&format!("city-{idx}"), idx as f64, idx as f64))
            .collect()
    }

    #[test]
    fn picked_cities_clear_minimum_separation() {
        let pool = spread_pool();
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pick = pick_route(&pool, &bounds(), &mut rng).expect("pool is large enough");
            assert!(pick.separated);
            let distance =
                calculate_distance(pick.start.lat, pick.start.lng, pick.end.lat, pick.end.lng);
            assert!(distance > 2.0, "seed {seed} picked {distance}");
        }
    }

    #[test]
    fn same_seed_picks_same_route() {
        let pool = spread_pool();
        let a = pick_route(&pool, &bounds(), &mut StdRng::seed_from_u64(7)).expect("pick");
        let b = pick_route(&pool, &bounds(), &mut StdRng::seed_from_u64(7)).expect("pick");
        assert_eq!(a.start, b.start);
        assert_eq!(a.end, b.end);
    }

    #[test]
    fn clustered_pool_falls_back_to_farthest_city() {
        // All within the 2.0 separation. From a or b the farthest is c; from c,
        // a and b tie and a comes first.
        let pool = vec![
            GeoCity::new("a", 1.0, 1.0),
            GeoCity::new("b", 1.0, 1.0),
            GeoCity::new("c", 1.5, 1.0),
        ];
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pick = pick_route(&pool, &bounds(), &mut rng).expect("distinct cities exist");
            assert!(!pick.separated);
            let expected = if pick.start.name == "c" { "a" } else { "c" };
            assert_eq!(pick.end.name, expected, "seed {seed}");
        }
    }

    #[test]
    fn farthest_city_prefers_first_on_ties() {
        let start = GeoCity::new("start", 0.0, 0.0);
        let pool = vec![
            GeoCity::new("near", 0.0, 0.5),
            GeoCity::new("north", 1.0, 0.0),
            GeoCity::new("east", 0.0, 1.0),
            start.clone(),
        ];
        assert_eq!(
            farthest_from(&start, &pool).map(|city| city.name.as_str()),
            Some("north")
        );
        assert!(farthest_from(&start, &[start.clone()]).is_none());
    }

    #[test]
    fn degenerate_pools_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pick_route(&[], &bounds(), &mut rng).is_none());
        let single = vec![GeoCity::new("only", 3.0, 3.0), GeoCity::new("dup", 3.0, 3.0)];
        assert!(pick_route(&single, &bounds(), &mut rng).is_none());
    }
}
