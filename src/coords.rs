//! Projection from latitude/longitude into map-relative coordinates and the
//! two distance notions the game uses.
//!
//! Selection distance ranks candidates and works on raw degrees. Range
//! distance decides whether a move is accepted and works on projected
//! coordinates scaled to the viewport in pixels, the same space the search
//! radius is drawn in.

use crate::types::{CityPoint, GeoCity, MapBounds, ScreenPoint, Viewport};

/// `y` grows with latitude, so north is `y = 1`. A renderer drawing with a
/// top-left origin flips it (`screen_y = (1 - y) * height`). Range checks are
/// unaffected by the flip. Points outside the bounds are not clamped.
pub fn project(bounds: &MapBounds, lat: f64, lng: f64) -> ScreenPoint {
    ScreenPoint {
        x: (lng - bounds.lng_min) / bounds.lng_span(),
        y: (lat - bounds.lat_min) / bounds.lat_span(),
    }
}

pub fn to_city_point(bounds: &MapBounds, city: &GeoCity) -> CityPoint {
    let point = project(bounds, city.lat, city.lng);
    CityPoint {
        name: city.name.clone(),
        x: point.x,
        y: point.y,
        lat: city.lat,
        lng: city.lng,
    }
}

/// Planar distance between raw coordinates. Only for ranking candidates.
pub fn calculate_distance(y1: f64, x1: f64, y2: f64, x2: f64) -> f64 {
    ((y1 - y2).powi(2) + (x1 - x2).powi(2)).sqrt()
}

/// Inputs must already be in the unit of `radius`. The boundary counts as
/// inside.
pub fn within_range(y1: f64, x1: f64, y2: f64, x2: f64, radius: f64) -> bool {
    calculate_distance(y1, x1, y2, x2) <= radius
}

pub fn selection_distance(a: &CityPoint, b: &CityPoint) -> f64 {
    calculate_distance(a.lat, a.lng, b.lat, b.lng)
}

pub fn points_within_radius(
    a: &CityPoint,
    b: &CityPoint,
    viewport: Viewport,
    radius: f64,
) -> bool {
    within_range(
        a.y * viewport.height,
        a.x * viewport.width,
        b.y * viewport.height,
        b.x * viewport.width,
        radius,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> MapBounds {
        MapBounds {
            lat_min: 0.0,
            lat_max: 10.0,
            lng_min: 0.0,
            lng_max: 20.0,
        }
    }

    #[test]
    fn project_normalises_inside_bounds() {
        let point = project(&bounds(), 5.0, 5.0);
        assert_eq!(point, ScreenPoint { x: 0.25, y: 0.5 });
        let corner = project(&bounds(), 10.0, 20.0);
        assert_eq!(corner, ScreenPoint { x: 1.0, y: 1.0 });
    }

    #[test]
    fn project_does_not_clamp_outside_bounds() {
        let point = project(&bounds(), -5.0, 30.0);
        assert_eq!(point.x, 1.5);
        assert_eq!(point.y, -0.5);
    }

    #[test]
    fn within_range_includes_boundary() {
        assert!(within_range(0.0, 0.0, 3.0, 4.0, 5.0));
        assert!(!within_range(0.0, 0.0, 3.0, 4.0, 4.999));
    }

    #[test]
    fn range_check_scales_axes_by_viewport() {
        let a = to_city_point(&bounds(), &GeoCity::new("A", 5.0, 10.0));
        let b = to_city_point(&bounds(), &GeoCity::new("B", 5.0, 12.0));
        // 0.1 of the width apart.
        assert!(points_within_radius(&a, &b, Viewport::new(100.0, 1000.0), 10.5));
        assert!(!points_within_radius(&a, &b, Viewport::new(1000.0, 100.0), 10.5));
    }

    #[test]
    fn selection_distance_uses_raw_degrees() {
        let a = to_city_point(&bounds(), &GeoCity::new("A", 0.0, 0.0));
        let b = to_city_point(&bounds(), &GeoCity::new("B", 3.0, 4.0));
        assert_eq!(selection_distance(&a, &b), 5.0);
    }
}
