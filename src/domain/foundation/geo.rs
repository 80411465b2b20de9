//! Geographic points and great-circle distance.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a validated point.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::invalid_format("lat", "must be within [-90, 90]"));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::invalid_format("lng", "must be within [-180, 180]"));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance to another point in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

/// Haversine distance between two points in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Point reached by travelling `distance_km` due north from `origin`.
///
/// Meridian arcs make this exact under the spherical model, which is what
/// the boundary tests for radius filtering rely on.
pub fn offset_north_km(origin: &GeoPoint, distance_km: f64) -> GeoPoint {
    let dlat = (distance_km / EARTH_RADIUS_KM).to_degrees();
    GeoPoint {
        lat: origin.lat + dlat,
        lng: origin.lng,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(43.2381, 76.9452).unwrap();
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn almaty_to_astana_is_roughly_970_km() {
        let almaty = GeoPoint::new(43.2381, 76.9452).unwrap();
        let astana = GeoPoint::new(51.1694, 71.4491).unwrap();
        let d = almaty.distance_km(&astana);
        assert!((960.0..990.0).contains(&d), "got {d}");
    }

    #[test]
    fn offset_north_lands_at_requested_distance() {
        let origin = GeoPoint::new(43.2381, 76.9452).unwrap();
        for km in [0.5, 5.0, 12.0, 25.0, 40.0] {
            let p = offset_north_km(&origin, km);
            assert!((origin.distance_km(&p) - km).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    proptest! {
        #[test]
        fn haversine_is_symmetric(
            lat1 in -89.0f64..89.0, lng1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lng2 in -179.0f64..179.0,
        ) {
            let a = GeoPoint { lat: lat1, lng: lng1 };
            let b = GeoPoint { lat: lat2, lng: lng2 };
            prop_assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-6);
        }

        #[test]
        fn haversine_never_exceeds_half_circumference(
            lat1 in -90.0f64..90.0, lng1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lng2 in -180.0f64..180.0,
        ) {
            let a = GeoPoint { lat: lat1, lng: lng1 };
            let b = GeoPoint { lat: lat2, lng: lng2 };
            let d = haversine_km(&a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
