use civic_types::Coordinates;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine great-circle distance between two points, in meters.
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Distance when both sides are geolocated.
pub fn distance_between(a: Option<Coordinates>, b: Option<Coordinates>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(distance_meters(a, b)),
        _ => None,
    }
}

/// `false` whenever either side lacks coordinates.
pub fn is_nearby(a: Option<Coordinates>, b: Option<Coordinates>, radius_meters: f64) -> bool {
    distance_between(a, b).is_some_and(|d| d <= radius_meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUMBAI_A: Coordinates = Coordinates { lat: 19.0760, lon: 72.8777 };
    const MUMBAI_B: Coordinates = Coordinates { lat: 19.0762, lon: 72.8779 };

    #[test]
    fn close_points_in_mumbai() {
        let d = distance_meters(MUMBAI_A, MUMBAI_B);
        assert!(d > 25.0 && d < 50.0, "got {}", d);
        assert!(is_nearby(Some(MUMBAI_A), Some(MUMBAI_B), 50.0));
    }

    #[test]
    fn known_city_distance_within_half_percent() {
        // One degree of longitude on the equator, WGS84 geodesic: 111_319.5 m.
        let d = distance_meters(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 1.0));
        assert!((d - 111_319.5).abs() / 111_319.5 < 0.005, "got {}", d);
    }

    #[test]
    fn symmetric_and_monotonic_in_radius() {
        let far = Coordinates::new(19.0900, 72.9000);
        for radius in [10.0, 100.0, 1_000.0, 5_000.0] {
            assert_eq!(
                is_nearby(Some(MUMBAI_A), Some(far), radius),
                is_nearby(Some(far), Some(MUMBAI_A), radius),
            );
        }
        let d = distance_meters(MUMBAI_A, far);
        assert!(!is_nearby(Some(MUMBAI_A), Some(far), d - 1.0));
        assert!(is_nearby(Some(MUMBAI_A), Some(far), d + 1.0));
        assert!(is_nearby(Some(MUMBAI_A), Some(far), d * 10.0));
    }

    #[test]
    fn missing_coordinates_never_match() {
        assert!(!is_nearby(None, Some(MUMBAI_A), 1e9));
        assert!(!is_nearby(Some(MUMBAI_A), None, 1e9));
        assert!(!is_nearby(None, None, 1e9));
        assert_eq!(distance_between(None, Some(MUMBAI_A)), None);
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(distance_meters(MUMBAI_A, MUMBAI_A), 0.0);
    }
}
