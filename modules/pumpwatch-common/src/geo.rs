//! Great-circle distance.

/// Haversine distance between two lat/lon points in kilometers.
///
/// Assumes valid numeric input; out-of-range coordinates are the
/// caller's responsibility.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_km(6.9271, 79.8612, 6.9271, 79.8612).abs() < 1e-9);
    }

    #[test]
    fn colombo_to_kandy_is_roughly_94km() {
        // Colombo Fort → Kandy city center, known to be ~94 km as the crow flies.
        let d = haversine_km(6.9344, 79.8428, 7.2906, 80.6337);
        assert!((d - 94.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111km() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }
}
