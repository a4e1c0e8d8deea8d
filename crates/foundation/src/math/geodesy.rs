use crate::geo::LatLng;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// Mean Earth radius (meters), used for spherical approximations.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_lng_deg(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}

/// Signed longitude delta from `from` to `to` along the shorter way round.
pub fn shortest_lng_delta_deg(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Great-circle distance on the mean sphere (haversine).
pub fn haversine_distance_m(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();

    let h = (0.5 * dlat).sin().powi(2) + lat1.cos() * lat2.cos() * (0.5 * dlng).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Point reached by travelling `distance_m` from `origin` on initial bearing
/// `bearing_deg` (clockwise from north) along a great circle.
pub fn destination(origin: LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let delta = distance_m / EARTH_MEAN_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let y = theta.sin() * delta.sin() * lat1.cos();
    let x = delta.cos() - lat1.sin() * sin_lat2;
    let lng2 = lng1 + y.atan2(x);

    LatLng::new(lat2.to_degrees(), wrap_lng_deg(lng2.to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::{destination, haversine_distance_m, shortest_lng_delta_deg, wrap_lng_deg};
    use crate::geo::LatLng;

    #[test]
    fn wrap_keeps_range() {
        assert_eq!(wrap_lng_deg(190.0), -170.0);
        assert_eq!(wrap_lng_deg(-190.0), 170.0);
        assert_eq!(wrap_lng_deg(45.0), 45.0);
        assert_eq!(wrap_lng_deg(180.0), 180.0);
    }

    #[test]
    fn shortest_delta_crosses_antimeridian() {
        assert_eq!(shortest_lng_delta_deg(170.0, -170.0), 20.0);
        assert_eq!(shortest_lng_delta_deg(-170.0, 170.0), -20.0);
        assert_eq!(shortest_lng_delta_deg(10.0, 30.0), 20.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111km() {
        let d = haversine_distance_m(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 50.0, "d={d}");
    }

    #[test]
    fn destination_matches_haversine_distance() {
        let origin = LatLng::new(48.85, 2.35);
        for bearing in [0.0, 45.0, 90.0, 200.0, 315.0] {
            let p = destination(origin, bearing, 5_000.0);
            let d = haversine_distance_m(origin, p);
            assert!((d - 5_000.0).abs() < 0.5, "bearing={bearing} d={d}");
        }
    }
}
