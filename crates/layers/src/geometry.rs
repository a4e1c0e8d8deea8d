//! Derived overlay geometry, computed once before a session becomes ready.

use foundation::geo::LatLng;
use foundation::math::destination;

/// Lower bound on ring resolution; coarser circles read as polygons.
pub const MIN_CIRCLE_SEGMENTS: u32 = 8;

/// Geodesic circle approximated by `segments` vertices, clockwise from north.
pub fn catchment_ring(center: LatLng, radius_m: f64, segments: u32) -> Vec<LatLng> {
    let n = segments.max(MIN_CIRCLE_SEGMENTS);
    (0..n)
        .map(|i| destination(center, 360.0 * i as f64 / n as f64, radius_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{MIN_CIRCLE_SEGMENTS, catchment_ring};
    use foundation::geo::LatLng;
    use foundation::math::haversine_distance_m;

    #[test]
    fn ring_vertices_sit_on_the_radius() {
        let c = LatLng::new(-33.86, 151.21);
        let ring = catchment_ring(c, 2_500.0, 64);
        assert_eq!(ring.len(), 64);
        for p in &ring {
            let d = haversine_distance_m(c, *p);
            assert!((d - 2_500.0).abs() < 0.5, "d={d}");
        }
    }

    #[test]
    fn coarse_rings_are_upsampled() {
        let ring = catchment_ring(LatLng::new(0.0, 0.0), 100.0, 3);
        assert_eq!(ring.len(), MIN_CIRCLE_SEGMENTS as usize);
    }
}
