use crate::model::attendance_location::AttendanceLocation;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6371e3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// True when `point` lies within the radius of at least one candidate.
/// An empty candidate list never matches.
pub fn is_within_any_location(point: GeoPoint, candidates: &[AttendanceLocation]) -> bool {
    candidates.iter().any(|loc| {
        let center = GeoPoint {
            latitude: loc.latitude,
            longitude: loc.longitude,
        };
        haversine_distance(point, center) <= f64::from(loc.radius)
    })
}
