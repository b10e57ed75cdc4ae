//! Surface distances between geographic points
//!
//! Uses the haversine formula on a sphere of the Earth's mean radius. This is
//! within about 0.5% of the WGS84 geodesic distance, which is well below GPS
//! noise for the point spacing of recorded tracks.

use crate::measure::Meters;
use crate::types::GeoPoint;

/// IUGG mean radius of the Earth.
const EARTH_MEAN_RADIUS: Meters<f64> = Meters(6_371_008.8);

/// Great-circle distance between two points, ignoring elevation.
pub fn surface_distance(point1: &GeoPoint, point2: &GeoPoint) -> Meters<f64> {
    let lat1 = point1.lat().0.to_radians();
    let lat2 = point2.lat().0.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (point2.lon().0 - point1.lon().0).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    Meters(EARTH_MEAN_RADIUS.0 * c)
}
