//! Conversions from domain values to FIT wire representations
//!
//! Each FIT field type has a fixed width, scale and offset, plus a reserved
//! "invalid" value. Domain values stay in [`crate::measure`] units and
//! `Option`s up to this point; the `INVALID_*` sentinels only appear when a
//! message is serialized.

use crate::measure::{
    Centimeters, Degrees, FromUnit, Meters, MetersPerSecond, Milliseconds, MillimetersPerSecond,
    Semicircles,
};
use crate::types::GeoPoint;

pub const INVALID_UINT8: u8 = 0xFF;
pub const INVALID_SINT8: i8 = 0x7F;
pub const INVALID_UINT16: u16 = 0xFFFF;
pub const INVALID_SINT32: i32 = 0x7FFF_FFFF;
pub const INVALID_UINT32: u32 = 0xFFFF_FFFF;
pub const INVALID_UINT32Z: u32 = 0;

/// Seconds between the Unix epoch and the Garmin epoch of
/// 1989-12-31T00:00:00Z.
pub const GARMIN_EPOCH_OFFSET: i64 = 631_065_600;

/// A date_time value as represented in a FIT file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitDateTime {
    /// Seconds since the Garmin epoch.
    value_unsafe: u32,
}

impl FitDateTime {
    /// Converts a Unix timestamp in milliseconds.
    ///
    /// Sub-second precision is truncated. Times before the Garmin epoch are
    /// not expected in recorded activities and saturate to zero.
    pub fn from_epoch_millis(epoch_millis: i64) -> Self {
        let seconds = epoch_millis / 1000 - GARMIN_EPOCH_OFFSET;
        Self {
            value_unsafe: seconds.clamp(0, u32::MAX as i64) as u32,
        }
    }

    pub fn value(self) -> u32 {
        self.value_unsafe
    }
}

/// Converts a Unix timestamp in milliseconds to FIT seconds.
pub fn epoch_millis_to_fit(epoch_millis: i64) -> u32 {
    FitDateTime::from_epoch_millis(epoch_millis).value()
}

const SEMICIRCLES_PER_DEGREE: f64 = 2_147_483_648.0 / 180.0;

impl From<Degrees<f64>> for Semicircles<i32> {
    fn from(value: Degrees<f64>) -> Self {
        // Float-to-int `as` saturates, so +180° lands on i32::MAX.
        Semicircles((value.0 * SEMICIRCLES_PER_DEGREE).round() as i32)
    }
}

impl From<Semicircles<i32>> for Degrees<f64> {
    fn from(value: Semicircles<i32>) -> Self {
        Degrees(value.0 as f64 / SEMICIRCLES_PER_DEGREE)
    }
}

pub fn degrees_to_semicircles(degrees: f64) -> i32 {
    Semicircles::<i32>::from(Degrees(degrees)).0
}

pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    Degrees::<f64>::from(Semicircles(semicircles)).0
}

/// A point on the surface of the ellipsoid, as represented in a FIT file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSurfacePoint {
    /// Latitude in semicircles
    pub lat: Semicircles<i32>,

    /// Longitude in semicircles
    pub lon: Semicircles<i32>,
}

impl From<GeoPoint> for FitSurfacePoint {
    fn from(value: GeoPoint) -> Self {
        Self {
            lat: value.lat().into(),
            lon: value.lon().into(),
        }
    }
}

/// Altitudes at or above this saturate to the top of the altitude range.
const ALTITUDE_CEILING: Meters<f64> = Meters(12_507.0);

/// Altitude as FIT's uint16 with scale 5 and offset 500 m.
///
/// Gives 0.2 m resolution from -100 m up to 12,507 m; values
/// outside that range saturate. Returns `None` for non-finite input.
pub fn altitude_to_fit(altitude: Meters<f64>) -> Option<u16> {
    if !altitude.0.is_finite() {
        return None;
    }
    if altitude >= ALTITUDE_CEILING {
        return Some(u16::MAX);
    }
    Some((altitude.0 * 5.0 + 500.0).round().clamp(0.0, u16::MAX as f64) as u16)
}

/// Speed in mm/s, saturating to the uint16 range.
pub fn speed_to_fit(speed: MetersPerSecond<f64>) -> MillimetersPerSecond<u16> {
    let mm_s = MillimetersPerSecond::from_unit(speed).0;
    MillimetersPerSecond(mm_s.round().clamp(0.0, u16::MAX as f64) as u16)
}

/// Distance in cm, saturating to the uint32 range.
pub fn distance_to_fit(distance: Meters<f64>) -> Centimeters<u32> {
    let cm = Centimeters::from_unit(distance).0;
    Centimeters(cm.round().clamp(0.0, u32::MAX as f64) as u32)
}

/// A duration in FIT's uint32 milliseconds (seconds with scale 1000).
pub fn duration_to_fit(duration: Milliseconds<i64>) -> Milliseconds<u32> {
    Milliseconds(duration.0.clamp(0, u32::MAX as i64) as u32)
}

/// Rounds a distance to whole meters for the ascent and descent fields.
pub fn whole_meters_to_fit(distance: Meters<f64>) -> u16 {
    distance.0.round().clamp(0.0, u16::MAX as f64) as u16
}

/// Temperature in whole degrees Celsius as a sint8, avoiding the invalid value.
pub fn temperature_to_fit(celsius: f64) -> Option<i8> {
    if !celsius.is_finite() {
        return None;
    }
    Some(celsius.round().clamp(i8::MIN as f64, (INVALID_SINT8 - 1) as f64) as i8)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::geo_point;

    #[test]
    fn garmin_epoch_offset() {
        let garmin_epoch = Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(garmin_epoch.timestamp(), GARMIN_EPOCH_OFFSET);
    }

    #[test]
    fn known_timestamp() {
        // 2023-01-01T00:00:00Z
        assert_eq!(epoch_millis_to_fit(1_672_531_200_000), 1_041_465_600);
        // Sub-second precision is truncated.
        assert_eq!(epoch_millis_to_fit(1_672_531_200_999), 1_041_465_600);
    }

    #[test]
    fn pre_epoch_timestamp_saturates() {
        assert_eq!(epoch_millis_to_fit(1_000), 0);
    }

    #[test]
    fn semicircle_reference_values() {
        assert_eq!(degrees_to_semicircles(0.0), 0);
        assert_eq!(degrees_to_semicircles(90.0), 1 << 30);
        assert_eq!(degrees_to_semicircles(-180.0), i32::MIN);
        assert_eq!(degrees_to_semicircles(180.0), i32::MAX);
        assert_relative_eq!(semicircles_to_degrees(1 << 30), 90.0);
    }

    // quickcheck's f64 generator rarely lands inside a bounded range, so these
    // derive coordinates from an integer instead.

    fn fraction(n: u32) -> f64 {
        n as f64 / u32::MAX as f64
    }

    #[quickcheck]
    fn qc_semicircle_roundtrip_latitude(n: u32) -> bool {
        let lat = -90.0 + 180.0 * fraction(n);
        (semicircles_to_degrees(degrees_to_semicircles(lat)) - lat).abs() < 1e-7
    }

    #[quickcheck]
    fn qc_semicircle_roundtrip_longitude(n: u32) -> bool {
        let lon = -180.0 + 360.0 * fraction(n);
        (semicircles_to_degrees(degrees_to_semicircles(lon)) - lon).abs() < 1e-7
    }

    #[quickcheck]
    fn qc_semicircle_roundtrip_any(degrees: f64) -> TestResult {
        if !(-180.0..=180.0).contains(&degrees) {
            return TestResult::discard();
        }
        TestResult::from_bool(
            (semicircles_to_degrees(degrees_to_semicircles(degrees)) - degrees).abs() < 1e-7,
        )
    }

    #[test]
    fn surface_point() -> Result<()> {
        let p = FitSurfacePoint::from(geo_point!(45.0, -90.0));
        assert_eq!(p.lat, Semicircles(1 << 29));
        assert_eq!(p.lon, Semicircles(-(1 << 30)));
        Ok(())
    }

    #[test]
    fn altitude() {
        assert_eq!(altitude_to_fit(Meters(0.0)), Some(500));
        assert_eq!(altitude_to_fit(Meters(-100.0)), Some(0));
        assert_eq!(altitude_to_fit(Meters(-250.0)), Some(0));
        assert_eq!(altitude_to_fit(Meters(12_506.0)), Some(63_030));
        assert_eq!(altitude_to_fit(Meters(12_507.0)), Some(u16::MAX));
        assert_eq!(altitude_to_fit(Meters(20_000.0)), Some(u16::MAX));
        assert_eq!(altitude_to_fit(Meters(123.4)), Some(1117));
        assert_eq!(altitude_to_fit(Meters(f64::NAN)), None);
    }

    #[test]
    fn speed() {
        assert_eq!(speed_to_fit(MetersPerSecond(3.2146)), MillimetersPerSecond(3215));
        assert_eq!(speed_to_fit(MetersPerSecond(-1.0)), MillimetersPerSecond(0));
        assert_eq!(
            speed_to_fit(MetersPerSecond(100.0)),
            MillimetersPerSecond(u16::MAX)
        );
    }

    #[test]
    fn distance() {
        assert_eq!(distance_to_fit(Meters(1234.567)), Centimeters(123_457));
        assert_eq!(distance_to_fit(Meters(-5.0)), Centimeters(0));
    }

    #[test]
    fn temperature() {
        assert_eq!(temperature_to_fit(21.6), Some(22));
        assert_eq!(temperature_to_fit(-40.0), Some(-40));
        assert_eq!(temperature_to_fit(300.0), Some(126));
        assert_eq!(temperature_to_fit(f64::INFINITY), None);
    }

    #[test]
    fn whole_meters() {
        assert_eq!(whole_meters_to_fit(Meters(152.5)), 153);
        assert_eq!(whole_meters_to_fit(Meters(0.2)), 0);
    }
}
