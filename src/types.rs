use approx::{AbsDiffEq, RelativeEq, abs_diff_eq, relative_eq};
use thiserror::Error;

use crate::measure::{Degrees, Meters, MetersPerSecond};

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("geographic point invariant: invalid value {1:?} for {0:?}")]
    GeoPointInvariant(GeoPointDimension, Degrees<f64>),
}

type Result<T> = std::result::Result<T, TypeError>;

/// A point on the surface of the WGS84 ellipsoid.
///
/// Enforces valid latitude and longitude values as type invariants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GeoPoint {
    lat: Degrees<f64>,
    lon: Degrees<f64>,
}

#[derive(Debug)]
pub enum GeoPointDimension {
    Latitude,
    Longitude,
}

impl GeoPoint {
    pub fn new(lat: Degrees<f64>, lon: Degrees<f64>) -> Result<GeoPoint> {
        if !(-90.0..=90.0).contains(&lat.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Latitude,
                lat,
            ));
        }
        if !(-180.0..=180.0).contains(&lon.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Longitude,
                lon,
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Get point latitude
    pub fn lat(&self) -> Degrees<f64> {
        self.lat
    }

    /// Get point longitude
    pub fn lon(&self) -> Degrees<f64> {
        self.lon
    }
}

impl AbsDiffEq for GeoPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        abs_diff_eq!(self.lat.0, other.lat.0, epsilon = epsilon)
            && abs_diff_eq!(self.lon.0, other.lon.0, epsilon = epsilon)
    }
}

impl RelativeEq for GeoPoint {
    fn default_max_relative() -> Self::Epsilon {
        0.000_000_000_000_001
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        relative_eq!(
            self.lat.0,
            other.lat.0,
            epsilon = epsilon,
            max_relative = max_relative
        ) && relative_eq!(
            self.lon.0,
            other.lon.0,
            epsilon = epsilon,
            max_relative = max_relative
        )
    }
}

/// One recorded instant of an activity.
///
/// Every value the FIT encoder reads is an explicit field here. Values a
/// recording device may not have measured are `None` rather than a magic
/// number; the encoder substitutes FIT's "invalid" sentinels only when writing
/// the wire format.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TrackPoint {
    /// Position fix, if the device had one.
    pub position: Option<GeoPoint>,

    /// Altitude above sea level.
    pub altitude: Option<Meters<f64>>,

    /// Cumulative distance covered since the start of the activity.
    pub distance: Meters<f64>,

    /// Instantaneous speed.
    pub speed: MetersPerSecond<f64>,

    /// Heart rate in beats per minute. Zero is treated the same as `None`.
    pub heart_rate: Option<u8>,

    /// Cadence, in RPM or steps per minute depending on the sport.
    pub cadence: Option<u8>,

    /// Lap number, non-decreasing over the course of an activity.
    pub lap: u32,

    /// Sample time in milliseconds since the Unix epoch. Points with a
    /// non-positive timestamp are not encoded.
    pub timestamp_ms: i64,

    /// Ambient temperature in degrees Celsius.
    pub temperature: Option<f64>,
}

impl TrackPoint {
    /// Whether this point carries a usable timestamp.
    pub fn is_timestamped(&self) -> bool {
        self.timestamp_ms > 0
    }

    /// The heart rate, if one was actually measured.
    pub fn measured_heart_rate(&self) -> Option<u8> {
        self.heart_rate.filter(|&hr| hr > 0)
    }

    /// The cadence, if nonzero.
    pub fn measured_cadence(&self) -> Option<u8> {
        self.cadence.filter(|&cad| cad > 0)
    }
}

/// Instantiate a `GeoPoint` with a tuple-like syntax.
#[macro_export]
macro_rules! geo_point {
    ( $lat:expr, $lon:expr ) => {
        $crate::GeoPoint::new($crate::Degrees($lat), $crate::Degrees($lon))?
    };
}

/// Instantiate a vec of `GeoPoint` with tuple-like syntax.
#[macro_export]
macro_rules! geo_points {
    ( $( ( $lat:expr, $lon:expr $(,)? ) ),* $(,)? ) => {
        vec![ $( $crate::geo_point!($lat, $lon) ),* ]
    };
}
