//! Whole-activity and per-lap statistics
//!
//! Everything a FIT session or lap message reports that isn't a property of a
//! single sample is computed here, once, from every sample in recorded order.
//! Samples without a positive timestamp still count toward distance, altitude
//! and metric statistics, but never toward start and end times. All
//! accumulators are local to each call.

use crate::measure::{Meters, MetersPerSecond, Milliseconds};
use crate::types::{GeoPoint, TrackPoint};

/// Summary statistics over an entire activity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivitySummary {
    /// Timestamp of the first timestamped point, in Unix milliseconds.
    pub start_time_ms: Option<i64>,

    /// Timestamp of the last timestamped point, in Unix milliseconds.
    pub end_time_ms: Option<i64>,

    /// The last point's cumulative distance.
    pub total_distance: Meters<f64>,

    pub elapsed: Milliseconds<i64>,
    pub avg_heart_rate: Option<u8>,
    pub max_heart_rate: Option<u8>,
    pub avg_speed: MetersPerSecond<f64>,
    pub max_speed: MetersPerSecond<f64>,
    pub avg_cadence: Option<u8>,
    pub max_cadence: Option<u8>,
    pub total_ascent: Meters<f64>,
    pub total_descent: Meters<f64>,

    /// The first point's position, if it had one.
    pub start_position: Option<GeoPoint>,
}

/// Summary statistics for one lap.
#[derive(Clone, Debug, PartialEq)]
pub struct LapSummary {
    pub lap: u32,

    /// `None` when no point in the lap has a timestamp.
    pub start_time_ms: Option<i64>,
    pub end_time_ms: Option<i64>,

    pub elapsed: Milliseconds<i64>,

    /// Distance covered within the lap: the difference in cumulative distance
    /// between its last and first points.
    pub distance: Meters<f64>,

    pub avg_heart_rate: Option<u8>,
    pub max_heart_rate: Option<u8>,
    pub start_position: Option<GeoPoint>,
    pub end_position: Option<GeoPoint>,
}

/// Running mean and maximum of an optional integer metric.
#[derive(Default)]
struct MetricStats {
    sum: u64,
    count: u64,
    max: Option<u8>,
}

impl MetricStats {
    fn add(&mut self, value: Option<u8>) {
        if let Some(v) = value {
            self.sum += v as u64;
            self.count += 1;
            self.max = self.max.max(Some(v));
        }
    }

    fn mean(&self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum as f64 / self.count as f64).round() as u8)
    }

    fn max(&self) -> Option<u8> {
        self.max
    }
}

/// Total climb and total drop between successive altitude readings.
///
/// Points without an altitude are skipped, so each reading is compared with
/// the last known one.
fn ascent_descent(points: &[&TrackPoint]) -> (Meters<f64>, Meters<f64>) {
    let mut ascent = Meters(0.0);
    let mut descent = Meters(0.0);
    let mut altitudes = points.iter().filter_map(|p| p.altitude);
    let Some(mut prev) = altitudes.next() else {
        return (ascent, descent);
    };
    for altitude in altitudes {
        let delta = altitude.0 - prev.0;
        if delta > 0.0 {
            ascent += Meters(delta);
        } else if delta < 0.0 {
            descent += Meters(-delta);
        }
        prev = altitude;
    }
    (ascent, descent)
}

/// First and last sample times, ignoring points without a timestamp.
fn time_span(points: &[&TrackPoint]) -> (Option<i64>, Option<i64>) {
    let mut timestamps = points
        .iter()
        .filter(|p| p.is_timestamped())
        .map(|p| p.timestamp_ms);
    let first = timestamps.next();
    (first, timestamps.last().or(first))
}

fn span_elapsed(start_ms: Option<i64>, end_ms: Option<i64>) -> Milliseconds<i64> {
    match (start_ms, end_ms) {
        (Some(start), Some(end)) => Milliseconds(end - start),
        _ => Milliseconds(0),
    }
}

impl ActivitySummary {
    /// Summarizes all of an activity's points, in recorded order.
    pub fn from_points(points: &[&TrackPoint]) -> Self {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Self::default();
        };

        let mut heart_rate = MetricStats::default();
        let mut cadence = MetricStats::default();
        let mut speed_sum = 0.0;
        let mut max_speed = MetersPerSecond(0.0);
        for p in points {
            heart_rate.add(p.measured_heart_rate());
            cadence.add(p.measured_cadence());
            speed_sum += p.speed.0;
            if p.speed > max_speed {
                max_speed = p.speed;
            }
        }
        let (total_ascent, total_descent) = ascent_descent(points);
        let (start_time_ms, end_time_ms) = time_span(points);

        Self {
            start_time_ms,
            end_time_ms,
            total_distance: last.distance,
            elapsed: span_elapsed(start_time_ms, end_time_ms),
            avg_heart_rate: heart_rate.mean(),
            max_heart_rate: heart_rate.max(),
            avg_speed: MetersPerSecond(speed_sum / points.len() as f64),
            max_speed,
            avg_cadence: cadence.mean(),
            max_cadence: cadence.max(),
            total_ascent,
            total_descent,
            start_position: first.position,
        }
    }
}

impl LapSummary {
    fn from_lap(points: &[&TrackPoint]) -> Option<Self> {
        let (first, last) = (points.first()?, points.last()?);

        let mut heart_rate = MetricStats::default();
        for p in points {
            heart_rate.add(p.measured_heart_rate());
        }

        let (start_time_ms, end_time_ms) = time_span(points);

        Some(Self {
            lap: first.lap,
            start_time_ms,
            end_time_ms,
            elapsed: span_elapsed(start_time_ms, end_time_ms),
            distance: last.distance - first.distance,
            avg_heart_rate: heart_rate.mean(),
            max_heart_rate: heart_rate.max(),
            start_position: first.position,
            end_position: last.position,
        })
    }

    /// Groups points into laps by lap number.
    ///
    /// Lap numbers are expected to be non-decreasing, so each run of equal lap
    /// numbers becomes one lap, in order of appearance. A lap is kept even if
    /// none of its points has a timestamp.
    pub fn from_points(points: &[&TrackPoint]) -> Vec<Self> {
        points
            .chunk_by(|a, b| a.lap == b.lap)
            .filter_map(Self::from_lap)
            .collect()
    }
}
