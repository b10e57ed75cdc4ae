//! Recorded activity tracks
//!
//! Provides [`Track`], the sequence of [`TrackPoint`]s recorded for one
//! activity. Tracks are created by obtaining a [`TrackSetBuilder`] and adding
//! data to it, for example by parsing a GPX file. [`TrackSetBuilder::build`]
//! then returns every track that was started.
//!
//! Points are taken in recorded order. Cumulative distance is the sum of the
//! surface distances between consecutive points within a segment; no distance
//! is counted across a gap between segments.

use thiserror::Error;
use tracing::debug;

use crate::geographic::surface_distance;
use crate::gpx::GpxTrackPoint;
use crate::measure::{Meters, MetersPerSecond, Milliseconds};
use crate::types::{GeoPoint, TrackPoint};

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Attempt to access a missing track")]
    MissingTrack,
}

type Result<T> = std::result::Result<T, TrackError>;

/// Options for building tracks
#[derive(Clone, Debug)]
pub struct TrackOptions {
    lap_per_segment: bool,
}

impl TrackOptions {
    /// Whether each GPX track segment starts a new lap
    ///
    /// On by default. When off, every point belongs to lap 0.
    pub fn with_lap_per_segment(mut self, lap_per_segment: bool) -> Self {
        self.lap_per_segment = lap_per_segment;
        self
    }
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            lap_per_segment: true,
        }
    }
}

pub struct TrackSet {
    pub tracks: Vec<Track>,
}

pub struct TrackSetBuilder {
    tracks: Vec<TrackBuilder>,
    options: TrackOptions,
}

impl TrackSetBuilder {
    pub fn new(options: TrackOptions) -> Self {
        Self {
            tracks: Vec::new(),
            options,
        }
    }

    pub fn create_track(&mut self) {
        self.tracks.push(TrackBuilder::new(self.options.clone()));
    }

    pub fn current_mut(&mut self) -> Result<&mut TrackBuilder> {
        match self.tracks.last_mut() {
            Some(track) => Ok(track),
            None => Err(TrackError::MissingTrack),
        }
    }

    pub fn build(self) -> TrackSet {
        TrackSet {
            tracks: self.tracks.into_iter().map(TrackBuilder::build).collect(),
        }
    }
}

/// One recorded activity.
pub struct Track {
    /// The name of the track, if given.
    pub name: Option<String>,

    /// The track's points, in recorded order.
    pub points: Vec<TrackPoint>,
}

impl Track {
    /// The total distance of the track.
    pub fn total_distance(&self) -> Meters<f64> {
        self.points
            .last()
            .map(|p| p.distance)
            .unwrap_or(Meters(0.0))
    }

    /// Time between the first and last timestamped points.
    pub fn elapsed(&self) -> Milliseconds<i64> {
        let mut timestamps = self
            .points
            .iter()
            .filter(|p| p.is_timestamped())
            .map(|p| p.timestamp_ms);
        match timestamps.next() {
            Some(first) => Milliseconds(timestamps.last().unwrap_or(first) - first),
            None => Milliseconds(0),
        }
    }
}

struct PrevFix {
    point: GeoPoint,
    timestamp_ms: Option<i64>,
}

pub struct TrackBuilder {
    options: TrackOptions,
    name: Option<String>,
    points: Vec<TrackPoint>,
    prev: Option<PrevFix>,
    distance: Meters<f64>,
    num_segments: u32,
    num_untimed_points: usize,
}

impl TrackBuilder {
    fn new(options: TrackOptions) -> Self {
        Self {
            options,
            name: None,
            points: Vec::new(),
            prev: None,
            distance: Meters(0.0),
            num_segments: 0,
            num_untimed_points: 0,
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Begins a new segment, which breaks distance and speed continuity with
    /// the previous point.
    pub fn start_segment(&mut self) {
        self.num_segments += 1;
        self.prev = None;
    }

    fn lap(&self) -> u32 {
        if self.options.lap_per_segment {
            self.num_segments.saturating_sub(1)
        } else {
            0
        }
    }

    pub fn add_point(&mut self, gpx_point: GpxTrackPoint) {
        let timestamp_ms = gpx_point.time.map(|t| t.timestamp_millis());
        if timestamp_ms.is_none() {
            self.num_untimed_points += 1;
        }

        let mut speed = MetersPerSecond(0.0);
        if let Some(prev) = &self.prev {
            let step = surface_distance(&prev.point, &gpx_point.point);
            self.distance += step;
            if let (Some(t0), Some(t1)) = (prev.timestamp_ms, timestamp_ms) {
                if t1 > t0 {
                    speed = step / Milliseconds(t1 - t0).as_seconds();
                }
            }
        }

        self.points.push(TrackPoint {
            position: Some(gpx_point.point),
            altitude: gpx_point.elevation,
            distance: self.distance,
            speed,
            heart_rate: gpx_point.heart_rate,
            cadence: gpx_point.cadence,
            lap: self.lap(),
            timestamp_ms: timestamp_ms.unwrap_or(0),
            temperature: gpx_point.temperature,
        });
        self.prev = Some(PrevFix {
            point: gpx_point.point,
            timestamp_ms,
        });
    }

    fn build(self) -> Track {
        debug!(
            "Built track {:?} with {} points in {} segments",
            self.name,
            self.points.len(),
            self.num_segments
        );
        if self.num_untimed_points > 0 {
            debug!(
                "Track has {} points without a time, which will not be encoded",
                self.num_untimed_points
            );
        }
        Track {
            name: self.name,
            points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    use super::{TrackError, TrackOptions, TrackSetBuilder};
    use crate::geo_point;
    use crate::gpx::GpxTrackPoint;
    use crate::measure::{Meters, MetersPerSecond, Milliseconds};
    use crate::types::GeoPoint;

    fn gpx_point(point: GeoPoint, time: Option<DateTime<Utc>>) -> GpxTrackPoint {
        GpxTrackPoint {
            point,
            elevation: None,
            time,
            heart_rate: None,
            cadence: None,
            temperature: None,
        }
    }

    fn at(seconds: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 4, 15, 16, 0, seconds).unwrap())
    }

    #[test]
    fn missing_track() {
        let mut builder = TrackSetBuilder::new(TrackOptions::default());
        assert!(matches!(
            builder.current_mut(),
            Err(TrackError::MissingTrack)
        ));
    }

    #[test]
    fn distance_and_speed() -> Result<()> {
        let mut builder = TrackSetBuilder::new(TrackOptions::default());
        builder.create_track();
        let track = builder.current_mut()?;
        track.set_name("Coyote".to_owned());
        track.start_segment();
        track.add_point(gpx_point(geo_point!(37.39987, -122.13737), at(0)));
        track.add_point(gpx_point(geo_point!(37.39888, -122.13498), at(40)));

        let set = builder.build();
        assert_eq!(set.tracks.len(), 1);
        let track = &set.tracks[0];
        assert_eq!(track.name.as_deref(), Some("Coyote"));
        assert_relative_eq!(track.points[0].distance, Meters(0.0));
        assert_relative_eq!(track.points[0].speed, MetersPerSecond(0.0));
        assert_relative_eq!(track.points[1].distance.0, 238.1, epsilon = 1.0);
        assert_relative_eq!(track.points[1].speed.0, 238.1 / 40.0, epsilon = 0.05);
        assert_relative_eq!(track.total_distance(), track.points[1].distance);
        assert_eq!(track.elapsed(), Milliseconds(40_000));
        assert!(track.points.iter().all(|p| p.lap == 0));
        Ok(())
    }

    #[test]
    fn segments_become_laps() -> Result<()> {
        let mut builder = TrackSetBuilder::new(TrackOptions::default());
        builder.create_track();
        let track = builder.current_mut()?;
        track.start_segment();
        track.add_point(gpx_point(geo_point!(0.0, 0.0), at(0)));
        track.add_point(gpx_point(geo_point!(0.0, 0.001), at(10)));
        track.start_segment();
        track.add_point(gpx_point(geo_point!(0.0, 0.01), at(20)));
        track.add_point(gpx_point(geo_point!(0.0, 0.011), at(30)));

        let set = builder.build();
        let points = &set.tracks[0].points;
        assert_eq!(
            points.iter().map(|p| p.lap).collect::<Vec<_>>(),
            vec![0, 0, 1, 1]
        );
        // No distance accrues across the gap between segments.
        assert_relative_eq!(points[2].distance, points[1].distance);
        assert_relative_eq!(points[2].speed, MetersPerSecond(0.0));
        assert_relative_eq!(
            points[3].distance.0 - points[2].distance.0,
            points[1].distance.0,
            epsilon = 1e-6
        );
        Ok(())
    }

    #[test]
    fn single_lap_option() -> Result<()> {
        let mut builder =
            TrackSetBuilder::new(TrackOptions::default().with_lap_per_segment(false));
        builder.create_track();
        let track = builder.current_mut()?;
        track.start_segment();
        track.add_point(gpx_point(geo_point!(0.0, 0.0), at(0)));
        track.start_segment();
        track.add_point(gpx_point(geo_point!(0.0, 0.01), at(20)));

        let set = builder.build();
        assert!(set.tracks[0].points.iter().all(|p| p.lap == 0));
        Ok(())
    }

    #[test]
    fn untimed_points() -> Result<()> {
        let mut builder = TrackSetBuilder::new(TrackOptions::default());
        builder.create_track();
        let track = builder.current_mut()?;
        track.start_segment();
        track.add_point(gpx_point(geo_point!(0.0, 0.0), None));
        track.add_point(gpx_point(geo_point!(0.0, 0.001), at(5)));
        track.add_point(gpx_point(geo_point!(0.0, 0.002), at(5)));

        let set = builder.build();
        let track = &set.tracks[0];
        assert_eq!(track.points[0].timestamp_ms, 0);
        assert!(!track.points[0].is_timestamped());
        // Distance still accrues, but speed needs elapsed time.
        assert!(track.points[1].distance.0 > 100.0);
        assert_relative_eq!(track.points[1].speed, MetersPerSecond(0.0));
        assert_relative_eq!(track.points[2].speed, MetersPerSecond(0.0));
        assert_eq!(track.elapsed(), Milliseconds(0));
        Ok(())
    }
}
