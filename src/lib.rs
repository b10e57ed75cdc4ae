//! A CLI tool and library for encoding recorded activities as Garmin FIT.
//!
//! Takes a recorded activity, as a sequence of [`TrackPoint`]s or a GPX track,
//! and encodes it as a FIT activity file with per-sample records, a lap per
//! lap number, and a session summary. The result can be uploaded to Garmin
//! Connect, Strava and other services that import FIT.
//!
//! See the [`encode`] function for the core entry point, and
//! [`convert_gpx_to_fit`], which is used by the CLI, for GPX conversion.
//!
//! # Feature flags
//!
//! - `cli` enables the additional dependencies needed by the CLI

pub mod fit;
mod geographic;
mod gpx;
pub mod internal;
mod measure;
mod sport;
mod summary;
mod track;
mod types;

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::debug;

pub use crate::fit::{
    ActivityFile, FitActivityOptions, FitEncodeError, PROFILE_VERSION, checksum,
    degrees_to_semicircles, epoch_millis_to_fit, semicircles_to_degrees,
};
pub use crate::gpx::GpxError;
pub use crate::measure::{
    Centimeters, Degrees, Meters, MetersPerSecond, Milliseconds, MillimetersPerSecond, Seconds,
    Semicircles,
};
pub use crate::sport::{Sport, SportCodes, SubSport, known_labels, sport_codes};
pub use crate::summary::{ActivitySummary, LapSummary};
pub use crate::track::{TrackError, TrackOptions};
pub use crate::types::{GeoPoint, TrackPoint, TypeError};

use crate::gpx::{GpxItem, GpxReader};
use crate::track::TrackSetBuilder;

#[derive(Error, Debug)]
pub enum TrackfitError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("GPX processing error")]
    Gpx(#[from] GpxError),
    #[error("Track error")]
    Track(#[from] TrackError),
    #[error("Unexpected number of tracks in input: {0}")]
    TrackCount(usize),
    #[error("FIT encoding error")]
    FitEncode(#[from] FitEncodeError),
}

pub type Result<T> = std::result::Result<T, TrackfitError>;

/// Encode samples as a FIT activity file.
///
/// Samples must be in recorded order, with non-decreasing lap numbers.
/// `sport_label` is matched against known activity names by
/// [`sport_codes`]. Encoding never fails: samples without a positive
/// timestamp are left out of the records, and an empty activity still
/// produces a valid file.
pub fn encode(sport_label: &str, samples: &[TrackPoint]) -> Vec<u8> {
    ActivityFile::new(sport_label, samples).encode()
}

/// Options for GPX conversion
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    sport_label: String,
    track_options: TrackOptions,
    fit_options: FitActivityOptions,
}

impl ConvertOptions {
    /// Set the activity label used to pick FIT sport codes
    ///
    /// Unset or unrecognized labels produce a generic activity.
    pub fn with_sport_label(mut self, sport_label: impl Into<String>) -> Self {
        self.sport_label = sport_label.into();
        self
    }

    pub fn with_track_options(mut self, track_options: TrackOptions) -> Self {
        self.track_options = track_options;
        self
    }

    pub fn with_fit_options(mut self, fit_options: FitActivityOptions) -> Self {
        self.fit_options = fit_options;
        self
    }
}

/// Information about a successful conversion.
#[derive(Clone, Debug)]
pub struct ConversionInfo {
    /// The track name, if the GPX file gave one.
    pub name: Option<String>,

    /// Trackpoints read from the input.
    pub num_points: usize,

    /// Record messages written, which excludes points without a time.
    pub num_records: usize,

    pub num_laps: usize,
    pub total_distance: Meters<f64>,
    pub elapsed: Milliseconds<i64>,
    pub sport: SportCodes,

    /// Size of the FIT file written.
    pub num_bytes: usize,
}

/// Convert a GPX track into a FIT activity file.
///
/// The input must contain exactly one track. The `BufRead` bound on
/// `gpx_input` is required internally by quick_xml. `fit_output` should
/// probably also be given as a buffered `Write`.
#[tracing::instrument(name = "convert_gpx_to_fit", level = "debug", skip_all)]
pub fn convert_gpx_to_fit<R: BufRead, W: Write>(
    gpx_input: R,
    fit_output: W,
    options: &ConvertOptions,
) -> Result<ConversionInfo> {
    let mut builder = TrackSetBuilder::new(options.track_options.clone());
    let gpx_reader = GpxReader::from_reader(gpx_input);
    for item in gpx_reader {
        match item? {
            GpxItem::Track => {
                builder.create_track();
            }

            GpxItem::TrackName(name) => {
                builder.current_mut()?.set_name(name);
            }

            GpxItem::TrackSegment => {
                builder.current_mut()?.start_segment();
            }

            GpxItem::TrackPoint(p) => {
                builder.current_mut()?.add_point(p);
            }
        }
    }

    let mut track_set = builder.build();
    let num_tracks = track_set.tracks.len();
    let track = match track_set.tracks.pop() {
        Some(track) if num_tracks == 1 => track,
        _ => return Err(TrackfitError::TrackCount(num_tracks)),
    };

    let sport = sport_codes(&options.sport_label);
    debug!("Sport label {:?} maps to {:?}", options.sport_label, sport);
    let num_bytes = ActivityFile::new(&options.sport_label, &track.points)
        .with_sport(sport)
        .with_options(options.fit_options.clone())
        .write_to(fit_output)?;

    let points = track.points.iter().collect::<Vec<_>>();
    Ok(ConversionInfo {
        num_points: points.len(),
        num_records: points.iter().filter(|p| p.is_timestamped()).count(),
        num_laps: LapSummary::from_points(&points).len(),
        total_distance: track.total_distance(),
        elapsed: track.elapsed(),
        sport,
        num_bytes,
        name: track.name,
    })
}
