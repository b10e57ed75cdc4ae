use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use trackfit::{ActivityFile, Degrees, GeoPoint, Meters, MetersPerSecond, TrackPoint};

/// Writes a FIT activity file from a JSON description
///
/// Used to produce fixtures for checking the encoder's output against
/// external FIT decoders, such as the Garmin FIT SDK's FitCSVTool.
#[derive(Parser)]
struct Cli {
    /// JSON file describing the activity
    #[clap(long)]
    spec: PathBuf,

    /// FIT file output path
    #[clap(long)]
    out: PathBuf,
}

#[derive(Deserialize)]
struct ActivitySpec {
    #[serde(default)]
    sport: String,
    points: Vec<PointSpec>,
    #[serde(default)]
    weather: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct PointSpec {
    time: DateTime<Utc>,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude: Option<f64>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    speed: f64,
    heart_rate: Option<u8>,
    cadence: Option<u8>,
    #[serde(default)]
    lap: u32,
    temperature: Option<f64>,
}

impl TryFrom<PointSpec> for TrackPoint {
    type Error = anyhow::Error;

    fn try_from(value: PointSpec) -> Result<Self> {
        let position = match (value.lat, value.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(Degrees(lat), Degrees(lon))?),
            _ => None,
        };
        Ok(TrackPoint {
            position,
            altitude: value.altitude.map(Meters),
            distance: Meters(value.distance),
            speed: MetersPerSecond(value.speed),
            heart_rate: value.heart_rate,
            cadence: value.cadence,
            lap: value.lap,
            timestamp_ms: value.time.timestamp_millis(),
            temperature: value.temperature,
        })
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let spec: ActivitySpec = serde_json::from_reader(BufReader::new(
        File::open(&args.spec).context("Opening the activity spec")?,
    ))
    .context("Parsing the activity spec")?;

    let points = spec
        .points
        .into_iter()
        .map(TrackPoint::try_from)
        .collect::<Result<Vec<_>>>()?;

    let out = BufWriter::new(File::create(&args.out).context("Creating the FIT output")?);
    let size = ActivityFile::new(&spec.sport, &points)
        .with_weather_temperatures(&spec.weather)
        .write_to(out)?;
    eprintln!(
        "Wrote {} points to {} ({size} bytes)",
        points.len(),
        args.out.display()
    );
    Ok(())
}
