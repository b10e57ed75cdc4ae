//! Encoding Garmin FIT activity files
//!
//! An activity file is a 14-byte header, a stream of definition and data
//! messages, and a trailing CRC. The messages always appear in the same order:
//! `file_id`, every `record`, every `lap`, one `session` and one `activity`.
//!
//! Encoding is infallible and deterministic. Samples without a positive
//! timestamp get no `record`, though they still count toward their lap and the
//! session. Out-of-range values saturate to what the wire format can hold. Only writing the finished bytes out can fail.

use std::io::Write;

use thiserror::Error;
use tracing::debug;

pub mod buffer;
pub mod codec;
pub mod crc;
pub mod message;

pub use buffer::FitBuffer;
pub use codec::{degrees_to_semicircles, epoch_millis_to_fit, semicircles_to_degrees};
pub use crc::{Crc, checksum};

use crate::sport::{SportCodes, sport_codes};
use crate::summary::{ActivitySummary, LapSummary};
use crate::types::TrackPoint;
use codec::FitDateTime;
use message::{
    ActivityMessage, DataMessage, FileIdMessage, FileType, LapMessage, Manufacturer,
    RecordMessage, SessionMessage,
};

/// The version of the Garmin SDK from which we obtain our profile information.
///
/// Represented in base 10 as two digits for the major version, followed by
/// three for the minor.
pub const PROFILE_VERSION: u16 = 21158;

/// Size of the file header, including its CRC.
pub const HEADER_SIZE: usize = 14;

/// An error when writing an encoded FIT file
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FitEncodeError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, FitEncodeError>;

#[repr(u8)]
#[derive(Clone, Copy, Debug)]
enum ProtocolVersion {
    V10 = 0x10,
}

pub struct FileHeader {
    protocol_version: ProtocolVersion,
    data_size: u32,
}

impl FileHeader {
    const DATA_SIZE_OFFSET: usize = 4;
    const CRC_OFFSET: usize = 12;

    /// Creates a header for a data section of the given size.
    ///
    /// Sizes beyond what the header can express saturate.
    pub fn new(data_size: usize) -> Self {
        Self {
            protocol_version: ProtocolVersion::V10,
            data_size: u32::try_from(data_size).unwrap_or(u32::MAX),
        }
    }

    /// Writes the complete header, including its CRC.
    pub fn encode(&self, buf: &mut FitBuffer) {
        let start = buf.len();
        buf.put_u8(HEADER_SIZE as u8);
        buf.put_u8(self.protocol_version as u8);
        buf.put_u16(PROFILE_VERSION);
        buf.put_u32(self.data_size);
        buf.put_bytes(b".FIT");
        let crc = checksum(&buf.as_slice()[start..start + Self::CRC_OFFSET]);
        buf.put_u16(crc);
    }

    /// Replaces the data size of a header previously written at the start of
    /// `buf`, and recomputes the header CRC to match.
    pub fn patch(&self, buf: &mut FitBuffer) {
        buf.patch_u32(Self::DATA_SIZE_OFFSET, self.data_size);
        let crc = checksum(&buf.as_slice()[..Self::CRC_OFFSET]);
        buf.patch_u16(Self::CRC_OFFSET, crc);
    }
}

/// Options for writing a FIT activity file
#[derive(Clone, Debug)]
pub struct FitActivityOptions {
    manufacturer: u16,
    product: u16,
    serial_number: Option<u32>,
}

impl FitActivityOptions {
    /// Set the `file_id` manufacturer
    ///
    /// Defaults to 255, the FIT profile's "development" manufacturer.
    pub fn with_manufacturer(mut self, manufacturer: u16) -> Self {
        self.manufacturer = manufacturer;
        self
    }

    /// Set the `file_id` product number. Zero by default.
    pub fn with_product(mut self, product: u16) -> Self {
        self.product = product;
        self
    }

    /// Set the `file_id` serial number
    ///
    /// Left invalid if unset. Zero is FIT's invalid value for this field, so
    /// it is equivalent to leaving it unset.
    pub fn with_serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = Some(serial_number);
        self
    }
}

impl Default for FitActivityOptions {
    fn default() -> Self {
        Self {
            manufacturer: Manufacturer::Development as u16,
            product: 0,
            serial_number: None,
        }
    }
}

/// A write-only Garmin FIT activity file
pub struct ActivityFile<'a> {
    samples: &'a [TrackPoint],
    weather_temperatures: &'a [Option<f64>],
    sport: SportCodes,
    options: FitActivityOptions,
}

impl<'a> ActivityFile<'a> {
    /// Creates a new activity file from samples in recorded order
    ///
    /// The sport codes are looked up from `sport_label`; see
    /// [`crate::sport_codes`].
    pub fn new(sport_label: &str, samples: &'a [TrackPoint]) -> Self {
        Self {
            samples,
            weather_temperatures: &[],
            sport: sport_codes(sport_label),
            options: FitActivityOptions::default(),
        }
    }

    /// Set the sport codes directly, bypassing label lookup
    pub fn with_sport(mut self, sport: SportCodes) -> Self {
        self.sport = sport;
        self
    }

    /// Supply ambient temperatures from a weather source
    ///
    /// Indexed in parallel with the samples. Where present, a weather
    /// temperature takes precedence over the sample's own reading.
    pub fn with_weather_temperatures(mut self, temperatures: &'a [Option<f64>]) -> Self {
        self.weather_temperatures = temperatures;
        self
    }

    pub fn with_options(mut self, options: FitActivityOptions) -> Self {
        self.options = options;
        self
    }

    /// Encode the activity file
    #[tracing::instrument(name = "encode_fit", level = "debug", skip_all)]
    pub fn encode(&self) -> Vec<u8> {
        if !self.weather_temperatures.is_empty()
            && self.weather_temperatures.len() != self.samples.len()
        {
            debug!(
                "Weather temperatures cover {} of {} samples",
                self.weather_temperatures.len(),
                self.samples.len()
            );
        }

        let records = self
            .samples
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_timestamped())
            .map(|(i, p)| RecordMessage::from_track_point(p, self.weather_temperature(i)))
            .collect::<Vec<_>>();
        debug!(
            "Skipped records for {} samples without a timestamp",
            self.samples.len() - records.len()
        );

        // Laps and the session summarize every sample, timestamped or not.
        let points = self.samples.iter().collect::<Vec<_>>();

        let summary = ActivitySummary::from_points(&points);
        let laps = LapSummary::from_points(&points);

        let mut buf = FitBuffer::with_capacity(
            HEADER_SIZE + records.len() * RecordMessage::data_size() + 512,
        );
        FileHeader::new(0).encode(&mut buf);

        FileIdMessage::definition().encode(&mut buf);
        FileIdMessage {
            file_type: FileType::Activity,
            manufacturer: self.options.manufacturer,
            product: self.options.product,
            serial_number: self.options.serial_number,
            time_created: summary.start_time_ms.map(FitDateTime::from_epoch_millis),
        }
        .encode(&mut buf);

        if !records.is_empty() {
            RecordMessage::definition().encode(&mut buf);
            for record in &records {
                record.encode(&mut buf);
            }
        }
        debug!("Encoded {} record messages", records.len());

        if !laps.is_empty() {
            LapMessage::definition().encode(&mut buf);
            for (i, lap) in laps.iter().enumerate() {
                let index = u16::try_from(i).unwrap_or(u16::MAX);
                LapMessage::from_summary(lap, index, self.sport.sport).encode(&mut buf);
            }
        }
        debug!("Encoded {} lap messages", laps.len());

        let num_laps = u16::try_from(laps.len()).unwrap_or(u16::MAX);
        let session = SessionMessage::from_summary(&summary, num_laps, self.sport);
        SessionMessage::definition().encode(&mut buf);
        session.encode(&mut buf);

        ActivityMessage::definition().encode(&mut buf);
        ActivityMessage {
            timestamp: session.end_time,
            total_timer_time: session.elapsed,
        }
        .encode(&mut buf);

        let data_size = buf.len() - HEADER_SIZE;
        FileHeader::new(data_size).patch(&mut buf);
        let crc = checksum(buf.as_slice());
        buf.put_u16(crc);
        debug!("Wrote {data_size} data bytes + 2 byte CRC");

        buf.into_bytes()
    }

    /// Encode the activity file and write it out, returning the number of
    /// bytes written
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<usize> {
        let bytes = self.encode();
        w.write_all(&bytes)?;
        w.flush()?;
        debug!("Flushed base writer");
        Ok(bytes.len())
    }

    fn weather_temperature(&self, index: usize) -> Option<f64> {
        self.weather_temperatures.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{ActivityFile, FileHeader, FitActivityOptions, FitBuffer, HEADER_SIZE, checksum};
    use crate::measure::Meters;
    use crate::types::TrackPoint;

    fn data_size(bytes: &[u8]) -> usize {
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize
    }

    fn points(laps: &[u32]) -> Vec<TrackPoint> {
        laps.iter()
            .enumerate()
            .map(|(i, &lap)| TrackPoint {
                timestamp_ms: 1_672_531_200_000 + 1_000 * i as i64,
                distance: Meters(10.0 * i as f64),
                lap,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_header_encode() {
        let mut buf = FitBuffer::new();
        FileHeader::new(17032usize).encode(&mut buf);

        assert_eq!(
            buf.as_slice(),
            &[
                0x0e, 0x10, 0xa6, 0x52, 0x88, 0x42, 0x00, 0x00, 0x2e, 0x46, 0x49, 0x54, 0x0b, 0xb9,
            ]
        );
    }

    #[test]
    fn test_header_patch() {
        let mut patched = FitBuffer::new();
        FileHeader::new(0).encode(&mut patched);
        patched.put_u8(0xaa);
        FileHeader::new(17032usize).patch(&mut patched);

        let mut direct = FitBuffer::new();
        FileHeader::new(17032usize).encode(&mut direct);
        direct.put_u8(0xaa);

        assert_eq!(patched.as_slice(), direct.as_slice());
    }

    #[test]
    fn empty_activity() {
        let bytes = ActivityFile::new("running", &[]).encode();
        // Header, file_id, session and activity messages, and CRC.
        assert_eq!(bytes.len(), 14 + (21 + 14) + (72 + 51) + (24 + 14) + 2);
        assert_eq!(data_size(&bytes), bytes.len() - HEADER_SIZE - 2);
        assert_eq!(checksum(&bytes), 0);
    }

    #[test]
    fn single_lap() {
        let samples = points(&[0; 5]);
        let bytes = ActivityFile::new("cycling", &samples).encode();
        assert_eq!(
            bytes.len(),
            14 + (21 + 14) + (36 + 5 * 25) + (51 + 44) + (72 + 51) + (24 + 14) + 2
        );
        assert_eq!(data_size(&bytes), bytes.len() - HEADER_SIZE - 2);
        assert_eq!(checksum(&bytes[..14]), 0);
    }

    #[test]
    fn untimestamped_samples_skipped() {
        let mut samples = points(&[0, 0, 1, 1]);
        samples[1].timestamp_ms = 0;
        samples[3].timestamp_ms = -5;
        let bytes = ActivityFile::new("cycling", &samples).encode();
        assert_eq!(
            bytes.len(),
            14 + (21 + 14) + (36 + 2 * 25) + (51 + 2 * 44) + (72 + 51) + (24 + 14) + 2
        );
    }

    #[test]
    fn lap_without_timestamps_still_written() {
        let mut samples = points(&[0, 0, 0]);
        for p in &mut samples {
            p.timestamp_ms = 0;
        }
        let bytes = ActivityFile::new("running", &samples).encode();
        // No records, but one lap and its definition.
        assert_eq!(
            bytes.len(),
            14 + (21 + 14) + (51 + 44) + (72 + 51) + (24 + 14) + 2
        );

        let lap = 14 + 21 + 14 + 51;
        assert_eq!(bytes[lap], 0x03);
        assert_eq!(&bytes[lap + 1..lap + 9], &[0xFF; 8]);
        assert_eq!(&bytes[lap + 33..lap + 37], &2_000u32.to_le_bytes());
    }

    #[test]
    fn deterministic() {
        let samples = points(&[0, 0, 1, 2]);
        let weather = [Some(12.0), None];
        let encode = || {
            ActivityFile::new("hiking", &samples)
                .with_weather_temperatures(&weather)
                .with_options(FitActivityOptions::default().with_serial_number(1234))
                .encode()
        };
        assert_eq!(encode(), encode());
    }

    #[test]
    fn write_to_reports_size() -> Result<()> {
        let samples = points(&[0, 0, 0]);
        let file = ActivityFile::new("running", &samples);
        let mut out: Vec<u8> = vec![];
        let n = file.write_to(&mut out)?;
        assert_eq!(n, out.len());
        assert_eq!(out, file.encode());
        Ok(())
    }
}
