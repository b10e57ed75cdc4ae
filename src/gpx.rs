//! GPX activity track reader
//!
//! # Usage
//!
//! Provides an iterator that reads in sequence the tracks, segments and
//! trackpoints of a recorded GPX activity.
//!
//! To use this module, instantiate a [`GpxReader`] by calling
//! [`GpxReader::from_reader`]. Iterating over the [`GpxReader`] will produce a
//! sequence of [`GpxItem`] describing the contents of the input.
//!
//! Besides position, elevation and time, trackpoints may carry heart rate,
//! cadence and air temperature in a Garmin `TrackPointExtension`. Namespace
//! prefixes are ignored when matching element names, so any prefix bound to
//! that extension schema works.

use std::io::BufRead;
use std::num::{ParseFloatError, ParseIntError};
use std::{mem, str};

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::events::attributes::AttrError;
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::debug;

use crate::measure::{Degrees, Meters};
use crate::types::{GeoPoint, TypeError};

/// An error processing a GPX track file.
#[derive(Error, Debug)]
pub enum GpxError {
    #[error("XML processing error")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute processing error")]
    XmlAttr(#[from] AttrError),
    #[error("UTF-8 decoding error")]
    Utf8(#[from] str::Utf8Error),
    #[error("parsing floating-point number")]
    ParseFloat(#[from] ParseFloatError),
    #[error("parsing integer")]
    ParseInt(#[from] ParseIntError),
    #[error("parsing timestamp")]
    ParseTime(#[from] chrono::ParseError),
    #[error("GPX schema error")]
    GpxSchema(String),
    #[error("type invariant error")]
    Type(#[from] TypeError),
}

type Result<T> = std::result::Result<T, GpxError>;

/// An item parsed from a GPX document.
#[derive(Clone, PartialEq, Debug)]
pub enum GpxItem {
    /// Indicates the start of a GPX track.  Subsequent `TrackName`,
    /// `TrackSegment`, and `TrackPoint` items belong to this track.
    Track,
    /// Optionally provides the name of a GPX track.
    TrackName(String),
    /// Indicates the start of a GPX track segment.  Subsequent `TrackPoint`
    /// items belong to this segment, until the next `Track` or `TrackSegment`
    /// is encountered.
    TrackSegment,
    /// A point along a track segment, returned in recorded order.
    TrackPoint(GpxTrackPoint),
}

/// A recorded GPX trackpoint.
#[derive(Clone, PartialEq, Debug)]
pub struct GpxTrackPoint {
    pub point: GeoPoint,
    pub elevation: Option<Meters<f64>>,
    pub time: Option<DateTime<Utc>>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,

    /// Air temperature in degrees Celsius.
    pub temperature: Option<f64>,
}

impl TryFrom<NextPtFields> for GpxTrackPoint {
    type Error = GpxError;

    fn try_from(value: NextPtFields) -> Result<Self> {
        let lat = value.lat.ok_or(GpxError::GpxSchema(
            "trackpoint missing lat attribute".to_owned(),
        ))?;
        let lon = value.lon.ok_or(GpxError::GpxSchema(
            "trackpoint missing lon attribute".to_owned(),
        ))?;
        Ok(Self {
            point: GeoPoint::new(lat, lon)?,
            elevation: value.ele,
            time: value.time,
            heart_rate: value.hr,
            cadence: value.cad,
            temperature: value.atemp,
        })
    }
}

/// A reader for GPX Track files
///
/// Implements an Iterator that emits the file's tracks and trackpoints.
pub struct GpxReader<R>
where
    R: BufRead,
{
    reader: Reader<R>,
    tag_path: TagPath,
    next_pt_fields: NextPtFields,
    num_tag_start: usize,
    num_tag_end: usize,
    num_next: usize,
}

impl<R> GpxReader<R>
where
    R: BufRead,
{
    fn new(mut reader: Reader<R>) -> GpxReader<R> {
        // Needed because our parsing logic relies on maintaining a stack of tag
        // names, which would otherwise be broken by empty trkpt tags not
        // generating an "End" event.
        reader.config_mut().expand_empty_elements = true;

        Self {
            reader,
            tag_path: vec![],
            next_pt_fields: NextPtFields::default(),
            num_tag_start: 0,
            num_tag_end: 0,
            num_next: 0,
        }
    }
}

impl<R: BufRead> GpxReader<R> {
    pub fn from_reader(reader: R) -> GpxReader<R> {
        GpxReader::new(Reader::from_reader(reader))
    }
}

#[derive(Default)]
struct NextPtFields {
    lat: Option<Degrees<f64>>,
    lon: Option<Degrees<f64>>,
    ele: Option<Meters<f64>>,
    time: Option<DateTime<Utc>>,
    hr: Option<u8>,
    cad: Option<u8>,
    atemp: Option<f64>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum Tag {
    Gpx,
    Trk,
    Name,
    Trkseg,
    Trkpt,
    Ele,
    Time,
    Extensions,
    Hr,
    Cad,
    Atemp,
    Unknown,
}

fn get_tag(local_name: &[u8]) -> Tag {
    match local_name {
        b"gpx" => Tag::Gpx,
        b"trk" => Tag::Trk,
        b"trkseg" => Tag::Trkseg,
        b"trkpt" => Tag::Trkpt,
        b"ele" => Tag::Ele,
        b"time" => Tag::Time,
        b"name" => Tag::Name,
        b"extensions" => Tag::Extensions,
        b"hr" => Tag::Hr,
        b"cad" => Tag::Cad,
        b"atemp" => Tag::Atemp,
        _ => Tag::Unknown,
    }
}

type TagPath = Vec<Tag>;

fn text_str(text: &[u8]) -> Result<&str> {
    Ok(str::from_utf8(text)?.trim())
}

impl<R> GpxReader<R>
where
    R: BufRead,
{
    /// Stores the text content of a trackpoint child element.
    fn read_point_text(&mut self, text: &[u8]) -> Result<()> {
        let s = text_str(text)?;
        if s.is_empty() {
            return Ok(());
        }
        let fields = &mut self.next_pt_fields;
        match self.tag_path.as_slice() {
            [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, Tag::Ele] => {
                fields.ele = Some(Meters(s.parse::<f64>()?));
            }
            [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, Tag::Time] => {
                fields.time = Some(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc));
            }
            [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, Tag::Extensions, .., Tag::Hr] => {
                fields.hr = Some(s.parse::<u8>()?);
            }
            [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, Tag::Extensions, .., Tag::Cad] => {
                fields.cad = Some(s.parse::<u8>()?);
            }
            [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, Tag::Extensions, .., Tag::Atemp] => {
                fields.atemp = Some(s.parse::<f64>()?);
            }
            _ => (),
        }
        Ok(())
    }
}

impl<R> Iterator for GpxReader<R>
where
    R: BufRead,
{
    type Item = Result<GpxItem>;

    fn next(&mut self) -> Option<Result<GpxItem>> {
        self.num_next += 1;
        let mut buf = Vec::new();

        // Keep iterating through quick_xml events until a new GpxItem can be
        // successfully emitted, any error occurs, or EOF is reached.
        loop {
            match self.reader.read_event_into(&mut buf) {
                Err(err) => return Some(Err(GpxError::Xml(err))),

                Ok(Event::Eof) => {
                    debug!(
                        "GpxReader processed {} tag start and {} tag end events in {} iterations",
                        self.num_tag_start, self.num_tag_end, self.num_next
                    );
                    return None;
                }

                Ok(Event::Start(elt)) => {
                    self.num_tag_start += 1;
                    let tag = get_tag(elt.local_name().as_ref());
                    self.tag_path.push(tag);

                    match self.tag_path.as_slice() {
                        [Tag::Gpx, Tag::Trk] => {
                            debug!("Found start of track at path: {:?}", self.tag_path);
                            return Some(Ok(GpxItem::Track));
                        }

                        [Tag::Gpx, Tag::Trk, Tag::Trkseg] => {
                            return Some(Ok(GpxItem::TrackSegment));
                        }

                        [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt] => {
                            if let Err(e) = (|| {
                                for attr in elt.attributes() {
                                    let a = attr?;
                                    if a.key == QName(b"lat") {
                                        self.next_pt_fields.lat =
                                            Some(Degrees(text_str(&a.value)?.parse::<f64>()?));
                                    } else if a.key == QName(b"lon") {
                                        self.next_pt_fields.lon =
                                            Some(Degrees(text_str(&a.value)?.parse::<f64>()?));
                                    }
                                }
                                Ok(())
                            })() {
                                return Some(Err(e));
                            }
                        }

                        _ => (),
                    }
                }

                Ok(Event::Text(text)) => match self.tag_path.as_slice() {
                    [Tag::Gpx, Tag::Trk, Tag::Name] => {
                        return Some(match str::from_utf8(text.as_ref()) {
                            Err(err) => Err(GpxError::Utf8(err)),
                            Ok(s) => Ok(GpxItem::TrackName(s.to_owned())),
                        });
                    }

                    [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt, ..] => {
                        if let Err(e) = self.read_point_text(text.as_ref()) {
                            return Some(Err(e));
                        }
                    }

                    _ => (),
                },

                Ok(Event::End(_elt)) => {
                    self.num_tag_end += 1;
                    let tag_path = self.tag_path.clone();
                    self.tag_path.pop();

                    if let [Tag::Gpx, Tag::Trk, Tag::Trkseg, Tag::Trkpt] = tag_path.as_slice() {
                        return Some(
                            GpxTrackPoint::try_from(mem::take(&mut self.next_pt_fields))
                                .map(GpxItem::TrackPoint),
                        );
                    }
                }

                _ => (),
            }
            buf.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use quick_xml::Reader;

    use super::{GpxError, GpxItem, GpxReader, GpxTrackPoint, Result};
    use crate::geo_points;
    use crate::measure::Meters;

    impl GpxReader<&[u8]> {
        pub fn from_text(s: &str) -> GpxReader<&[u8]> {
            GpxReader::new(Reader::from_reader(s.as_bytes()))
        }
    }

    fn trackpoints(items: &[GpxItem]) -> Vec<GpxTrackPoint> {
        items
            .iter()
            .filter_map(|item| match item {
                GpxItem::TrackPoint(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_trackpoints() -> Result<()> {
        let xml = r#"
<gpx>
  <trk>
    <name>Coyote</name>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737" />
      <trkpt lat="37.39958" lon="-122.13684" />
      <trkpt lat="37.39923" lon="-122.13591" />
      <trkpt lat="37.39888" lon="-122.13498" />
    </trkseg>
  </trk>
</gpx>
"#;

        let expected = geo_points![
            (37.39987, -122.13737),
            (37.39958, -122.13684),
            (37.39923, -122.13591),
            (37.39888, -122.13498),
        ];

        let reader = GpxReader::from_text(xml);
        let items = reader.collect::<Result<Vec<_>>>()?;
        let points = trackpoints(&items);
        let result = points.iter().map(|p| p.point).collect::<Vec<_>>();

        assert_eq!(result, expected);
        assert!(points.iter().all(|p| p.time.is_none() && p.elevation.is_none()));
        Ok(())
    }

    #[test]
    fn test_trackpoints_with_time_and_elevation() -> Result<()> {
        let xml = r#"
<gpx>
  <trk>
    <name>Coyote</name>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737">
        <ele>30.5</ele>
        <time>2025-04-15T16:09:37Z</time>
      </trkpt>
      <trkpt lat="37.39958" lon="-122.13684">
        <ele> 29.9 </ele>
        <time>2025-04-15T09:09:42.500-07:00</time>
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let items = reader.collect::<Result<Vec<_>>>()?;
        let points = trackpoints(&items);

        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].elevation.unwrap(), Meters(30.5));
        assert_relative_eq!(points[1].elevation.unwrap(), Meters(29.9));
        assert_eq!(
            points[0].time,
            Some(Utc.with_ymd_and_hms(2025, 4, 15, 16, 9, 37).unwrap())
        );
        assert_eq!(
            points[1].time.map(|t| t.timestamp_millis()),
            Some(Utc.with_ymd_and_hms(2025, 4, 15, 16, 9, 42).unwrap().timestamp_millis() + 500)
        );
        Ok(())
    }

    #[test]
    fn test_trackpoint_extensions() -> Result<()> {
        let xml = r#"
<gpx xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <trk>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737">
        <time>2025-04-15T16:09:37Z</time>
        <extensions>
          <gpxtpx:TrackPointExtension>
            <gpxtpx:atemp>21.5</gpxtpx:atemp>
            <gpxtpx:hr>142</gpxtpx:hr>
            <gpxtpx:cad>88</gpxtpx:cad>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
      <trkpt lat="37.39958" lon="-122.13684">
        <time>2025-04-15T16:09:38Z</time>
        <extensions>
          <ns3:TrackPointExtension>
            <ns3:hr>143</ns3:hr>
          </ns3:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let items = reader.collect::<Result<Vec<_>>>()?;
        let points = trackpoints(&items);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].heart_rate, Some(142));
        assert_eq!(points[0].cadence, Some(88));
        assert_eq!(points[0].temperature, Some(21.5));
        assert_eq!(points[1].heart_rate, Some(143));
        assert_eq!(points[1].cadence, None);
        assert_eq!(points[1].temperature, None);
        Ok(())
    }

    #[test]
    fn test_invalid_trackpoint() -> Result<()> {
        let xml = r#"
<gpx>
  <trk>
    <name>Foo</name>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737">
        <ele>30.5</ele>
      </trkpt>
      <trkpt lat="37.39958">
        <ele>29.9</ele>
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let result = reader.collect::<Result<Vec<_>>>();
        assert!(
            matches!(result, Err(GpxError::GpxSchema(mesg)) if mesg == "trackpoint missing lon attribute")
        );

        Ok(())
    }

    #[test]
    fn test_invalid_heart_rate() {
        let xml = r#"
<gpx>
  <trk>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737">
        <extensions><TrackPointExtension><hr>fast</hr></TrackPointExtension></extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let result = reader.collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(GpxError::ParseInt(_))));
    }

    #[test]
    fn test_invalid_time() {
        let xml = r#"
<gpx>
  <trk>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737"><time>yesterday</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let result = reader.collect::<Result<Vec<_>>>();
        assert!(matches!(result, Err(GpxError::ParseTime(_))));
    }

    #[test]
    fn test_track_name() -> Result<()> {
        let xml = r#"
<gpx>
  <metadata>
    <name>Not a track name</name>
  </metadata>
  <trk>
    <name>Coyote</name>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737" />
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let items = reader.collect::<Result<Vec<_>>>()?;
        let result = items
            .iter()
            .filter_map(|ele| match ele {
                GpxItem::TrackName(n) => Some(n),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(result, vec!["Coyote"]);
        Ok(())
    }

    #[test]
    fn test_track_and_track_segments() -> Result<()> {
        let xml = r#"
<gpx>
  <trk>
    <name>Coyote</name>
    <trkseg>
      <trkpt lat="37.39987" lon="-122.13737" />
    </trkseg>
    <trkseg>
      <trkpt lat="37.39958" lon="-122.13684" />
    </trkseg>
  </trk>
</gpx>
"#;

        let reader = GpxReader::from_text(xml);
        let items = reader.collect::<Result<Vec<_>>>()?;

        assert_eq!(
            items
                .iter()
                .filter(|e| matches!(e, GpxItem::Track))
                .count(),
            1
        );
        assert_eq!(
            items
                .iter()
                .filter(|e| matches!(e, GpxItem::TrackSegment))
                .count(),
            2
        );
        Ok(())
    }
}
