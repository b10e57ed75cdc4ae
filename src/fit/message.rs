//! FIT definition and data messages for activity files
//!
//! Field numbers, base types and enum values are taken from Profile.xlsx in
//! FIT SDK 21.158.00. Every message here is written little endian, with one
//! definition per local message type.

use tracing::debug;

use crate::fit::buffer::FitBuffer;
use crate::fit::codec::{
    FitDateTime, FitSurfacePoint, INVALID_SINT8, INVALID_SINT32, INVALID_UINT8, INVALID_UINT16,
    INVALID_UINT32, INVALID_UINT32Z, altitude_to_fit, distance_to_fit, duration_to_fit,
    speed_to_fit, temperature_to_fit, whole_meters_to_fit,
};
use crate::measure::{Centimeters, Milliseconds, MillimetersPerSecond};
use crate::sport::{Sport, SportCodes, SubSport};
use crate::summary::{ActivitySummary, LapSummary};
use crate::types::TrackPoint;

#[repr(u16)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlobalMessage {
    FileId = 0u16,
    Session = 18u16,
    Lap = 19u16,
    Record = 20u16,
    Activity = 34u16,
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BaseType {
    Enum = 0x00,
    SInt8 = 0x01,
    UInt8 = 0x02,
    UInt16 = 0x84,
    SInt32 = 0x85,
    UInt32 = 0x86,
    UInt32z = 0x8C,
}

impl BaseType {
    /// Size of one value of this type, in bytes.
    pub const fn size(self) -> u8 {
        match self {
            BaseType::Enum | BaseType::SInt8 | BaseType::UInt8 => 1,
            BaseType::UInt16 => 2,
            BaseType::SInt32 | BaseType::UInt32 | BaseType::UInt32z => 4,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FieldDefinition {
    pub field_number: u8,
    pub base_type: BaseType,
}

impl FieldDefinition {
    pub const fn new(field_number: u8, base_type: BaseType) -> Self {
        Self {
            field_number,
            base_type,
        }
    }

    pub const fn size(&self) -> u8 {
        self.base_type.size()
    }

    fn encode(&self, buf: &mut FitBuffer) {
        buf.put_u8(self.field_number);
        buf.put_u8(self.size());
        buf.put_u8(self.base_type as u8);
    }
}

/// Binds a local message type to a global message and its field layout.
pub struct DefinitionFrame {
    global_message: GlobalMessage,
    local_message_type: u8,
    field_definitions: &'static [FieldDefinition],
}

impl DefinitionFrame {
    pub fn new(
        global_message: GlobalMessage,
        local_message_type: u8,
        field_definitions: &'static [FieldDefinition],
    ) -> Self {
        Self {
            global_message,
            local_message_type,
            field_definitions,
        }
    }

    /// Encoded size, assuming no developer data fields.
    pub fn encoded_size(&self) -> usize {
        6 + 3 * self.field_definitions.len()
    }

    pub fn encode(&self, buf: &mut FitBuffer) {
        buf.put_u8(0b0100_0000 | (self.local_message_type & 0b0000_1111));
        buf.put_u8(0x00); // reserved
        buf.put_u8(0x00); // architecture = little endian
        buf.put_u16(self.global_message as u16);
        debug_assert!(self.field_definitions.len() <= u8::MAX as usize);
        buf.put_u8(self.field_definitions.len() as u8);

        for def in self.field_definitions {
            def.encode(buf);
        }
        debug!(
            "Wrote definition frame for {:?} with local type {}",
            self.global_message, self.local_message_type
        );
    }
}

/// A FIT data message with a fixed field layout.
pub trait DataMessage {
    const GLOBAL_MESSAGE: GlobalMessage;
    const LOCAL_MESSAGE_TYPE: u8;
    const FIELDS: &'static [FieldDefinition];

    /// Writes field values in the order of [`Self::FIELDS`].
    fn encode_fields(&self, buf: &mut FitBuffer);

    fn definition() -> DefinitionFrame {
        DefinitionFrame::new(Self::GLOBAL_MESSAGE, Self::LOCAL_MESSAGE_TYPE, Self::FIELDS)
    }

    /// Size of one data message including its header byte.
    fn data_size() -> usize {
        1 + Self::FIELDS
            .iter()
            .map(|def| def.size() as usize)
            .sum::<usize>()
    }

    fn encode(&self, buf: &mut FitBuffer) {
        let start = buf.len();
        buf.put_u8(Self::LOCAL_MESSAGE_TYPE & 0x0F);
        self.encode_fields(buf);
        debug_assert_eq!(buf.len() - start, Self::data_size());
    }
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileType {
    Activity = 4,
}

#[repr(u16)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Manufacturer {
    Development = 255,
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Session = 8,
    Lap = 9,
    Activity = 26,
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EventType {
    Stop = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActivityType {
    Manual = 0,
}

fn put_date_time(buf: &mut FitBuffer, value: Option<FitDateTime>) {
    buf.put_u32(value.map_or(INVALID_UINT32, FitDateTime::value));
}

fn put_position(buf: &mut FitBuffer, value: Option<FitSurfacePoint>) {
    match value {
        Some(p) => {
            buf.put_i32(p.lat.0);
            buf.put_i32(p.lon.0);
        }
        None => {
            buf.put_i32(INVALID_SINT32);
            buf.put_i32(INVALID_SINT32);
        }
    }
}

fn put_optional_u8(buf: &mut FitBuffer, value: Option<u8>) {
    buf.put_u8(value.unwrap_or(INVALID_UINT8));
}

pub struct FileIdMessage {
    pub file_type: FileType,
    pub manufacturer: u16,
    pub product: u16,
    pub serial_number: Option<u32>,
    pub time_created: Option<FitDateTime>,
}

impl DataMessage for FileIdMessage {
    const GLOBAL_MESSAGE: GlobalMessage = GlobalMessage::FileId;
    const LOCAL_MESSAGE_TYPE: u8 = 0;
    const FIELDS: &'static [FieldDefinition] = &[
        FieldDefinition::new(0, BaseType::Enum),    // type
        FieldDefinition::new(1, BaseType::UInt16),  // manufacturer
        FieldDefinition::new(2, BaseType::UInt16),  // product
        FieldDefinition::new(3, BaseType::UInt32z), // serial_number
        FieldDefinition::new(4, BaseType::UInt32),  // time_created
    ];

    fn encode_fields(&self, buf: &mut FitBuffer) {
        buf.put_u8(self.file_type as u8);
        buf.put_u16(self.manufacturer);
        buf.put_u16(self.product);
        buf.put_u32(self.serial_number.unwrap_or(INVALID_UINT32Z));
        put_date_time(buf, self.time_created);
    }
}

/// A single sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordMessage {
    pub timestamp: FitDateTime,
    pub position: Option<FitSurfacePoint>,
    pub distance: Centimeters<u32>,
    pub altitude: Option<u16>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,
    pub speed: MillimetersPerSecond<u16>,
    pub temperature: Option<i8>,
}

impl RecordMessage {
    /// Builds a record from a track point.
    ///
    /// A `weather_temperature` replaces the point's own temperature reading.
    pub fn from_track_point(point: &TrackPoint, weather_temperature: Option<f64>) -> Self {
        Self {
            timestamp: FitDateTime::from_epoch_millis(point.timestamp_ms),
            position: point.position.map(FitSurfacePoint::from),
            distance: distance_to_fit(point.distance),
            altitude: point.altitude.and_then(altitude_to_fit),
            heart_rate: point.measured_heart_rate(),
            cadence: point.cadence,
            speed: speed_to_fit(point.speed),
            temperature: weather_temperature
                .or(point.temperature)
                .and_then(temperature_to_fit),
        }
    }
}

impl DataMessage for RecordMessage {
    const GLOBAL_MESSAGE: GlobalMessage = GlobalMessage::Record;
    const LOCAL_MESSAGE_TYPE: u8 = 4;
    const FIELDS: &'static [FieldDefinition] = &[
        FieldDefinition::new(253, BaseType::UInt32), // timestamp
        FieldDefinition::new(0, BaseType::SInt32),   // position_lat
        FieldDefinition::new(1, BaseType::SInt32),   // position_long
        FieldDefinition::new(5, BaseType::UInt32),   // distance
        FieldDefinition::new(2, BaseType::UInt16),   // altitude
        FieldDefinition::new(3, BaseType::UInt8),    // heart_rate
        FieldDefinition::new(4, BaseType::UInt8),    // cadence
        FieldDefinition::new(6, BaseType::UInt16),   // speed
        FieldDefinition::new(13, BaseType::SInt8),   // temperature
        // Declared sint16 in the FIT profile. Always written as the invalid
        // u8, which decoders read as an unset field.
        FieldDefinition::new(9, BaseType::UInt8),    // grade
    ];

    fn encode_fields(&self, buf: &mut FitBuffer) {
        buf.put_u32(self.timestamp.value());
        put_position(buf, self.position);
        buf.put_u32(self.distance.0);
        buf.put_u16(self.altitude.unwrap_or(INVALID_UINT16));
        put_optional_u8(buf, self.heart_rate);
        put_optional_u8(buf, self.cadence);
        buf.put_u16(self.speed.0);
        buf.put_i8(self.temperature.unwrap_or(INVALID_SINT8));
        // Grade isn't computed.
        buf.put_u8(INVALID_UINT8);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LapMessage {
    pub message_index: u16,
    pub start_time: Option<FitDateTime>,
    pub end_time: Option<FitDateTime>,
    pub start_position: Option<FitSurfacePoint>,
    pub end_position: Option<FitSurfacePoint>,
    pub elapsed: Milliseconds<u32>,
    pub distance: Centimeters<u32>,
    pub avg_heart_rate: Option<u8>,
    pub max_heart_rate: Option<u8>,
    pub sport: Sport,
}

impl LapMessage {
    pub fn from_summary(summary: &LapSummary, message_index: u16, sport: Sport) -> Self {
        Self {
            message_index,
            start_time: summary.start_time_ms.map(FitDateTime::from_epoch_millis),
            end_time: summary.end_time_ms.map(FitDateTime::from_epoch_millis),
            start_position: summary.start_position.map(FitSurfacePoint::from),
            end_position: summary.end_position.map(FitSurfacePoint::from),
            elapsed: duration_to_fit(summary.elapsed),
            distance: distance_to_fit(summary.distance),
            avg_heart_rate: summary.avg_heart_rate,
            max_heart_rate: summary.max_heart_rate,
            sport,
        }
    }
}

impl DataMessage for LapMessage {
    const GLOBAL_MESSAGE: GlobalMessage = GlobalMessage::Lap;
    const LOCAL_MESSAGE_TYPE: u8 = 3;
    const FIELDS: &'static [FieldDefinition] = &[
        FieldDefinition::new(253, BaseType::UInt32), // timestamp
        FieldDefinition::new(2, BaseType::UInt32),   // start_time
        FieldDefinition::new(3, BaseType::SInt32),   // start_position_lat
        FieldDefinition::new(4, BaseType::SInt32),   // start_position_long
        FieldDefinition::new(5, BaseType::SInt32),   // end_position_lat
        FieldDefinition::new(6, BaseType::SInt32),   // end_position_long
        FieldDefinition::new(7, BaseType::UInt32),   // total_elapsed_time
        FieldDefinition::new(8, BaseType::UInt32),   // total_timer_time
        FieldDefinition::new(9, BaseType::UInt32),   // total_distance
        FieldDefinition::new(15, BaseType::UInt8),   // avg_heart_rate
        FieldDefinition::new(16, BaseType::UInt8),   // max_heart_rate
        FieldDefinition::new(254, BaseType::UInt16), // message_index
        FieldDefinition::new(0, BaseType::Enum),     // event
        FieldDefinition::new(1, BaseType::Enum),     // event_type
        FieldDefinition::new(25, BaseType::Enum),    // sport
    ];

    fn encode_fields(&self, buf: &mut FitBuffer) {
        put_date_time(buf, self.end_time);
        put_date_time(buf, self.start_time);
        put_position(buf, self.start_position);
        put_position(buf, self.end_position);
        buf.put_u32(self.elapsed.0);
        buf.put_u32(self.elapsed.0);
        buf.put_u32(self.distance.0);
        put_optional_u8(buf, self.avg_heart_rate);
        put_optional_u8(buf, self.max_heart_rate);
        buf.put_u16(self.message_index);
        buf.put_u8(Event::Lap as u8);
        buf.put_u8(EventType::Stop as u8);
        buf.put_u8(self.sport as u8);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionMessage {
    pub start_time: Option<FitDateTime>,
    pub end_time: Option<FitDateTime>,
    pub start_position: Option<FitSurfacePoint>,
    pub elapsed: Milliseconds<u32>,
    pub distance: Centimeters<u32>,
    pub avg_speed: MillimetersPerSecond<u16>,
    pub max_speed: MillimetersPerSecond<u16>,
    pub avg_heart_rate: Option<u8>,
    pub max_heart_rate: Option<u8>,
    pub avg_cadence: Option<u8>,
    pub max_cadence: Option<u8>,
    pub total_ascent: u16,
    pub total_descent: u16,
    pub num_laps: u16,
    pub sport: Sport,
    pub sub_sport: SubSport,
}

impl SessionMessage {
    pub fn from_summary(summary: &ActivitySummary, num_laps: u16, codes: SportCodes) -> Self {
        Self {
            start_time: summary.start_time_ms.map(FitDateTime::from_epoch_millis),
            end_time: summary.end_time_ms.map(FitDateTime::from_epoch_millis),
            start_position: summary.start_position.map(FitSurfacePoint::from),
            elapsed: duration_to_fit(summary.elapsed),
            distance: distance_to_fit(summary.total_distance),
            avg_speed: speed_to_fit(summary.avg_speed),
            max_speed: speed_to_fit(summary.max_speed),
            avg_heart_rate: summary.avg_heart_rate,
            max_heart_rate: summary.max_heart_rate,
            avg_cadence: summary.avg_cadence,
            max_cadence: summary.max_cadence,
            total_ascent: whole_meters_to_fit(summary.total_ascent),
            total_descent: whole_meters_to_fit(summary.total_descent),
            num_laps,
            sport: codes.sport,
            sub_sport: codes.sub_sport,
        }
    }
}

impl DataMessage for SessionMessage {
    const GLOBAL_MESSAGE: GlobalMessage = GlobalMessage::Session;
    const LOCAL_MESSAGE_TYPE: u8 = 2;
    const FIELDS: &'static [FieldDefinition] = &[
        FieldDefinition::new(253, BaseType::UInt32), // timestamp
        FieldDefinition::new(2, BaseType::UInt32),   // start_time
        FieldDefinition::new(3, BaseType::SInt32),   // start_position_lat
        FieldDefinition::new(4, BaseType::SInt32),   // start_position_long
        FieldDefinition::new(7, BaseType::UInt32),   // total_elapsed_time
        FieldDefinition::new(8, BaseType::UInt32),   // total_timer_time
        FieldDefinition::new(9, BaseType::UInt32),   // total_distance
        FieldDefinition::new(14, BaseType::UInt16),  // avg_speed
        FieldDefinition::new(15, BaseType::UInt16),  // max_speed
        FieldDefinition::new(16, BaseType::UInt8),   // avg_heart_rate
        FieldDefinition::new(17, BaseType::UInt8),   // max_heart_rate
        FieldDefinition::new(18, BaseType::UInt8),   // avg_cadence
        FieldDefinition::new(19, BaseType::UInt8),   // max_cadence
        FieldDefinition::new(22, BaseType::UInt16),  // total_ascent
        FieldDefinition::new(23, BaseType::UInt16),  // total_descent
        FieldDefinition::new(25, BaseType::UInt16),  // first_lap_index
        FieldDefinition::new(26, BaseType::UInt16),  // num_laps
        FieldDefinition::new(254, BaseType::UInt16), // message_index
        FieldDefinition::new(0, BaseType::Enum),     // event
        FieldDefinition::new(1, BaseType::Enum),     // event_type
        FieldDefinition::new(5, BaseType::Enum),     // sport
        FieldDefinition::new(6, BaseType::Enum),     // sub_sport
    ];

    fn encode_fields(&self, buf: &mut FitBuffer) {
        put_date_time(buf, self.end_time);
        put_date_time(buf, self.start_time);
        put_position(buf, self.start_position);
        buf.put_u32(self.elapsed.0);
        buf.put_u32(self.elapsed.0);
        buf.put_u32(self.distance.0);
        buf.put_u16(self.avg_speed.0);
        buf.put_u16(self.max_speed.0);
        put_optional_u8(buf, self.avg_heart_rate);
        put_optional_u8(buf, self.max_heart_rate);
        put_optional_u8(buf, self.avg_cadence);
        put_optional_u8(buf, self.max_cadence);
        buf.put_u16(self.total_ascent);
        buf.put_u16(self.total_descent);
        buf.put_u16(0); // first_lap_index
        buf.put_u16(self.num_laps);
        buf.put_u16(0); // message_index
        buf.put_u8(Event::Session as u8);
        buf.put_u8(EventType::Stop as u8);
        buf.put_u8(self.sport as u8);
        buf.put_u8(self.sub_sport as u8);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityMessage {
    pub timestamp: Option<FitDateTime>,
    pub total_timer_time: Milliseconds<u32>,
}

impl DataMessage for ActivityMessage {
    const GLOBAL_MESSAGE: GlobalMessage = GlobalMessage::Activity;
    const LOCAL_MESSAGE_TYPE: u8 = 1;
    const FIELDS: &'static [FieldDefinition] = &[
        FieldDefinition::new(253, BaseType::UInt32), // timestamp
        FieldDefinition::new(0, BaseType::UInt32),   // total_timer_time
        FieldDefinition::new(1, BaseType::UInt16),   // num_sessions
        FieldDefinition::new(2, BaseType::Enum),     // type
        FieldDefinition::new(3, BaseType::Enum),     // event
        FieldDefinition::new(4, BaseType::Enum),     // event_type
    ];

    fn encode_fields(&self, buf: &mut FitBuffer) {
        put_date_time(buf, self.timestamp);
        buf.put_u32(self.total_timer_time.0);
        buf.put_u16(1);
        buf.put_u8(ActivityType::Manual as u8);
        buf.put_u8(Event::Activity as u8);
        buf.put_u8(EventType::Stop as u8);
    }
}
