//! Mapping free-text activity labels to FIT sport codes
//!
//! Recording apps label activities with whatever string the user picked
//! ("Trail Running", "bike", ...). FIT wants a `sport` and `sub_sport` enum
//! pair. [`sport_codes`] looks labels up case-insensitively in a static table
//! and falls back to generic/generic for anything it doesn't recognize.

use phf::phf_map;
use strum::{Display, EnumString};

/// Sport types
///
/// Names and numeric values manually copied from Profile.xlsx in FIT SDK
/// 21.158.00.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Display, EnumString, Debug)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum Sport {
    Generic = 0u8,
    Running = 1u8,
    Cycling = 2u8,
    Transition = 3u8, // Multisport transition
    FitnessEquipment = 4u8,
    Swimming = 5u8,
    Basketball = 6u8,
    Soccer = 7u8,
    Tennis = 8u8,
    AmericanFootball = 9u8,
    Training = 10u8,
    Walking = 11u8,
    CrossCountrySkiing = 12u8,
    AlpineSkiing = 13u8,
    Snowboarding = 14u8,
    Rowing = 15u8,
    Mountaineering = 16u8,
    Hiking = 17u8,
    Multisport = 18u8,
    Paddling = 19u8,
    Flying = 20u8,
    EBiking = 21u8,
    Motorcycling = 22u8,
    Boating = 23u8,
    Driving = 24u8,
    Golf = 25u8,
    HangGliding = 26u8,
    HorsebackRiding = 27u8,
    Hunting = 28u8,
    Fishing = 29u8,
    InlineSkating = 30u8,
    RockClimbing = 31u8,
    Sailing = 32u8,
    IceSkating = 33u8,
    SkyDiving = 34u8,
    Snowshoeing = 35u8,
    Snowmobiling = 36u8,
}

/// Sub-sport types
///
/// The subset of Profile.xlsx's `sub_sport` values that [`sport_codes`] can
/// produce.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Display, EnumString, Debug)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum SubSport {
    Generic = 0u8,
    Treadmill = 1u8,
    Street = 2u8,
    Trail = 3u8,
    Track = 4u8,
    Spin = 5u8,
    IndoorCycling = 6u8,
    Road = 7u8,
    Mountain = 8u8,
    Downhill = 9u8,
    Cyclocross = 11u8,
    Elliptical = 15u8,
    LapSwimming = 17u8,
    OpenWater = 18u8,
    Gravel = 46u8,
}

/// The `sport` and `sub_sport` pair written to FIT session and lap messages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SportCodes {
    pub sport: Sport,
    pub sub_sport: SubSport,
}

impl SportCodes {
    pub const GENERIC: SportCodes = SportCodes::new(Sport::Generic, SubSport::Generic);

    pub const fn new(sport: Sport, sub_sport: SubSport) -> Self {
        Self { sport, sub_sport }
    }

    /// The raw numeric `(sport, sub_sport)` values.
    pub fn codes(self) -> (u8, u8) {
        (self.sport as u8, self.sub_sport as u8)
    }
}

impl Default for SportCodes {
    fn default() -> Self {
        Self::GENERIC
    }
}

static SPORT_LABELS: phf::Map<&'static str, SportCodes> = phf_map! {
    "running" => SportCodes::new(Sport::Running, SubSport::Generic),
    "run" => SportCodes::new(Sport::Running, SubSport::Generic),
    "jogging" => SportCodes::new(Sport::Running, SubSport::Generic),
    "street running" => SportCodes::new(Sport::Running, SubSport::Street),
    "treadmill" => SportCodes::new(Sport::Running, SubSport::Treadmill),
    "treadmill running" => SportCodes::new(Sport::Running, SubSport::Treadmill),
    "track running" => SportCodes::new(Sport::Running, SubSport::Track),
    "trail running" => SportCodes::new(Sport::Running, SubSport::Trail),
    "marathon" => SportCodes::new(Sport::Running, SubSport::Trail),
    "cycling" => SportCodes::new(Sport::Cycling, SubSport::Generic),
    "bike" => SportCodes::new(Sport::Cycling, SubSport::Generic),
    "biking" => SportCodes::new(Sport::Cycling, SubSport::Generic),
    "road cycling" => SportCodes::new(Sport::Cycling, SubSport::Road),
    "road bike" => SportCodes::new(Sport::Cycling, SubSport::Road),
    "mountain bike" => SportCodes::new(Sport::Cycling, SubSport::Mountain),
    "mountain biking" => SportCodes::new(Sport::Cycling, SubSport::Mountain),
    "downhill biking" => SportCodes::new(Sport::Cycling, SubSport::Downhill),
    "gravel cycling" => SportCodes::new(Sport::Cycling, SubSport::Gravel),
    "cyclocross" => SportCodes::new(Sport::Cycling, SubSport::Cyclocross),
    "indoor cycling" => SportCodes::new(Sport::Cycling, SubSport::IndoorCycling),
    "spinning" => SportCodes::new(Sport::Cycling, SubSport::Spin),
    "e-bike" => SportCodes::new(Sport::EBiking, SubSport::Generic),
    "e-biking" => SportCodes::new(Sport::EBiking, SubSport::Generic),
    "hiking" => SportCodes::new(Sport::Walking, SubSport::Generic),
    "walking" => SportCodes::new(Sport::Walking, SubSport::Generic),
    "swimming" => SportCodes::new(Sport::Swimming, SubSport::Generic),
    "swimming - pool" => SportCodes::new(Sport::Swimming, SubSport::LapSwimming),
    // Written with sub_sport 1, not open_water (18).
    "swimming - open water" => SportCodes::new(Sport::Swimming, SubSport::Treadmill),
    "open water swimming" => SportCodes::new(Sport::Swimming, SubSport::OpenWater),
    "elliptical" => SportCodes::new(Sport::FitnessEquipment, SubSport::Elliptical),
    "training" => SportCodes::new(Sport::Training, SubSport::Generic),
    "workout" => SportCodes::new(Sport::Training, SubSport::Generic),
    "rowing" => SportCodes::new(Sport::Rowing, SubSport::Generic),
    "kayaking" => SportCodes::new(Sport::Paddling, SubSport::Generic),
    "canoeing" => SportCodes::new(Sport::Paddling, SubSport::Generic),
    "paddling" => SportCodes::new(Sport::Paddling, SubSport::Generic),
    "cross-country skiing" => SportCodes::new(Sport::CrossCountrySkiing, SubSport::Generic),
    "nordic skiing" => SportCodes::new(Sport::CrossCountrySkiing, SubSport::Generic),
    "skiing" => SportCodes::new(Sport::AlpineSkiing, SubSport::Generic),
    "alpine skiing" => SportCodes::new(Sport::AlpineSkiing, SubSport::Generic),
    "snowboarding" => SportCodes::new(Sport::Snowboarding, SubSport::Generic),
    "snowshoeing" => SportCodes::new(Sport::Snowshoeing, SubSport::Generic),
    "mountaineering" => SportCodes::new(Sport::Mountaineering, SubSport::Generic),
    "rock climbing" => SportCodes::new(Sport::RockClimbing, SubSport::Generic),
    "inline skating" => SportCodes::new(Sport::InlineSkating, SubSport::Generic),
    "ice skating" => SportCodes::new(Sport::IceSkating, SubSport::Generic),
    "sailing" => SportCodes::new(Sport::Sailing, SubSport::Generic),
    "horseback riding" => SportCodes::new(Sport::HorsebackRiding, SubSport::Generic),
    "golf" => SportCodes::new(Sport::Golf, SubSport::Generic),
};

/// Look up the FIT sport codes for an activity label.
///
/// Matching ignores case and surrounding whitespace. Unknown labels map to
/// [`SportCodes::GENERIC`].
pub fn sport_codes(label: &str) -> SportCodes {
    let key = label.trim().to_lowercase();
    SPORT_LABELS
        .get(key.as_str())
        .copied()
        .unwrap_or(SportCodes::GENERIC)
}

/// All recognized labels and their codes, sorted by label.
pub fn known_labels() -> Vec<(&'static str, SportCodes)> {
    let mut labels = SPORT_LABELS
        .entries()
        .map(|(label, codes)| (*label, *codes))
        .collect::<Vec<_>>();
    labels.sort_by_key(|(label, _)| *label);
    labels
}
