//! The swathio data model
//!
//! Drivers translate their vendor records into these format-independent
//! types. A [`Ping`] is the normalized view of one survey record; the
//! narrower structs ([`Navigation`], [`Altitude`], [`Svp`], ...) are what the
//! driver accessors return when a caller does not need a full extraction.
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod epoch;

/// Amplitude value carried by a sidescan pixel with no data
///
/// Zero is a legal amplitude, so absent pixels use this sentinel instead.
pub const SIDESCAN_NULL: f64 = -1_000_000_000.0;

/// The kind of logical record a driver decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(Deserialize, Serialize)]
pub enum DataKind {
    /// Nothing decoded yet
    #[default]
    None,
    /// Survey data (a ping or scan)
    Data,
    /// A free-text comment
    Comment,
    /// A file header
    Header,
    /// Sonar or scanner parameters
    Parameter,
    /// A sound velocity profile
    VelocityProfile,
    /// An asynchronous navigation fix
    Navigation,
    /// An asynchronous attitude sample
    Attitude,
    /// An asynchronous heading sample
    Heading,
    /// An asynchronous sensor depth sample
    SensorDepth,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataKind::None => "None",
            DataKind::Data => "Data",
            DataKind::Comment => "Comment",
            DataKind::Header => "Header",
            DataKind::Parameter => "Parameter",
            DataKind::VelocityProfile => "VelocityProfile",
            DataKind::Navigation => "Navigation",
            DataKind::Attitude => "Attitude",
            DataKind::Heading => "Heading",
            DataKind::SensorDepth => "SensorDepth",
        };
        write!(f, "{}", s)
    }
}

bitflags! {
    /// Per-beam quality flag
    ///
    /// Two super-states share the reason bits: `FLAG` (ignore this beam)
    /// and `SELECT` (this beam was chosen among redundant solutions). The
    /// reason bits only mean something when their super-state bit is set,
    /// which is why the selection reasons alias the flag reasons. The one
    /// value carrying both super-state bits is reserved for `NULL` (no data).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[derive(Deserialize, Serialize)]
    pub struct BeamFlag: u8 {
        /// Flagged super-state
        const FLAG = 0x01;
        /// Selected super-state
        const SELECT = 0x02;
        /// No data in this slot
        const NULL = 0x03;
        /// Flagged by manual editing
        const MANUAL = 0x04;
        /// Flagged by an automatic filter
        const FILTER = 0x08;
        /// Exceeds one times the uncertainty threshold
        const GT_1X_IHO = 0x10;
        /// Exceeds two times the uncertainty threshold
        const GT_2X_IHO = 0x20;
        /// Footprint too large
        const FOOTPRINT = 0x40;
        /// Reported unreliable by the sonar
        const SONAR = 0x80;
        /// Selected as the least depth
        const LEAST_DEPTH = 0x04;
        /// Selected as the average depth
        const AVERAGE_DEPTH = 0x08;
        /// Selected as the maximum depth
        const MAXIMUM_DEPTH = 0x10;
        /// Selected as a contact
        const CONTACT = 0x20;
    }
}

impl BeamFlag {
    /// A good, unflagged beam
    pub const NONE: BeamFlag = BeamFlag::empty();

    /// Return `true` for the null (no data) value
    pub fn is_null(&self) -> bool {
        self.contains(BeamFlag::NULL)
    }

    /// Return `true` if the beam is flagged (null beams count as flagged)
    pub fn is_flagged(&self) -> bool {
        self.contains(BeamFlag::FLAG)
    }

    /// Return `true` if the beam is selected
    pub fn is_selected(&self) -> bool {
        self.contains(BeamFlag::SELECT) && !self.contains(BeamFlag::FLAG)
    }

    /// Return `true` if the beam can be used in processing
    pub fn is_ok(&self) -> bool {
        !self.contains(BeamFlag::FLAG)
    }

    /// Flag a beam for a reason, dropping any selection state
    pub fn flagged(reason: BeamFlag) -> BeamFlag {
        BeamFlag::FLAG | (reason - BeamFlag::NULL)
    }

    /// Select a beam for a reason, dropping any flag state
    pub fn selected(reason: BeamFlag) -> BeamFlag {
        BeamFlag::SELECT | (reason - BeamFlag::NULL)
    }

    /// Return `true` if flagged by manual editing
    pub fn is_manual(&self) -> bool {
        self.is_flagged() && !self.is_null() && self.contains(BeamFlag::MANUAL)
    }

    /// Return `true` if flagged by an automatic filter
    pub fn is_filter(&self) -> bool {
        self.is_flagged() && !self.is_null() && self.contains(BeamFlag::FILTER)
    }

    /// Return `true` if flagged as unreliable by the sonar
    pub fn is_sonar(&self) -> bool {
        self.is_flagged() && !self.is_null() && self.contains(BeamFlag::SONAR)
    }
}

/// The bottom detection method behind a sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Deserialize, Serialize)]
pub enum DetectKind {
    /// The detection method is not known
    #[default]
    Unknown,
    /// Amplitude (energy) detection
    Amplitude,
    /// Phase (zero crossing) detection
    Phase,
    /// Laser ranging
    Lidar,
}

/// One bathymetry sounding
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct Beam {
    /// Quality flag
    pub flag: BeamFlag,
    /// Depth in meters, positive down
    pub depth: f64,
    /// Across-track offset from the transducer in meters, starboard positive
    pub acrosstrack: f64,
    /// Along-track offset from the transducer in meters, forward positive
    pub alongtrack: f64,
    /// Amplitude (dB or instrument units, format dependent)
    pub amplitude: f64,
    /// How the sounding was detected
    pub detect: DetectKind,
    /// Two-way travel time in seconds, 0 when unknown
    pub ttime: f64,
    /// Across-track beam angle in degrees
    pub angle_across: f64,
    /// Forward beam angle in degrees
    pub angle_forward: f64,
    /// Signal to noise ratio in dB
    pub snr: f64,
    /// Echo length in samples
    pub echo_length: i32,
    /// Quality code as recorded, 0 when the format keeps none
    pub quality: u8,
}

impl Beam {
    /// A beam with no data
    pub fn null() -> Beam {
        Beam {
            flag: BeamFlag::NULL,
            ..Beam::default()
        }
    }
}

/// One sidescan pixel
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Pixel {
    /// Amplitude, [`SIDESCAN_NULL`] when absent
    pub amplitude: f64,
    /// Across-track offset in meters
    pub acrosstrack: f64,
    /// Along-track offset in meters
    pub alongtrack: f64,
}

impl Pixel {
    /// A pixel with no data
    pub fn null() -> Pixel {
        Pixel {
            amplitude: SIDESCAN_NULL,
            acrosstrack: 0.0,
            alongtrack: 0.0,
        }
    }

    /// Return `true` if the pixel carries an amplitude
    pub fn is_valid(&self) -> bool {
        self.amplitude != SIDESCAN_NULL
    }
}

/// A normalized survey ping
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Ping {
    /// The time of the ping
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Heading in degrees east of north
    pub heading: f64,
    /// Bathymetry and amplitude, one entry per beam
    pub beams: Vec<Beam>,
    /// Sidescan, one entry per pixel
    pub pixels: Vec<Pixel>,
}

impl Ping {
    /// Create a new Ping from the given data
    pub fn new(
        timestamp: OffsetDateTime,
        longitude: f64,
        latitude: f64,
        speed: f64,
        heading: f64,
        beams: Vec<Beam>,
        pixels: Vec<Pixel>,
    ) -> Ping {
        Ping {
            timestamp,
            longitude,
            latitude,
            speed,
            heading,
            beams,
            pixels,
        }
    }

    /// Seconds since the Unix epoch
    pub fn time_d(&self) -> f64 {
        epoch::seconds(self.timestamp)
    }
}

/// A record as seen through the generic model
///
/// This is what [`crate::driver::SonarDriver::extract`] returns and what
/// [`crate::driver::SonarDriver::insert`] accepts.
#[derive(Debug, Clone, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum SwathRecord {
    /// A survey ping
    Ping(Ping),
    /// A comment
    Comment(String),
    /// Any other record kind, carried through without payload
    Other(DataKind),
}

impl SwathRecord {
    /// The kind of this record
    pub fn kind(&self) -> DataKind {
        match self {
            SwathRecord::Ping(_) => DataKind::Data,
            SwathRecord::Comment(_) => DataKind::Comment,
            SwathRecord::Other(k) => *k,
        }
    }
}

/// Navigation and attitude at a ping
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Navigation {
    /// The time of the fix
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Heading in degrees
    pub heading: f64,
    /// Transducer draft in meters
    pub draft: f64,
    /// Roll in degrees, starboard down positive
    pub roll: f64,
    /// Pitch in degrees, bow up positive
    pub pitch: f64,
    /// Heave in meters, up positive
    pub heave: f64,
}

/// Transducer depth and altitude above the seafloor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct Altitude {
    /// Transducer depth in meters
    pub transducer_depth: f64,
    /// Altitude in meters
    pub altitude: f64,
}

/// A sound velocity profile as (depth m, velocity m/s) pairs
#[derive(Debug, Clone, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct Svp {
    /// Profile samples ordered by depth
    pub samples: Vec<(f64, f64)>,
}

/// Raw travel time and angles for one beam
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct BeamTravelTime {
    /// Travel time in seconds
    pub ttime: f64,
    /// Angle from vertical in degrees
    pub angle: f64,
    /// Azimuthal angle in degrees
    pub angle_forward: f64,
    /// Angle of the receive null in degrees
    pub angle_null: f64,
    /// Heave at the beam in meters
    pub heave: f64,
    /// Along-track offset of the receiver in meters
    pub alongtrack_offset: f64,
}

/// Travel times for a whole ping
#[derive(Debug, Clone, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct TravelTimes {
    /// One entry per beam
    pub beams: Vec<BeamTravelTime>,
    /// Transducer draft in meters
    pub draft: f64,
    /// Surface sound velocity in m/s
    pub ssv: f64,
}

/// Sonar gain settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(Deserialize, Serialize)]
pub struct Gains {
    /// Transmit gain in dB
    pub transmit_gain: f64,
    /// Pulse length in seconds
    pub pulse_length: f64,
    /// Receive gain in dB
    pub receive_gain: f64,
}

/// The array sizes a store currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Deserialize, Serialize)]
pub struct Dimensions {
    /// Number of bathymetry beams
    pub beams_bath: usize,
    /// Number of amplitude beams
    pub beams_amp: usize,
    /// Number of sidescan pixels
    pub pixels_ss: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flag_states() {
        assert!(BeamFlag::NONE.is_ok());
        assert!(!BeamFlag::NONE.is_flagged());

        let f = BeamFlag::flagged(BeamFlag::MANUAL);
        assert!(f.is_flagged());
        assert!(!f.is_selected());
        assert!(f.is_manual());
        assert!(!f.is_null());

        let s = BeamFlag::selected(BeamFlag::LEAST_DEPTH);
        assert!(s.is_selected());
        assert!(s.is_ok());
        assert!(!s.is_flagged());

        assert!(BeamFlag::NULL.is_null());
        assert!(BeamFlag::NULL.is_flagged());
        assert!(!BeamFlag::NULL.is_selected());
        assert!(!BeamFlag::NULL.is_manual());
    }

    #[test]
    fn test_flag_never_both_states() {
        // requesting a reason that happens to be NULL cannot produce both super-states
        let f = BeamFlag::flagged(BeamFlag::NULL | BeamFlag::FILTER);
        assert!(f.is_filter());
        assert!(!f.contains(BeamFlag::SELECT));
        let s = BeamFlag::selected(BeamFlag::NULL);
        assert!(!s.contains(BeamFlag::FLAG));
    }

    #[test]
    fn test_null_slots() {
        assert!(!Pixel::null().is_valid());
        assert!(Beam::null().flag.is_null());
        assert_eq!(Beam::null().depth, 0.0);
    }
}
