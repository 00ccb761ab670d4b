//! The format-independent driver interface and the format registry
//!
//! Every supported on-disk format implements [`SonarDriver`]. A driver owns
//! its format-specific store: the record it most recently decoded, or the
//! record it is about to encode. The reading and writing front ends
//! ([`crate::reader::PingReader`], [`crate::writer::PingWriter`]) only ever
//! talk to a `Box<dyn SonarDriver>`, resolved once from a format id through
//! the [`Registry`].
//!
//! ```
//! # use swathio::driver::Registry;
//! # fn main() -> Result<(),Box<dyn std::error::Error>> {
//! let registry = Registry::with_builtin_formats();
//! let driver = registry.open(42)?;
//! assert_eq!(driver.info().name, "SB2100B1");
//! assert!(registry.open(9999).is_err());
//! # Ok(())
//! # }
//! ```
use crate::error::{Error, Result};
use crate::format::lidar::LidarDriver;
use crate::format::sb2100::{Sb2100Driver, Variant};
use crate::model::{
    Altitude, DataKind, DetectKind, Dimensions, Gains, Navigation, Svp, SwathRecord, TravelTimes,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

/// Static description of a registered format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatInfo {
    /// Numeric format identifier
    pub id: i32,
    /// Short format name
    pub name: &'static str,
    /// Name of the sonar system family
    pub system: &'static str,
    /// One-line human readable description
    pub description: &'static str,
    /// Maximum number of bathymetry beams, 0 when unbounded
    pub beams_bath_max: usize,
    /// Maximum number of amplitude beams, 0 when unbounded
    pub beams_amp_max: usize,
    /// Maximum number of sidescan pixels
    pub pixels_ss_max: usize,
    /// Whether the beam count varies from ping to ping
    pub variable_beams: bool,
    /// Whether raw travel times are available
    pub traveltime: bool,
    /// Across-track beam width in degrees
    pub beamwidth_xtrack: f64,
    /// Along-track beam width in degrees
    pub beamwidth_ltrack: f64,
}

/// The operations every format driver supplies
///
/// The store lives inside the implementing type. Decoding fills it, encoding
/// serializes it, and the accessors view it through the generic model.
/// Accessors other than [`SonarDriver::extract`] only make sense for survey
/// data: on a comment store they return [`Error::Comment`] and on any other
/// record kind [`Error::Other`].
pub trait SonarDriver {
    /// The format this driver reads and writes
    fn info(&self) -> &FormatInfo;

    /// The kind of record currently held in the store
    fn kind(&self) -> DataKind;

    /// Array sizes of the record currently held in the store
    fn dimensions(&self) -> Dimensions;

    /// Decode the next logical record from the stream into the store
    ///
    /// A logical record may span several physical records. End of data is
    /// reported as [`Error::Eof`]; a record that cannot be understood is
    /// reported as [`Error::Unintelligible`] and the stream stays usable.
    fn decode_ping(&mut self, reader: &mut dyn Read) -> Result<DataKind>;

    /// Encode the record currently held in the store
    fn encode_ping(&mut self, writer: &mut dyn Write) -> Result<()>;

    /// View the store through the generic model
    fn extract(&self) -> Result<SwathRecord>;

    /// Replace the store contents from a generic record
    fn insert(&mut self, record: &SwathRecord) -> Result<()>;

    /// Navigation and attitude of the current ping
    fn extract_nav(&self) -> Result<Navigation>;

    /// Overwrite navigation and attitude of the current ping
    fn insert_nav(&mut self, nav: &Navigation) -> Result<()>;

    /// Transducer depth and altitude of the current ping
    fn extract_altitude(&self) -> Result<Altitude>;

    /// The sound velocity profile, when the store holds one
    fn extract_svp(&self) -> Result<Svp>;

    /// Replace the stored sound velocity profile
    fn insert_svp(&mut self, svp: &Svp) -> Result<()>;

    /// Raw travel times and angles of the current ping
    fn travel_times(&self) -> Result<TravelTimes>;

    /// Bottom detection method per beam
    fn detects(&self) -> Result<Vec<DetectKind>>;

    /// Gain settings of the current ping
    fn gains(&self) -> Result<Gains>;

    /// Return `true` if the last decoded record carried a valid checksum
    ///
    /// Formats without checksums always return `true`.
    fn verify_checksum(&self) -> bool {
        true
    }
}

/// The formats built into this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// SeaBeam 2100 binary with sidescan
    Sb2100B1,
    /// SeaBeam 2100 binary, sidescan stripped on write
    Sb2100B2,
    /// 3D at Depth processed LIDAR
    Lidar3dDepthP,
}

impl Format {
    /// The numeric format id
    pub fn id(&self) -> i32 {
        match self {
            Format::Sb2100B1 => 42,
            Format::Sb2100B2 => 43,
            Format::Lidar3dDepthP => 231,
        }
    }

    /// Look a built-in format up by id
    pub fn from_id(id: i32) -> Result<Format> {
        match id {
            42 => Ok(Format::Sb2100B1),
            43 => Ok(Format::Sb2100B2),
            231 => Ok(Format::Lidar3dDepthP),
            _ => Err(Error::BadFormat(id)),
        }
    }

    /// Infer the format from a conventional `.mbNN` file suffix
    ///
    /// ```
    /// # use swathio::driver::Format;
    /// assert_eq!(Format::from_path("line1.mb42"), Some(Format::Sb2100B1));
    /// assert_eq!(Format::from_path("scan.MB231"), Some(Format::Lidar3dDepthP));
    /// assert_eq!(Format::from_path("notes.txt"), None);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        let id = ext.strip_prefix("mb")?.parse::<i32>().ok()?;
        Format::from_id(id).ok()
    }
}

impl TryFrom<i32> for Format {
    type Error = Error;

    fn try_from(id: i32) -> Result<Format> {
        Format::from_id(id)
    }
}

type Constructor = fn(FormatInfo) -> Box<dyn SonarDriver>;

/// Maps format ids to driver constructors
///
/// The table is filled once and only read afterwards, so a registry can be
/// shared freely between threads that each open their own streams.
pub struct Registry {
    entries: BTreeMap<i32, (FormatInfo, Constructor)>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Registry {
        Registry {
            entries: BTreeMap::new(),
        }
    }

    /// A registry holding every format built into this crate
    pub fn with_builtin_formats() -> Registry {
        let mut registry = Registry::new();
        registry.register(Sb2100Driver::format_info(Variant::B1), |info| {
            Box::new(Sb2100Driver::new(info, Variant::B1))
        });
        registry.register(Sb2100Driver::format_info(Variant::B2), |info| {
            Box::new(Sb2100Driver::new(info, Variant::B2))
        });
        registry.register(LidarDriver::format_info(), |info| {
            Box::new(LidarDriver::new(info))
        });
        registry
    }

    /// Add or replace a format
    pub fn register(&mut self, info: FormatInfo, constructor: Constructor) {
        self.entries.insert(info.id, (info, constructor));
    }

    /// The description of a format
    pub fn info(&self, id: i32) -> Result<&FormatInfo> {
        self.entries
            .get(&id)
            .map(|(info, _)| info)
            .ok_or(Error::BadFormat(id))
    }

    /// Iterate over registered formats in id order
    pub fn formats(&self) -> impl Iterator<Item = &FormatInfo> {
        self.entries.values().map(|(info, _)| info)
    }

    /// Create a driver with a fresh store for a format
    pub fn open(&self, id: i32) -> Result<Box<dyn SonarDriver>> {
        let (info, constructor) = self.entries.get(&id).ok_or(Error::BadFormat(id))?;
        tracing::debug!("opening driver for format {} ({})", id, info.name);
        Ok(constructor(info.clone()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_builtin_formats()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtin_formats() {
        let registry = Registry::with_builtin_formats();
        let ids: Vec<i32> = registry.formats().map(|f| f.id).collect();
        assert_eq!(ids, vec![42, 43, 231]);
        assert_eq!(registry.info(43).unwrap().pixels_ss_max, 0);
        assert!(matches!(registry.info(1), Err(Error::BadFormat(1))));
    }

    #[test]
    fn test_open_fresh_store() {
        let registry = Registry::with_builtin_formats();
        for id in [42, 43, 231] {
            let driver = registry.open(id).unwrap();
            assert_eq!(driver.info().id, id);
            assert_eq!(driver.kind(), DataKind::None);
            assert_eq!(Format::from_id(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a/b/c.mb43"), Some(Format::Sb2100B2));
        assert_eq!(Format::from_path("c.mb"), None);
        assert_eq!(Format::from_path("c.mb7"), None);
        assert_eq!(Format::from_path("mb42"), None);
    }
}
