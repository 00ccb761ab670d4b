//! Sensor platforms and lever-arm geometry
//!
//! A [`Platform`] lists the sensors mounted on a vessel or vehicle, each with
//! one or more mounting offsets, and names which sensor supplies position,
//! depth, heading, roll and pitch, heave and the survey data itself. Given
//! an instantaneous attitude it can move a position from the reference
//! sensors to any target sensor.
//!
//! Offsets use a right handed body frame: x starboard, y forward, z up.
//! Sensor depth is positive down.
//!
//! ```
//! # use swathio::platform::{Platform, PositionOffset, Sensor, SensorOffset, SensorType};
//! # use swathio::platform::math::Attitude;
//! # fn main() -> Result<(),Box<dyn std::error::Error>> {
//! let mut platform = Platform::default();
//! platform.sensors.push(Sensor::new(SensorType::Ins));
//! platform.sensors.push(Sensor::new(SensorType::SonarMultibeam));
//! platform.sensors[1].offsets.push(SensorOffset {
//!     position: Some(PositionOffset { x: 0.0, y: 2.0, z: -1.0 }),
//!     ..SensorOffset::default()
//! });
//! platform.sources.set_all_navigation(0);
//!
//! let lever = platform.lever(1, 0, Attitude::new(90.0, 0.0, 0.0))?;
//! assert!((lever.x - 2.0).abs() < 1e-9);
//! assert!((lever.z + 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
use crate::error::{Error, Result};
use crate::geodesy::coor_scale;
use bitflags::bitflags;
use math::Attitude;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod math;

/// Most sensors a platform file may declare
pub const MAX_SENSORS: usize = 1000;
/// Most offsets a single sensor may declare
pub const MAX_OFFSETS: usize = 100;
/// Most entries in one time latency model
pub const MAX_LATENCY_SAMPLES: usize = 100_000;

/// What kind of vehicle carries the sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum PlatformType {
    /// Not specified
    #[default]
    Unknown,
    /// A surface ship or boat
    SurfaceVessel,
    /// A towed vehicle
    TowBody,
    /// A remotely operated vehicle
    Rov,
    /// An autonomous underwater vehicle
    Auv,
    /// An aircraft
    Aircraft,
    /// A satellite
    Satellite,
    /// A mooring
    Mooring,
    /// A fixed installation
    Fixed,
}

impl PlatformType {
    /// The numeric code used in platform files
    pub fn code(&self) -> i32 {
        match self {
            PlatformType::Unknown => 0,
            PlatformType::SurfaceVessel => 1,
            PlatformType::TowBody => 2,
            PlatformType::Rov => 3,
            PlatformType::Auv => 4,
            PlatformType::Aircraft => 5,
            PlatformType::Satellite => 6,
            PlatformType::Mooring => 7,
            PlatformType::Fixed => 8,
        }
    }

    /// Map a numeric code; unknown codes become [`PlatformType::Unknown`]
    pub fn from_code(code: i32) -> PlatformType {
        match code {
            1 => PlatformType::SurfaceVessel,
            2 => PlatformType::TowBody,
            3 => PlatformType::Rov,
            4 => PlatformType::Auv,
            5 => PlatformType::Aircraft,
            6 => PlatformType::Satellite,
            7 => PlatformType::Mooring,
            8 => PlatformType::Fixed,
            _ => PlatformType::Unknown,
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            PlatformType::Unknown => "Unknown platform",
            PlatformType::SurfaceVessel => "Surface vessel",
            PlatformType::TowBody => "Tow body",
            PlatformType::Rov => "ROV",
            PlatformType::Auv => "AUV",
            PlatformType::Aircraft => "Aircraft",
            PlatformType::Satellite => "Satellite",
            PlatformType::Mooring => "Mooring",
            PlatformType::Fixed => "Fixed installation",
        };
        write!(f, "{}", name)
    }
}

/// What kind of instrument a sensor is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SensorType {
    /// Not specified
    #[default]
    Unknown,
    /// Single beam echosounder
    SonarEchosounder,
    /// Multiple frequency echosounder
    SonarMultiEchosounder,
    /// Sidescan sonar
    SonarSidescan,
    /// Interferometric sonar
    SonarInterferometry,
    /// Multibeam sonar
    SonarMultibeam,
    /// Multibeam sonar with two heads
    SonarMultibeamTwoHead,
    /// Subbottom profiler
    SonarSubbottom,
    /// Still camera
    CameraMono,
    /// Stereo camera pair
    CameraStereo,
    /// Video camera
    CameraVideo,
    /// Scanning lidar
    LidarScan,
    /// Swath lidar
    LidarSwath,
    /// Positioning system
    Position,
    /// Compass
    Compass,
    /// Vertical reference unit
    Vru,
    /// Inertial measurement unit
    Imu,
    /// Inertial navigation system
    Ins,
    /// Inertial navigation system with a pressure sensor
    InsWithPressure,
    /// Conductivity, temperature and depth probe
    Ctd,
    /// Pressure sensor
    Pressure,
    /// Sound speed probe
    SoundSpeed,
    /// A code this crate does not name
    Other(i32),
}

impl SensorType {
    /// The numeric code used in platform files
    pub fn code(&self) -> i32 {
        match self {
            SensorType::Unknown => 0,
            SensorType::SonarEchosounder => 1,
            SensorType::SonarMultiEchosounder => 2,
            SensorType::SonarSidescan => 3,
            SensorType::SonarInterferometry => 4,
            SensorType::SonarMultibeam => 5,
            SensorType::SonarMultibeamTwoHead => 6,
            SensorType::SonarSubbottom => 7,
            SensorType::CameraMono => 11,
            SensorType::CameraStereo => 12,
            SensorType::CameraVideo => 13,
            SensorType::LidarScan => 21,
            SensorType::LidarSwath => 22,
            SensorType::Position => 31,
            SensorType::Compass => 41,
            SensorType::Vru => 42,
            SensorType::Imu => 43,
            SensorType::Ins => 44,
            SensorType::InsWithPressure => 45,
            SensorType::Ctd => 51,
            SensorType::Pressure => 52,
            SensorType::SoundSpeed => 53,
            SensorType::Other(code) => *code,
        }
    }

    /// Map a numeric code, keeping unknown codes as [`SensorType::Other`]
    pub fn from_code(code: i32) -> SensorType {
        match code {
            0 => SensorType::Unknown,
            1 => SensorType::SonarEchosounder,
            2 => SensorType::SonarMultiEchosounder,
            3 => SensorType::SonarSidescan,
            4 => SensorType::SonarInterferometry,
            5 => SensorType::SonarMultibeam,
            6 => SensorType::SonarMultibeamTwoHead,
            7 => SensorType::SonarSubbottom,
            11 => SensorType::CameraMono,
            12 => SensorType::CameraStereo,
            13 => SensorType::CameraVideo,
            21 => SensorType::LidarScan,
            22 => SensorType::LidarSwath,
            31 => SensorType::Position,
            41 => SensorType::Compass,
            42 => SensorType::Vru,
            43 => SensorType::Imu,
            44 => SensorType::Ins,
            45 => SensorType::InsWithPressure,
            51 => SensorType::Ctd,
            52 => SensorType::Pressure,
            53 => SensorType::SoundSpeed,
            code => SensorType::Other(code),
        }
    }
}

bitflags! {
    /// Navigation and environmental quantities a sensor measures
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
    pub struct Capability1: u32 {
        /// Horizontal position
        const POSITION = 1 << 0;
        /// Depth
        const DEPTH = 1 << 1;
        /// Altitude above the seafloor
        const ALTITUDE = 1 << 2;
        /// Velocity
        const VELOCITY = 1 << 3;
        /// Acceleration
        const ACCELERATION = 1 << 4;
        /// Pressure
        const PRESSURE = 1 << 5;
        /// Roll and pitch
        const ROLLPITCH = 1 << 6;
        /// Heading
        const HEADING = 1 << 7;
        /// Magnetic field
        const MAGNETIC_FIELD = 1 << 8;
        /// Temperature
        const TEMPERATURE = 1 << 9;
        /// Conductivity
        const CONDUCTIVITY = 1 << 10;
        /// Salinity
        const SALINITY = 1 << 11;
        /// Sound speed
        const SOUNDSPEED = 1 << 12;
        /// Gravity
        const GRAVITY = 1 << 13;
    }
}

bitflags! {
    /// Survey data products a sensor produces
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
    pub struct Capability2: u32 {
        /// Topography from a lidar or camera
        const TOPOGRAPHY_LIDAR = 1 << 0;
        /// Topography from structure from motion
        const TOPOGRAPHY_PHOTOGRAMMETRY = 1 << 1;
        /// Water column echoes
        const WATERCOLUMN = 1 << 2;
        /// Bathymetry
        const BATHYMETRY = 1 << 3;
        /// Backscatter
        const BACKSCATTER = 1 << 4;
        /// Sidescan
        const SIDESCAN = 1 << 5;
        /// Subbottom profiles
        const SUBBOTTOM = 1 << 6;
        /// Still photography
        const PHOTOGRAPHY = 1 << 7;
        /// Video
        const VIDEO = 1 << 8;
    }
}

/// Static translation of a sensor in the body frame, in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct PositionOffset {
    /// Starboard
    pub x: f64,
    /// Forward
    pub y: f64,
    /// Up
    pub z: f64,
}

/// Time latency applied to a sensor's time stamps
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub enum TimeLatency {
    /// No correction
    #[default]
    None,
    /// A constant correction in seconds
    Static(f64),
    /// A correction in seconds interpolated from (time, value) pairs
    Model(Vec<(f64, f64)>),
}

impl TimeLatency {
    /// The latency in seconds at `time_d`
    ///
    /// A model is interpolated linearly and held constant beyond its ends.
    ///
    /// ```
    /// # use swathio::platform::TimeLatency;
    /// let model = TimeLatency::Model(vec![(0.0, 0.1), (10.0, 0.3)]);
    /// assert!((model.at(5.0) - 0.2).abs() < 1e-12);
    /// assert_eq!(model.at(20.0), 0.3);
    /// assert_eq!(TimeLatency::None.at(5.0), 0.0);
    /// ```
    pub fn at(&self, time_d: f64) -> f64 {
        match self {
            TimeLatency::None => 0.0,
            TimeLatency::Static(v) => *v,
            TimeLatency::Model(table) => {
                let Some(first) = table.first() else {
                    return 0.0;
                };
                if time_d <= first.0 {
                    return first.1;
                }
                for pair in table.windows(2) {
                    let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
                    if time_d <= t1 {
                        if t1 == t0 {
                            return v1;
                        }
                        return v0 + (v1 - v0) * (time_d - t0) / (t1 - t0);
                    }
                }
                table.last().map(|(_, v)| *v).unwrap_or(0.0)
            }
        }
    }
}

/// One mounting of a sensor
///
/// A multi-head sonar has one offset per head.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SensorOffset {
    /// Static translation, `None` when not known
    pub position: Option<PositionOffset>,
    /// Static mounting attitude, `None` when not known
    pub attitude: Option<Attitude>,
    /// Time latency
    pub time_latency: TimeLatency,
}

impl SensorOffset {
    fn position_or_zero(&self) -> PositionOffset {
        self.position.unwrap_or_default()
    }
}

/// A sensor mounted on a platform
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Sensor {
    /// Instrument type
    pub kind: SensorType,
    /// Model name
    pub model: String,
    /// Manufacturer name
    pub manufacturer: String,
    /// Serial number
    pub serial_number: String,
    /// Measured quantities
    pub capability1: Capability1,
    /// Produced data products
    pub capability2: Capability2,
    /// Mounting offsets
    pub offsets: Vec<SensorOffset>,
}

impl Sensor {
    /// A sensor of the given type with no offsets
    pub fn new(kind: SensorType) -> Sensor {
        Sensor {
            kind,
            ..Sensor::default()
        }
    }

    fn offset(&self, index: usize) -> Option<&SensorOffset> {
        self.offsets.get(index)
    }
}

/// A primary sensor index with up to three alternates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Source {
    /// The sensor used by default
    pub primary: Option<usize>,
    /// Fallback sensors
    pub alternates: [Option<usize>; 3],
}

impl Source {
    /// A source with only a primary sensor
    pub fn primary(index: usize) -> Source {
        Source {
            primary: Some(index),
            alternates: [None; 3],
        }
    }

    fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.primary)
            .chain(self.alternates.iter().copied())
            .flatten()
    }
}

/// Which sensor supplies each kind of data
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Sources {
    /// Bathymetry
    pub bathymetry: Source,
    /// Backscatter
    pub backscatter: Source,
    /// Subbottom profiles
    pub subbottom: Source,
    /// Camera imagery
    pub camera: Source,
    /// Position
    pub position: Source,
    /// Depth
    pub depth: Source,
    /// Heading
    pub heading: Source,
    /// Roll and pitch
    pub rollpitch: Source,
    /// Heave
    pub heave: Source,
}

impl Sources {
    /// Take position, depth, heading, roll, pitch and heave from one sensor
    pub fn set_all_navigation(&mut self, index: usize) {
        self.position = Source::primary(index);
        self.depth = Source::primary(index);
        self.heading = Source::primary(index);
        self.rollpitch = Source::primary(index);
        self.heave = Source::primary(index);
    }

    /// Every source with its name, in file order
    pub fn named(&self) -> [(&'static str, &Source); 9] {
        [
            ("BATHYMETRY", &self.bathymetry),
            ("BACKSCATTER", &self.backscatter),
            ("SUBBOTTOM", &self.subbottom),
            ("CAMERA", &self.camera),
            ("POSITION", &self.position),
            ("DEPTH", &self.depth),
            ("HEADING", &self.heading),
            ("ROLLPITCH", &self.rollpitch),
            ("HEAVE", &self.heave),
        ]
    }

    /// Mutable access to a source by its name in platform files
    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Source> {
        match name {
            "BATHYMETRY" => Some(&mut self.bathymetry),
            "BACKSCATTER" => Some(&mut self.backscatter),
            "SUBBOTTOM" => Some(&mut self.subbottom),
            "CAMERA" => Some(&mut self.camera),
            "POSITION" => Some(&mut self.position),
            "DEPTH" => Some(&mut self.depth),
            "HEADING" => Some(&mut self.heading),
            "ROLLPITCH" => Some(&mut self.rollpitch),
            "HEAVE" => Some(&mut self.heave),
            _ => None,
        }
    }
}

/// Displacement of a target sensor from the reference sensors, in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Lever {
    /// Eastward
    pub x: f64,
    /// Northward
    pub y: f64,
    /// Upward
    pub z: f64,
}

/// Geographic position and depth of a target sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TargetPosition {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Depth in meters, positive down
    pub depth: f64,
}

/// A vehicle or vessel with its sensors
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Platform {
    /// Vehicle type
    pub kind: PlatformType,
    /// Name
    pub name: String,
    /// Operating organization
    pub organization: String,
    /// Where the platform is documented
    pub documentation_url: String,
    /// Start of validity in seconds since the Unix epoch, 0 when open
    pub start_time_d: f64,
    /// End of validity in seconds since the Unix epoch, 0 when open
    pub end_time_d: f64,
    /// Source sensor assignment
    pub sources: Sources,
    /// Mounted sensors
    pub sensors: Vec<Sensor>,
}

impl Platform {
    /// Check that every assigned source names an existing sensor
    pub fn validate(&self) -> Result<()> {
        if self.sensors.is_empty() {
            return Err(Error::BadParameter("platform defines no sensors".to_string()));
        }
        for (name, source) in self.sources.named() {
            if let Some(i) = source.indices().find(|i| *i >= self.sensors.len()) {
                return Err(Error::BadParameter(format!(
                    "{} source sensor {} of {}",
                    name.to_lowercase(),
                    i,
                    self.sensors.len()
                )));
            }
        }
        Ok(())
    }

    fn source_sensor(&self, name: &str, source: &Source) -> Result<&Sensor> {
        source
            .primary
            .and_then(|i| self.sensors.get(i))
            .ok_or_else(|| {
                Error::BadParameter(format!("no valid {} source sensor", name))
            })
    }

    fn target_offset(&self, sensor: usize, offset: usize) -> Result<&SensorOffset> {
        self.sensors
            .get(sensor)
            .ok_or_else(|| {
                Error::BadParameter(format!(
                    "target sensor {} of {}",
                    sensor,
                    self.sensors.len()
                ))
            })?
            .offset(offset)
            .ok_or_else(|| {
                Error::BadParameter(format!("offset {} of target sensor {}", offset, sensor))
            })
    }

    /// Mounting attitude of the attitude reference
    ///
    /// Roll and pitch come from the roll-pitch sensor and heading from the
    /// heading sensor. `None` when the roll-pitch sensor has no static
    /// attitude offset.
    fn reference_mounting(&self) -> Result<Option<Attitude>> {
        let heading = self.source_sensor("heading", &self.sources.heading)?;
        let rollpitch = self.source_sensor("roll-pitch", &self.sources.rollpitch)?;
        let Some(rp) = rollpitch.offset(0).and_then(|o| o.attitude) else {
            return Ok(None);
        };
        let h = heading
            .offset(0)
            .and_then(|o| o.attitude)
            .map(|a| a.heading)
            .unwrap_or(0.0);
        Ok(Some(Attitude::new(h, rp.roll, rp.pitch)))
    }

    /// Attitude of the platform from the raw attitude sensor reading
    ///
    /// The mounting offset of the attitude sensors is removed. Without a
    /// static offset the reading is returned unchanged.
    pub fn orientation(&self, measured: Attitude) -> Result<Attitude> {
        match self.reference_mounting()? {
            Some(mount) if !mount.is_zero() => Ok(math::attitude_platform(measured, mount)),
            _ => Ok(measured),
        }
    }

    /// Lever arm from the position and depth references to a target sensor
    pub fn lever(&self, target: usize, target_offset: usize, measured: Attitude) -> Result<Lever> {
        self.validate()?;
        let platform = self.orientation(measured)?;
        let target = self.target_offset(target, target_offset)?.position_or_zero();
        let position = self
            .source_sensor("position", &self.sources.position)?
            .offset(0)
            .map(SensorOffset::position_or_zero)
            .unwrap_or_default();
        let depth = self
            .source_sensor("depth", &self.sources.depth)?
            .offset(0)
            .map(SensorOffset::position_or_zero)
            .unwrap_or_default();

        let (sr, cr) = platform.roll.to_radians().sin_cos();
        let (sp, cp) = platform.pitch.to_radians().sin_cos();
        let (sh, ch) = platform.heading.to_radians().sin_cos();

        // vertical lever does not depend on heading
        let (xx, yy, zz) = (target.x - depth.x, target.y - depth.y, target.z - depth.z);
        let z = sp * yy - cp * sr * xx + cp * cr * zz;

        let (xx, yy, zz) = (
            target.x - position.x,
            target.y - position.y,
            target.z - position.z,
        );
        let x = cp * sh * yy + (ch * cr + sh * sp * sr) * xx - (cr * sh * sp - ch * sr) * zz;
        let y = ch * cp * yy + (ch * sp * sr - cr * sh) * xx - (sh * sr + ch * cr * sp) * zz;
        Ok(Lever { x, y, z })
    }

    /// Absolute position and depth of a target sensor
    #[allow(clippy::too_many_arguments)]
    pub fn position(
        &self,
        target: usize,
        target_offset: usize,
        longitude: f64,
        latitude: f64,
        sensordepth: f64,
        measured: Attitude,
    ) -> Result<TargetPosition> {
        let lever = self.lever(target, target_offset, measured)?;
        let (mtodeglon, mtodeglat) = coor_scale(latitude);
        Ok(TargetPosition {
            longitude: longitude + lever.x * mtodeglon,
            latitude: latitude + lever.y * mtodeglat,
            depth: sensordepth - lever.z,
        })
    }

    /// Mounting rotation of a target sensor relative to the attitude reference
    pub fn orientation_offset(&self, target: usize, target_offset: usize) -> Result<Attitude> {
        let mount = self
            .target_offset(target, target_offset)?
            .attitude
            .unwrap_or_default();
        let reference = self.reference_mounting()?.unwrap_or_default();
        Ok(math::attitude_offset(mount, reference))
    }

    /// Attitude of a target sensor from the raw attitude sensor reading
    pub fn orientation_target(
        &self,
        target: usize,
        target_offset: usize,
        measured: Attitude,
    ) -> Result<Attitude> {
        let offset = self.orientation_offset(target, target_offset)?;
        let has_mount = self.target_offset(target, target_offset)?.attitude.is_some();
        let near_zero = offset.roll.abs() < 1e-12
            && offset.pitch.abs() < 1e-12
            && (offset.heading < 1e-12 || offset.heading > 360.0 - 1e-12);
        if has_mount && !near_zero {
            Ok(math::attitude_target(measured, offset))
        } else {
            Ok(measured)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn platform() -> Platform {
        let mut p = Platform {
            kind: PlatformType::SurfaceVessel,
            name: "Test".to_string(),
            ..Platform::default()
        };
        let mut ins = Sensor::new(SensorType::Ins);
        ins.offsets.push(SensorOffset {
            position: Some(PositionOffset {
                x: 0.5,
                y: 1.0,
                z: -0.5,
            }),
            attitude: Some(Attitude::default()),
            time_latency: TimeLatency::None,
        });
        let mut sonar = Sensor::new(SensorType::SonarMultibeam);
        sonar.offsets.push(SensorOffset {
            position: Some(PositionOffset {
                x: 0.5,
                y: 1.0,
                z: -0.5,
            }),
            ..SensorOffset::default()
        });
        p.sensors = vec![ins, sonar];
        p.sources.set_all_navigation(0);
        p.sources.bathymetry = Source::primary(1);
        p
    }

    #[test]
    fn test_coincident_sensors_have_zero_lever() {
        let p = platform();
        for (h, r, pi) in [(0.0, 0.0, 0.0), (37.0, 5.0, -3.0), (270.0, -12.0, 8.0)] {
            let lever = p.lever(1, 0, Attitude::new(h, r, pi)).unwrap();
            assert_abs_diff_eq!(lever.x, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(lever.y, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(lever.z, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forward_lever_follows_heading() {
        let mut p = platform();
        p.sensors[1].offsets[0].position = Some(PositionOffset {
            x: 0.5,
            y: 11.0,
            z: -0.5,
        });
        let north = p.lever(1, 0, Attitude::new(0.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(north.y, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(north.x, 0.0, epsilon = 1e-9);
        let east = p.lever(1, 0, Attitude::new(90.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(east.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(east.y, 0.0, epsilon = 1e-9);

        let pos = p
            .position(1, 0, -70.0, 41.5, 3.0, Attitude::new(0.0, 0.0, 0.0))
            .unwrap();
        let (_, mtodeglat) = coor_scale(41.5);
        assert_abs_diff_eq!(pos.latitude, 41.5 + 10.0 * mtodeglat, epsilon = 1e-12);
        assert_abs_diff_eq!(pos.longitude, -70.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pos.depth, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_lever_ignores_heading() {
        let mut p = platform();
        p.sensors[1].offsets[0].position = Some(PositionOffset {
            x: 0.5,
            y: 1.0,
            z: -2.5,
        });
        for h in [0.0, 45.0, 180.0] {
            let pos = p
                .position(1, 0, 0.0, 0.0, 1.0, Attitude::new(h, 0.0, 0.0))
                .unwrap();
            assert_abs_diff_eq!(pos.depth, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bad_source_index() {
        let mut p = platform();
        p.sources.position = Source::primary(5);
        assert!(matches!(
            p.lever(1, 0, Attitude::default()),
            Err(Error::BadParameter(_))
        ));
        assert!(p.validate().is_err());

        let p = platform();
        assert!(matches!(
            p.lever(2, 0, Attitude::default()),
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(
            p.lever(1, 3, Attitude::default()),
            Err(Error::BadParameter(_))
        ));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_attitude_mounting() {
        let mut p = platform();
        let measured = Attitude::new(100.0, 2.0, 1.0);
        assert_eq!(p.orientation(measured).unwrap(), measured);
        assert_eq!(p.orientation_target(1, 0, measured).unwrap(), measured);

        p.sensors[1].offsets[0].attitude = Some(Attitude::new(0.0, 0.0, 0.0));
        p.sensors[0].offsets[0].attitude = Some(Attitude::new(5.0, 0.0, 0.0));
        let platform = p.orientation(Attitude::new(100.0, 0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(platform.heading, 95.0, epsilon = 1e-9);

        // the sonar is aligned with the hull, the attitude sensor is not
        let target = p
            .orientation_target(1, 0, Attitude::new(100.0, 0.0, 0.0))
            .unwrap();
        assert_abs_diff_eq!(target.heading, 95.0, epsilon = 1e-9);
        let offset = p.orientation_offset(1, 0).unwrap();
        assert_abs_diff_eq!(offset.heading, 355.0, epsilon = 1e-9);
    }
}
