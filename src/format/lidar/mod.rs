//! 3D at Depth subsea LIDAR (format 231)
//!
//! The scanner writes one record per laser scan plus asynchronous
//! position, attitude, heading and sensor depth records. Raw scans only
//! carry ranges and angles. On read they are stamped with navigation from
//! the asynchronous records and turned into soundings. Processed scans
//! carry both and are read as they are. Writing always produces processed
//! scans, so reconstructed soundings survive a round trip.
use crate::driver::{FormatInfo, SonarDriver};
use crate::error::{Error, Result};
use crate::geodesy::fold_heading;
use crate::model::{
    epoch, Altitude, DataKind, DetectKind, Dimensions, Gains, Navigation, Svp, SwathRecord,
    TravelTimes,
};
use crate::platform::math::Attitude;
use crate::platform::Platform;
use std::io::{Read, Write};

pub mod record;
pub mod store;

use record::{
    AttitudeRecord, CommentRecord, HeadingRecord, PositionRecord, ProcessedPulse,
    ProcessedScanHeader, RawPulse, RawScanHeader, RecordId, SensorDepthRecord,
    FILE_MAGIC, MAX_PULSES, PARAMETER_LEN, PROCESSED_HEADER_LEN, PROCESSED_PULSE_LEN,
    RAW_HEADER_LEN, RAW_PULSE_LEN,
};
pub use store::{Fix, LidarStore, NavHistory, Pulse, Scan};

/// How raw scans get their navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavStrategy {
    /// Every pulse uses the fix at the time of the first pulse
    #[default]
    SharedFix,
    /// Each pulse is interpolated at its own time
    PerPulse,
}

/// A platform and the sensor whose position the soundings refer to
#[derive(Debug, Clone)]
pub struct SensorMount {
    /// The platform
    pub platform: Platform,
    /// Index of the lidar among the platform sensors
    pub sensor: usize,
    /// Index of the offset of that sensor
    pub offset: usize,
}

impl SensorMount {
    fn apply(&self, fix: &Fix) -> Result<Fix> {
        let measured = Attitude::new(fix.heading, fix.roll, fix.pitch);
        let position = self.platform.position(
            self.sensor,
            self.offset,
            fix.longitude,
            fix.latitude,
            fix.sensordepth,
            measured,
        )?;
        let attitude = self
            .platform
            .orientation_target(self.sensor, self.offset, measured)?;
        Ok(Fix {
            longitude: position.longitude,
            latitude: position.latitude,
            sensordepth: position.depth,
            heading: attitude.heading,
            roll: attitude.roll,
            pitch: attitude.pitch,
            ..*fix
        })
    }
}

/// Reads and writes 3D at Depth LIDAR scans
#[derive(Debug, Clone)]
pub struct LidarDriver {
    info: FormatInfo,
    store: LidarStore,
    history: NavHistory,
    strategy: NavStrategy,
    mount: Option<SensorMount>,
    magic_checked: bool,
    magic_written: bool,
}

impl LidarDriver {
    /// Registry description of the format
    pub fn format_info() -> FormatInfo {
        FormatInfo {
            id: 231,
            name: "3DDEPTHP",
            system: "3DATDEPTHLIDAR",
            description: "3D at Depth subsea LIDAR, processed scans with variable pulse counts",
            beams_bath_max: 0,
            beams_amp_max: 0,
            pixels_ss_max: 0,
            variable_beams: true,
            traveltime: false,
            beamwidth_xtrack: 0.02,
            beamwidth_ltrack: 0.02,
        }
    }

    /// A driver with an empty store and shared per-scan navigation
    pub fn new(info: FormatInfo) -> LidarDriver {
        LidarDriver {
            info,
            store: LidarStore::default(),
            history: NavHistory::default(),
            strategy: NavStrategy::default(),
            mount: None,
            magic_checked: false,
            magic_written: false,
        }
    }

    /// Choose how raw scans are stamped with navigation
    pub fn with_strategy(mut self, strategy: NavStrategy) -> LidarDriver {
        self.strategy = strategy;
        self
    }

    /// Move navigation from the reference sensors to the lidar
    pub fn with_mount(mut self, mount: SensorMount) -> LidarDriver {
        self.mount = Some(mount);
        self
    }

    /// The store
    pub fn store(&self) -> &LidarStore {
        &self.store
    }

    /// Mutable access to the store
    pub fn store_mut(&mut self) -> &mut LidarStore {
        &mut self.store
    }

    /// The asynchronous navigation seen so far
    pub fn history(&self) -> &NavHistory {
        &self.history
    }

    fn fix_at(&self, time_d: f64) -> Result<Fix> {
        let fix = self.history.fix(time_d);
        match &self.mount {
            Some(mount) => mount.apply(&fix),
            None => Ok(fix),
        }
    }

    /// Stamp a raw scan with navigation and reconstruct its soundings
    fn preprocess(&mut self) -> Result<()> {
        if self.history.lacks_position() {
            tracing::debug!("raw scan before any position record");
        }
        let t0 = self.store.scan.time_d();
        let mut fix = self.fix_at(t0)?;
        // the attitude sensor reports roll with the opposite sign
        fix.roll = -fix.roll;
        self.store.scan.set_fix(&fix);

        for i in 0..self.store.scan.pulses.len() {
            let time_d = t0 + 1.0e-6 * self.store.scan.pulses[i].pulse_time_offset as f64;
            let pulse_fix = match self.strategy {
                NavStrategy::SharedFix => fix,
                NavStrategy::PerPulse => {
                    let mut f = self.fix_at(time_d)?;
                    f.roll = -f.roll;
                    f
                }
            };
            let pulse = &mut self.store.scan.pulses[i];
            pulse.time_d = time_d;
            pulse.set_fix(&pulse_fix);
        }
        self.store.scan.calculate_bathymetry();
        Ok(())
    }

    fn read_raw_scan(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header: RawScanHeader = record::read_block(reader, RAW_HEADER_LEN)?;
        check_pulse_count(header.num_pulses)?;
        let mut pulses = Vec::with_capacity(header.num_pulses as usize);
        for _ in 0..header.num_pulses {
            let p: RawPulse = record::read_block(reader, RAW_PULSE_LEN)?;
            pulses.push(Pulse::from(&p));
        }
        let t = header.time;
        self.store.scan.timestamp = epoch::from_calendar(
            t.year as i32,
            t.month,
            t.day,
            t.hour.min(u8::MAX as u16) as u8,
            t.minutes,
            t.seconds,
            t.nanoseconds,
        )
        .map_err(|e| Error::Unintelligible(format!("raw scan time: {}", e)))?;
        self.store.scan.pulses = pulses;
        self.store.scan.pad_to(self.store.parameter.pulses_per_scan());
        self.preprocess()
    }

    fn read_processed_scan(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header: ProcessedScanHeader = record::read_block(reader, PROCESSED_HEADER_LEN)?;
        check_pulse_count(header.num_pulses)?;
        let scan = &mut self.store.scan;
        scan.timestamp = epoch::from_seconds(header.time_d)
            .map_err(|e| Error::Unintelligible(format!("processed scan time: {}", e)))?;
        scan.navlon = header.navlon;
        scan.navlat = header.navlat;
        scan.sensordepth = header.sensordepth;
        scan.heading = header.heading as f64;
        scan.roll = header.roll as f64;
        scan.pitch = header.pitch as f64;
        scan.speed = header.speed as f64;
        let mut pulses = Vec::with_capacity(header.num_pulses as usize);
        for _ in 0..header.num_pulses {
            let p: ProcessedPulse = record::read_block(reader, PROCESSED_PULSE_LEN)?;
            pulses.push(Pulse::from(&p));
        }
        scan.pulses = pulses;
        scan.pad_to(self.store.parameter.pulses_per_scan());
        Ok(())
    }

    fn decode_record(&mut self, reader: &mut dyn Read) -> Result<DataKind> {
        let mut id = record::read_u16(reader)?;
        if !self.magic_checked {
            self.magic_checked = true;
            if id == FILE_MAGIC {
                id = record::read_u16(reader)?;
            } else {
                tracing::debug!("no file magic, reading records from the start");
            }
        }
        let kind = match RecordId::from_value(id) {
            Some(RecordId::Parameter) => {
                self.store.parameter = record::read_block(reader, PARAMETER_LEN)?;
                DataKind::Parameter
            }
            Some(RecordId::Comment) => {
                self.store.comment = record::read_comment(reader)?.text();
                DataKind::Comment
            }
            Some(RecordId::Position) => {
                let r: PositionRecord = record::read_block(reader, 24)?;
                self.history.add_position(r.time_d, r.longitude, r.latitude);
                self.store.sample_time_d = r.time_d;
                self.store.sample.longitude = r.longitude;
                self.store.sample.latitude = r.latitude;
                DataKind::Navigation
            }
            Some(RecordId::Attitude) => {
                let r: AttitudeRecord = record::read_block(reader, 32)?;
                self.history.add_attitude(r.time_d, r.roll, r.pitch, r.heave);
                self.store.sample_time_d = r.time_d;
                self.store.sample.roll = r.roll;
                self.store.sample.pitch = r.pitch;
                self.store.sample.heave = r.heave;
                DataKind::Attitude
            }
            Some(RecordId::Heading) => {
                let r: HeadingRecord = record::read_block(reader, 16)?;
                self.history.add_heading(r.time_d, r.heading);
                self.store.sample_time_d = r.time_d;
                self.store.sample.heading = r.heading;
                DataKind::Heading
            }
            Some(RecordId::SensorDepth) => {
                let r: SensorDepthRecord = record::read_block(reader, 16)?;
                self.history.add_sensordepth(r.time_d, r.depth);
                self.store.sample_time_d = r.time_d;
                self.store.sample.sensordepth = r.depth;
                DataKind::SensorDepth
            }
            Some(RecordId::RawScan) => {
                self.read_raw_scan(reader)?;
                DataKind::Data
            }
            Some(RecordId::ProcessedScan) => {
                self.read_processed_scan(reader)?;
                DataKind::Data
            }
            None => {
                return Err(Error::Unintelligible(format!(
                    "unknown record id {:#06x}",
                    id
                )))
            }
        };
        Ok(kind)
    }

    fn encode_record(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if !self.magic_written {
            out.extend_from_slice(&FILE_MAGIC.to_be_bytes());
        }
        let id = |out: &mut Vec<u8>, id: RecordId| out.extend_from_slice(&id.value().to_be_bytes());
        let store = &self.store;
        let t = store.sample_time_d;
        match store.kind {
            DataKind::None => {}
            DataKind::Parameter => {
                id(&mut out, RecordId::Parameter);
                record::write_block(&mut out, &store.parameter)?;
            }
            DataKind::Comment => {
                id(&mut out, RecordId::Comment);
                record::write_block(&mut out, &CommentRecord::new(&store.comment))?;
            }
            DataKind::Navigation => {
                id(&mut out, RecordId::Position);
                let r = PositionRecord {
                    time_d: t,
                    longitude: store.sample.longitude,
                    latitude: store.sample.latitude,
                };
                record::write_block(&mut out, &r)?;
            }
            DataKind::Attitude => {
                id(&mut out, RecordId::Attitude);
                let r = AttitudeRecord {
                    time_d: t,
                    roll: store.sample.roll,
                    pitch: store.sample.pitch,
                    heave: store.sample.heave,
                };
                record::write_block(&mut out, &r)?;
            }
            DataKind::Heading => {
                id(&mut out, RecordId::Heading);
                let r = HeadingRecord {
                    time_d: t,
                    heading: store.sample.heading,
                };
                record::write_block(&mut out, &r)?;
            }
            DataKind::SensorDepth => {
                id(&mut out, RecordId::SensorDepth);
                let r = SensorDepthRecord {
                    time_d: t,
                    depth: store.sample.sensordepth,
                };
                record::write_block(&mut out, &r)?;
            }
            DataKind::Data => {
                id(&mut out, RecordId::ProcessedScan);
                record::write_block(&mut out, &store.scan.processed_header())?;
                for pulse in &store.scan.pulses {
                    record::write_block(&mut out, &ProcessedPulse::from(pulse))?;
                }
            }
            kind => return Err(Error::BadKind(kind)),
        }
        Ok(out)
    }
}

fn check_pulse_count(n: u32) -> Result<()> {
    if n > MAX_PULSES {
        return Err(Error::Unintelligible(format!("scan with {} pulses", n)));
    }
    Ok(())
}

impl SonarDriver for LidarDriver {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn kind(&self) -> DataKind {
        self.store.kind
    }

    fn dimensions(&self) -> Dimensions {
        match self.store.kind {
            DataKind::Data => Dimensions {
                beams_bath: self.store.scan.pulses.len(),
                beams_amp: self.store.scan.pulses.len(),
                pixels_ss: 0,
            },
            _ => Dimensions::default(),
        }
    }

    fn decode_ping(&mut self, reader: &mut dyn Read) -> Result<DataKind> {
        self.store.clear();
        let kind = self.decode_record(reader)?;
        self.store.kind = kind;
        tracing::trace!("decoded {} ({} pulses)", kind, self.store.scan.pulses.len());
        Ok(kind)
    }

    fn encode_ping(&mut self, writer: &mut dyn Write) -> Result<()> {
        let bytes = self.encode_record()?;
        record::write_record(writer, &bytes)?;
        self.magic_written = true;
        Ok(())
    }

    fn extract(&self) -> Result<SwathRecord> {
        Ok(match self.store.kind {
            DataKind::Data => SwathRecord::Ping(self.store.to_ping()),
            DataKind::Comment => SwathRecord::Comment(self.store.comment.clone()),
            kind => SwathRecord::Other(kind),
        })
    }

    fn insert(&mut self, record: &SwathRecord) -> Result<()> {
        match record {
            SwathRecord::Ping(ping) => self.store.set_ping(ping),
            SwathRecord::Comment(text) => {
                self.store.kind = DataKind::Comment;
                self.store.comment = text.clone();
            }
            SwathRecord::Other(kind) => self.store.kind = *kind,
        }
        Ok(())
    }

    fn extract_nav(&self) -> Result<Navigation> {
        self.store.require_data()?;
        Ok(self.store.navigation())
    }

    fn insert_nav(&mut self, nav: &Navigation) -> Result<()> {
        self.store.require_data()?;
        let mut nav = *nav;
        nav.heading = fold_heading(nav.heading);
        self.store.set_navigation(&nav);
        Ok(())
    }

    fn extract_altitude(&self) -> Result<Altitude> {
        self.store.require_data()?;
        Ok(self.store.altitude())
    }

    fn extract_svp(&self) -> Result<Svp> {
        Err(Error::for_kind(self.store.kind))
    }

    fn insert_svp(&mut self, _svp: &Svp) -> Result<()> {
        Err(Error::for_kind(self.store.kind))
    }

    fn travel_times(&self) -> Result<TravelTimes> {
        self.store.require_data()?;
        Ok(self.store.travel_times())
    }

    fn detects(&self) -> Result<Vec<DetectKind>> {
        self.store.require_data()?;
        Ok(vec![DetectKind::Lidar; self.store.scan.pulses.len()])
    }

    fn gains(&self) -> Result<Gains> {
        self.store.require_data()?;
        Ok(Gains::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::BeamFlag;
    use approx::assert_abs_diff_eq;

    fn driver() -> LidarDriver {
        LidarDriver::new(LidarDriver::format_info())
    }

    fn raw_scan_bytes(pulses: &[RawPulse]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&RecordId::RawScan.value().to_be_bytes());
        let header = RawScanHeader {
            time: record::ScanTime {
                year: 2020,
                month: 1,
                day: 1,
                days_since_jan_1: 0,
                hour: 0,
                minutes: 0,
                seconds: 10,
                nanoseconds: 0,
            },
            num_pulses: pulses.len() as u32,
        };
        record::write_block(&mut out, &header).unwrap();
        for p in pulses {
            record::write_block(&mut out, p).unwrap();
        }
        out
    }

    fn nav_bytes(t0: f64) -> Vec<u8> {
        let mut out = FILE_MAGIC.to_be_bytes().to_vec();
        for (i, t) in [t0, t0 + 20.0].into_iter().enumerate() {
            out.extend_from_slice(&RecordId::Position.value().to_be_bytes());
            let r = PositionRecord {
                time_d: t,
                longitude: -122.0,
                latitude: 36.0 + i as f64 * 0.001,
            };
            record::write_block(&mut out, &r).unwrap();
            out.extend_from_slice(&RecordId::Heading.value().to_be_bytes());
            let r = HeadingRecord {
                time_d: t,
                heading: 90.0,
            };
            record::write_block(&mut out, &r).unwrap();
            out.extend_from_slice(&RecordId::SensorDepth.value().to_be_bytes());
            let r = SensorDepthRecord {
                time_d: t,
                depth: 100.0,
            };
            record::write_block(&mut out, &r).unwrap();
        }
        out
    }

    #[test]
    fn test_raw_scan_is_stamped_and_reconstructed() {
        let t0 = 1577836800.0;
        let mut bytes = nav_bytes(t0);
        bytes.extend(raw_scan_bytes(&[
            RawPulse {
                range: 4.0,
                ..RawPulse::default()
            },
            RawPulse::default(),
        ]));
        let mut d = driver();
        let mut reader = bytes.as_slice();
        let mut kinds = Vec::new();
        loop {
            let kind = d.decode_ping(&mut reader).unwrap();
            kinds.push(kind);
            if kind == DataKind::Data {
                break;
            }
        }
        assert_eq!(kinds[0], DataKind::Navigation);
        let scan = &d.store().scan;
        assert_abs_diff_eq!(scan.navlat, 36.0005, epsilon = 1e-9);
        assert_abs_diff_eq!(scan.heading, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(scan.sensordepth, 100.0, epsilon = 1e-9);
        assert!(scan.speed > 0.0);
        assert_eq!(scan.pulses[0].beamflag, BeamFlag::NONE);
        assert!(scan.pulses[1].beamflag.is_null());

        let SwathRecord::Ping(ping) = d.extract().unwrap() else {
            panic!("expected a ping");
        };
        assert_abs_diff_eq!(ping.beams[0].depth, 104.0, epsilon = 1e-6);
        assert_eq!(ping.beams[0].detect, DetectKind::Lidar);
        assert!(ping.pixels.is_empty());
        assert!(d.decode_ping(&mut reader).unwrap_err().is_eof());
    }

    #[test]
    fn test_per_pulse_strategy() {
        let t0 = 1577836800.0;
        let mut bytes = nav_bytes(t0);
        bytes.extend(raw_scan_bytes(&[
            RawPulse {
                range: 4.0,
                ..RawPulse::default()
            },
            RawPulse {
                range: 4.0,
                pulse_time_offset: 10_000_000,
                ..RawPulse::default()
            },
        ]));

        let mut shared = driver();
        let mut per_pulse = driver().with_strategy(NavStrategy::PerPulse);
        for d in [&mut shared, &mut per_pulse] {
            let mut reader = bytes.as_slice();
            while d.decode_ping(&mut reader).unwrap() != DataKind::Data {}
        }
        let a = &shared.store().scan.pulses;
        let b = &per_pulse.store().scan.pulses;
        assert_eq!(a[0].navlat, a[1].navlat);
        assert_eq!(a[0].navlat, b[0].navlat);
        assert_abs_diff_eq!(b[1].navlat, 36.001, epsilon = 1e-9);
        assert_abs_diff_eq!(b[1].time_d, t0 + 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_processed_round_trip() {
        let mut d = driver();
        let mut bytes = nav_bytes(1577836800.0);
        bytes.extend(raw_scan_bytes(&[
            RawPulse {
                range: 3.0,
                cross_track_angle: 10.0,
                amplitude: 120,
                ..RawPulse::default()
            },
            RawPulse::default(),
        ]));
        let mut reader = bytes.as_slice();
        while d.decode_ping(&mut reader).unwrap() != DataKind::Data {}

        let mut out = Vec::new();
        d.encode_ping(&mut out).unwrap();
        assert_eq!(&out[..2], &FILE_MAGIC.to_be_bytes());
        assert_eq!(out.len(), 4 + PROCESSED_HEADER_LEN + 2 * PROCESSED_PULSE_LEN);

        let mut r = driver();
        assert_eq!(r.decode_ping(&mut out.as_slice()).unwrap(), DataKind::Data);
        let (SwathRecord::Ping(a), SwathRecord::Ping(b)) = (d.extract().unwrap(), r.extract().unwrap())
        else {
            panic!("expected pings");
        };
        assert_eq!(a.beams, b.beams);
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!((a.longitude, a.latitude), (b.longitude, b.latitude));
        // speed is stored in single precision
        assert_abs_diff_eq!(a.speed, b.speed, epsilon = 1e-3);
    }

    #[test]
    fn test_unknown_record() {
        let bytes = [0x3D, 0x46, 0x12, 0x34];
        let err = driver().decode_ping(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, Error::Unintelligible(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_accessors_on_comment() {
        let mut d = driver();
        d.insert(&SwathRecord::Comment("x".to_string())).unwrap();
        assert!(matches!(d.extract_altitude(), Err(Error::Comment)));
        assert!(matches!(d.extract_svp(), Err(Error::Comment)));
        d.insert(&SwathRecord::Other(DataKind::Heading)).unwrap();
        assert!(matches!(d.detects(), Err(Error::Other)));
    }
}
