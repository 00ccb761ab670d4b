//! In-memory LIDAR records, navigation history and sounding reconstruction
use super::record::{ParameterRecord, ProcessedPulse, ProcessedScanHeader, RawPulse, ScanTime};
use crate::geodesy::{coor_scale, fold_heading, rollpitch_to_takeoff};
use crate::model::{
    epoch, Altitude, Beam, BeamFlag, BeamTravelTime, DataKind, DetectKind, Navigation, Ping,
    TravelTimes,
};
use std::collections::VecDeque;
use time::OffsetDateTime;

/// Ranges at or below this are treated as no return
pub const MIN_RANGE: f64 = 0.001;

/// Samples kept per navigation channel
pub const HISTORY_LEN: usize = 1000;

/// Meters per second per (km/h * microsecond)
const SPEED_TIME_SCALE: f64 = 0.000_000_277_777_7;

/// One laser shot and its reconstructed sounding
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pulse {
    /// Slant range in meters
    pub range: f64,
    /// Return amplitude
    pub amplitude: i16,
    /// Signal to noise ratio
    pub snr: f64,
    /// Scan angle across track in degrees
    pub cross_track_angle: f64,
    /// Scan angle along track in degrees
    pub forward_track_angle: f64,
    /// Static across-track offset in meters
    pub cross_track_offset: f64,
    /// Static along-track offset in meters
    pub forward_track_offset: f64,
    /// Microseconds since the first pulse of the scan
    pub pulse_time_offset: u32,
    /// Saturation flag
    pub saturated: u8,
    /// Time of the pulse in seconds since the Unix epoch
    pub time_d: f64,
    /// Quality flag
    pub beamflag: BeamFlag,
    /// Across-track distance in meters
    pub acrosstrack: f64,
    /// Along-track distance in meters
    pub alongtrack: f64,
    /// Depth below the sensor in meters
    pub depth: f64,
    /// Sensor longitude at the pulse
    pub navlon: f64,
    /// Sensor latitude at the pulse
    pub navlat: f64,
    /// Sensor depth at the pulse
    pub sensordepth: f64,
    /// Heading at the pulse
    pub heading: f64,
    /// Roll at the pulse
    pub roll: f64,
    /// Pitch at the pulse
    pub pitch: f64,
}

impl Pulse {
    /// A slot with no return
    pub fn null() -> Pulse {
        Pulse {
            beamflag: BeamFlag::NULL,
            ..Pulse::default()
        }
    }

    /// Fill depth, across-track and along-track from range and angles
    ///
    /// `speed` is the platform speed in km/h, used to move the sounding
    /// forward by the distance travelled since the first pulse of the scan.
    pub fn reconstruct(&mut self, speed: f64) {
        if self.range > MIN_RANGE {
            let (theta, phi) = self.takeoff();
            let (st, ct) = theta.to_radians().sin_cos();
            let (sp, cp) = phi.to_radians().sin_cos();
            let xx = self.range * st;
            self.beamflag = BeamFlag::NONE;
            self.depth = self.range * ct;
            self.acrosstrack = xx * cp + self.cross_track_offset;
            self.alongtrack = xx * sp
                + self.forward_track_offset
                + SPEED_TIME_SCALE * self.pulse_time_offset as f64 * speed;
        } else {
            self.beamflag = BeamFlag::NULL;
            self.depth = 0.0;
            self.acrosstrack = 0.0;
            self.alongtrack = 0.0;
        }
    }

    /// Takeoff angles of the ray, corrected for roll and pitch
    pub fn takeoff(&self) -> (f64, f64) {
        let alpha = self.forward_track_angle + self.pitch;
        let beta = 90.0 - self.cross_track_angle + self.roll;
        rollpitch_to_takeoff(alpha, beta)
    }

    /// Copy navigation and attitude from a fix
    pub fn set_fix(&mut self, fix: &Fix) {
        self.navlon = fix.longitude;
        self.navlat = fix.latitude;
        self.sensordepth = fix.sensordepth;
        self.heading = fix.heading;
        self.roll = fix.roll;
        self.pitch = fix.pitch;
    }
}

impl From<&RawPulse> for Pulse {
    fn from(p: &RawPulse) -> Pulse {
        Pulse {
            range: p.range as f64,
            amplitude: p.amplitude,
            snr: p.snr as f64,
            cross_track_angle: p.cross_track_angle as f64,
            forward_track_angle: p.forward_track_angle as f64,
            cross_track_offset: p.cross_track_offset as f64,
            forward_track_offset: p.forward_track_offset as f64,
            pulse_time_offset: p.pulse_time_offset,
            saturated: p.saturated,
            ..Pulse::default()
        }
    }
}

impl From<&ProcessedPulse> for Pulse {
    fn from(p: &ProcessedPulse) -> Pulse {
        Pulse {
            time_d: p.time_d,
            beamflag: BeamFlag::from_bits_retain(p.beamflag),
            acrosstrack: p.acrosstrack,
            alongtrack: p.alongtrack,
            depth: p.depth,
            navlon: p.navlon,
            navlat: p.navlat,
            sensordepth: p.sensordepth,
            heading: p.heading as f64,
            roll: p.roll as f64,
            pitch: p.pitch as f64,
            ..Pulse::from(&p.raw)
        }
    }
}

impl From<&Pulse> for ProcessedPulse {
    fn from(p: &Pulse) -> ProcessedPulse {
        ProcessedPulse {
            raw: RawPulse {
                range: p.range as f32,
                amplitude: p.amplitude,
                snr: p.snr as f32,
                cross_track_angle: p.cross_track_angle as f32,
                forward_track_angle: p.forward_track_angle as f32,
                cross_track_offset: p.cross_track_offset as f32,
                forward_track_offset: p.forward_track_offset as f32,
                pulse_time_offset: p.pulse_time_offset,
                saturated: p.saturated,
            },
            time_d: p.time_d,
            beamflag: p.beamflag.bits(),
            acrosstrack: p.acrosstrack,
            alongtrack: p.alongtrack,
            depth: p.depth,
            navlon: p.navlon,
            navlat: p.navlat,
            sensordepth: p.sensordepth,
            heading: p.heading as f32,
            roll: p.roll as f32,
            pitch: p.pitch as f32,
        }
    }
}

/// Navigation and attitude at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fix {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Sensor depth in meters
    pub sensordepth: f64,
    /// Heading in degrees
    pub heading: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Pitch in degrees
    pub pitch: f64,
    /// Heave in meters
    pub heave: f64,
}

/// A bounded time series with linear interpolation
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: VecDeque<(f64, f64)>,
    angular: bool,
}

impl Series {
    /// A series of plain values
    pub fn linear() -> Series {
        Series::default()
    }

    /// A series of angles in degrees, interpolated across north
    pub fn angular() -> Series {
        Series {
            samples: VecDeque::new(),
            angular: true,
        }
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` when no sample has been added
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample; samples that do not advance in time are dropped
    pub fn push(&mut self, time_d: f64, value: f64) {
        if let Some((last, _)) = self.samples.back() {
            if time_d <= *last {
                tracing::trace!("dropping out of order sample at {}", time_d);
                return;
            }
        }
        if self.samples.len() == HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back((time_d, value));
    }

    /// The bracketing samples of `time_d` and the interpolation weight
    fn bracket(&self, time_d: f64) -> Option<((f64, f64), (f64, f64), f64)> {
        let first = *self.samples.front()?;
        let last = *self.samples.back()?;
        if time_d <= first.0 {
            return Some((first, first, 0.0));
        }
        if time_d >= last.0 {
            return Some((last, last, 0.0));
        }
        let i = self.samples.partition_point(|(t, _)| *t <= time_d);
        let (a, b) = (self.samples[i - 1], self.samples[i]);
        Some((a, b, (time_d - a.0) / (b.0 - a.0)))
    }

    /// The value at `time_d`, held constant outside the covered span
    pub fn at(&self, time_d: f64) -> Option<f64> {
        let ((_, v0), (_, v1), w) = self.bracket(time_d)?;
        if self.angular {
            let mut d = v1 - v0;
            if d > 180.0 {
                d -= 360.0;
            } else if d < -180.0 {
                d += 360.0;
            }
            Some(fold_heading(v0 + w * d))
        } else {
            Some(v0 + w * (v1 - v0))
        }
    }
}

/// Navigation and attitude received as separate asynchronous records
#[derive(Debug, Clone)]
pub struct NavHistory {
    longitude: Series,
    latitude: Series,
    sensordepth: Series,
    heading: Series,
    roll: Series,
    pitch: Series,
    heave: Series,
}

impl Default for NavHistory {
    fn default() -> Self {
        NavHistory {
            longitude: Series::linear(),
            latitude: Series::linear(),
            sensordepth: Series::linear(),
            heading: Series::angular(),
            roll: Series::linear(),
            pitch: Series::linear(),
            heave: Series::linear(),
        }
    }
}

impl NavHistory {
    /// Add a position fix
    pub fn add_position(&mut self, time_d: f64, longitude: f64, latitude: f64) {
        self.longitude.push(time_d, longitude);
        self.latitude.push(time_d, latitude);
    }

    /// Add an attitude sample
    pub fn add_attitude(&mut self, time_d: f64, roll: f64, pitch: f64, heave: f64) {
        self.roll.push(time_d, roll);
        self.pitch.push(time_d, pitch);
        self.heave.push(time_d, heave);
    }

    /// Add a heading sample
    pub fn add_heading(&mut self, time_d: f64, heading: f64) {
        self.heading.push(time_d, heading);
    }

    /// Add a sensor depth sample
    pub fn add_sensordepth(&mut self, time_d: f64, depth: f64) {
        self.sensordepth.push(time_d, depth);
    }

    /// Return `true` when no position has been seen yet
    pub fn lacks_position(&self) -> bool {
        self.longitude.is_empty()
    }

    /// Speed over ground in km/h from the fixes around `time_d`
    fn speed(&self, time_d: f64) -> f64 {
        let (Some(((t0, lon0), (t1, lon1), _)), Some(((_, lat0), (_, lat1), _))) =
            (self.longitude.bracket(time_d), self.latitude.bracket(time_d))
        else {
            return 0.0;
        };
        if t1 <= t0 {
            return 0.0;
        }
        let (mtodeglon, mtodeglat) = coor_scale(0.5 * (lat0 + lat1));
        let dx = (lon1 - lon0) / mtodeglon;
        let dy = (lat1 - lat0) / mtodeglat;
        3.6 * dx.hypot(dy) / (t1 - t0)
    }

    /// Interpolate everything at `time_d`; missing channels are zero
    pub fn fix(&self, time_d: f64) -> Fix {
        let at = |s: &Series| s.at(time_d).unwrap_or(0.0);
        Fix {
            longitude: at(&self.longitude),
            latitude: at(&self.latitude),
            speed: self.speed(time_d),
            sensordepth: at(&self.sensordepth),
            heading: at(&self.heading),
            roll: at(&self.roll),
            pitch: at(&self.pitch),
            heave: at(&self.heave),
        }
    }
}

/// One scan of the laser
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    /// Time of the first pulse
    pub timestamp: OffsetDateTime,
    /// Sensor longitude
    pub navlon: f64,
    /// Sensor latitude
    pub navlat: f64,
    /// Sensor depth in meters
    pub sensordepth: f64,
    /// Heading in degrees
    pub heading: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Pitch in degrees
    pub pitch: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Pulses, padded with null slots to the configured scan size
    pub pulses: Vec<Pulse>,
}

impl Default for Scan {
    fn default() -> Self {
        Scan {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            navlon: 0.0,
            navlat: 0.0,
            sensordepth: 0.0,
            heading: 0.0,
            roll: 0.0,
            pitch: 0.0,
            speed: 0.0,
            pulses: Vec::new(),
        }
    }
}

impl Scan {
    /// Seconds since the Unix epoch of the first pulse
    pub fn time_d(&self) -> f64 {
        epoch::seconds(self.timestamp)
    }

    /// Copy a fix into the scan-level navigation
    pub fn set_fix(&mut self, fix: &Fix) {
        self.navlon = fix.longitude;
        self.navlat = fix.latitude;
        self.speed = fix.speed;
        self.sensordepth = fix.sensordepth;
        self.heading = fix.heading;
        self.roll = fix.roll;
        self.pitch = fix.pitch;
    }

    /// The scan-level navigation as a fix
    pub fn fix(&self) -> Fix {
        Fix {
            longitude: self.navlon,
            latitude: self.navlat,
            speed: self.speed,
            sensordepth: self.sensordepth,
            heading: self.heading,
            roll: self.roll,
            pitch: self.pitch,
            heave: 0.0,
        }
    }

    /// Reconstruct every pulse from its range and angles
    pub fn calculate_bathymetry(&mut self) {
        let speed = self.speed;
        for pulse in &mut self.pulses {
            pulse.reconstruct(speed);
        }
    }

    /// Pad with null pulses up to `n`
    pub fn pad_to(&mut self, n: usize) {
        if self.pulses.len() < n {
            self.pulses.resize(n, Pulse::null());
        }
    }

    /// The header written ahead of the pulses of a processed scan
    pub fn processed_header(&self) -> ProcessedScanHeader {
        let t = self.timestamp;
        ProcessedScanHeader {
            time: ScanTime {
                year: t.year().clamp(0, u16::MAX as i32) as u16,
                month: t.month() as u8,
                day: t.day(),
                days_since_jan_1: t.ordinal() - 1,
                hour: t.hour() as u16,
                minutes: t.minute(),
                seconds: t.second(),
                nanoseconds: t.nanosecond(),
            },
            time_d: self.time_d(),
            navlon: self.navlon,
            navlat: self.navlat,
            sensordepth: self.sensordepth,
            heading: self.heading as f32,
            roll: self.roll as f32,
            pitch: self.pitch as f32,
            speed: self.speed as f32,
            num_pulses: self.pulses.len() as u32,
        }
    }
}

/// The most recent record decoded, or the one about to be encoded
#[derive(Debug, Clone, Default)]
pub struct LidarStore {
    /// Kind of the record held
    pub kind: DataKind,
    /// Scanner configuration
    pub parameter: ParameterRecord,
    /// Comment text
    pub comment: String,
    /// Time of the last asynchronous sample
    pub sample_time_d: f64,
    /// Values of the last asynchronous sample
    pub sample: Fix,
    /// The scan
    pub scan: Scan,
}

impl LidarStore {
    /// Reset to an empty store, keeping the scanner configuration
    pub fn clear(&mut self) {
        self.kind = DataKind::None;
        self.comment.clear();
        self.scan.pulses.clear();
    }

    /// Fail with the accessor error for anything but a scan
    pub fn require_data(&self) -> crate::Result<()> {
        match self.kind {
            DataKind::Data => Ok(()),
            kind => Err(crate::Error::for_kind(kind)),
        }
    }

    /// The scan as a generic ping
    pub fn to_ping(&self) -> Ping {
        let s = &self.scan;
        let beams = s
            .pulses
            .iter()
            .map(|p| Beam {
                flag: p.beamflag,
                depth: p.depth + p.sensordepth,
                acrosstrack: p.acrosstrack,
                alongtrack: p.alongtrack,
                amplitude: p.amplitude as f64,
                detect: DetectKind::Lidar,
                angle_across: p.cross_track_angle,
                angle_forward: p.forward_track_angle,
                snr: p.snr,
                ..Beam::default()
            })
            .collect();
        Ping::new(
            s.timestamp,
            s.navlon,
            s.navlat,
            s.speed,
            s.heading,
            beams,
            Vec::new(),
        )
    }

    /// Move the scan navigation, shifting every pulse by the same amount
    fn move_scan(&mut self, longitude: f64, latitude: f64, heading: f64) {
        let s = &mut self.scan;
        let dlon = longitude - s.navlon;
        let dlat = latitude - s.navlat;
        let dheading = heading - s.heading;
        s.navlon = longitude;
        s.navlat = latitude;
        s.heading = heading;
        for p in &mut s.pulses {
            p.navlon += dlon;
            p.navlat += dlat;
            p.heading = fold_heading(p.heading + dheading);
        }
    }

    /// Replace the scan from a generic ping
    ///
    /// Pulses are added or dropped to match the beam count.
    pub fn set_ping(&mut self, ping: &Ping) {
        self.kind = DataKind::Data;
        let fresh = self.scan.pulses.len() != ping.beams.len();
        if fresh {
            let template = Pulse {
                time_d: ping.time_d(),
                navlon: self.scan.navlon,
                navlat: self.scan.navlat,
                sensordepth: self.scan.sensordepth,
                heading: self.scan.heading,
                roll: self.scan.roll,
                pitch: self.scan.pitch,
                ..Pulse::null()
            };
            self.scan.pulses.resize(ping.beams.len(), template);
        }
        self.scan.timestamp = ping.timestamp;
        self.scan.speed = ping.speed;
        self.move_scan(ping.longitude, ping.latitude, ping.heading);
        for (p, b) in self.scan.pulses.iter_mut().zip(&ping.beams) {
            p.beamflag = b.flag;
            p.depth = b.depth - p.sensordepth;
            p.amplitude = b.amplitude.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            p.acrosstrack = b.acrosstrack;
            p.alongtrack = b.alongtrack;
        }
    }

    /// Navigation of the scan
    pub fn navigation(&self) -> Navigation {
        let s = &self.scan;
        Navigation {
            timestamp: s.timestamp,
            longitude: s.navlon,
            latitude: s.navlat,
            speed: s.speed,
            heading: s.heading,
            draft: s.sensordepth,
            roll: s.roll,
            pitch: s.pitch,
            heave: 0.0,
        }
    }

    /// Overwrite the scan navigation
    pub fn set_navigation(&mut self, nav: &Navigation) {
        self.scan.timestamp = nav.timestamp;
        self.scan.speed = nav.speed;
        self.move_scan(nav.longitude, nav.latitude, nav.heading);
        let ddepth = nav.draft - self.scan.sensordepth;
        self.scan.sensordepth = nav.draft;
        self.scan.roll = nav.roll;
        self.scan.pitch = nav.pitch;
        for p in &mut self.scan.pulses {
            p.sensordepth += ddepth;
        }
    }

    /// Sensor depth and the depth of the sounding nearest the nadir
    pub fn altitude(&self) -> Altitude {
        let nadir = self
            .scan
            .pulses
            .iter()
            .filter(|p| !p.beamflag.is_null())
            .map(|p| (p.acrosstrack.hypot(p.alongtrack), p.depth))
            .min_by(|a, b| a.0.total_cmp(&b.0));
        Altitude {
            transducer_depth: self.scan.sensordepth,
            altitude: nadir.map(|(_, depth)| depth).unwrap_or(0.0),
        }
    }

    /// Takeoff angles of every pulse; lidar keeps no travel times
    pub fn travel_times(&self) -> TravelTimes {
        let beams = self
            .scan
            .pulses
            .iter()
            .map(|p| {
                let (angle, angle_forward) = if p.beamflag.is_null() {
                    (0.0, 0.0)
                } else {
                    p.takeoff()
                };
                BeamTravelTime {
                    angle,
                    angle_forward,
                    ..BeamTravelTime::default()
                }
            })
            .collect();
        TravelTimes {
            beams,
            draft: 0.0,
            ssv: 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_null_range() {
        for range in [0.0, 0.0005, 0.001] {
            let mut p = Pulse {
                range,
                cross_track_angle: 20.0,
                forward_track_angle: -5.0,
                cross_track_offset: 1.0,
                depth: 9.0,
                ..Pulse::default()
            };
            p.reconstruct(10.0);
            assert!(p.beamflag.is_null());
            assert_eq!((p.depth, p.acrosstrack, p.alongtrack), (0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_vertical_pulse() {
        let mut p = Pulse {
            range: 12.5,
            ..Pulse::default()
        };
        p.reconstruct(0.0);
        assert_eq!(p.beamflag, BeamFlag::NONE);
        assert_abs_diff_eq!(p.depth, 12.5, epsilon = 1e-9);
        assert_abs_diff_eq!(p.acrosstrack, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.alongtrack, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cross_track_pulse() {
        let mut p = Pulse {
            range: 10.0,
            cross_track_angle: 30.0,
            cross_track_offset: 0.5,
            forward_track_offset: 0.25,
            ..Pulse::default()
        };
        p.reconstruct(0.0);
        assert_abs_diff_eq!(p.depth, 10.0 * 30f64.to_radians().cos(), epsilon = 1e-9);
        assert_abs_diff_eq!(p.acrosstrack, 5.5, epsilon = 1e-9);
        assert_abs_diff_eq!(p.alongtrack, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_motion_during_scan() {
        // 36 km/h is 10 m/s, a tenth of a second moves a meter
        let mut p = Pulse {
            range: 5.0,
            pulse_time_offset: 100_000,
            ..Pulse::default()
        };
        p.reconstruct(36.0);
        assert_abs_diff_eq!(p.alongtrack, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_series_interpolation() {
        let mut s = Series::linear();
        assert_eq!(s.at(1.0), None);
        s.push(10.0, 1.0);
        s.push(20.0, 3.0);
        s.push(15.0, 100.0);
        assert_eq!(s.len(), 2);
        assert_eq!(s.at(0.0), Some(1.0));
        assert_eq!(s.at(15.0), Some(2.0));
        assert_eq!(s.at(99.0), Some(3.0));

        let mut h = Series::angular();
        h.push(0.0, 350.0);
        h.push(2.0, 10.0);
        assert_abs_diff_eq!(h.at(1.0).unwrap(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(h.at(0.5).unwrap(), 355.0, epsilon = 1e-9);
    }

    #[test]
    fn test_series_is_bounded() {
        let mut s = Series::linear();
        for i in 0..HISTORY_LEN + 10 {
            s.push(i as f64, i as f64);
        }
        assert_eq!(s.len(), HISTORY_LEN);
        assert_eq!(s.at(0.0), Some(10.0));
    }

    #[test]
    fn test_history_speed() {
        let mut h = NavHistory::default();
        let (_, mtodeglat) = coor_scale(0.0);
        h.add_position(0.0, 0.0, 0.0);
        h.add_position(10.0, 0.0, 100.0 * mtodeglat);
        let fix = h.fix(5.0);
        assert_abs_diff_eq!(fix.speed, 36.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fix.latitude, 50.0 * mtodeglat, epsilon = 1e-12);
    }

    #[test]
    fn test_insert_shifts_pulses() {
        let mut store = LidarStore::default();
        store.kind = DataKind::Data;
        store.scan.navlon = 10.0;
        store.scan.heading = 350.0;
        store.scan.pulses = vec![
            Pulse {
                navlon: 10.5,
                heading: 355.0,
                sensordepth: 2.0,
                ..Pulse::default()
            };
            2
        ];
        let mut ping = store.to_ping();
        ping.longitude = 11.0;
        ping.heading = 20.0;
        ping.beams[1].depth = 7.0;
        store.set_ping(&ping);
        assert_abs_diff_eq!(store.scan.pulses[0].navlon, 11.5, epsilon = 1e-12);
        assert_abs_diff_eq!(store.scan.pulses[0].heading, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(store.scan.pulses[1].depth, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_altitude_uses_nadir_pulse() {
        let mut store = LidarStore::default();
        store.kind = DataKind::Data;
        store.scan.sensordepth = 3.0;
        store.scan.pulses = vec![
            Pulse {
                acrosstrack: 4.0,
                depth: 8.0,
                ..Pulse::default()
            },
            Pulse {
                acrosstrack: -0.5,
                depth: 6.0,
                ..Pulse::default()
            },
            Pulse::null(),
        ];
        let a = store.altitude();
        assert_eq!(a.transducer_depth, 3.0);
        assert_eq!(a.altitude, 6.0);
    }
}
