//! Reading pings, with optional averaging
//!
//! [`PingReader`] pulls raw records from a driver and folds a configured
//! number of consecutive pings into one. Each call to [`PingReader::read`]
//! returns a [`Reading`]: the averaged ping with its per-slot counts and
//! geographic positions, or a comment, or only a notice when a record was
//! rejected. Notices are non-fatal; fatal errors and the end of data come
//! back as `Err`.
//!
//! A bin is closed early when something interrupts the run of pings: a
//! time gap, a rejected ping, a comment or an error. Whatever interrupted
//! it is held and handled first by the next call, so binned data is never
//! dropped.
//!
//! ```
//! # use swathio::driver::Registry;
//! # use swathio::reader::{PingReader, ReadParams};
//! # use swathio::model::SwathRecord;
//! # fn main() -> Result<(),Box<dyn std::error::Error>> {
//! let registry = Registry::with_builtin_formats();
//! let mut writer = registry.open(42)?;
//! let mut bytes = Vec::new();
//! writer.insert(&SwathRecord::Comment("start of line".to_string()))?;
//! writer.encode_ping(&mut bytes)?;
//!
//! let reader = PingReader::new(bytes.as_slice(), registry.open(42)?, ReadParams::default())?;
//! let readings: Vec<_> = reader.collect::<Result<_, _>>()?;
//! assert_eq!(readings.len(), 1);
//! assert_eq!(readings[0].comment.as_deref(), Some("start of line"));
//! # Ok(())
//! # }
//! ```
use crate::driver::{Registry, SonarDriver};
use crate::error::{Error, Result};
use crate::geodesy::{apply_lonflip, coor_scale, fold_heading};
use crate::model::{epoch, Altitude, Beam, DataKind, Ping, Pixel, SwathRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use time::OffsetDateTime;

/// Reading and averaging configuration
///
/// Every field has a default, so a TOML file only needs the fields it
/// changes:
///
/// ```
/// # use swathio::reader::ReadParams;
/// let params: ReadParams = toml::from_str("pings = 3\ntimegap = 5.0").unwrap();
/// assert_eq!(params.pings, 3);
/// assert_eq!(params.lonflip, 0);
/// assert_eq!(params.bounds, [-360.0, 360.0, -90.0, 90.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadParams {
    /// Raw pings folded into each reading
    pub pings: usize,
    /// Longitude range: -1 for [-360, 0], 0 for [-180, 180], 1 for [0, 360]
    pub lonflip: i32,
    /// West, east, south and north limits in degrees
    pub bounds: [f64; 4],
    /// Pings before this time are rejected
    #[serde(with = "time::serde::rfc3339::option")]
    pub begin: Option<OffsetDateTime>,
    /// Pings after this time are rejected
    ///
    /// When `end` is before `begin` the window wraps: only pings between
    /// `end` and `begin` are rejected.
    #[serde(with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    /// Minimum speed in km/h
    pub speedmin: f64,
    /// Largest time between pings, in seconds, that is not a gap
    pub timegap: f64,
}

impl Default for ReadParams {
    fn default() -> Self {
        ReadParams {
            pings: 1,
            lonflip: 0,
            bounds: [-360.0, 360.0, -90.0, 90.0],
            begin: None,
            end: None,
            speedmin: 0.0,
            timegap: 60.0,
        }
    }
}

impl ReadParams {
    /// Load parameters from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<ReadParams> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::OpenFail {
            path: path.to_path_buf(),
            source,
        })?;
        let params: ReadParams = toml::from_str(&text)
            .map_err(|e| Error::BadParameter(format!("{}: {}", path.display(), e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Reject settings the reader cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pings == 0 {
            return Err(Error::BadParameter("pings must be at least 1".to_string()));
        }
        let [west, east, south, north] = self.bounds;
        if west >= east || south >= north {
            return Err(Error::BadParameter(format!(
                "bounds {:?} are empty",
                self.bounds
            )));
        }
        if self.timegap < 0.0 || self.speedmin < 0.0 {
            return Err(Error::BadParameter(
                "timegap and speedmin must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn in_bounds(&self, longitude: f64, latitude: f64) -> bool {
        let [west, east, south, north] = self.bounds;
        longitude >= west && longitude <= east && latitude >= south && latitude <= north
    }

    fn in_time(&self, t: OffsetDateTime) -> bool {
        match (self.begin, self.end) {
            (None, None) => true,
            (Some(b), None) => t >= b,
            (None, Some(e)) => t <= e,
            (Some(b), Some(e)) if b <= e => t >= b && t <= e,
            (Some(b), Some(e)) => t <= e || t >= b,
        }
    }
}

/// The outcome of one call to [`PingReader::read`]
#[derive(Debug, Default)]
pub struct Reading {
    /// What was read
    pub kind: DataKind,
    /// Raw pings folded into `ping`
    pub pings_binned: usize,
    /// The averaged ping
    pub ping: Option<Ping>,
    /// Pings contributing to each beam
    pub bath_counts: Vec<usize>,
    /// Pings contributing to each pixel
    pub ss_counts: Vec<usize>,
    /// Longitude and latitude of each beam
    pub bath_lonlat: Vec<(f64, f64)>,
    /// Longitude and latitude of each pixel
    pub ss_lonlat: Vec<(f64, f64)>,
    /// Distance covered since the previous ping, in km
    pub distance: f64,
    /// Averaged transducer depth and altitude, when the format has them
    pub altitude: Option<Altitude>,
    /// Comment text
    pub comment: Option<String>,
    /// A non-fatal condition met while reading
    pub notice: Option<Error>,
}

impl Reading {
    fn notice(kind: DataKind, notice: Error) -> Reading {
        Reading {
            kind,
            notice: Some(notice),
            ..Reading::default()
        }
    }

    fn comment(text: String) -> Reading {
        Reading {
            kind: DataKind::Comment,
            comment: Some(text),
            notice: Some(Error::Comment),
            ..Reading::default()
        }
    }
}

enum Raw {
    Ping(Ping, Option<Altitude>),
    Comment(String),
    Rejected(Error),
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    time_d: f64,
    longitude: f64,
    latitude: f64,
}

impl Anchor {
    fn of(ping: &Ping) -> Anchor {
        Anchor {
            time_d: ping.time_d(),
            longitude: ping.longitude,
            latitude: ping.latitude,
        }
    }

    /// Distance in km on a locally flat earth
    fn distance_to(&self, other: &Anchor) -> f64 {
        let (mtodeglon, mtodeglat) = coor_scale(0.5 * (self.latitude + other.latitude));
        let dx = (other.longitude - self.longitude) / mtodeglon;
        let dy = (other.latitude - self.latitude) / mtodeglat;
        dx.hypot(dy) / 1000.0
    }
}

#[derive(Default)]
struct Bin {
    pings: Vec<Ping>,
    altitudes: Vec<Altitude>,
    deferred: Option<Error>,
    distance: f64,
    start_time_d: Option<f64>,
}

impl Bin {
    fn is_empty(&self) -> bool {
        self.pings.is_empty()
    }

    fn len(&self) -> usize {
        self.pings.len()
    }
}

/// Reads, filters and averages pings from a stream
pub struct PingReader<R> {
    reader: R,
    driver: Box<dyn SonarDriver>,
    params: ReadParams,
    held: Option<Result<Raw>>,
    anchor: Option<Anchor>,
    pings_read: u64,
    finished: bool,
}

impl PingReader<BufReader<File>> {
    /// Open a file in a built-in format
    pub fn open<P: AsRef<Path>>(path: P, format: i32, params: ReadParams) -> Result<Self> {
        let driver = Registry::with_builtin_formats().open(format)?;
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::OpenFail {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("reading {} as format {}", path.display(), format);
        PingReader::new(BufReader::new(file), driver, params)
    }
}

impl<R: Read> PingReader<R> {
    /// Read from any byte stream with the given driver
    pub fn new(reader: R, driver: Box<dyn SonarDriver>, params: ReadParams) -> Result<Self> {
        params.validate()?;
        Ok(PingReader {
            reader,
            driver,
            params,
            held: None,
            anchor: None,
            pings_read: 0,
            finished: false,
        })
    }

    /// The driver, holding the most recently decoded record
    pub fn driver(&self) -> &dyn SonarDriver {
        self.driver.as_ref()
    }

    /// The configuration in use
    pub fn params(&self) -> &ReadParams {
        &self.params
    }

    /// Raw survey pings decoded so far
    pub fn pings_read(&self) -> u64 {
        self.pings_read
    }

    /// Decode until something the binning loop cares about turns up
    fn next_raw(&mut self) -> Result<Raw> {
        loop {
            match self.driver.decode_ping(&mut self.reader) {
                Ok(DataKind::Data) => {}
                Ok(DataKind::Comment) => {
                    if let SwathRecord::Comment(text) = self.driver.extract()? {
                        return Ok(Raw::Comment(text));
                    }
                    continue;
                }
                Ok(kind) => {
                    tracing::trace!("skipping {} record", kind);
                    continue;
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!("skipping record: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            }
            let SwathRecord::Ping(mut ping) = self.driver.extract()? else {
                continue;
            };
            self.pings_read += 1;
            ping.longitude = apply_lonflip(self.params.lonflip, ping.longitude);
            if !self.params.in_bounds(ping.longitude, ping.latitude) {
                tracing::debug!(
                    "ping at {} {} outside bounds",
                    ping.longitude,
                    ping.latitude
                );
                return Ok(Raw::Rejected(Error::OutOfBounds));
            }
            if !self.params.in_time(ping.timestamp) {
                tracing::debug!("ping at {} outside time window", ping.timestamp);
                return Ok(Raw::Rejected(Error::OutOfTime));
            }
            let altitude = self.driver.extract_altitude().ok();
            return Ok(Raw::Ping(ping, altitude));
        }
    }

    fn is_gap(&self, ping: &Ping) -> bool {
        match self.anchor {
            Some(a) if self.pings_read > 1 => ping.time_d() - a.time_d > self.params.timegap,
            _ => false,
        }
    }

    fn add_to_bin(&mut self, bin: &mut Bin, ping: Ping, altitude: Option<Altitude>) {
        let here = Anchor::of(&ping);
        match self.anchor {
            Some(a) => {
                bin.distance += a.distance_to(&here);
                bin.start_time_d.get_or_insert(a.time_d);
            }
            None => {
                bin.start_time_d.get_or_insert(here.time_d);
            }
        }
        self.anchor = Some(here);
        bin.pings.push(ping);
        bin.altitudes.extend(altitude);
    }

    /// Read the next reading
    ///
    /// Returns [`Error::Eof`] once the stream is exhausted and no binned
    /// data is left.
    pub fn read(&mut self) -> Result<Reading> {
        let mut bin = Bin::default();
        while bin.len() < self.params.pings {
            let item = match self.held.take() {
                Some(item) => item,
                None => self.next_raw(),
            };
            match item {
                Ok(Raw::Ping(ping, altitude)) => {
                    if self.is_gap(&ping) {
                        self.anchor = None;
                        if !bin.is_empty() {
                            self.held = Some(Ok(Raw::Ping(ping, altitude)));
                            return self.close(bin, Some(Error::TimeGap));
                        }
                        if self.params.pings == 1 {
                            self.held = Some(Ok(Raw::Ping(ping, altitude)));
                            return Ok(Reading::notice(DataKind::Data, Error::TimeGap));
                        }
                        bin.deferred = Some(Error::TimeGap);
                    }
                    self.add_to_bin(&mut bin, ping, altitude);
                }
                Ok(Raw::Comment(text)) => {
                    if bin.is_empty() {
                        return Ok(Reading::comment(text));
                    }
                    self.held = Some(Ok(Raw::Comment(text)));
                    return self.close(bin, None);
                }
                Ok(Raw::Rejected(notice)) => {
                    if bin.is_empty() {
                        self.anchor = None;
                        return Ok(Reading::notice(DataKind::Data, notice));
                    }
                    self.held = Some(Ok(Raw::Rejected(notice)));
                    return self.close(bin, None);
                }
                Err(e) => {
                    if bin.is_empty() {
                        return Err(e);
                    }
                    self.held = Some(Err(e));
                    return self.close(bin, None);
                }
            }
        }
        self.close(bin, None)
    }

    fn close(&mut self, bin: Bin, notice: Option<Error>) -> Result<Reading> {
        let n = bin.len();
        let (Some(first), Some(last)) = (bin.pings.first(), bin.pings.last()) else {
            return Err(Error::NoPingsBinned);
        };
        let elapsed = last.time_d() - bin.start_time_d.unwrap_or(first.time_d());

        let (ping, bath_counts, ss_counts) = if n == 1 {
            let ping = first.clone();
            let bath = ping.beams.iter().map(|b| b.flag.is_ok() as usize).collect();
            let ss = ping.pixels.iter().map(|p| p.is_valid() as usize).collect();
            (ping, bath, ss)
        } else {
            average(&bin.pings)?
        };

        let speed = if ping.speed > 0.0 {
            ping.speed
        } else if elapsed > 0.0 {
            3600.0 * bin.distance / elapsed
        } else {
            0.0
        };
        let mut notice = notice.or(bin.deferred);
        if self.pings_read > 1 && speed < self.params.speedmin {
            notice = Some(Error::SpeedTooSmall);
        }

        let altitude = (!bin.altitudes.is_empty()).then(|| {
            let k = bin.altitudes.len() as f64;
            Altitude {
                transducer_depth: bin.altitudes.iter().map(|a| a.transducer_depth).sum::<f64>() / k,
                altitude: bin.altitudes.iter().map(|a| a.altitude).sum::<f64>() / k,
            }
        });

        let (bath_lonlat, ss_lonlat) = positions(&ping);
        tracing::trace!("binned {} pings at {}", n, ping.timestamp);
        Ok(Reading {
            kind: DataKind::Data,
            pings_binned: n,
            ping: Some(ping),
            bath_counts,
            ss_counts,
            bath_lonlat,
            ss_lonlat,
            distance: bin.distance,
            altitude,
            comment: None,
            notice,
        })
    }
}

impl<R: Read> Iterator for PingReader<R> {
    type Item = Result<Reading>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read() {
            Err(e) if e.is_eof() => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
            ok => Some(ok),
        }
    }
}

/// Slot-by-slot mean of several pings over valid values only
///
/// The output has a slot for every beam and pixel any of the pings carries,
/// so a short first ping does not truncate the rest. Slots nobody filled
/// keep the first ping's value, or a null.
fn average(pings: &[Ping]) -> Result<(Ping, Vec<usize>, Vec<usize>)> {
    let first = &pings[0];
    let k = pings.len() as f64;
    let nbeams = pings.iter().map(|p| p.beams.len()).max().unwrap_or(0);
    let npixels = pings.iter().map(|p| p.pixels.len()).max().unwrap_or(0);

    let time_d = pings.iter().map(Ping::time_d).sum::<f64>() / k;
    let longitude = pings.iter().map(|p| p.longitude).sum::<f64>() / k;
    let latitude = pings.iter().map(|p| p.latitude).sum::<f64>() / k;
    let speed = pings.iter().map(|p| p.speed).sum::<f64>() / k;
    let (sx, sy) = pings.iter().fold((0.0, 0.0), |(sx, sy), p| {
        let (s, c) = p.heading.to_radians().sin_cos();
        (sx + s, sy + c)
    });
    let heading = fold_heading(sx.atan2(sy).to_degrees());

    let mut beams: Vec<Beam> = (0..nbeams)
        .map(|i| first.beams.get(i).copied().unwrap_or_else(Beam::null))
        .collect();
    let mut bath_counts = vec![0usize; nbeams];
    let mut sums = vec![[0.0f64; 4]; nbeams];
    for ping in pings {
        for (i, b) in ping.beams.iter().enumerate() {
            if !b.flag.is_ok() {
                continue;
            }
            if bath_counts[i] == 0 {
                beams[i].flag = b.flag;
                beams[i].detect = b.detect;
            }
            bath_counts[i] += 1;
            let s = &mut sums[i];
            s[0] += b.depth;
            s[1] += b.acrosstrack;
            s[2] += b.alongtrack;
            s[3] += b.amplitude;
        }
    }
    for ((beam, count), s) in beams.iter_mut().zip(&bath_counts).zip(&sums) {
        if *count > 0 {
            let c = *count as f64;
            beam.depth = s[0] / c;
            beam.acrosstrack = s[1] / c;
            beam.alongtrack = s[2] / c;
            beam.amplitude = s[3] / c;
        }
    }

    let mut pixels: Vec<Pixel> = (0..npixels)
        .map(|i| {
            let p = first.pixels.get(i).copied().unwrap_or_else(Pixel::null);
            Pixel {
                amplitude: crate::model::SIDESCAN_NULL,
                ..p
            }
        })
        .collect();
    let mut ss_counts = vec![0usize; npixels];
    let mut ss_sums = vec![[0.0f64; 3]; npixels];
    for ping in pings {
        for (i, p) in ping.pixels.iter().enumerate() {
            if !p.is_valid() {
                continue;
            }
            ss_counts[i] += 1;
            let s = &mut ss_sums[i];
            s[0] += p.amplitude;
            s[1] += p.acrosstrack;
            s[2] += p.alongtrack;
        }
    }
    for ((pixel, count), s) in pixels.iter_mut().zip(&ss_counts).zip(&ss_sums) {
        if *count > 0 {
            let c = *count as f64;
            pixel.amplitude = s[0] / c;
            pixel.acrosstrack = s[1] / c;
            pixel.alongtrack = s[2] / c;
        }
    }

    let ping = Ping::new(
        epoch::from_seconds(time_d)?,
        longitude,
        latitude,
        speed,
        heading,
        beams,
        pixels,
    );
    Ok((ping, bath_counts, ss_counts))
}

/// Longitude and latitude of every beam and pixel of a ping
fn positions(ping: &Ping) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let (mtodeglon, mtodeglat) = coor_scale(ping.latitude);
    let (headingx, headingy) = ping.heading.to_radians().sin_cos();
    let locate = |across: f64, along: f64| {
        (
            ping.longitude + headingy * mtodeglon * across + headingx * mtodeglon * along,
            ping.latitude - headingx * mtodeglat * across + headingy * mtodeglat * along,
        )
    };
    let bath = ping
        .beams
        .iter()
        .map(|b| locate(b.acrosstrack, b.alongtrack))
        .collect();
    let ss = ping
        .pixels
        .iter()
        .map(|p| locate(p.acrosstrack, p.alongtrack))
        .collect();
    (bath, ss)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use time::macros::datetime;

    #[test]
    fn test_time_window() {
        let mut p = ReadParams::default();
        let t = datetime!(2000-01-01 12:00 UTC);
        assert!(p.in_time(t));
        p.begin = Some(datetime!(2000-01-01 13:00 UTC));
        assert!(!p.in_time(t));
        p.end = Some(datetime!(2000-01-01 11:00 UTC));
        // wrapped window rejects only the span between end and begin
        assert!(!p.in_time(t));
        assert!(p.in_time(datetime!(2000-01-01 10:00 UTC)));
        assert!(p.in_time(datetime!(2000-01-01 14:00 UTC)));
    }

    #[test]
    fn test_validate() {
        assert!(ReadParams::default().validate().is_ok());
        let p = ReadParams {
            pings: 0,
            ..ReadParams::default()
        };
        assert!(matches!(p.validate(), Err(Error::BadParameter(_))));
        let p = ReadParams {
            bounds: [10.0, 0.0, -90.0, 90.0],
            ..ReadParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_positions_follow_heading() {
        let mut ping = Ping::new(
            datetime!(2000-01-01 0:00 UTC),
            0.0,
            0.0,
            0.0,
            90.0,
            vec![Beam {
                acrosstrack: 100.0,
                ..Beam::default()
            }],
            vec![],
        );
        let (bath, _) = positions(&ping);
        let (_, mtodeglat) = coor_scale(0.0);
        // heading east, starboard is south
        assert_abs_diff_eq!(bath[0].0, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bath[0].1, -100.0 * mtodeglat, epsilon = 1e-12);

        ping.heading = 0.0;
        let (bath, _) = positions(&ping);
        let (mtodeglon, _) = coor_scale(0.0);
        assert_abs_diff_eq!(bath[0].0, 100.0 * mtodeglon, epsilon = 1e-12);
        assert_abs_diff_eq!(bath[0].1, 0.0, epsilon = 1e-12);
    }
}
