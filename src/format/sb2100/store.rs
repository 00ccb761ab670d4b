//! The SeaBeam 2100 store and its mapping onto the generic model
use super::record::{
    BeamRecord, DataHeaderRecord, ParameterRecord, PixelRecord, RecordTime, MAX_BEAMS, MAX_PIXELS,
    MAX_SVP,
};
use crate::error::{Error, Result};
use crate::model::epoch;
use crate::model::{
    Altitude, Beam, BeamFlag, BeamTravelTime, DataKind, DetectKind, Gains, Navigation, Pixel,
    Ping, Svp, TravelTimes, SIDESCAN_NULL,
};
use time::OffsetDateTime;

/// Knots-ish native speed units to km/h
const SPEED_TO_KMH: f64 = 0.18553167;
/// km/h to native speed units
const KMH_TO_SPEED: f64 = 5.3899155;

/// One stored beam
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreBeam {
    /// Depth in meters
    pub depth: f64,
    /// Across-track distance in meters
    pub acrosstrack: f64,
    /// Along-track distance in meters
    pub alongtrack: f64,
    /// Two-way travel time in seconds
    pub range: f64,
    /// Across-track angle in degrees
    pub angle_across: f64,
    /// Forward angle in degrees
    pub angle_forward: f64,
    /// Amplitude in 0.25 dB
    pub amplitude: i16,
    /// Signal to noise ratio in dB
    pub signal_to_noise: i16,
    /// Echo length in samples
    pub echo_length: i16,
    /// Quality code: `0` no data, `Q` sonar flagged, `E` edited, `F` filtered, blank good
    pub quality: u8,
    /// Detection source: `W` amplitude, `B` phase
    pub source: u8,
}

impl Default for StoreBeam {
    fn default() -> Self {
        StoreBeam {
            depth: 0.0,
            acrosstrack: 0.0,
            alongtrack: 0.0,
            range: 0.0,
            angle_across: 0.0,
            angle_forward: 0.0,
            amplitude: 0,
            signal_to_noise: 0,
            echo_length: 0,
            quality: b'0',
            source: b'W',
        }
    }
}

impl From<BeamRecord> for StoreBeam {
    fn from(b: BeamRecord) -> Self {
        StoreBeam {
            depth: b.depth as f64,
            acrosstrack: b.acrosstrack as f64,
            alongtrack: b.alongtrack as f64,
            range: b.range as f64,
            angle_across: b.angle_across as f64,
            angle_forward: b.angle_forward as f64,
            amplitude: b.amplitude,
            signal_to_noise: b.signal_to_noise,
            echo_length: b.echo_length,
            quality: b.quality,
            source: b.source,
        }
    }
}

impl From<&StoreBeam> for BeamRecord {
    fn from(b: &StoreBeam) -> Self {
        BeamRecord {
            depth: b.depth as f32,
            acrosstrack: b.acrosstrack as f32,
            alongtrack: b.alongtrack as f32,
            range: b.range as f32,
            angle_across: b.angle_across as f32,
            angle_forward: b.angle_forward as f32,
            amplitude: b.amplitude,
            signal_to_noise: b.signal_to_noise,
            echo_length: b.echo_length,
            quality: b.quality,
            source: b.source,
        }
    }
}

/// One stored sidescan pixel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StorePixel {
    /// Raw amplitude
    pub amplitude: f64,
    /// Along-track distance in meters
    pub alongtrack: f64,
}

impl From<PixelRecord> for StorePixel {
    fn from(p: PixelRecord) -> Self {
        StorePixel {
            amplitude: p.amplitude as f64,
            alongtrack: 0.1 * p.alongtrack as f64,
        }
    }
}

impl From<&StorePixel> for PixelRecord {
    fn from(p: &StorePixel) -> Self {
        PixelRecord {
            amplitude: saturate_i16(p.amplitude),
            alongtrack: saturate_i16(10.0 * p.alongtrack),
        }
    }
}

fn saturate_i16(v: f64) -> i16 {
    v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Everything one SeaBeam 2100 logical record can carry
#[derive(Debug, Clone, PartialEq)]
pub struct Sb2100Store {
    /// Kind of the record held
    pub kind: DataKind,
    /// Record time
    pub time: OffsetDateTime,

    /// Port roll bias in degrees
    pub roll_bias_port: f64,
    /// Starboard roll bias in degrees
    pub roll_bias_starboard: f64,
    /// Pitch bias in degrees
    pub pitch_bias: f64,
    /// Ship draft in meters
    pub ship_draft: f64,
    /// Navigation offset x in meters
    pub offset_x: f64,
    /// Navigation offset y in meters
    pub offset_y: f64,
    /// Navigation offset z in meters
    pub offset_z: f64,
    /// Sound velocity profile
    pub svp: Vec<(f64, f64)>,

    /// Longitude in degrees, stored in [0, 360)
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Heading in degrees
    pub heading: f64,
    /// Speed in native units
    pub speed: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Pitch in degrees
    pub pitch: f64,
    /// Heave in meters
    pub heave: f64,
    /// Surface sound velocity in m/s
    pub ssv: f64,
    /// `L` 12 kHz, `H` 36 kHz, `2` 20 kHz
    pub frequency: u8,
    /// `A` auto, `M` manual
    pub depth_gate_mode: u8,
    /// Receive gain in dB
    pub ping_gain: u8,
    /// Pulse width in ms
    pub ping_pulse_width: u8,
    /// Transmitter attenuation in dB
    pub transmitter_attenuation: u8,
    /// `V` velocimeter, `M` manual, `T` temperature
    pub ssv_source: u8,
    /// `0` none, `A` true across-track and apparent depth, `T` true both
    pub svp_correction: u8,
    /// `D` logarithmic, `L` linear
    pub pixel_algorithm: u8,
    /// Pixel size in meters
    pub pixel_size: f64,
    /// Bathymetry
    pub beams: Vec<StoreBeam>,
    /// Sidescan
    pub pixels: Vec<StorePixel>,

    /// Comment text
    pub comment: String,
}

impl Default for Sb2100Store {
    fn default() -> Self {
        Sb2100Store {
            kind: DataKind::None,
            time: OffsetDateTime::UNIX_EPOCH,
            roll_bias_port: 0.0,
            roll_bias_starboard: 0.0,
            pitch_bias: 0.0,
            ship_draft: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_z: 0.0,
            svp: Vec::new(),
            longitude: 0.0,
            latitude: 0.0,
            heading: 0.0,
            speed: 0.0,
            roll: 0.0,
            pitch: 0.0,
            heave: 0.0,
            ssv: 0.0,
            frequency: b'L',
            depth_gate_mode: b'A',
            ping_gain: 0,
            ping_pulse_width: 0,
            transmitter_attenuation: 0,
            ssv_source: b'M',
            svp_correction: b'T',
            pixel_algorithm: b'L',
            pixel_size: 0.0,
            beams: Vec::with_capacity(MAX_BEAMS),
            pixels: Vec::with_capacity(MAX_PIXELS),
            comment: String::new(),
        }
    }
}

fn time_from_record(t: &RecordTime) -> Result<OffsetDateTime> {
    epoch::from_julian(
        t.year as i32,
        t.jday as i32,
        t.hour as i32,
        t.minute as i32,
        t.sec as i32,
        t.msec as i32,
    )
    .map_err(|e| Error::Unintelligible(format!("record time: {}", e)))
}

fn record_time(t: OffsetDateTime) -> RecordTime {
    let (year, jday, hour, minute, sec, msec) = epoch::to_julian(t);
    RecordTime {
        year: year as i16,
        jday: jday as i16,
        hour: hour as i16,
        minute: minute as i16,
        sec: sec as i16,
        msec: msec as i16,
    }
}

fn flag_from_quality(quality: u8) -> BeamFlag {
    match quality {
        b' ' | b'\n' => BeamFlag::NONE,
        b'0' => BeamFlag::NULL,
        b'Q' => BeamFlag::flagged(BeamFlag::SONAR),
        b'E' => BeamFlag::flagged(BeamFlag::MANUAL),
        b'F' => BeamFlag::flagged(BeamFlag::FILTER),
        _ => BeamFlag::flagged(BeamFlag::SONAR),
    }
}

fn quality_from_flag(flag: BeamFlag) -> u8 {
    if !flag.is_flagged() {
        b' '
    } else if flag.is_null() {
        b'0'
    } else if flag.is_manual() {
        b'E'
    } else if flag.is_sonar() {
        b'Q'
    } else {
        b'F'
    }
}

impl Sb2100Store {
    /// Reset to the state of a freshly allocated store
    pub fn clear(&mut self) {
        let beams = std::mem::take(&mut self.beams);
        let pixels = std::mem::take(&mut self.pixels);
        *self = Sb2100Store {
            beams,
            pixels,
            ..Default::default()
        };
        self.beams.clear();
        self.pixels.clear();
    }

    /// Receiver gain correction in dB
    pub fn gain_db(&self) -> f64 {
        let pulse_width = if self.ping_pulse_width == 0 {
            5.0
        } else {
            self.ping_pulse_width as f64
        };
        self.ping_gain as f64 - self.transmitter_attenuation as f64
            + 10.0 * (pulse_width / 5.0).log10()
            - 30.0
    }

    /// Load a parameter record
    pub fn set_parameter(&mut self, pr: ParameterRecord) -> Result<()> {
        self.time = time_from_record(&pr.time)?;
        self.roll_bias_port = pr.roll_bias_port as f64;
        self.roll_bias_starboard = pr.roll_bias_starboard as f64;
        self.pitch_bias = pr.pitch_bias as f64;
        self.ship_draft = pr.ship_draft as f64;
        self.offset_x = pr.offset_x as f64;
        self.offset_y = pr.offset_y as f64;
        self.offset_z = pr.offset_z as f64;
        self.svp = pr
            .svp
            .into_iter()
            .map(|(d, v)| (d as f64, v as f64))
            .collect();
        Ok(())
    }

    /// The parameter record to write
    pub fn parameter(&self) -> ParameterRecord {
        ParameterRecord {
            time: record_time(self.time),
            roll_bias_port: self.roll_bias_port as f32,
            roll_bias_starboard: self.roll_bias_starboard as f32,
            pitch_bias: self.pitch_bias as f32,
            ship_draft: self.ship_draft as f32,
            offset_x: self.offset_x as f32,
            offset_y: self.offset_y as f32,
            offset_z: self.offset_z as f32,
            svp: self
                .svp
                .iter()
                .take(MAX_SVP)
                .map(|(d, v)| (*d as f32, *v as f32))
                .collect(),
        }
    }

    /// Load a data header, returning the beam and pixel counts that follow
    pub fn set_data_header(&mut self, dh: &DataHeaderRecord) -> Result<(usize, usize)> {
        self.time = time_from_record(&dh.time)?;
        self.longitude = dh.longitude;
        self.latitude = dh.latitude;
        self.heading = dh.heading as f64;
        self.speed = dh.speed as f64;
        self.roll = dh.roll as f64;
        self.pitch = dh.pitch as f64;
        self.heave = dh.heave as f64;
        self.ssv = dh.ssv as f64;
        self.frequency = dh.frequency;
        self.depth_gate_mode = dh.depth_gate_mode;
        self.ping_gain = dh.ping_gain;
        self.ping_pulse_width = dh.ping_pulse_width;
        self.transmitter_attenuation = dh.transmitter_attenuation;
        self.ssv_source = dh.ssv_source;
        self.svp_correction = dh.svp_correction;
        self.pixel_algorithm = dh.pixel_algorithm;
        self.pixel_size = dh.pixel_size as f64;
        self.beams.clear();
        self.pixels.clear();
        Ok((dh.nbeams as usize, dh.npixels as usize))
    }

    /// The data header to write, announcing `npixels` pixels
    pub fn data_header(&self, npixels: usize) -> DataHeaderRecord {
        DataHeaderRecord {
            time: record_time(self.time),
            longitude: self.longitude,
            latitude: self.latitude,
            heading: self.heading as f32,
            speed: self.speed as f32,
            roll: self.roll as f32,
            pitch: self.pitch as f32,
            heave: self.heave as f32,
            ssv: self.ssv as f32,
            frequency: self.frequency,
            depth_gate_mode: self.depth_gate_mode,
            ping_gain: self.ping_gain,
            ping_pulse_width: self.ping_pulse_width,
            transmitter_attenuation: self.transmitter_attenuation,
            ssv_source: self.ssv_source,
            svp_correction: self.svp_correction,
            pixel_algorithm: self.pixel_algorithm,
            pixel_size: self.pixel_size as f32,
            nbeams: self.beams.len().min(MAX_BEAMS) as i32,
            npixels: npixels.min(MAX_PIXELS) as i32,
            ..Default::default()
        }
    }

    /// Fail unless the store holds survey data
    pub fn require_data(&self) -> Result<()> {
        match self.kind {
            DataKind::Data => Ok(()),
            k => Err(Error::for_kind(k)),
        }
    }

    /// Build the generic ping
    pub fn to_ping(&self) -> Ping {
        let gain_db = self.gain_db();
        let gain_factor = 10f64.powf(-gain_db / 20.0);
        let beams = self
            .beams
            .iter()
            .map(|b| Beam {
                flag: flag_from_quality(b.quality),
                depth: b.depth,
                acrosstrack: b.acrosstrack,
                alongtrack: b.alongtrack,
                amplitude: 0.25 * b.amplitude as f64 - gain_db,
                detect: detect_from_source(b.source),
                ttime: b.range,
                angle_across: b.angle_across,
                angle_forward: b.angle_forward,
                snr: b.signal_to_noise as f64,
                echo_length: b.echo_length as i32,
                quality: b.quality,
            })
            .collect();
        let center = (self.pixels.len() / 2) as f64;
        let pixels = self
            .pixels
            .iter()
            .enumerate()
            .map(|(i, p)| Pixel {
                amplitude: if p.amplitude > 0.0 {
                    gain_factor * p.amplitude
                } else {
                    SIDESCAN_NULL
                },
                acrosstrack: self.pixel_size * (i as f64 - center),
                alongtrack: p.alongtrack,
            })
            .collect();
        Ping::new(
            self.time,
            self.longitude,
            self.latitude,
            SPEED_TO_KMH * self.speed,
            self.heading,
            beams,
            pixels,
        )
    }

    /// Overwrite the survey fields from a generic ping
    pub fn set_ping(&mut self, ping: &Ping) -> Result<()> {
        if ping.beams.len() > MAX_BEAMS {
            return Err(Error::BadParameter(format!(
                "{} beams exceed the maximum of {}",
                ping.beams.len(),
                MAX_BEAMS
            )));
        }
        if ping.pixels.len() > MAX_PIXELS {
            return Err(Error::BadParameter(format!(
                "{} pixels exceed the maximum of {}",
                ping.pixels.len(),
                MAX_PIXELS
            )));
        }
        self.kind = DataKind::Data;
        self.time = ping.timestamp;
        self.longitude = if ping.longitude < 0.0 {
            ping.longitude + 360.0
        } else {
            ping.longitude
        };
        self.latitude = ping.latitude;
        self.heading = ping.heading;
        self.speed = KMH_TO_SPEED * ping.speed;

        let gain_db = self.gain_db();
        let gain_factor = 10f64.powf(gain_db / 20.0);
        self.beams.resize(ping.beams.len(), StoreBeam::default());
        for (s, b) in self.beams.iter_mut().zip(&ping.beams) {
            s.quality = quality_from_flag(b.flag);
            s.depth = b.depth;
            s.acrosstrack = b.acrosstrack;
            s.alongtrack = b.alongtrack;
            s.amplitude = saturate_i16(4.0 * (b.amplitude + gain_db));
            s.range = b.ttime;
            s.angle_across = b.angle_across;
            s.angle_forward = b.angle_forward;
            s.signal_to_noise = saturate_i16(b.snr);
            s.echo_length = saturate_i16(b.echo_length as f64);
            match b.detect {
                DetectKind::Amplitude => s.source = b'W',
                DetectKind::Phase => s.source = b'B',
                _ => {}
            }
        }

        let center = ping.pixels.len() / 2;
        let mut set_pixel_size = self.pixel_size <= 0.0;
        self.pixels.resize(ping.pixels.len(), StorePixel::default());
        for (i, (s, p)) in self.pixels.iter_mut().zip(&ping.pixels).enumerate() {
            s.amplitude = if p.amplitude > SIDESCAN_NULL {
                gain_factor * p.amplitude
            } else {
                0.0
            };
            s.alongtrack = p.alongtrack;
            if set_pixel_size && p.acrosstrack > 0.0 && i != center {
                self.pixel_size = p.acrosstrack / (i as f64 - center as f64);
                set_pixel_size = false;
            }
        }
        Ok(())
    }

    /// Navigation and attitude
    pub fn navigation(&self) -> Navigation {
        Navigation {
            timestamp: self.time,
            longitude: self.longitude,
            latitude: self.latitude,
            speed: SPEED_TO_KMH * self.speed,
            heading: self.heading,
            draft: self.ship_draft,
            roll: self.roll,
            pitch: self.pitch,
            heave: -self.heave,
        }
    }

    /// Overwrite navigation and attitude
    pub fn set_navigation(&mut self, nav: &Navigation) {
        self.time = nav.timestamp;
        self.longitude = if nav.longitude < 0.0 {
            nav.longitude + 360.0
        } else {
            nav.longitude
        };
        self.latitude = nav.latitude;
        self.speed = KMH_TO_SPEED * nav.speed;
        self.heading = nav.heading;
        self.roll = nav.roll;
        self.pitch = nav.pitch;
        self.heave = -nav.heave;
    }

    /// Altitude from the centre beam or the beam nearest nadir
    pub fn altitude(&self) -> Altitude {
        let n = self.beams.len();
        let mut altitude = 0.0;
        if n > 0 {
            let center = &self.beams[n / 2];
            if center.quality != b'0' && center.depth > 0.0 {
                altitude = center.depth;
            } else {
                let valid = |b: &&StoreBeam| b.quality != b'0' && b.depth != 0.0;
                let nearest = |want_positive: bool| {
                    self.beams
                        .iter()
                        .filter(valid)
                        .filter(|b| (b.depth > 0.0) == want_positive)
                        .min_by(|a, b| a.acrosstrack.abs().total_cmp(&b.acrosstrack.abs()))
                };
                if let Some(b) = nearest(true) {
                    altitude = b.depth;
                } else if let Some(b) = nearest(false) {
                    altitude = -b.depth;
                }
            }
        }
        Altitude {
            transducer_depth: 0.0,
            altitude,
        }
    }

    /// Travel times and angles
    pub fn travel_times(&self) -> TravelTimes {
        let beams = self
            .beams
            .iter()
            .map(|b| {
                let (angle, angle_forward) = if b.angle_across < 0.0 {
                    (-b.angle_across, 180.0 + b.angle_forward)
                } else {
                    (b.angle_across, b.angle_forward)
                };
                BeamTravelTime {
                    ttime: b.range,
                    angle,
                    angle_forward,
                    angle_null: 0.0,
                    heave: -self.heave,
                    alongtrack_offset: 0.0,
                }
            })
            .collect();
        TravelTimes {
            beams,
            draft: 0.0,
            ssv: self.ssv,
        }
    }

    /// Bottom detection method per beam
    pub fn detects(&self) -> Vec<DetectKind> {
        self.beams.iter().map(|b| detect_from_source(b.source)).collect()
    }

    /// Gain settings
    pub fn gains(&self) -> Gains {
        Gains {
            transmit_gain: self.transmitter_attenuation as f64,
            pulse_length: 0.001 * self.ping_pulse_width as f64,
            receive_gain: self.ping_gain as f64,
        }
    }

    /// The velocity profile
    pub fn svp(&self) -> Svp {
        Svp {
            samples: self.svp.clone(),
        }
    }

    /// Replace the velocity profile, keeping at most the format's maximum
    pub fn set_svp(&mut self, svp: &Svp) {
        self.svp = svp.samples.iter().take(MAX_SVP).copied().collect();
    }
}

fn detect_from_source(source: u8) -> DetectKind {
    match source {
        b'W' => DetectKind::Amplitude,
        b'B' => DetectKind::Phase,
        _ => DetectKind::Unknown,
    }
}
