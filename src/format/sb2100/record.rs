//! Wire layouts of the SeaBeam 2100 binary records
//!
//! Each physical record is an 8-byte label, a big-endian `i16` length
//! counting every byte after the length field, the payload, a `u32`
//! checksum of the payload and a two byte end-of-record marker. The file
//! header is the exception: its length is six ASCII digits and it carries
//! no trailer.
//!
//! The structs here mirror the payloads byte for byte and know nothing
//! about the generic model. [`super::store`] converts between the two.
use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Error, Result};

/// Every label starts with this prefix
pub const LABEL_PREFIX: &[u8; 6] = b"SB21BI";
/// Bytes in a label
pub const LABEL_LEN: usize = 8;
/// Checksum plus end-of-record marker
pub const TRAILER_LEN: usize = 6;
/// End-of-record marker
pub const EOR: [u8; 2] = *b"\r\n";

/// Maximum number of bathymetry beams
pub const MAX_BEAMS: usize = 151;
/// Maximum number of sidescan pixels
pub const MAX_PIXELS: usize = 2000;
/// Maximum number of sound velocity profile pairs
pub const MAX_SVP: usize = 30;
/// Maximum comment length including the terminating NUL
pub const MAX_COMMENT: usize = 1944;
/// Largest file header text accepted on read
pub const MAX_FILE_HEADER: usize = 100_000;

/// Parameter payload without any velocity pairs
pub const PR_FIXED_LEN: usize = 44;
/// Parameter payload as written, with room for every velocity pair
pub const PR_WRITE_LEN: usize = PR_FIXED_LEN + MAX_SVP * 8;
/// Data header payload
pub const DH_LEN: usize = 84;
/// Bytes per beam in a bathymetry payload
pub const BEAM_LEN: usize = 32;
/// Bytes per pixel in a sidescan payload
pub const PIXEL_LEN: usize = 4;

/// The kinds of physical record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// ASCII file header
    FileHeader,
    /// Comment text
    Text,
    /// Sonar parameters and sound velocity profile
    Parameter,
    /// Per-ping navigation, attitude and settings
    DataHeader,
    /// Per-ping bathymetry
    Bathymetry,
    /// Per-ping sidescan
    Sidescan,
}

impl Label {
    /// The 8-byte tag written before the record
    pub fn tag(&self) -> &'static [u8; LABEL_LEN] {
        match self {
            Label::FileHeader => b"SB21BIFH",
            Label::Text => b"SB21BITR",
            Label::Parameter => b"SB21BIPR",
            Label::DataHeader => b"SB21BIDH",
            Label::Bathymetry => b"SB21BIBR",
            Label::Sidescan => b"SB21BISR",
        }
    }

    /// Identify a tag, `None` if it is not one of ours
    pub fn from_tag(tag: &[u8]) -> Option<Label> {
        [
            Label::FileHeader,
            Label::Text,
            Label::Parameter,
            Label::DataHeader,
            Label::Bathymetry,
            Label::Sidescan,
        ]
        .into_iter()
        .find(|l| tag.len() >= LABEL_LEN && l.tag()[..] == tag[..LABEL_LEN])
    }
}

/// Additive checksum over payload bytes
///
/// ```
/// # use swathio::format::sb2100::record::checksum;
/// assert_eq!(checksum(&[0xff, 0xff, 2]), 512);
/// ```
pub fn checksum(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |sum, b| sum.wrapping_add(*b as u32))
}

/// Assemble a complete checksummed record
pub fn frame(label: Label, payload: &[u8]) -> Result<Vec<u8>> {
    let length = i16::try_from(payload.len() + TRAILER_LEN).map_err(|_| {
        Error::BadParameter(format!("{} byte payload too long for a record", payload.len()))
    })?;
    let mut out = Vec::with_capacity(LABEL_LEN + 2 + payload.len() + TRAILER_LEN);
    out.extend_from_slice(label.tag());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&checksum(payload).to_be_bytes());
    out.extend_from_slice(&EOR);
    Ok(out)
}

/// Assemble the file header record
pub fn frame_file_header(text: &str) -> Result<Vec<u8>> {
    if text.len() > 999_999 {
        return Err(Error::BadParameter("file header text too long".to_string()));
    }
    let mut out = Vec::with_capacity(LABEL_LEN + 6 + text.len());
    out.extend_from_slice(Label::FileHeader.tag());
    out.extend_from_slice(format!("{:6}", text.len()).as_bytes());
    out.extend_from_slice(text.as_bytes());
    Ok(out)
}

/// The split time stamp carried by parameter and data header records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTime {
    /// Year
    pub year: i16,
    /// Day of year
    pub jday: i16,
    /// Hour
    pub hour: i16,
    /// Minute
    pub minute: i16,
    /// Second
    pub sec: i16,
    /// Millisecond
    pub msec: i16,
}

impl RecordTime {
    fn read(c: &mut ByteCursor) -> Result<RecordTime> {
        Ok(RecordTime {
            year: c.get_i16()?,
            jday: c.get_i16()?,
            hour: c.get_i16()?,
            minute: c.get_i16()?,
            sec: c.get_i16()?,
            msec: c.get_i16()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) -> Result<()> {
        for v in [self.year, self.jday, self.hour, self.minute, self.sec, self.msec] {
            w.put_i16(v)?;
        }
        Ok(())
    }
}

/// Sonar parameter record (`SB21BIPR`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterRecord {
    /// Record time
    pub time: RecordTime,
    /// Port roll bias in degrees
    pub roll_bias_port: f32,
    /// Starboard roll bias in degrees
    pub roll_bias_starboard: f32,
    /// Pitch bias in degrees
    pub pitch_bias: f32,
    /// Ship draft in meters
    pub ship_draft: f32,
    /// Navigation offset x in meters
    pub offset_x: f32,
    /// Navigation offset y in meters
    pub offset_y: f32,
    /// Navigation offset z in meters
    pub offset_z: f32,
    /// Sound velocity profile as (depth, velocity) pairs
    pub svp: Vec<(f32, f32)>,
}

impl ParameterRecord {
    /// Return `true` if `length` is a valid record length field
    ///
    /// Writers emit the full fixed layout; compact records carrying only
    /// the stated number of pairs are accepted as well.
    pub fn length_ok(length: usize) -> bool {
        if length == PR_WRITE_LEN + TRAILER_LEN {
            return true;
        }
        length >= PR_FIXED_LEN + TRAILER_LEN
            && (length - PR_FIXED_LEN - TRAILER_LEN) % 8 == 0
            && (length - PR_FIXED_LEN - TRAILER_LEN) / 8 <= MAX_SVP
    }

    /// Parse a payload
    pub fn decode(payload: &[u8]) -> Result<ParameterRecord> {
        let mut c = ByteCursor::new(payload);
        let time = RecordTime::read(&mut c)?;
        let roll_bias_port = c.get_f32()?;
        let roll_bias_starboard = c.get_f32()?;
        let pitch_bias = c.get_f32()?;
        let ship_draft = c.get_f32()?;
        let offset_x = c.get_f32()?;
        let offset_y = c.get_f32()?;
        let offset_z = c.get_f32()?;
        let num_svp = c.get_i32()?;
        if num_svp < 0 || num_svp as usize > MAX_SVP {
            return Err(Error::Unintelligible(format!(
                "parameter record with {} velocity pairs",
                num_svp
            )));
        }
        let compact_len = PR_FIXED_LEN + 8 * num_svp as usize;
        if payload.len() != compact_len && payload.len() != PR_WRITE_LEN {
            return Err(Error::Unintelligible(format!(
                "parameter payload of {} bytes for {} velocity pairs",
                payload.len(),
                num_svp
            )));
        }
        let mut svp = Vec::with_capacity(num_svp as usize);
        for _ in 0..num_svp {
            svp.push((c.get_f32()?, c.get_f32()?));
        }
        Ok(ParameterRecord {
            time,
            roll_bias_port,
            roll_bias_starboard,
            pitch_bias,
            ship_draft,
            offset_x,
            offset_y,
            offset_z,
            svp,
        })
    }

    /// Serialize to the fixed write layout, unused pairs zeroed
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; PR_WRITE_LEN];
        let mut w = ByteWriter::new(&mut buf);
        self.time.write(&mut w)?;
        w.put_f32(self.roll_bias_port)?;
        w.put_f32(self.roll_bias_starboard)?;
        w.put_f32(self.pitch_bias)?;
        w.put_f32(self.ship_draft)?;
        w.put_f32(self.offset_x)?;
        w.put_f32(self.offset_y)?;
        w.put_f32(self.offset_z)?;
        let n = self.svp.len().min(MAX_SVP);
        w.put_i32(n as i32)?;
        for (depth, velocity) in &self.svp[..n] {
            w.put_f32(*depth)?;
            w.put_f32(*velocity)?;
        }
        Ok(buf)
    }
}

/// Sonar data header record (`SB21BIDH`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataHeaderRecord {
    /// Ping time
    pub time: RecordTime,
    /// Reserved
    pub spare1: i16,
    /// Reserved
    pub spare2: i16,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Heading in degrees
    pub heading: f32,
    /// Speed in the instrument's native units
    pub speed: f32,
    /// Roll in degrees
    pub roll: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Heave in meters
    pub heave: f32,
    /// Surface sound velocity in m/s
    pub ssv: f32,
    /// Sonar frequency code
    pub frequency: u8,
    /// Depth gate mode code
    pub depth_gate_mode: u8,
    /// Receive gain in dB
    pub ping_gain: u8,
    /// Pulse width in ms
    pub ping_pulse_width: u8,
    /// Transmitter attenuation in dB
    pub transmitter_attenuation: u8,
    /// Surface sound velocity source code
    pub ssv_source: u8,
    /// Sound velocity correction code
    pub svp_correction: u8,
    /// Pixel intensity algorithm code
    pub pixel_algorithm: u8,
    /// Sidescan pixel size in meters
    pub pixel_size: f32,
    /// Number of bathymetry beams that follow
    pub nbeams: i32,
    /// Number of sidescan pixels that follow
    pub npixels: i32,
    /// Reserved
    pub spare3: i16,
    /// Reserved
    pub spare4: i16,
    /// Reserved
    pub spare5: i16,
    /// Reserved
    pub spare6: i16,
}

impl DataHeaderRecord {
    /// Parse a payload
    pub fn decode(payload: &[u8]) -> Result<DataHeaderRecord> {
        let mut c = ByteCursor::new(payload);
        let dh = DataHeaderRecord {
            time: RecordTime::read(&mut c)?,
            spare1: c.get_i16()?,
            spare2: c.get_i16()?,
            longitude: c.get_f64()?,
            latitude: c.get_f64()?,
            heading: c.get_f32()?,
            speed: c.get_f32()?,
            roll: c.get_f32()?,
            pitch: c.get_f32()?,
            heave: c.get_f32()?,
            ssv: c.get_f32()?,
            frequency: c.get_u8()?,
            depth_gate_mode: c.get_u8()?,
            ping_gain: c.get_u8()?,
            ping_pulse_width: c.get_u8()?,
            transmitter_attenuation: c.get_u8()?,
            ssv_source: c.get_u8()?,
            svp_correction: c.get_u8()?,
            pixel_algorithm: c.get_u8()?,
            pixel_size: c.get_f32()?,
            nbeams: c.get_i32()?,
            npixels: c.get_i32()?,
            spare3: c.get_i16()?,
            spare4: c.get_i16()?,
            spare5: c.get_i16()?,
            spare6: c.get_i16()?,
        };
        if dh.nbeams < 0 || dh.nbeams as usize > MAX_BEAMS {
            return Err(Error::Unintelligible(format!("{} beams in data header", dh.nbeams)));
        }
        if dh.npixels < 0 || dh.npixels as usize > MAX_PIXELS {
            return Err(Error::Unintelligible(format!("{} pixels in data header", dh.npixels)));
        }
        if !dh.longitude.is_finite() || !dh.latitude.is_finite() {
            return Err(Error::Unintelligible(format!(
                "data header position {} {}",
                dh.longitude, dh.latitude
            )));
        }
        Ok(dh)
    }

    /// Serialize
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; DH_LEN];
        let mut w = ByteWriter::new(&mut buf);
        self.time.write(&mut w)?;
        w.put_i16(self.spare1)?;
        w.put_i16(self.spare2)?;
        w.put_f64(self.longitude)?;
        w.put_f64(self.latitude)?;
        w.put_f32(self.heading)?;
        w.put_f32(self.speed)?;
        w.put_f32(self.roll)?;
        w.put_f32(self.pitch)?;
        w.put_f32(self.heave)?;
        w.put_f32(self.ssv)?;
        w.put_u8(self.frequency)?;
        w.put_u8(self.depth_gate_mode)?;
        w.put_u8(self.ping_gain)?;
        w.put_u8(self.ping_pulse_width)?;
        w.put_u8(self.transmitter_attenuation)?;
        w.put_u8(self.ssv_source)?;
        w.put_u8(self.svp_correction)?;
        w.put_u8(self.pixel_algorithm)?;
        w.put_f32(self.pixel_size)?;
        w.put_i32(self.nbeams)?;
        w.put_i32(self.npixels)?;
        w.put_i16(self.spare3)?;
        w.put_i16(self.spare4)?;
        w.put_i16(self.spare5)?;
        w.put_i16(self.spare6)?;
        Ok(buf)
    }
}

/// One beam of a bathymetry record (`SB21BIBR`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeamRecord {
    /// Depth in meters
    pub depth: f32,
    /// Across-track distance in meters
    pub acrosstrack: f32,
    /// Along-track distance in meters
    pub alongtrack: f32,
    /// Two-way travel time in seconds
    pub range: f32,
    /// Across-track angle in degrees
    pub angle_across: f32,
    /// Forward angle in degrees
    pub angle_forward: f32,
    /// Amplitude in 0.25 dB
    pub amplitude: i16,
    /// Signal to noise ratio in dB
    pub signal_to_noise: i16,
    /// Echo length in samples
    pub echo_length: i16,
    /// Quality code
    pub quality: u8,
    /// Bottom detection source code
    pub source: u8,
}

impl BeamRecord {
    /// Parse `nbeams` beams
    pub fn decode_all(payload: &[u8], nbeams: usize) -> Result<Vec<BeamRecord>> {
        let mut c = ByteCursor::new(payload);
        let mut beams = Vec::with_capacity(nbeams);
        for _ in 0..nbeams {
            beams.push(BeamRecord {
                depth: c.get_f32()?,
                acrosstrack: c.get_f32()?,
                alongtrack: c.get_f32()?,
                range: c.get_f32()?,
                angle_across: c.get_f32()?,
                angle_forward: c.get_f32()?,
                amplitude: c.get_i16()?,
                signal_to_noise: c.get_i16()?,
                echo_length: c.get_i16()?,
                quality: c.get_u8()?,
                source: c.get_u8()?,
            });
        }
        Ok(beams)
    }

    /// Serialize a slice of beams
    pub fn encode_all(beams: &[BeamRecord]) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; beams.len() * BEAM_LEN];
        let mut w = ByteWriter::new(&mut buf);
        for b in beams {
            w.put_f32(b.depth)?;
            w.put_f32(b.acrosstrack)?;
            w.put_f32(b.alongtrack)?;
            w.put_f32(b.range)?;
            w.put_f32(b.angle_across)?;
            w.put_f32(b.angle_forward)?;
            w.put_i16(b.amplitude)?;
            w.put_i16(b.signal_to_noise)?;
            w.put_i16(b.echo_length)?;
            w.put_u8(b.quality)?;
            w.put_u8(b.source)?;
        }
        Ok(buf)
    }
}

/// One pixel of a sidescan record (`SB21BISR`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRecord {
    /// Amplitude
    pub amplitude: i16,
    /// Along-track distance in 0.1 m
    pub alongtrack: i16,
}

impl PixelRecord {
    /// Parse `npixels` pixels
    pub fn decode_all(payload: &[u8], npixels: usize) -> Result<Vec<PixelRecord>> {
        let mut c = ByteCursor::new(payload);
        let mut pixels = Vec::with_capacity(npixels);
        for _ in 0..npixels {
            pixels.push(PixelRecord {
                amplitude: c.get_i16()?,
                alongtrack: c.get_i16()?,
            });
        }
        Ok(pixels)
    }

    /// Serialize a slice of pixels
    pub fn encode_all(pixels: &[PixelRecord]) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; pixels.len() * PIXEL_LEN];
        let mut w = ByteWriter::new(&mut buf);
        for p in pixels {
            w.put_i16(p.amplitude)?;
            w.put_i16(p.alongtrack)?;
        }
        Ok(buf)
    }
}

/// Comment text as written: NUL terminated and truncated to fit
pub fn encode_comment(comment: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = comment.bytes().take(MAX_COMMENT - 1).collect();
    bytes.push(0);
    bytes
}

/// Comment text from a payload, trailing NULs removed
pub fn decode_comment(payload: &[u8]) -> String {
    let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}
