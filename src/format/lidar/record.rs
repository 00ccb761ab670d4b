//! Fixed binary layouts of 3D at Depth LIDAR records
//!
//! A file starts with a two byte magic number. Every record after it starts
//! with a two byte record id. All values are big-endian. Field names follow
//! the vendor's record documentation.
#![allow(missing_docs)]
use crate::error::{Error, Result};
use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};
use std::io::{Read, Write};

/// Magic number at the start of a file
pub const FILE_MAGIC: u16 = 0x3D46;

/// Bytes in a scan time stamp
pub const SCAN_TIME_LEN: usize = 14;
/// Bytes in a parameter record after its id
pub const PARAMETER_LEN: usize = 36;
/// Bytes in a raw scan header after its id
pub const RAW_HEADER_LEN: usize = SCAN_TIME_LEN + 4;
/// Bytes in one raw pulse
pub const RAW_PULSE_LEN: usize = 31;
/// Bytes in a processed scan header after its id
pub const PROCESSED_HEADER_LEN: usize = SCAN_TIME_LEN + 4 * 8 + 4 * 4 + 4;
/// Bytes in one processed pulse
pub const PROCESSED_PULSE_LEN: usize = RAW_PULSE_LEN + 8 + 1 + 6 * 8 + 3 * 4;
/// Largest pulse count accepted in a scan header
pub const MAX_PULSES: u32 = 1_000_000;

/// Record kinds and their ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordId {
    /// Scanner parameters
    Parameter,
    /// Free text
    Comment,
    /// Position fix
    Position,
    /// Roll, pitch and heave
    Attitude,
    /// Heading
    Heading,
    /// Sensor depth
    SensorDepth,
    /// Unprocessed scan
    RawScan,
    /// Scan with reconstructed soundings
    ProcessedScan,
}

impl RecordId {
    /// The id as written to the file
    pub fn value(&self) -> u16 {
        match self {
            RecordId::Parameter => 0x3D07,
            RecordId::Comment => 0x3D43,
            RecordId::Position => 0x3D50,
            RecordId::Attitude => 0x3D41,
            RecordId::Heading => 0x3D48,
            RecordId::SensorDepth => 0x3D44,
            RecordId::RawScan => 0x3D52,
            RecordId::ProcessedScan => 0x3D4C,
        }
    }

    /// Look an id up
    pub fn from_value(value: u16) -> Option<RecordId> {
        [
            RecordId::Parameter,
            RecordId::Comment,
            RecordId::Position,
            RecordId::Attitude,
            RecordId::Heading,
            RecordId::SensorDepth,
            RecordId::RawScan,
            RecordId::ProcessedScan,
        ]
        .into_iter()
        .find(|id| id.value() == value)
    }
}

/// Scanner configuration
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterRecord {
    pub version: u16,
    pub subversion: u16,
    pub scan_type: u16,
    pub cross_track_angle_start: f32,
    pub cross_track_angle_end: f32,
    pub forward_track_angle_start: f32,
    pub forward_track_angle_end: f32,
    pub counts_per_scan: i16,
    pub counts_per_cross_track: i16,
    pub counts_per_forward_track: i16,
    pub scanner_efficiency: i16,
    pub scans_per_file: i16,
    pub scan_count: i32,
}

impl ParameterRecord {
    /// Pulses per scan, derived from the track counts when not set
    pub fn pulses_per_scan(&self) -> usize {
        let n = if self.counts_per_scan > 0 {
            self.counts_per_scan as i32
        } else if self.counts_per_forward_track == 0 {
            self.counts_per_cross_track as i32
        } else if self.counts_per_cross_track == 0 {
            self.counts_per_forward_track as i32
        } else {
            self.counts_per_cross_track as i32 * self.counts_per_forward_track as i32
        };
        usize::try_from(n).unwrap_or(0)
    }
}

/// A text record
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentRecord {
    #[br(temp)]
    #[bw(calc = text.len() as u16)]
    len: u16,
    #[br(count = len)]
    text: Vec<u8>,
}

impl CommentRecord {
    /// A comment record holding `text`, truncated to what the length field fits
    pub fn new(text: &str) -> CommentRecord {
        let mut bytes = text.as_bytes().to_vec();
        bytes.truncate(u16::MAX as usize);
        CommentRecord { text: bytes }
    }

    /// The text, with invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Position fix
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionRecord {
    pub time_d: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Attitude sample
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttitudeRecord {
    pub time_d: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
}

/// Heading sample
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadingRecord {
    pub time_d: f64,
    pub heading: f64,
}

/// Sensor depth sample
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorDepthRecord {
    pub time_d: f64,
    pub depth: f64,
}

/// Calendar time stamp of the first pulse of a scan
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub days_since_jan_1: u16,
    pub hour: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub nanoseconds: u32,
}

/// Header of an unprocessed scan
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawScanHeader {
    pub time: ScanTime,
    pub num_pulses: u32,
}

/// One laser shot as recorded
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawPulse {
    pub range: f32,
    pub amplitude: i16,
    pub snr: f32,
    pub cross_track_angle: f32,
    pub forward_track_angle: f32,
    pub cross_track_offset: f32,
    pub forward_track_offset: f32,
    pub pulse_time_offset: u32,
    pub saturated: u8,
}

/// Header of a scan with navigation attached
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessedScanHeader {
    pub time: ScanTime,
    pub time_d: f64,
    pub navlon: f64,
    pub navlat: f64,
    pub sensordepth: f64,
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    pub speed: f32,
    pub num_pulses: u32,
}

/// One laser shot with its reconstructed sounding
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessedPulse {
    pub raw: RawPulse,
    pub time_d: f64,
    pub beamflag: u8,
    pub acrosstrack: f64,
    pub alongtrack: f64,
    pub depth: f64,
    pub navlon: f64,
    pub navlat: f64,
    pub sensordepth: f64,
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
}

/// Read exactly `len` bytes and parse them as `T`
///
/// The stream is not seekable, so each fixed-size block is buffered first.
pub fn read_block<T>(reader: &mut dyn Read, len: usize) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()> + binrw::meta::ReadEndian,
{
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(T::read(&mut Cursor::new(&buf))?)
}

/// Serialize `value` and append it to `out`
pub fn write_block<T>(out: &mut Vec<u8>, value: &T) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()> + binrw::meta::WriteEndian,
{
    let mut cursor = Cursor::new(Vec::new());
    value.write(&mut cursor)?;
    out.extend_from_slice(&cursor.into_inner());
    Ok(())
}

/// Read a two byte id or magic number
pub fn read_u16(reader: &mut dyn Read) -> Result<u16> {
    let mut b = [0u8; 2];
    reader.read_exact(&mut b).map_err(Error::from_read)?;
    Ok(u16::from_be_bytes(b))
}

/// Read a length-prefixed comment
pub fn read_comment(reader: &mut dyn Read) -> Result<CommentRecord> {
    let len = read_u16(reader)? as usize;
    let mut text = vec![0u8; len];
    reader.read_exact(&mut text).map_err(Error::from_read)?;
    Ok(CommentRecord { text })
}

/// Write a whole record to the stream
pub fn write_record(writer: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .map_err(|e| Error::WriteFail(e.to_string()))
}
