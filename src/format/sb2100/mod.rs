//! SeaBeam 2100 binary formats (42 and 43)
//!
//! Both formats share one codec. Format 43 is format 42 with the sidescan
//! dropped: it always announces and writes zero pixels and drops pixels on
//! read.
//!
//! A ping is three physical records, data header then bathymetry then
//! sidescan. Comments and parameter records stand on their own. The file
//! header is written once before the first record and skipped on read.
//!
//! ```
//! # use swathio::driver::{Registry, SonarDriver};
//! # use swathio::model::{DataKind, SwathRecord};
//! # fn main() -> Result<(),Box<dyn std::error::Error>> {
//! let registry = Registry::with_builtin_formats();
//! let mut driver = registry.open(42)?;
//! driver.insert(&SwathRecord::Comment("line 7".to_string()))?;
//! let mut bytes = Vec::new();
//! driver.encode_ping(&mut bytes)?;
//!
//! let mut reader = registry.open(42)?;
//! assert_eq!(reader.decode_ping(&mut bytes.as_slice())?, DataKind::Comment);
//! assert_eq!(reader.extract()?, SwathRecord::Comment("line 7".to_string()));
//! # Ok(())
//! # }
//! ```
use crate::driver::{FormatInfo, SonarDriver};
use crate::error::{Error, Result};
use crate::model::{
    Altitude, DataKind, DetectKind, Dimensions, Gains, Navigation, Svp, SwathRecord, TravelTimes,
};
use std::io::{Read, Write};

pub mod parser;
pub mod record;
pub mod store;

use parser::{Expect, Header, LabelParser};
use record::{
    BeamRecord, DataHeaderRecord, Label, ParameterRecord, PixelRecord, BEAM_LEN, DH_LEN,
    MAX_BEAMS, MAX_COMMENT, MAX_PIXELS, PIXEL_LEN, TRAILER_LEN,
};
pub use store::Sb2100Store;

const FILE_HEADER_TEXT: &str = "
SeaBeam 2100 multibeam sonar binary data
Formats 42 (with sidescan) and 43 (without sidescan)

Records are an 8 byte label, a 2 byte length, the payload,
a 4 byte checksum and a carriage return line feed pair.
All binary values are big-endian; floats are IEEE 754.

Records:
        SB21BITR  text (comment)
        SB21BIPR  sonar parameters and velocity profile
        SB21BIDH  ping data header
        SB21BIBR  ping bathymetry
        SB21BISR  ping sidescan

Each ping is written as a data header, a bathymetry record
and a sidescan record, in that order, even when the beam or
pixel count is zero.
";

/// Which of the two on-disk variants a driver handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Format 42, bathymetry, amplitude and sidescan
    B1,
    /// Format 43, bathymetry and amplitude only
    B2,
}

impl Variant {
    fn keeps_sidescan(&self) -> bool {
        matches!(self, Variant::B1)
    }
}

/// Reads and writes SeaBeam 2100 binary records
#[derive(Debug, Clone)]
pub struct Sb2100Driver {
    info: FormatInfo,
    variant: Variant,
    store: Sb2100Store,
    parser: LabelParser,
    file_header: Option<String>,
    header_written: bool,
    checksum_ok: bool,
}

fn unintelligible(e: Error) -> Error {
    match e {
        Error::BufferExhausted { .. } => Error::Unintelligible(e.to_string()),
        e => e,
    }
}

fn write_all(writer: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .map_err(|e| Error::WriteFail(e.to_string()))
}

impl Sb2100Driver {
    /// Registry description of a variant
    pub fn format_info(variant: Variant) -> FormatInfo {
        let (id, name, description, pixels_ss_max) = match variant {
            Variant::B1 => (
                42,
                "SB2100B1",
                "SeaBeam 2100 binary: 151 beams of bathymetry and amplitude, 2000 pixels of sidescan",
                MAX_PIXELS,
            ),
            Variant::B2 => (
                43,
                "SB2100B2",
                "SeaBeam 2100 binary: 151 beams of bathymetry and amplitude, no sidescan",
                0,
            ),
        };
        FormatInfo {
            id,
            name,
            system: "SB2100",
            description,
            beams_bath_max: MAX_BEAMS,
            beams_amp_max: MAX_BEAMS,
            pixels_ss_max,
            variable_beams: true,
            traveltime: true,
            beamwidth_xtrack: 2.0,
            beamwidth_ltrack: 2.0,
        }
    }

    /// A driver with an empty store
    pub fn new(info: FormatInfo, variant: Variant) -> Sb2100Driver {
        Sb2100Driver {
            info,
            variant,
            store: Sb2100Store::default(),
            parser: LabelParser::new(),
            file_header: None,
            header_written: false,
            checksum_ok: true,
        }
    }

    /// The store
    pub fn store(&self) -> &Sb2100Store {
        &self.store
    }

    /// Mutable access to the store
    pub fn store_mut(&mut self) -> &mut Sb2100Store {
        &mut self.store
    }

    /// Text of the last file header read
    pub fn file_header(&self) -> Option<&str> {
        self.file_header.as_deref()
    }

    fn read_checked(
        &mut self,
        reader: &mut dyn Read,
        label: Label,
        length: i16,
    ) -> Result<Vec<u8>> {
        let body = self.parser.read_body(reader, label, length)?;
        self.checksum_ok &= body.checksum_ok();
        Ok(body.payload)
    }

    fn decode_records(&mut self, reader: &mut dyn Read) -> Result<DataKind> {
        let mut expect = Expect::Nothing;
        let mut npixels = 0;
        let mut nbeams = 0;
        loop {
            let (window, header) = match self.parser.next_header(reader) {
                Ok(next) => next,
                Err(e) if expect != Expect::Nothing && (e.is_eof() || !e.is_fatal()) => {
                    return Ok(DataKind::Data)
                }
                Err(e) => return Err(e),
            };

            // a ping ends at the first record that does not continue it
            if let Some(wanted) = expect.label() {
                match header {
                    Header::Unknown => return Ok(DataKind::Data),
                    Header::Record(label, _) if label == wanted => {}
                    _ => {
                        self.parser.save(window);
                        return Ok(DataKind::Data);
                    }
                }
            }

            match header {
                Header::Unknown => {
                    return Err(Error::Unintelligible(format!(
                        "unknown record label {:?}",
                        String::from_utf8_lossy(&window[..8])
                    )))
                }
                Header::Record(Label::FileHeader, _) => {
                    let text = self.parser.read_file_header(reader, &window)?;
                    tracing::trace!("file header of {} bytes", text.len());
                    self.file_header = Some(text);
                    self.store.kind = DataKind::None;
                }
                Header::Record(Label::Parameter, length) => {
                    if length < 0 || !ParameterRecord::length_ok(length as usize) {
                        return Err(Error::Unintelligible(format!(
                            "parameter record length {}",
                            length
                        )));
                    }
                    let payload = self.read_checked(reader, Label::Parameter, length)?;
                    let pr = ParameterRecord::decode(&payload).map_err(unintelligible)?;
                    self.store.set_parameter(pr)?;
                    self.store.kind = DataKind::VelocityProfile;
                    return Ok(self.store.kind);
                }
                Header::Record(Label::Text, length) => {
                    if length as i32 > (MAX_COMMENT + TRAILER_LEN) as i32 {
                        return Err(Error::Unintelligible(format!(
                            "text record length {}",
                            length
                        )));
                    }
                    let payload = self.read_checked(reader, Label::Text, length)?;
                    self.store.comment = record::decode_comment(&payload);
                    self.store.kind = DataKind::Comment;
                    return Ok(self.store.kind);
                }
                Header::Record(Label::DataHeader, length) => {
                    if length as usize != DH_LEN + TRAILER_LEN {
                        return Err(Error::Unintelligible(format!(
                            "data header length {}",
                            length
                        )));
                    }
                    let payload = self.read_checked(reader, Label::DataHeader, length)?;
                    let dh = DataHeaderRecord::decode(&payload).map_err(unintelligible)?;
                    (nbeams, npixels) = self.store.set_data_header(&dh)?;
                    self.store.kind = DataKind::Data;
                    expect = Expect::Bathymetry;
                }
                Header::Record(Label::Bathymetry, length) => {
                    if expect != Expect::Bathymetry {
                        return Err(Error::Unintelligible(
                            "bathymetry record without a data header".to_string(),
                        ));
                    }
                    if length as i32 != (nbeams * BEAM_LEN + TRAILER_LEN) as i32 {
                        return Err(Error::Unintelligible(format!(
                            "bathymetry record length {} for {} beams",
                            length, nbeams
                        )));
                    }
                    let payload = self.read_checked(reader, Label::Bathymetry, length)?;
                    let beams = BeamRecord::decode_all(&payload, nbeams).map_err(unintelligible)?;
                    self.store.beams.extend(beams.into_iter().map(store::StoreBeam::from));
                    expect = Expect::Sidescan;
                }
                Header::Record(Label::Sidescan, length) => {
                    if expect != Expect::Sidescan {
                        return Err(Error::Unintelligible(
                            "sidescan record without bathymetry".to_string(),
                        ));
                    }
                    if length as i32 != (npixels * PIXEL_LEN + TRAILER_LEN) as i32 {
                        // keep the bathymetry already read
                        tracing::warn!(
                            "sidescan record length {} for {} pixels, dropping sidescan",
                            length,
                            npixels
                        );
                        return Ok(DataKind::Data);
                    }
                    let payload = match self.read_checked(reader, Label::Sidescan, length) {
                        Ok(payload) => payload,
                        Err(e) if e.is_eof() => {
                            tracing::debug!("sidescan record cut short, keeping bathymetry");
                            return Ok(DataKind::Data);
                        }
                        Err(e) => return Err(e),
                    };
                    let pixels =
                        PixelRecord::decode_all(&payload, npixels).map_err(unintelligible)?;
                    if self.variant.keeps_sidescan() {
                        self.store.pixels.extend(pixels.into_iter().map(store::StorePixel::from));
                    }
                    return Ok(DataKind::Data);
                }
            }
        }
    }

    fn encode_records(&self) -> Result<Vec<Vec<u8>>> {
        let mut records = Vec::new();
        if !self.header_written {
            records.push(record::frame_file_header(FILE_HEADER_TEXT)?);
        }
        match self.store.kind {
            DataKind::None | DataKind::Header => {}
            DataKind::Comment => {
                let payload = record::encode_comment(&self.store.comment);
                records.push(record::frame(Label::Text, &payload)?);
            }
            DataKind::Parameter | DataKind::VelocityProfile => {
                let payload = self.store.parameter().encode()?;
                records.push(record::frame(Label::Parameter, &payload)?);
            }
            DataKind::Data => {
                let nbeams = self.store.beams.len().min(MAX_BEAMS);
                let pixels: &[_] = if self.variant.keeps_sidescan() {
                    &self.store.pixels[..self.store.pixels.len().min(MAX_PIXELS)]
                } else {
                    &[]
                };
                let dh = self.store.data_header(pixels.len());
                records.push(record::frame(Label::DataHeader, &dh.encode()?)?);

                let beams: Vec<BeamRecord> =
                    self.store.beams[..nbeams].iter().map(Into::into).collect();
                records.push(record::frame(Label::Bathymetry, &BeamRecord::encode_all(&beams)?)?);

                let pixels: Vec<PixelRecord> = pixels.iter().map(Into::into).collect();
                records.push(record::frame(Label::Sidescan, &PixelRecord::encode_all(&pixels)?)?);
            }
            kind => return Err(Error::BadKind(kind)),
        }
        Ok(records)
    }
}

impl SonarDriver for Sb2100Driver {
    fn info(&self) -> &FormatInfo {
        &self.info
    }

    fn kind(&self) -> DataKind {
        self.store.kind
    }

    fn dimensions(&self) -> Dimensions {
        match self.store.kind {
            DataKind::Data => Dimensions {
                beams_bath: self.store.beams.len(),
                beams_amp: self.store.beams.len(),
                pixels_ss: self.store.pixels.len(),
            },
            _ => Dimensions::default(),
        }
    }

    fn decode_ping(&mut self, reader: &mut dyn Read) -> Result<DataKind> {
        self.store.clear();
        self.checksum_ok = true;
        let kind = self.decode_records(reader);
        if let Ok(kind) = &kind {
            tracing::trace!(
                "decoded {} with {} beams and {} pixels",
                kind,
                self.store.beams.len(),
                self.store.pixels.len()
            );
        }
        kind
    }

    fn encode_ping(&mut self, writer: &mut dyn Write) -> Result<()> {
        for bytes in self.encode_records()? {
            write_all(writer, &bytes)?;
        }
        self.header_written = true;
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
            SwathRecord::Ping(ping) => self.store.set_ping(ping)?,
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
        self.store.set_navigation(nav);
        Ok(())
    }

    fn extract_altitude(&self) -> Result<Altitude> {
        self.store.require_data()?;
        Ok(self.store.altitude())
    }

    fn extract_svp(&self) -> Result<Svp> {
        match self.store.kind {
            DataKind::VelocityProfile => Ok(self.store.svp()),
            kind => Err(Error::for_kind(kind)),
        }
    }

    fn insert_svp(&mut self, svp: &Svp) -> Result<()> {
        match self.store.kind {
            DataKind::VelocityProfile => {
                self.store.set_svp(svp);
                Ok(())
            }
            kind => Err(Error::for_kind(kind)),
        }
    }

    fn travel_times(&self) -> Result<TravelTimes> {
        self.store.require_data()?;
        Ok(self.store.travel_times())
    }

    fn detects(&self) -> Result<Vec<DetectKind>> {
        self.store.require_data()?;
        Ok(self.store.detects())
    }

    fn gains(&self) -> Result<Gains> {
        self.store.require_data()?;
        Ok(self.store.gains())
    }

    fn verify_checksum(&self) -> bool {
        self.checksum_ok
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn driver(variant: Variant) -> Sb2100Driver {
        Sb2100Driver::new(Sb2100Driver::format_info(variant), variant)
    }

    #[test]
    fn test_header_written_once() {
        let mut d = driver(Variant::B1);
        d.insert(&SwathRecord::Comment("a".to_string())).unwrap();
        let mut out = Vec::new();
        d.encode_ping(&mut out).unwrap();
        d.encode_ping(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches("SB21BIFH").count(), 1);
        assert_eq!(text.matches("SB21BITR").count(), 2);
    }

    #[test]
    fn test_file_header_is_skipped() {
        let mut d = driver(Variant::B1);
        d.insert(&SwathRecord::Other(DataKind::VelocityProfile))
            .unwrap();
        let mut out = Vec::new();
        d.encode_ping(&mut out).unwrap();

        let mut r = driver(Variant::B1);
        let kind = r.decode_ping(&mut out.as_slice()).unwrap();
        assert_eq!(kind, DataKind::VelocityProfile);
        assert!(r.file_header().unwrap().contains("SeaBeam 2100"));
        assert!(r.verify_checksum());
    }

    #[test]
    fn test_accessors_on_comment() {
        let mut d = driver(Variant::B2);
        d.insert(&SwathRecord::Comment("c".to_string())).unwrap();
        assert!(matches!(d.extract_nav(), Err(Error::Comment)));
        assert!(matches!(d.gains(), Err(Error::Comment)));
        d.insert(&SwathRecord::Other(DataKind::VelocityProfile))
            .unwrap();
        assert!(matches!(d.travel_times(), Err(Error::Other)));
        assert!(d.extract_svp().is_ok());
    }

    #[test]
    fn test_bad_kind_on_write() {
        let mut d = driver(Variant::B1);
        d.insert(&SwathRecord::Other(DataKind::Attitude)).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            d.encode_ping(&mut out),
            Err(Error::BadKind(DataKind::Attitude))
        ));
    }
}
