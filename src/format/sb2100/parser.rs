//! Record framing and resynchronisation
//!
//! [`LabelParser`] finds the next record label in a byte stream and reads
//! record bodies. It carries the one-slot lookahead used by the decoder: when
//! a ping ends because a label of another kind turned up, that label is
//! handed back with [`LabelParser::save`] and returned again by the next
//! call to [`LabelParser::next_header`] without touching the stream.
use super::record::{Label, LABEL_LEN, LABEL_PREFIX, MAX_FILE_HEADER, TRAILER_LEN, EOR};
use super::record::checksum;
use crate::error::{Error, Result};
use std::io::Read;

/// Label plus the two bytes that follow it
pub const WINDOW_LEN: usize = LABEL_LEN + 2;

/// Which record the decoder wants next within one ping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// Any record may start a new logical unit
    #[default]
    Nothing,
    /// A data header was read, bathymetry should follow
    Bathymetry,
    /// Bathymetry was read, sidescan should follow
    Sidescan,
}

impl Expect {
    /// The label this state is waiting for
    pub fn label(&self) -> Option<Label> {
        match self {
            Expect::Nothing => None,
            Expect::Bathymetry => Some(Label::Bathymetry),
            Expect::Sidescan => Some(Label::Sidescan),
        }
    }
}

/// A located record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// A record with the value of its length field
    ///
    /// For [`Label::FileHeader`] the two bytes are the first of the six
    /// ASCII length digits, which [`LabelParser::read_file_header`] reads.
    Record(Label, i16),
    /// A window with the right prefix but an unknown kind
    Unknown,
}

/// A record body read from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Checksum stored in the record
    pub checksum_read: u32,
    /// End-of-record marker as found
    pub eor: [u8; 2],
}

impl Body {
    /// Return `true` if the stored checksum matches the payload
    pub fn checksum_ok(&self) -> bool {
        checksum(&self.payload) == self.checksum_read
    }
}

/// Finds labels and reads record bodies, keeping one saved label
#[derive(Debug, Clone, Default)]
pub struct LabelParser {
    saved: Option<[u8; WINDOW_LEN]>,
    skipped: u64,
}

impl LabelParser {
    /// A parser with nothing saved
    pub fn new() -> LabelParser {
        LabelParser::default()
    }

    /// Push a window back to be returned by the next call
    pub fn save(&mut self, window: [u8; WINDOW_LEN]) {
        self.saved = Some(window);
    }

    /// Return `true` when a label is waiting
    pub fn has_saved(&self) -> bool {
        self.saved.is_some()
    }

    /// Total bytes discarded while resynchronising
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Return the next window starting with the label prefix
    ///
    /// The saved window is used first. Otherwise ten bytes are read and the
    /// window slides one byte at a time until it lines up with a label.
    pub fn next_window(&mut self, reader: &mut dyn Read) -> Result<[u8; WINDOW_LEN]> {
        if let Some(w) = self.saved.take() {
            return Ok(w);
        }
        let mut window = [0u8; WINDOW_LEN];
        reader.read_exact(&mut window).map_err(Error::from_read)?;
        let mut skipped = 0u64;
        while !window.starts_with(LABEL_PREFIX) {
            window.copy_within(1.., 0);
            let mut b = [0u8; 1];
            reader.read_exact(&mut b).map_err(Error::from_read)?;
            window[WINDOW_LEN - 1] = b[0];
            skipped += 1;
        }
        if skipped > 0 {
            tracing::debug!("skipped {} bytes to resynchronise on a label", skipped);
            self.skipped += skipped;
        }
        Ok(window)
    }

    /// Locate the next record and decode its length field
    ///
    /// Returns the raw window too, so the caller can save it.
    pub fn next_header(&mut self, reader: &mut dyn Read) -> Result<([u8; WINDOW_LEN], Header)> {
        let window = self.next_window(reader)?;
        let header = match Label::from_tag(&window) {
            Some(label) => Header::Record(
                label,
                i16::from_be_bytes([window[LABEL_LEN], window[LABEL_LEN + 1]]),
            ),
            None => Header::Unknown,
        };
        tracing::trace!("record header {:?}", header);
        Ok((window, header))
    }

    /// Read the length digits and text of a file header
    ///
    /// The first two digits are the last two bytes of `window`.
    pub fn read_file_header(
        &self,
        reader: &mut dyn Read,
        window: &[u8; WINDOW_LEN],
    ) -> Result<String> {
        let mut digits = [0u8; 6];
        digits[..2].copy_from_slice(&window[LABEL_LEN..]);
        reader
            .read_exact(&mut digits[2..])
            .map_err(Error::from_read)?;
        let length = parse_length_digits(&digits)?;
        let mut text = vec![0u8; length];
        reader.read_exact(&mut text).map_err(Error::from_read)?;
        Ok(String::from_utf8_lossy(&text).into_owned())
    }

    /// Read the payload and trailer of a binary record
    ///
    /// A checksum or end-of-record mismatch is only logged.
    pub fn read_body(&self, reader: &mut dyn Read, label: Label, length: i16) -> Result<Body> {
        let length = usize::try_from(length)
            .ok()
            .filter(|l| *l >= TRAILER_LEN)
            .ok_or_else(|| {
                Error::Unintelligible(format!("{:?} record with length {}", label, length))
            })?;
        let mut raw = vec![0u8; length];
        reader.read_exact(&mut raw).map_err(Error::from_read)?;
        let trailer = raw.split_off(length - TRAILER_LEN);
        let body = Body {
            payload: raw,
            checksum_read: u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]),
            eor: [trailer[4], trailer[5]],
        };
        if !body.checksum_ok() {
            tracing::debug!(
                "checksum mismatch in {:?} record: read {} calculated {}",
                label,
                body.checksum_read,
                checksum(&body.payload)
            );
        }
        if body.eor != EOR {
            tracing::debug!("bad end of record marker in {:?} record", label);
        }
        Ok(body)
    }
}

fn parse_length_digits(digits: &[u8; 6]) -> Result<usize> {
    let text = std::str::from_utf8(digits)
        .map_err(|_| Error::Unintelligible("non-ASCII file header length".to_string()))?;
    let length: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::Unintelligible(format!("file header length {:?}", text)))?;
    if length > MAX_FILE_HEADER {
        return Err(Error::Unintelligible(format!(
            "file header length {} too large",
            length
        )));
    }
    Ok(length)
}

#[cfg(test)]
mod test {
    use super::super::record::frame;
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_resync_over_garbage() {
        let mut bytes = b"xxSB2SB21".to_vec();
        bytes.extend(frame(Label::Text, b"hi\0").unwrap());
        let mut reader = Cursor::new(bytes);
        let mut parser = LabelParser::new();

        let (_, header) = parser.next_header(&mut reader).unwrap();
        assert_eq!(header, Header::Record(Label::Text, 9));
        assert_eq!(parser.skipped(), 9);
        let body = parser.read_body(&mut reader, Label::Text, 9).unwrap();
        assert_eq!(body.payload, b"hi\0");
        assert!(body.checksum_ok());
        assert!(parser.next_header(&mut reader).unwrap_err().is_eof());
    }

    #[test]
    fn test_saved_window_is_returned_first() {
        let bytes = frame(Label::Sidescan, &[]).unwrap();
        let mut reader = Cursor::new(bytes);
        let mut parser = LabelParser::new();

        let (window, _) = parser.next_header(&mut reader).unwrap();
        parser.save(window);
        assert!(parser.has_saved());
        let (again, header) = parser.next_header(&mut reader).unwrap();
        assert_eq!(window, again);
        assert_eq!(header, Header::Record(Label::Sidescan, 6));
        assert!(!parser.has_saved());
        assert_eq!(reader.position(), WINDOW_LEN as u64);
    }

    #[test]
    fn test_unknown_kind() {
        let mut reader = Cursor::new(b"SB21BIZZ\0\x06".to_vec());
        let (_, header) = LabelParser::new().next_header(&mut reader).unwrap();
        assert_eq!(header, Header::Unknown);
    }

    #[test]
    fn test_file_header() {
        let mut reader = Cursor::new(b"SB21BIFH    12hello world!".to_vec());
        let mut parser = LabelParser::new();
        let (window, header) = parser.next_header(&mut reader).unwrap();
        assert!(matches!(header, Header::Record(Label::FileHeader, _)));
        assert_eq!(reader.position(), 10);
        assert_eq!(parser.read_file_header(&mut reader, &window).unwrap(), "hello world!");
    }

    #[test]
    fn test_bad_file_header_length() {
        for bytes in [b"SB21BIFH 1x2..", b"SB21BIFH999999"] {
            let mut reader = Cursor::new(bytes.to_vec());
            let mut parser = LabelParser::new();
            let (window, _) = parser.next_header(&mut reader).unwrap();
            let err = parser.read_file_header(&mut reader, &window).unwrap_err();
            assert!(matches!(err, Error::Unintelligible(_)));
        }
    }

    #[test]
    fn test_checksum_mismatch_is_not_an_error() {
        let mut bytes = frame(Label::Text, b"abc\0").unwrap();
        bytes[11] ^= 0x20;
        let mut reader = Cursor::new(bytes);
        let mut parser = LabelParser::new();
        let (_, header) = parser.next_header(&mut reader).unwrap();
        let Header::Record(label, length) = header else {
            panic!("unexpected header {:?}", header);
        };
        let body = parser.read_body(&mut reader, label, length).unwrap();
        assert!(!body.checksum_ok());
        assert_eq!(body.payload, b"aBc\0");
    }

    #[test]
    fn test_short_length_field() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let err = LabelParser::new()
            .read_body(&mut reader, Label::Text, 3)
            .unwrap_err();
        assert!(matches!(err, Error::Unintelligible(_)));
    }
}
